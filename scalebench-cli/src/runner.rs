//! Engine Process Runner
//!
//! Launches the external engine once per trial and captures everything it
//! writes. stdout and stderr share one pipe, so diagnostics and the timing
//! marker arrive in the order the engine wrote them.
//!
//! There is no retry: the first failing trial is returned to the caller. A
//! timeout is optional and off by default, in which case a hung engine blocks
//! the run indefinitely.

use scalebench_core::ExperimentCell;
use std::fs::File;
use std::io::Read;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on a single poll of the output pipe
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period between SIGTERM and SIGKILL on timeout
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Lines of engine output quoted in a failure message
const OUTPUT_TAIL_LINES: usize = 20;

/// Failure of a single engine invocation
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The engine could not be started
    #[error("failed to launch engine `{program}`: {source}")]
    SpawnFailed {
        /// Executable that failed to start
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully
    #[error("engine exited with {status} for {cell}{}", output_tail(.output))]
    NonZeroExit {
        /// Cell being measured
        cell: ExperimentCell,
        /// Exit code or terminating signal
        status: String,
        /// Combined stdout/stderr of the failed trial
        output: String,
    },

    /// The engine ran past the configured timeout and was killed
    #[error("engine exceeded the {timeout:?} timeout for {cell}")]
    Timeout {
        /// Cell being measured
        cell: ExperimentCell,
        /// Configured limit
        timeout: Duration,
    },

    /// Reading the output pipe failed
    #[error("failed to read engine output: {0}")]
    Io(#[from] std::io::Error),
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    format!("\n--- engine output ---\n{}", lines[start..].join("\n"))
}

/// How to launch the engine
///
/// The per-trial positional arguments (mode token, thread count, start
/// token, depth) are appended after `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    /// Executable to launch
    pub program: String,
    /// Leading arguments, e.g. `run main.go`
    pub args: Vec<String>,
    /// Directory the engine runs in (current directory if unset)
    pub working_dir: Option<PathBuf>,
    /// Kill the engine if a trial runs longer than this
    pub timeout: Option<Duration>,
}

impl EngineCommand {
    /// Command running `program` with no leading arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Set the leading arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run the engine in `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Abort trials that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Positional arguments for one trial
    pub fn trial_args(cell: ExperimentCell, start_token: &str, depth: u32) -> [String; 4] {
        [
            cell.mode.token().to_string(),
            cell.threads.to_string(),
            start_token.to_string(),
            depth.to_string(),
        ]
    }
}

impl Default for EngineCommand {
    fn default() -> Self {
        EngineCommand::new("go").with_args(["run", "main.go"])
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Something that can execute one trial and hand back the raw engine output
pub trait EngineRunner {
    /// Run the engine once for `cell`
    fn run(
        &mut self,
        cell: ExperimentCell,
        start_token: &str,
        depth: u32,
    ) -> Result<String, ProcessError>;
}

/// [`EngineRunner`] backed by a closure
pub struct FnRunner<F>(F);

/// Wrap a closure as an [`EngineRunner`]
pub fn runner_fn<F>(f: F) -> FnRunner<F>
where
    F: FnMut(ExperimentCell, &str, u32) -> Result<String, ProcessError>,
{
    FnRunner(f)
}

impl<F> EngineRunner for FnRunner<F>
where
    F: FnMut(ExperimentCell, &str, u32) -> Result<String, ProcessError>,
{
    fn run(
        &mut self,
        cell: ExperimentCell,
        start_token: &str,
        depth: u32,
    ) -> Result<String, ProcessError> {
        (self.0)(cell, start_token, depth)
    }
}

/// Result of polling for data
#[derive(Debug)]
enum PollResult {
    DataAvailable,
    Timeout,
    PipeClosed,
    Error(std::io::Error),
}

/// Convert a wait into a poll(2) timeout, rounding up so that a sub-millisecond
/// remainder still blocks instead of spinning.
fn poll_timeout_ms(wait: Duration) -> i32 {
    let ms = wait.as_micros().div_ceil(1000).max(1);
    i32::try_from(ms).unwrap_or(i32::MAX)
}

/// Wait for data to be available on a file descriptor with timeout
fn wait_for_data(fd: RawFd, timeout_ms: i32) -> PollResult {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

    if result < 0 {
        PollResult::Error(std::io::Error::last_os_error())
    } else if result == 0 {
        PollResult::Timeout
    } else if pollfd.revents & libc::POLLIN != 0 {
        // Drain before honouring a hangup: the pipe may still hold output
        PollResult::DataAvailable
    } else if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        PollResult::PipeClosed
    } else {
        PollResult::Timeout
    }
}

/// Create a close-on-exec pipe, returning (reader, writer).
fn output_pipe() -> Result<(File, File), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // Stdio redirection dup2()s the write end onto fd 1/2 in the child, which
    // clears the flag there; every other copy stays private to this process.
    for &fd in &fds {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    let reader = unsafe { File::from_raw_fd(fds[0]) };
    let writer = unsafe { File::from_raw_fd(fds[1]) };
    Ok((reader, writer))
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn describe_status(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => status.to_string(),
    }
}

/// Runs the real engine as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: EngineCommand,
}

impl ProcessRunner {
    /// Create a runner for `command`
    pub fn new(command: EngineCommand) -> Self {
        Self { command }
    }

    /// The command this runner launches
    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    fn spawn(&self, trial_args: &[String; 4]) -> Result<(Child, File), ProcessError> {
        let (reader, writer) = output_pipe()?;
        let stderr_writer = writer.try_clone()?;

        // The Command owns the parent's copies of the write end; dropping it at
        // the end of this function lets the reader see EOF once the engine exits.
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .args(trial_args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer));
        if let Some(dir) = &self.command.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| ProcessError::SpawnFailed {
            program: self.command.program.clone(),
            source,
        })?;
        Ok((child, reader))
    }

    fn remaining(&self, started: Instant) -> Option<Duration> {
        self.command
            .timeout
            .map(|limit| limit.saturating_sub(started.elapsed()))
    }

    /// Read the engine's combined output until it closes the pipe
    fn collect_output(
        &self,
        child: &mut Child,
        mut reader: File,
        cell: ExperimentCell,
        started: Instant,
    ) -> Result<Vec<u8>, ProcessError> {
        let fd = reader.as_raw_fd();
        let mut output = Vec::new();
        let mut buf = [0u8; 8192];

        loop {
            let wait = match self.remaining(started) {
                Some(remaining) if remaining.is_zero() => {
                    return Err(self.handle_timeout(child, cell));
                }
                Some(remaining) => remaining.min(POLL_INTERVAL),
                None => POLL_INTERVAL,
            };

            match wait_for_data(fd, poll_timeout_ms(wait)) {
                PollResult::DataAvailable => {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    output.extend_from_slice(&buf[..n]);
                }
                PollResult::PipeClosed => break,
                PollResult::Timeout => continue,
                PollResult::Error(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                PollResult::Error(e) => return Err(ProcessError::Io(e)),
            }
        }

        Ok(output)
    }

    /// Reap the engine, honouring the timeout if one is set
    fn wait_for_exit(
        &self,
        child: &mut Child,
        cell: ExperimentCell,
        started: Instant,
    ) -> Result<ExitStatus, ProcessError> {
        if self.command.timeout.is_none() {
            return Ok(child.wait()?);
        }

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            match self.remaining(started) {
                Some(remaining) if !remaining.is_zero() => {
                    std::thread::sleep(remaining.min(Duration::from_millis(10)));
                }
                _ => return Err(self.handle_timeout(child, cell)),
            }
        }
    }

    /// Handle timeout: send SIGTERM, give the engine a grace period, then SIGKILL.
    fn handle_timeout(&self, child: &mut Child, cell: ExperimentCell) -> ProcessError {
        // Ignore the error: the engine may already be gone
        let _ = send_sigterm(child.id());

        let deadline = Instant::now() + TERM_GRACE;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
            let _ = child.wait();
        }

        ProcessError::Timeout {
            cell,
            timeout: self.command.timeout.unwrap_or_default(),
        }
    }
}

impl EngineRunner for ProcessRunner {
    fn run(
        &mut self,
        cell: ExperimentCell,
        start_token: &str,
        depth: u32,
    ) -> Result<String, ProcessError> {
        let trial_args = EngineCommand::trial_args(cell, start_token, depth);
        debug!(
            engine = %self.command,
            args = ?trial_args,
            dir = ?self.command.working_dir,
            "spawning trial"
        );

        let started = Instant::now();
        let (mut child, reader) = self.spawn(&trial_args)?;

        let collected = self
            .collect_output(&mut child, reader, cell, started)
            .and_then(|output| {
                self.wait_for_exit(&mut child, cell, started)
                    .map(|status| (status, output))
            });
        let (status, output) = match collected {
            Ok(done) => done,
            Err(e) => {
                if let Ok(None) = child.try_wait() {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                return Err(e);
            }
        };
        let output = String::from_utf8_lossy(&output).into_owned();

        if !status.success() {
            let status = describe_status(status);
            warn!(%cell, %status, "engine failed");
            return Err(ProcessError::NonZeroExit {
                cell,
                status,
                output,
            });
        }

        debug!(%cell, elapsed = ?started.elapsed(), bytes = output.len(), "trial finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalebench_core::Mode;

    fn sh(script: &str) -> EngineCommand {
        EngineCommand::new("sh").with_args(["-c", script, "engine"])
    }

    #[test]
    fn test_trial_args_order() {
        let args = EngineCommand::trial_args(ExperimentCell::new(Mode::WorkStealing, 8), "f", 5);
        assert_eq!(args, ["w", "8", "f", "5"]);
    }

    #[test]
    fn test_default_command() {
        let cmd = EngineCommand::default();
        assert_eq!(cmd.to_string(), "go run main.go");
        assert!(cmd.timeout.is_none());
    }

    #[test]
    fn test_passes_positional_args() {
        let mut runner = ProcessRunner::new(sh(r#"echo "args: $1 $2 $3 $4""#));
        let output = runner
            .run(ExperimentCell::new(Mode::Parallel, 6), "b", 4)
            .unwrap();
        assert_eq!(output.trim(), "args: p 6 b 4");
    }

    #[test]
    fn test_captures_stdout_and_stderr_in_order() {
        let mut runner = ProcessRunner::new(sh("echo one; echo two >&2; echo three"));
        let output = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap();
        assert_eq!(output, "one\ntwo\nthree\n");
    }

    #[test]
    fn test_large_output() {
        let mut runner = ProcessRunner::new(sh(
            "i=0; while [ $i -lt 5000 ]; do echo \"line $i of diagnostic noise\"; i=$((i+1)); done; echo 'S-TIME: 1.0'",
        ));
        let output = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap();
        assert!(output.len() > 64 * 1024);
        assert!(output.ends_with("S-TIME: 1.0\n"));
    }

    #[test]
    fn test_nonzero_exit() {
        let mut runner = ProcessRunner::new(sh("echo boom; exit 3"));
        let err = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap_err();
        match &err {
            ProcessError::NonZeroExit { status, output, .. } => {
                assert_eq!(status, "exit code 3");
                assert_eq!(output, "boom\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_spawn_failure() {
        let mut runner = ProcessRunner::new(EngineCommand::new("/nonexistent/scalebench-engine"));
        let err = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap_err();
        assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    }

    #[test]
    fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here\n").unwrap();
        let mut runner = ProcessRunner::new(sh("cat marker.txt").in_dir(dir.path()));
        let output = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap();
        assert_eq!(output, "here\n");
    }

    #[test]
    fn test_timeout_kills_engine() {
        let mut runner =
            ProcessRunner::new(sh("sleep 10").with_timeout(Duration::from_millis(200)));
        let start = Instant::now();
        let err = runner.run(ExperimentCell::BASELINE, "f", 5).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_poll_timeout_rounds_up() {
        assert_eq!(poll_timeout_ms(Duration::ZERO), 1);
        assert_eq!(poll_timeout_ms(Duration::from_micros(300)), 1);
        assert_eq!(poll_timeout_ms(Duration::from_micros(1500)), 2);
        assert_eq!(poll_timeout_ms(POLL_INTERVAL), 100);
        assert_eq!(poll_timeout_ms(Duration::from_secs(u64::MAX)), i32::MAX);
    }

    #[test]
    fn test_fn_runner() {
        let mut calls = Vec::new();
        let mut runner = runner_fn(|cell: ExperimentCell, start: &str, depth: u32| {
            calls.push((cell, start.to_string(), depth));
            Ok(format!("{}: 1.0", cell.mode.marker()))
        });
        assert_eq!(
            runner.run(ExperimentCell::BASELINE, "f", 3).unwrap(),
            "S-TIME: 1.0"
        );
        drop(runner);
        assert_eq!(calls, vec![(ExperimentCell::BASELINE, "f".to_string(), 3)]);
    }
}
