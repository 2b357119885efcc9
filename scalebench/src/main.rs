fn main() -> anyhow::Result<()> {
    scalebench::run()
}
