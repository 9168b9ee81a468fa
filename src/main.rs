fn main() -> anyhow::Result<()> {
    mwscript_compiler::run()
}
