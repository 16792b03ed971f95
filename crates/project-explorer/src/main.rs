fn main() -> anyhow::Result<()> {
    project_explorer::init();
    project_explorer::cli::run()
}
