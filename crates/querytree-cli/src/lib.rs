mod check;
mod cli;
mod config;
mod files;
mod render;

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Sql(args) => render::run_sql(args),
        cli::Command::Model(args) => render::run_model(args),
        cli::Command::Check(args) => check::run(args),
    }
}
