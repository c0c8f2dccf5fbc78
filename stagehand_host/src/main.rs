use anyhow::Result;

mod cli;
mod demo;
mod flag_file;
mod runtime;
mod scene;

use cli::Command;

fn main() -> Result<()> {
    let command = cli::parse()?;

    let default_level = if command.verbose() { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match command {
        Command::List => {
            demo::print_library();
            Ok(())
        }
        Command::Run(args) => runtime::execute(args),
    }
}
