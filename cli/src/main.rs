mod commands;
mod terminal;

use commands::{CommandLine, Commands, modules, run};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.quiet());
    print::banner(commands.quiet());

    match commands.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Modules => {
            modules::modules();
            Ok(())
        }
    }
}
