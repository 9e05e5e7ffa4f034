use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Commands that need logging initialize it after loading the config
    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Translate { text } => {
            commands::translate::execute(&args.config, &text).await?;
        }
        cli::Commands::Stats { json } => {
            commands::stats::execute(&args.config, json).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
        },
        cli::Commands::Version => {
            println!("Translator Bot v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
