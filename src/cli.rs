use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "translator-bot", version, about = "Telegram translation bot with a SQLite cache")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the bot (default)
    Start,

    /// Translate a phrase through the cache without Telegram
    Translate {
        /// Word or phrase to translate
        text: String,
    },

    /// Print translation statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test configuration file validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_start() {
        let cli = Cli {
            config: PathBuf::from("config.toml"),
            command: None,
        };

        assert!(matches!(cli.get_command(), Commands::Start));
    }

    #[test]
    fn test_cli_parsing_translate() {
        let cli = Cli::try_parse_from(["translator-bot", "translate", "break the ice"]).unwrap();

        match cli.get_command() {
            Commands::Translate { text } => assert_eq!(text, "break the ice"),
            _ => panic!("Expected Translate command"),
        }
    }

    #[test]
    fn test_cli_parsing_stats_json_with_global_config() {
        let cli = Cli::try_parse_from(["translator-bot", "stats", "--json", "-c", "bot.toml"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("bot.toml"));
        assert!(matches!(cli.get_command(), Commands::Stats { json: true }));
    }

    #[test]
    fn test_cli_parsing_config_show() {
        let cli = Cli::try_parse_from(["translator-bot", "config", "show"]).unwrap();

        match cli.get_command() {
            Commands::Config { action } => assert!(matches!(action, ConfigCommands::Show)),
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_translate_requires_text() {
        assert!(Cli::try_parse_from(["translator-bot", "translate"]).is_err());
    }
}
