use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "lore",
    about = "Chat with an AI agent whose instructions are composed from your knowledge files",
    version,
    after_help = "Logs are written to: ~/.local/share/lore/logs/lore.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to lore.yaml config file")]
    pub config: Option<PathBuf>,

    /// Suppress status output
    #[arg(short, long, global = true, help = "Suppress status output")]
    pub quiet: bool,

    /// Defaults to `chat`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a conversation (default)
    Chat {
        /// Instruction file with front matter (overrides instruction_file)
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,

        /// Keep the remote thread and agent when the conversation ends
        #[arg(long)]
        keep: bool,
    },

    /// Print the composed instructions without contacting the service
    Prompt {
        /// Instruction file with front matter (overrides instruction_file)
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create a lore directory with a config, template and example instructions
    Init {
        /// Directory to initialize (defaults to ~/.config/lore)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}
