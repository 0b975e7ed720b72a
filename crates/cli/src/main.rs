//! akyuu CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Initialize config & storage
//! - `context`: Assemble a prompt from a story file and a lorebook
//! - `lore`: Inspect a lorebook and what a text would activate
//! - `story`: Keep stories in the local record store
//! - `config`: Show, locate or validate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "akyuu",
    about = "akyuu — token-budgeted prompt assembly for interactive fiction",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.akyuu/config.toml
    #[arg(long, global = true, env = "AKYUU_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and storage
    Onboard,

    /// Assemble the prompt for a story
    Context {
        /// Story JSON file, or a plain text file used as the story body
        story: PathBuf,

        /// Lorebook to draw entries from (overrides the configured one)
        #[arg(short, long)]
        lorebook: Option<PathBuf>,

        /// Memory text (overrides the story's)
        #[arg(short, long)]
        memory: Option<String>,

        /// Author's note (overrides the story's)
        #[arg(short, long)]
        note: Option<String>,

        /// Token budget (defaults to context.max_tokens)
        #[arg(short = 't', long)]
        max_tokens: Option<usize>,

        /// Omit the `***` preamble
        #[arg(long)]
        no_preamble: bool,

        /// Print per-entry statistics after the prompt
        #[arg(short, long)]
        report: bool,
    },

    /// List lorebook entries, optionally checking what a text activates
    Lore {
        /// Lorebook file
        lorebook: PathBuf,

        /// Text to scan for entry keys
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Manage stories in the record store
    Story {
        /// Local user id the stories belong to
        #[arg(short, long, default_value_t = 1, env = "AKYUU_USER")]
        user: u64,

        #[command(subcommand)]
        action: StoryAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum StoryAction {
    /// Create a story and select it
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change the current story's title or description
    Edit {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List your stories
    List,
    /// Select a story by id
    Select { id: String },
    /// Print the current story
    Show {
        /// Characters to display
        #[arg(short, long, default_value_t = 768)]
        chars: usize,
    },
    /// Append text to the current story
    Write { text: String },
    /// Remove the last action
    Undo,
    /// Replace the last action
    Alter { text: String },
    /// Replace the last action with text on its own line
    Add { text: String },
    /// Set the memory
    Memory { text: String },
    /// Set the author's note (empty clears it)
    Note { text: String },
    /// Print the prompt the next generation would send
    Prompt,
    /// Delete the current story
    Delete,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Context {
            story,
            lorebook,
            memory,
            note,
            max_tokens,
            no_preamble,
            report,
        } => {
            let args = commands::context::ContextArgs {
                story,
                lorebook,
                memory,
                note,
                max_tokens,
                no_preamble,
                report,
            };
            commands::context::run(config, args).await?
        }
        Commands::Lore { lorebook, text } => {
            commands::lore::run(config, &lorebook, text.as_deref()).await?
        }
        Commands::Story { user, action } => commands::story::run(config, user, action).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config).await?,
            ConfigAction::Path => commands::config_cmd::path(config).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config).await?,
        },
    }

    Ok(())
}
