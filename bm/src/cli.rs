//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BiteMatch - AI food portioning and pairing advisor
#[derive(Parser)]
#[command(
    name = "bm",
    about = "AI food portioning and pairing advisor",
    version,
    after_help = "Logs are written to: ~/.local/share/bitematch/logs/bitematch.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start the interactive session (default)
    Repl,

    /// Ask one question and print the streamed recommendation
    Ask {
        /// The question to ask
        prompt: String,

        /// Food items on the plate (repeatable)
        #[arg(short, long = "food", value_name = "ITEM")]
        food: Vec<String>,

        /// Vibe to steer the recommendation
        #[arg(long)]
        vibe: Option<String>,

        /// Path to a photo of the plate
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Show trial/subscription status and remaining requests
    Status,

    /// List saved recommendations
    History,

    /// Clear all saved recommendations
    Clear,

    /// Upgrade to a paid tier (premium or pro)
    Upgrade {
        /// Tier to purchase
        #[arg(value_name = "TIER", default_value = "premium")]
        tier: String,

        /// Billing period
        #[arg(short, long, default_value = "monthly")]
        plan: String,
    },

    /// Show the plan catalog
    Plans,

    /// Show estimated savings from your recommendation history
    Stats,
}

/// Path to the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bitematch")
        .join("logs")
        .join("bitematch.log")
}
