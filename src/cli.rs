use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mediagrab")]
#[command(author, version, about = "Telegram bot that downloads YouTube/Instagram media as audio or video", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Probe a URL and print its metadata without downloading
    Info {
        /// Media URL to inspect
        url: String,
    },

    /// Print the aggregate download statistics from the data directory
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
