use std::num::NonZeroU32;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "Summarize YouTube videos from their captions",
    version
)]
pub struct Cli {
    /// LLM model for summarization (claude-* uses Anthropic, anything else OpenAI)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Preferred caption language
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Per-request timeout for outbound API calls, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Show config and pipeline details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the web front end
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Summarize a single video and print the result
    Summarize {
        /// YouTube video URL or video ID
        url: String,

        /// Approximate summary length in words (over 500 asks for an in-depth summary)
        #[arg(short = 'n', long, default_value = "250")]
        length: NonZeroU32,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
