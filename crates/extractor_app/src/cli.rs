use std::path::PathBuf;

use clap::Parser;

/// Extract an AI chat conversation from clipboard HTML into Markdown.
///
/// The platform clipboard itself is read by an external wrapper; this binary
/// consumes the raw payload from stdin or a file and prints the finished
/// Markdown on stdout for the wrapper to copy back.
#[derive(Debug, Parser)]
#[command(name = "chat-extract", version)]
pub struct Cli {
    /// Raw clipboard payload file; `-` reads stdin.
    #[arg(long, short = 'i', default_value = "-")]
    pub input: String,

    /// Directory holding the model profile files.
    #[arg(long, default_value = "models")]
    pub profiles: PathBuf,

    /// Configuration file; defaults to ./config.yaml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose logging.
    #[arg(long)]
    pub debug: bool,

    /// Convert without writing the output file.
    #[arg(long)]
    pub no_write: bool,

    /// Suppress the Markdown echo on stdout.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
