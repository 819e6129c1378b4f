mod cli;
mod config;
mod logging;
mod run;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.debug);
    let config = config::load(cli.config.as_deref())?;

    let summary = run::run(&cli, &config)?;

    // Human-readable summary goes to stderr; stdout carries only the
    // document so an external clipboard-writer can consume it.
    eprintln!("Detected model: {}", summary.model);
    eprintln!("Extracted {} turn(s): {}", summary.turn_count, summary.title);
    if summary.warning_count > 0 {
        eprintln!("{} conversion warning(s); see extractor.log.", summary.warning_count);
    }
    if let Some(path) = &summary.output_path {
        eprintln!("Saved to: {}", path.display());
    }
    if !cli.quiet {
        println!("{}", summary.markdown);
    }
    Ok(())
}
