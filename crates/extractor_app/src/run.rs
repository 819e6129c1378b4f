use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use extractor_engine::{
    build_markdown_document, convert, decode_payload, derive_title, detect, ensure_output_dir,
    fragment_body, generic_turns, load_profiles, parse_document, templated_filename, Conversion,
    ConvertError, Detection, DocumentMeta, FilenameParts, MarkdownWriter,
};
use extractor_logging::{extractor_debug, extractor_info, extractor_warn};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Front-matter timestamp format; fixed so every document reads the same.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct RunSummary {
    pub model: String,
    pub title: String,
    pub turn_count: usize,
    pub warning_count: usize,
    pub output_path: Option<PathBuf>,
    pub markdown: String,
}

/// One extraction run: payload to finished document. Synchronous and
/// self-contained; every recoverable condition degrades to a generic
/// conversion rather than aborting.
pub fn run(cli: &Cli, config: &AppConfig) -> Result<RunSummary> {
    let bytes = read_payload(&cli.input)?;
    let payload = decode_payload(&bytes).context("decoding clipboard payload")?;
    extractor_debug!(
        "decoded {} bytes as {}",
        bytes.len(),
        payload.encoding_label
    );
    let html = fragment_body(&payload.html);
    let document = parse_document(html);

    let outcome = load_profiles(&cli.profiles)
        .with_context(|| format!("loading model profiles from {:?}", cli.profiles))?;
    for failure in &outcome.failures {
        extractor_warn!("{failure}");
    }
    extractor_info!("{} model profile(s) loaded", outcome.registry.len());

    let (model_id, model_name, conversion) = match detect(&document, &outcome.registry) {
        Detection::Model(profile) => match convert(&document, profile) {
            Ok(conversion) => (profile.id.clone(), profile.name.clone(), conversion),
            Err(ConvertError::NoTurnsFound) => {
                extractor_warn!(
                    "profile `{}` matched but no turn containers were found; converting generically",
                    profile.id
                );
                (
                    profile.id.clone(),
                    profile.name.clone(),
                    Conversion {
                        turns: generic_turns(html),
                        warnings: Vec::new(),
                    },
                )
            }
        },
        Detection::Unknown => {
            extractor_warn!("no model profile matched; converting generically");
            (
                "unknown".to_string(),
                "Unknown".to_string(),
                Conversion {
                    turns: generic_turns(html),
                    warnings: Vec::new(),
                },
            )
        }
    };

    if conversion.turns.is_empty() {
        bail!("nothing extractable in the clipboard payload");
    }
    for warning in &conversion.warnings {
        extractor_warn!("{warning}");
    }

    let now = Local::now();
    let title = derive_title(&conversion.turns);
    let markdown = build_markdown_document(
        &conversion.turns,
        &DocumentMeta {
            model: model_name.clone(),
            title: title.clone(),
            extracted: now.format(TIMESTAMP_FORMAT).to_string(),
        },
    );

    let output_path = if config.output.enabled && !cli.no_write {
        let dir = PathBuf::from(&config.output.dir);
        ensure_output_dir(&dir).with_context(|| format!("preparing output directory {dir:?}"))?;

        let date = now.format(&config.date_format()).to_string();
        let time = now.format(&config.time_format()).to_string();
        let filename = templated_filename(
            &config.output.filename,
            &FilenameParts {
                model: &model_id,
                date: &date,
                time: &time,
                title: &title,
                counter: next_counter(&dir),
            },
        );
        let writer = MarkdownWriter::new(dir).with_bom(config.output.bom);
        let path = writer.write(&filename, &markdown)?;
        extractor_info!("saved {} turn(s) to {:?}", conversion.turns.len(), path);
        Some(path)
    } else {
        None
    };

    Ok(RunSummary {
        model: model_name,
        title,
        turn_count: conversion.turns.len(),
        warning_count: conversion.warnings.len(),
        output_path,
        markdown,
    })
}

fn read_payload(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading payload from stdin")?;
        Ok(buf)
    } else {
        fs::read(input).with_context(|| format!("reading payload file {input}"))
    }
}

/// Sequential `{counter}` value: one past the Markdown files already present.
fn next_counter(dir: &Path) -> u32 {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let existing = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("md"))
                .count();
            existing as u32 + 1
        }
        Err(_) => 1,
    }
}
