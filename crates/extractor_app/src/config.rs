use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub output: OutputConfig,
    /// Format for the `{date}` filename placeholder. JS-style tokens
    /// (`yyyy`, `MM`, `dd`) are accepted alongside strftime.
    pub date_format: String,
    /// Format for the `{time}` filename placeholder.
    pub time_format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub enabled: bool,
    pub dir: String,
    pub filename: String,
    /// Prefix the output file with a UTF-8 BOM for legacy Windows editors.
    pub bom: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            date_format: "yyyyMMdd".to_string(),
            time_format: "yyyyMMdd_HHmmss".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "outputs/chat_logs".to_string(),
            filename: "chat_log_{time}_{model}.md".to_string(),
            bom: true,
        }
    }
}

impl AppConfig {
    pub fn date_format(&self) -> String {
        translate_time_tokens(&self.date_format)
    }

    pub fn time_format(&self) -> String {
        translate_time_tokens(&self.time_format)
    }
}

/// Load the configuration. An explicit path must exist; otherwise
/// `./config.yaml` is used when present, else built-in defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => parse_file(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                parse_file(default)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

fn parse_file(path: &Path) -> Result<AppConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing config file {path:?}"))
}

/// Translate JS-style date tokens to strftime ones; strftime input passes
/// through untouched.
pub fn translate_time_tokens(format: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];
    let mut out = format.to_string();
    for (js, strftime) in TOKENS {
        out = out.replace(js, strftime);
    }
    out
}
