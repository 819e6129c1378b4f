use crate::types::{Block, Role, Turn};

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// Generic whole-document converter used when no model profile matched, or
/// when a matched profile yielded no turns.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

/// Best-effort fallback: the entire payload becomes a single user turn of
/// pre-rendered Markdown. Never fails; empty input yields no turns.
pub fn generic_turns(html: &str) -> Vec<Turn> {
    let markdown = Html2MdConverter.to_markdown(html);
    let markdown = markdown.trim();
    if markdown.is_empty() {
        return Vec::new();
    }
    vec![Turn {
        role: Role::User,
        blocks: vec![Block::Raw(markdown.to_string())],
    }]
}
