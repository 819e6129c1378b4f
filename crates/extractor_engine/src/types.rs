use std::fmt;

use serde::Deserialize;

/// Speaker attribution for one conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Label used for section headers in the assembled document.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
            Role::System => "System",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One extracted conversational turn: a role plus its content blocks in
/// source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub blocks: Vec<Block>,
}

impl Turn {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            blocks: Vec::new(),
        }
    }

    /// Concatenated rendering of all blocks, blank-line separated.
    pub fn to_markdown(&self) -> String {
        let parts: Vec<String> = self.blocks.iter().map(Block::to_markdown).collect();
        parts.join("\n\n")
    }
}

/// A block-level unit of converted content. Inline formatting (emphasis,
/// links, inline code) is already rendered into the contained text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    Heading { level: u8, text: String },
    Code { language: Option<String>, body: String },
    List(ListBlock),
    Table(TableBlock),
    Quote(String),
    Rule,
    /// Pre-rendered Markdown, emitted by the generic fallback converter.
    Raw(String),
}

impl Block {
    pub fn to_markdown(&self) -> String {
        match self {
            Block::Paragraph(text) => text.clone(),
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6) as usize;
                format!("{} {}", "#".repeat(level), text)
            }
            Block::Code { language, body } => {
                let lang = language.as_deref().unwrap_or("");
                format!("```{lang}\n{body}\n```")
            }
            Block::List(list) => list.to_markdown(),
            Block::Table(table) => table.to_markdown(),
            Block::Quote(text) => text
                .lines()
                .map(|line| format!("> {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Rule => "---".to_string(),
            Block::Raw(markdown) => markdown.clone(),
        }
    }
}

/// An ordered or unordered list; nested lists hang off their parent item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBlock {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub text: String,
    pub nested: Vec<ListBlock>,
}

impl ListBlock {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, 0);
        out.trim_end().to_string()
    }

    fn render(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for (idx, item) in self.items.iter().enumerate() {
            let marker = if self.ordered {
                format!("{}.", idx + 1)
            } else {
                "-".to_string()
            };
            out.push_str(&indent);
            out.push_str(&marker);
            out.push(' ');
            out.push_str(&item.text);
            out.push('\n');
            for nested in &item.nested {
                nested.render(out, depth + 1);
            }
        }
    }
}

/// A table rendered as a Markdown pipe table. `synthesized_header` marks a
/// source table that had no header row and got an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub synthesized_header: bool,
}

impl TableBlock {
    pub fn to_markdown(&self) -> String {
        let columns = self.header.len().max(1);
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(render_row(&self.header, columns));
        lines.push(format!("| {} |", vec!["---"; columns].join(" | ")));
        for row in &self.rows {
            lines.push(render_row(row, columns));
        }
        lines.join("\n")
    }
}

fn render_row(cells: &[String], columns: usize) -> String {
    let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
    padded.resize(columns, "");
    format!("| {} |", padded.join(" | "))
}

/// Non-fatal conditions raised during conversion. Conversion always proceeds
/// best-effort; warnings are surfaced to the caller alongside the turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionWarning {
    /// A source table without a header row was rendered with an empty one.
    TableMissingHeader { turn_index: usize, columns: usize },
    /// A turn container's role could not be resolved; the container was
    /// skipped rather than mislabeled.
    UnresolvedRole { container_index: usize },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::TableMissingHeader {
                turn_index,
                columns,
            } => write!(
                f,
                "turn {turn_index}: table with {columns} column(s) has no header row; rendered an empty one"
            ),
            ConversionWarning::UnresolvedRole { container_index } => write!(
                f,
                "container {container_index}: no role rule matched; container skipped"
            ),
        }
    }
}

/// Result of converting one parsed document with one profile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conversion {
    pub turns: Vec<Turn>,
    pub warnings: Vec<ConversionWarning>,
}
