use crate::types::{Block, Role, Turn};

const UNTITLED: &str = "Untitled Chat";
const TITLE_MAX_CHARS: usize = 40;

/// Metadata carried into the document front-matter. The extraction timestamp
/// is preformatted by the caller, so assembly stays pure and repeated calls
/// are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub model: String,
    pub title: String,
    pub extracted: String,
}

/// Assemble the final Markdown document: YAML front-matter followed by one
/// section per turn, numbered sequentially and headed by the speaker label.
pub fn build_markdown_document(turns: &[Turn], meta: &DocumentMeta) -> String {
    let mut doc = format!(
        "---\ntitle: {title}\nmodel: {model}\nextracted: {extracted}\nturns: {count}\n---\n",
        title = meta.title,
        model = meta.model,
        extracted = meta.extracted,
        count = turns.len(),
    );

    for (index, turn) in turns.iter().enumerate() {
        let body = turn.to_markdown();
        doc.push('\n');
        doc.push_str(&format!("## {} ({})\n", turn.role.label(), index + 1));
        if !body.is_empty() {
            doc.push('\n');
            doc.push_str(&body);
            doc.push('\n');
        }
    }
    doc
}

/// Derive a document title from the first line of the first user paragraph,
/// clipped to a displayable length.
pub fn derive_title(turns: &[Turn]) -> String {
    for turn in turns {
        if turn.role != Role::User {
            continue;
        }
        for block in &turn.blocks {
            let text = match block {
                Block::Paragraph(text) | Block::Raw(text) => text,
                Block::Heading { text, .. } => text,
                _ => continue,
            };
            let first_line = text.lines().next().unwrap_or("").trim();
            if !first_line.is_empty() {
                return clip_chars(first_line, TITLE_MAX_CHARS);
            }
        }
    }
    UNTITLED.to_string()
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
