use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::profile::{ModelProfile, RoleRule, RuleRole};
use crate::types::{
    Block, Conversion, ConversionWarning, ListBlock, ListItem, Role, TableBlock, Turn,
};

/// Tags dropped wholesale, descendants included, regardless of profile.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "path", "button", "mat-icon", "nav", "aside", "iframe",
    "template",
];

/// Tags that open a paragraph boundary but carry no markup of their own.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "figure",
    "figcaption",
    "address",
    "response-element",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The profile's turn-container selectors matched nothing. Recoverable:
    /// the caller may fall back to the generic converter or ask the user to
    /// re-copy the page region.
    #[error("no turn containers matched the detected profile")]
    NoTurnsFound,
}

/// Convert a parsed document into turns using the matched profile.
///
/// Containers are enumerated in document order; nested matches collapse into
/// their outermost container. Conversion is best-effort: unexpected markup
/// degrades to plain text and malformed structures surface as warnings,
/// never as failures.
pub fn convert(document: &Html, profile: &ModelProfile) -> Result<Conversion, ConvertError> {
    let mut container_roles: HashMap<NodeId, RuleRole> = HashMap::new();
    let mut code_nodes: HashSet<NodeId> = HashSet::new();
    let mut ignored: HashSet<NodeId> = HashSet::new();
    for rule in &profile.rules {
        match rule.role {
            RuleRole::Code => {
                for element in document.select(&rule.selector) {
                    code_nodes.insert(element.id());
                }
            }
            RuleRole::Ignore => {
                for element in document.select(&rule.selector) {
                    ignored.insert(element.id());
                }
            }
            role => {
                for element in document.select(&rule.selector) {
                    // First rule in profile order wins for shared nodes.
                    container_roles.entry(element.id()).or_insert(role);
                }
            }
        }
    }

    let mut containers = Vec::new();
    collect_containers(
        *document.root_element(),
        &container_roles,
        &ignored,
        &mut containers,
    );
    if containers.is_empty() {
        return Err(ConvertError::NoTurnsFound);
    }

    let mut conversion = Conversion::default();
    for (index, (element, rule_role)) in containers.iter().enumerate() {
        let Some(role) = resolve_role(*element, *rule_role, index, profile) else {
            conversion.warnings.push(ConversionWarning::UnresolvedRole {
                container_index: index,
            });
            continue;
        };
        let mut walker = TurnWalker::new(&code_nodes, &ignored, conversion.turns.len());
        for child in element.children() {
            walker.visit_node(child);
        }
        walker.flush();
        conversion.warnings.append(&mut walker.warnings);
        conversion.turns.push(Turn {
            role,
            blocks: walker.blocks,
        });
    }
    Ok(conversion)
}

/// Document-order scan that stops at the outermost matched container, so a
/// container nested inside another match is never extracted twice.
fn collect_containers<'a>(
    node: NodeRef<'a, Node>,
    roles: &HashMap<NodeId, RuleRole>,
    ignored: &HashSet<NodeId>,
    out: &mut Vec<(ElementRef<'a>, RuleRole)>,
) {
    if ignored.contains(&node.id()) {
        return;
    }
    if let Some(element) = ElementRef::wrap(node) {
        if let Some(role) = roles.get(&node.id()) {
            out.push((element, *role));
            return;
        }
    }
    for child in node.children() {
        collect_containers(child, roles, ignored, out);
    }
}

fn resolve_role(
    element: ElementRef,
    rule_role: RuleRole,
    index: usize,
    profile: &ModelProfile,
) -> Option<Role> {
    if let Some(role) = rule_role.fixed_role() {
        return Some(role);
    }
    match profile.role_rule.as_ref()? {
        RoleRule::ClassContains { user, assistant } => {
            let class = element.value().attr("class").unwrap_or("");
            if class.contains(user.as_str()) {
                Some(Role::User)
            } else if class.contains(assistant.as_str()) {
                Some(Role::Assistant)
            } else {
                None
            }
        }
        RoleRule::Parity { first } => {
            if index % 2 == 0 {
                Some(*first)
            } else {
                Some(alternate(*first))
            }
        }
        RoleRule::Marker {
            selector,
            role,
            otherwise,
            ..
        } => {
            if element.select(selector).next().is_some() {
                Some(*role)
            } else {
                Some(*otherwise)
            }
        }
    }
}

fn alternate(role: Role) -> Role {
    match role {
        Role::User => Role::Assistant,
        _ => Role::User,
    }
}

/// Accumulates inline text with browser-like whitespace collapsing: runs of
/// whitespace become a single space, tracked via the last emitted character.
#[derive(Debug, Default)]
struct InlineBuffer {
    buf: String,
    last_char: Option<char>,
}

impl InlineBuffer {
    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if self.last_char == Some(' ') || self.last_char == Some('\n') {
                    continue;
                }
                self.push(' ');
            } else {
                self.push(ch);
            }
        }
    }

    /// Append already-rendered Markdown verbatim.
    fn append_raw(&mut self, text: &str) {
        for ch in text.chars() {
            self.push(ch);
        }
    }

    fn break_line(&mut self) {
        if !self.buf.is_empty() && self.last_char != Some('\n') {
            self.push('\n');
        }
    }

    fn push(&mut self, ch: char) {
        self.buf.push(ch);
        self.last_char = Some(ch);
    }

    fn take(&mut self) -> String {
        self.last_char = None;
        std::mem::take(&mut self.buf)
    }
}

struct TurnWalker<'a> {
    code_nodes: &'a HashSet<NodeId>,
    ignored: &'a HashSet<NodeId>,
    turn_index: usize,
    blocks: Vec<Block>,
    inline: InlineBuffer,
    warnings: Vec<ConversionWarning>,
}

impl<'a> TurnWalker<'a> {
    fn new(code_nodes: &'a HashSet<NodeId>, ignored: &'a HashSet<NodeId>, turn_index: usize) -> Self {
        Self {
            code_nodes,
            ignored,
            turn_index,
            blocks: Vec::new(),
            inline: InlineBuffer::default(),
            warnings: Vec::new(),
        }
    }

    fn visit_node(&mut self, node: NodeRef<Node>) {
        match node.value() {
            Node::Text(text) => self.inline.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element);
                }
            }
            _ => {}
        }
    }

    fn visit_element(&mut self, element: ElementRef) {
        if self.ignored.contains(&element.id()) {
            return;
        }
        let tag = element.value().name().to_ascii_lowercase();
        if NOISE_TAGS.contains(&tag.as_str()) {
            return;
        }
        if self.code_nodes.contains(&element.id()) {
            self.code_block(element);
            return;
        }
        if element.value().attr("role") == Some("heading") {
            // ARIA headings (div[role=heading]) map like h1-h6.
            let level = element
                .value()
                .attr("aria-level")
                .and_then(|v| v.parse::<u8>().ok())
                .unwrap_or(3);
            self.heading(level, element);
            return;
        }

        match tag.as_str() {
            "pre" => self.code_block(element),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag.as_bytes()[1] - b'0';
                self.heading(level, element);
            }
            "ul" | "ol" => {
                self.flush();
                let list = self.parse_list(element, tag == "ol");
                if !list.items.is_empty() {
                    self.blocks.push(Block::List(list));
                }
            }
            "table" => {
                self.flush();
                let table = self.parse_table(element);
                if table.synthesized_header {
                    self.warnings.push(ConversionWarning::TableMissingHeader {
                        turn_index: self.turn_index,
                        columns: table.header.len(),
                    });
                }
                self.blocks.push(Block::Table(table));
            }
            "blockquote" => {
                self.flush();
                let inner = self.render_subtree(element);
                let text = inner
                    .iter()
                    .map(Block::to_markdown)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                if !text.is_empty() {
                    self.blocks.push(Block::Quote(text));
                }
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "br" => self.inline.break_line(),
            "b" | "strong" | "i" | "em" | "code" | "a" => {
                inline_element(self.ignored, element, &mut self.inline);
            }
            _ if BLOCK_TAGS.contains(&tag.as_str()) => {
                self.flush();
                self.visit_children(element);
                self.flush();
            }
            // Unknown markup contributes its text content only; the explicit
            // default keeps conversion best-effort instead of failing.
            _ => self.visit_children(element),
        }
    }

    fn visit_children(&mut self, element: ElementRef) {
        for child in element.children() {
            self.visit_node(child);
        }
    }

    /// Close the current paragraph, if any.
    fn flush(&mut self) {
        let text = self.inline.take();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.blocks.push(Block::Paragraph(trimmed.to_string()));
        }
    }

    fn heading(&mut self, level: u8, element: ElementRef) {
        self.flush();
        let text = inline_text(self.ignored, element);
        if !text.is_empty() {
            self.blocks.push(Block::Heading {
                level: level.clamp(1, 6),
                text,
            });
        }
    }

    fn code_block(&mut self, element: ElementRef) {
        self.flush();
        let code_child = element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name().eq_ignore_ascii_case("code"));
        let source = code_child.unwrap_or(element);
        let body: String = source.text().collect();
        let body = body
            .trim_matches(|c| c == '\n' || c == '\r')
            .trim_end()
            .to_string();
        self.blocks.push(Block::Code {
            language: code_language(element, code_child),
            body,
        });
    }

    fn parse_list(&self, element: ElementRef, ordered: bool) -> ListBlock {
        let mut items = Vec::new();
        for child in element.children() {
            let Some(li) = ElementRef::wrap(child) else {
                continue;
            };
            if !li.value().name().eq_ignore_ascii_case("li") {
                continue;
            }
            let mut buf = InlineBuffer::default();
            let mut nested = Vec::new();
            for li_child in li.children() {
                if let Some(el) = ElementRef::wrap(li_child) {
                    let name = el.value().name().to_ascii_lowercase();
                    if name == "ul" || name == "ol" {
                        let sub = self.parse_list(el, name == "ol");
                        if !sub.items.is_empty() {
                            nested.push(sub);
                        }
                        continue;
                    }
                }
                inline_node(self.ignored, li_child, &mut buf);
            }
            items.push(ListItem {
                text: buf.take().trim().to_string(),
                nested,
            });
        }
        ListBlock { ordered, items }
    }

    fn parse_table(&self, element: ElementRef) -> TableBlock {
        let rows: Vec<(ElementRef, bool)> = element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name().eq_ignore_ascii_case("tr"))
            .map(|tr| {
                let in_thead = tr
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|a| a.value().name().eq_ignore_ascii_case("thead"));
                (tr, in_thead)
            })
            .collect();

        let head_row = rows.iter().find(|(_, in_thead)| *in_thead).map(|(tr, _)| *tr);
        let (header, body_rows, synthesized) = if let Some(head) = head_row {
            let body: Vec<ElementRef> = rows
                .iter()
                .filter(|(_, in_thead)| !in_thead)
                .map(|(tr, _)| *tr)
                .collect();
            (self.table_cells(head), body, false)
        } else if let Some((first, _)) = rows.first().filter(|(tr, _)| is_all_th(*tr)) {
            let body: Vec<ElementRef> = rows.iter().skip(1).map(|(tr, _)| *tr).collect();
            (self.table_cells(*first), body, false)
        } else {
            // No header row anywhere: synthesize an empty one.
            let columns = rows
                .first()
                .map(|(tr, _)| self.table_cells(*tr).len())
                .unwrap_or(0);
            let body: Vec<ElementRef> = rows.iter().map(|(tr, _)| *tr).collect();
            (vec![String::new(); columns], body, true)
        };

        TableBlock {
            header,
            rows: body_rows.iter().map(|tr| self.table_cells(*tr)).collect(),
            synthesized_header: synthesized,
        }
    }

    fn table_cells(&self, tr: ElementRef) -> Vec<String> {
        tr.children()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                let name = el.value().name();
                name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
            })
            .map(|cell| inline_text(self.ignored, cell).replace('|', "\\|"))
            .collect()
    }

    /// Render a subtree into its own block list without disturbing the
    /// current paragraph state.
    fn render_subtree(&mut self, element: ElementRef) -> Vec<Block> {
        let saved_blocks = std::mem::take(&mut self.blocks);
        let saved_inline = std::mem::take(&mut self.inline);
        self.visit_children(element);
        self.flush();
        self.inline = saved_inline;
        std::mem::replace(&mut self.blocks, saved_blocks)
    }
}

fn is_all_th(tr: ElementRef) -> bool {
    let mut any = false;
    for cell in tr.children().filter_map(ElementRef::wrap).filter(|el| {
        let name = el.value().name();
        name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
    }) {
        if !cell.value().name().eq_ignore_ascii_case("th") {
            return false;
        }
        any = true;
    }
    any
}

fn code_language(element: ElementRef, code_child: Option<ElementRef>) -> Option<String> {
    for el in [Some(element), code_child].into_iter().flatten() {
        for class in el.value().classes() {
            if let Some(lang) = class.strip_prefix("language-") {
                if !lang.is_empty() {
                    return Some(lang.to_string());
                }
            }
        }
    }
    None
}

/// Inline rendering used for headings, emphasis spans, links, list items and
/// table cells.
fn inline_text(ignored: &HashSet<NodeId>, element: ElementRef) -> String {
    let mut buf = InlineBuffer::default();
    inline_children(ignored, element, &mut buf);
    buf.take().trim().to_string()
}

fn inline_children(ignored: &HashSet<NodeId>, element: ElementRef, buf: &mut InlineBuffer) {
    for child in element.children() {
        inline_node(ignored, child, buf);
    }
}

fn inline_node(ignored: &HashSet<NodeId>, node: NodeRef<Node>, buf: &mut InlineBuffer) {
    match node.value() {
        Node::Text(text) => buf.append_text(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                inline_element(ignored, element, buf);
            }
        }
        _ => {}
    }
}

fn inline_element(ignored: &HashSet<NodeId>, element: ElementRef, buf: &mut InlineBuffer) {
    if ignored.contains(&element.id()) {
        return;
    }
    let tag = element.value().name().to_ascii_lowercase();
    if NOISE_TAGS.contains(&tag.as_str()) {
        return;
    }
    match tag.as_str() {
        "b" | "strong" => {
            let inner = inline_text(ignored, element);
            if !inner.is_empty() {
                buf.append_raw(&format!("**{inner}**"));
            }
        }
        "i" | "em" => {
            let inner = inline_text(ignored, element);
            if !inner.is_empty() {
                buf.append_raw(&format!("*{inner}*"));
            }
        }
        "code" => {
            let inner = inline_text(ignored, element);
            if !inner.is_empty() {
                buf.append_raw(&format!("`{inner}`"));
            }
        }
        "a" => {
            let inner = inline_text(ignored, element);
            // Link targets pass through verbatim; no URL validation.
            match element.value().attr("href").map(str::trim) {
                Some(href) if !href.is_empty() && !inner.is_empty() => {
                    buf.append_raw(&format!("[{inner}]({href})"));
                }
                _ => buf.append_raw(&inner),
            }
        }
        "br" => buf.append_text(" "),
        _ => inline_children(ignored, element, buf),
    }
}
