/// Values substituted into the output filename template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts<'a> {
    pub model: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    pub title: &'a str,
    pub counter: u32,
}

/// Expand a filename template. Recognized placeholders: `{model}`, `{date}`,
/// `{time}`, `{counter}`, `{title}`. Unrecognized placeholders pass through
/// verbatim; filenames are advisory, so that is not an error. Substituted
/// values are sanitized for Windows-safe filenames.
pub fn templated_filename(template: &str, parts: &FilenameParts<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match substitute(name, parts) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    finalize_name(out)
}

fn substitute(name: &str, parts: &FilenameParts<'_>) -> Option<String> {
    match name {
        "model" => Some(sanitize_component(parts.model)),
        "date" => Some(sanitize_component(parts.date)),
        "time" => Some(sanitize_component(parts.time)),
        "counter" => Some(parts.counter.to_string()),
        "title" => Some(sanitize_component(parts.title)),
        _ => None,
    }
}

/// Windows-safe cleanup of one substituted value.
fn sanitize_component(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    clip_bytes(compacted, 80)
}

fn finalize_name(mut name: String) -> String {
    if name.trim().is_empty() {
        name = "chat_log.md".to_string();
    }
    let stem = name.split('.').next().unwrap_or("");
    if is_reserved_windows_name(stem) {
        name.insert(stem.len(), '_');
    }
    name
}

fn clip_bytes(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut end = max;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '`')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::{templated_filename, FilenameParts};

    fn parts() -> FilenameParts<'static> {
        FilenameParts {
            model: "chatgpt",
            date: "20260807",
            time: "120000",
            title: "My: Title?/Bad",
            counter: 3,
        }
    }

    #[test]
    fn recognized_placeholders_are_substituted() {
        let name = templated_filename("chat_{date}_{time}_{model}_{counter}.md", &parts());
        assert_eq!(name, "chat_20260807_120000_chatgpt_3.md");
    }

    #[test]
    fn title_is_sanitized() {
        let name = templated_filename("{title}.md", &parts());
        assert_eq!(name, "My_ Title_Bad.md");
    }

    #[test]
    fn unrecognized_placeholders_pass_through() {
        let name = templated_filename("{model}_{session}.md", &parts());
        assert_eq!(name, "chatgpt_{session}.md");
    }

    #[test]
    fn unterminated_placeholder_is_kept_verbatim() {
        let name = templated_filename("log_{model", &parts());
        assert_eq!(name, "log_{model");
    }

    #[test]
    fn reserved_windows_stem_is_patched() {
        let name = templated_filename("CON.md", &parts());
        assert_eq!(name, "CON_.md");
    }

    #[test]
    fn empty_expansion_falls_back() {
        let empty = FilenameParts {
            title: "",
            ..parts()
        };
        assert_eq!(templated_filename("{title}", &empty), "chat_log.md");
    }
}
