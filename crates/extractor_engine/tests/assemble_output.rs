use extractor_engine::{
    build_markdown_document, convert, derive_title, generic_turns, parse_document,
    profile_from_yaml, Block, DocumentMeta, Role, Turn,
};
use pretty_assertions::assert_eq;

fn meta() -> DocumentMeta {
    DocumentMeta {
        model: "ChatGPT".to_string(),
        title: "Sorting a Vec".to_string(),
        extracted: "2026-08-07 12:00:00".to_string(),
    }
}

#[test]
fn front_matter_carries_model_title_and_timestamp() {
    let turns = vec![Turn {
        role: Role::User,
        blocks: vec![Block::Paragraph("Sorting a Vec".into())],
    }];
    let doc = build_markdown_document(&turns, &meta());

    assert!(doc.starts_with("---\n"));
    assert!(doc.contains("title: Sorting a Vec"));
    assert!(doc.contains("model: ChatGPT"));
    assert!(doc.contains("extracted: 2026-08-07 12:00:00"));
    assert!(doc.contains("turns: 1"));
}

#[test]
fn sections_are_labeled_and_numbered_sequentially() {
    let turns = vec![
        Turn {
            role: Role::User,
            blocks: vec![Block::Paragraph("q".into())],
        },
        Turn {
            role: Role::Assistant,
            blocks: vec![Block::Paragraph("a".into())],
        },
        Turn {
            role: Role::User,
            blocks: vec![Block::Paragraph("follow-up".into())],
        },
    ];
    let doc = build_markdown_document(&turns, &meta());

    let user_pos = doc.find("## User (1)").expect("first user section");
    let ai_pos = doc.find("## AI (2)").expect("assistant section");
    let second_user = doc.find("## User (3)").expect("second user section");
    assert!(user_pos < ai_pos && ai_pos < second_user);
}

#[test]
fn assembly_is_byte_identical_on_repeat() {
    let turns = vec![Turn {
        role: Role::Assistant,
        blocks: vec![
            Block::Paragraph("text".into()),
            Block::Code {
                language: Some("rust".into()),
                body: "let x = 1;".into(),
            },
        ],
    }];
    let first = build_markdown_document(&turns, &meta());
    let second = build_markdown_document(&turns, &meta());
    assert_eq!(first, second);
}

#[test]
fn empty_turn_renders_header_only() {
    let turns = vec![Turn {
        role: Role::User,
        blocks: Vec::new(),
    }];
    let doc = build_markdown_document(&turns, &meta());
    assert!(doc.contains("## User (1)\n"));
}

#[test]
fn pipeline_convert_then_assemble_end_to_end() {
    let yaml = r#"
id: classchat
signatures:
  - selector: ".user-msg"
rules:
  - selector: ".user-msg"
    role: user
  - selector: ".ai-msg"
    role: assistant
"#;
    let profile = profile_from_yaml("classchat.yaml", yaml).unwrap();
    let doc = parse_document(
        r#"<div class="user-msg">What is 2 + 2?</div><div class="ai-msg"><p>It is <b>4</b>.</p></div>"#,
    );
    let conversion = convert(&doc, &profile).unwrap();
    let title = derive_title(&conversion.turns);
    assert_eq!(title, "What is 2 + 2?");

    let assembled = build_markdown_document(
        &conversion.turns,
        &DocumentMeta {
            model: profile.name.clone(),
            title,
            extracted: "2026-08-07 12:00:00".to_string(),
        },
    );
    assert!(assembled.contains("## User (1)\n\nWhat is 2 + 2?"));
    assert!(assembled.contains("## AI (2)\n\nIt is **4**."));
}

#[test]
fn generic_fallback_wraps_whole_payload_in_one_turn() {
    let turns = generic_turns("<h1>Notes</h1><p>body</p>");
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
    let markdown = turns[0].to_markdown();
    assert!(markdown.contains("Notes"));
    assert!(markdown.contains("body"));
}

#[test]
fn generic_fallback_on_empty_input_yields_no_turns() {
    assert!(generic_turns("").is_empty());
    assert!(generic_turns("   ").is_empty());
}
