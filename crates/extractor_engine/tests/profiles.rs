use extractor_engine::{load_profiles, profile_from_yaml, ProfileError, RuleRole};
use pretty_assertions::assert_eq;

const VALID_PROFILE: &str = r#"
id: chatgpt
name: ChatGPT
priority: 10
signatures:
  - selector: "[data-message-author-role]"
rules:
  - selector: "[data-message-author-role='user']"
    role: user
  - selector: "[data-message-author-role='assistant']"
    role: assistant
  - selector: "button"
    role: ignore
"#;

#[test]
fn valid_profile_parses_and_validates() {
    let profile = profile_from_yaml("chatgpt.yaml", VALID_PROFILE).unwrap();
    assert_eq!(profile.id, "chatgpt");
    assert_eq!(profile.name, "ChatGPT");
    assert_eq!(profile.priority, 10);
    assert_eq!(profile.signatures.len(), 1);
    assert_eq!(profile.rules.len(), 3);
    assert_eq!(profile.rules[2].role, RuleRole::Ignore);
}

#[test]
fn profile_name_defaults_to_id() {
    let yaml = r#"
id: claude
signatures:
  - selector: ".chat"
rules:
  - selector: ".msg"
    role: user
"#;
    let profile = profile_from_yaml("claude.yaml", yaml).unwrap();
    assert_eq!(profile.name, "claude");
    assert_eq!(profile.priority, 100);
}

#[test]
fn missing_id_is_reported_with_file_and_field() {
    let yaml = r#"
signatures:
  - selector: ".chat"
rules:
  - selector: ".msg"
    role: user
"#;
    let err = profile_from_yaml("broken.yaml", yaml).unwrap_err();
    match err {
        ProfileError::MissingField { ref file, field } => {
            assert_eq!(file, "broken.yaml");
            assert_eq!(field, "id");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_signatures_fail_validation() {
    let yaml = r#"
id: x
rules:
  - selector: ".msg"
    role: user
"#;
    let err = profile_from_yaml("x.yaml", yaml).unwrap_err();
    assert!(matches!(
        err,
        ProfileError::MissingField {
            field: "signatures",
            ..
        }
    ));
}

#[test]
fn bad_selector_names_the_offender() {
    let yaml = r#"
id: x
signatures:
  - selector: "???"
rules:
  - selector: ".msg"
    role: user
"#;
    let err = profile_from_yaml("x.yaml", yaml).unwrap_err();
    match err {
        ProfileError::InvalidSelector { ref selector, .. } => assert_eq!(selector, "???"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_role_is_rejected() {
    let yaml = r#"
id: x
signatures:
  - selector: ".chat"
rules:
  - selector: ".msg"
    role: speaker
"#;
    let err = profile_from_yaml("x.yaml", yaml).unwrap_err();
    assert!(matches!(err, ProfileError::UnknownRole { ref role, .. } if role == "speaker"));
}

#[test]
fn generic_turn_rule_requires_role_rule() {
    let yaml = r#"
id: x
signatures:
  - selector: ".chat"
rules:
  - selector: ".msg"
    role: turn
"#;
    let err = profile_from_yaml("x.yaml", yaml).unwrap_err();
    assert!(matches!(err, ProfileError::MissingRoleRule { .. }));
}

#[test]
fn load_is_partial_failure_tolerant() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("good.yaml"), VALID_PROFILE).unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "id: ''\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a profile").unwrap();

    let outcome = load_profiles(dir.path()).unwrap();
    assert_eq!(outcome.registry.len(), 1);
    assert!(outcome.registry.get("chatgpt").is_some());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].file(), "bad.yaml");
}

#[test]
fn registry_orders_by_priority_then_id() {
    let dir = tempfile::TempDir::new().unwrap();
    for (file, id, priority) in [
        ("a.yaml", "zeta", 10),
        ("b.yaml", "alpha", 50),
        ("c.yaml", "beta", 10),
    ] {
        let yaml = format!(
            "id: {id}\npriority: {priority}\nsignatures:\n  - selector: \".chat\"\nrules:\n  - selector: \".msg\"\n    role: user\n"
        );
        std::fs::write(dir.path().join(file), yaml).unwrap();
    }

    let outcome = load_profiles(dir.path()).unwrap();
    let ids: Vec<&str> = outcome.registry.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["beta", "zeta", "alpha"]);
}

#[test]
fn missing_profiles_directory_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("absent");
    assert!(load_profiles(&missing).is_err());
}
