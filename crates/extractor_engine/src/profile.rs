use std::fs;
use std::path::{Path, PathBuf};

use extractor_logging::extractor_debug;
use scraper::Selector;
use serde::Deserialize;

use crate::types::Role;

const DEFAULT_PRIORITY: u32 = 100;

/// Declarative description of how to detect and extract one AI model's chat
/// markup. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    pub id: String,
    pub name: String,
    /// Detection order: lower wins; ties break on id. Overlapping profiles
    /// are resolved by this explicit ordering, never by file enumeration
    /// order.
    pub priority: u32,
    pub signatures: Vec<Signature>,
    pub rules: Vec<ExtractionRule>,
    pub role_rule: Option<RoleRule>,
}

/// A detection predicate. The profile matches only if every signature holds.
#[derive(Debug, Clone)]
pub struct Signature {
    pub selector: Selector,
    pub raw_selector: String,
    /// Required attribute on the matched element.
    pub attr: Option<AttrExpectation>,
    /// Required substring of the matched element's text.
    pub text: Option<String>,
}

/// An attribute the matched element must carry; `value` of `None` means any
/// value satisfies it.
#[derive(Debug, Clone)]
pub struct AttrExpectation {
    pub name: String,
    pub value: Option<String>,
}

/// Maps a selector to its semantic role during extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub selector: Selector,
    pub raw_selector: String,
    pub role: RuleRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRole {
    /// Container holding one user turn.
    User,
    /// Container holding one assistant turn.
    Assistant,
    /// Container holding one system turn.
    System,
    /// Generic turn container; the profile's `role_rule` decides the role.
    Turn,
    /// Element rendered as a fenced code block.
    Code,
    /// Element skipped entirely, descendants included.
    Ignore,
}

impl RuleRole {
    pub fn is_turn_container(self) -> bool {
        matches!(
            self,
            RuleRole::User | RuleRole::Assistant | RuleRole::System | RuleRole::Turn
        )
    }

    /// The fixed role of a non-generic turn container rule.
    pub fn fixed_role(self) -> Option<Role> {
        match self {
            RuleRole::User => Some(Role::User),
            RuleRole::Assistant => Some(Role::Assistant),
            RuleRole::System => Some(Role::System),
            _ => None,
        }
    }
}

/// How a generic `turn` container gets its role.
#[derive(Debug, Clone)]
pub enum RoleRule {
    /// The container's `class` attribute contains one of the substrings.
    ClassContains { user: String, assistant: String },
    /// Containers alternate roles by position, starting with `first`.
    Parity { first: Role },
    /// Containers holding a descendant matching `selector` get `role`,
    /// everything else gets `otherwise`.
    Marker {
        selector: Selector,
        raw_selector: String,
        role: Role,
        otherwise: Role,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile {file}: not valid YAML: {source}")]
    Parse {
        file: String,
        source: serde_yaml::Error,
    },
    #[error("profile {file}: missing or empty field `{field}`")]
    MissingField { file: String, field: &'static str },
    #[error("profile {file}: invalid selector `{selector}` in `{field}`")]
    InvalidSelector {
        file: String,
        field: &'static str,
        selector: String,
    },
    #[error("profile {file}: unknown rule role `{role}`")]
    UnknownRole { file: String, role: String },
    #[error("profile {file}: has no turn container rule")]
    NoTurnRule { file: String },
    #[error("profile {file}: a `turn` rule requires `role_rule`")]
    MissingRoleRule { file: String },
    #[error("profile {file}: unreadable: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
}

impl ProfileError {
    /// Name of the offending profile file.
    pub fn file(&self) -> &str {
        match self {
            ProfileError::Parse { file, .. }
            | ProfileError::MissingField { file, .. }
            | ProfileError::InvalidSelector { file, .. }
            | ProfileError::UnknownRole { file, .. }
            | ProfileError::NoTurnRule { file }
            | ProfileError::MissingRoleRule { file }
            | ProfileError::Io { file, .. } => file,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileDirError {
    #[error("profiles directory {dir:?} cannot be read: {source}")]
    Unreadable {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// All profiles that loaded, in detection order, plus per-file failures for
/// the ones that did not. A failed profile never aborts the load.
#[derive(Debug)]
pub struct ProfileLoadOutcome {
    pub registry: ProfileRegistry,
    pub failures: Vec<ProfileError>,
}

/// Owns the loaded profiles for the process lifetime, ordered by
/// `(priority, id)`.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<ModelProfile>,
}

impl ProfileRegistry {
    pub fn from_profiles(mut profiles: Vec<ModelProfile>) -> Self {
        profiles.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { profiles }
    }

    /// Profiles in detection priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, ModelProfile> {
        self.profiles.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Load every `*.yaml`/`*.yml` profile under `dir`. Files that fail to parse
/// or validate are reported in the outcome and skipped.
pub fn load_profiles(dir: &Path) -> Result<ProfileLoadOutcome, ProfileDirError> {
    let entries = fs::read_dir(dir).map_err(|source| ProfileDirError::Unreadable {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    let mut profiles = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let yaml = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => {
                failures.push(ProfileError::Io { file, source });
                continue;
            }
        };
        match profile_from_yaml(&file, &yaml) {
            Ok(profile) => {
                extractor_debug!("loaded profile `{}` from {}", profile.id, file);
                profiles.push(profile);
            }
            Err(err) => {
                extractor_debug!("skipping profile: {err}");
                failures.push(err);
            }
        }
    }

    Ok(ProfileLoadOutcome {
        registry: ProfileRegistry::from_profiles(profiles),
        failures,
    })
}

/// Parse and validate a single profile document.
pub fn profile_from_yaml(file: &str, yaml: &str) -> Result<ModelProfile, ProfileError> {
    let record: ProfileRecord =
        serde_yaml::from_str(yaml).map_err(|source| ProfileError::Parse {
            file: file.to_string(),
            source,
        })?;
    record.validate(file)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    signatures: Vec<SignatureRecord>,
    #[serde(default)]
    rules: Vec<RuleRecord>,
    #[serde(default)]
    role_rule: Option<RoleRuleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignatureRecord {
    selector: String,
    #[serde(default)]
    attr: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleRecord {
    selector: String,
    role: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
enum RoleRuleRecord {
    ClassContains { user: String, assistant: String },
    Parity { first: Role },
    Marker {
        selector: String,
        role: Role,
        otherwise: Role,
    },
}

impl ProfileRecord {
    fn validate(self, file: &str) -> Result<ModelProfile, ProfileError> {
        if self.id.trim().is_empty() {
            return Err(ProfileError::MissingField {
                file: file.to_string(),
                field: "id",
            });
        }
        if self.signatures.is_empty() {
            return Err(ProfileError::MissingField {
                file: file.to_string(),
                field: "signatures",
            });
        }
        if self.rules.is_empty() {
            return Err(ProfileError::MissingField {
                file: file.to_string(),
                field: "rules",
            });
        }

        let mut signatures = Vec::with_capacity(self.signatures.len());
        for record in self.signatures {
            let selector = compile_selector(file, "signatures", &record.selector)?;
            let attr = record.attr.map(|name| AttrExpectation {
                name,
                value: record.value,
            });
            signatures.push(Signature {
                selector,
                raw_selector: record.selector,
                attr,
                text: record.text,
            });
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for record in self.rules {
            let role = parse_rule_role(file, &record.role)?;
            let selector = compile_selector(file, "rules", &record.selector)?;
            rules.push(ExtractionRule {
                selector,
                raw_selector: record.selector,
                role,
            });
        }
        if !rules.iter().any(|r| r.role.is_turn_container()) {
            return Err(ProfileError::NoTurnRule {
                file: file.to_string(),
            });
        }

        let role_rule = match self.role_rule {
            Some(RoleRuleRecord::ClassContains { user, assistant }) => {
                Some(RoleRule::ClassContains { user, assistant })
            }
            Some(RoleRuleRecord::Parity { first }) => Some(RoleRule::Parity { first }),
            Some(RoleRuleRecord::Marker {
                selector,
                role,
                otherwise,
            }) => Some(RoleRule::Marker {
                selector: compile_selector(file, "role_rule", &selector)?,
                raw_selector: selector,
                role,
                otherwise,
            }),
            None => None,
        };
        if rules.iter().any(|r| r.role == RuleRole::Turn) && role_rule.is_none() {
            return Err(ProfileError::MissingRoleRule {
                file: file.to_string(),
            });
        }

        let name = if self.name.trim().is_empty() {
            self.id.clone()
        } else {
            self.name
        };
        Ok(ModelProfile {
            id: self.id,
            name,
            priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            signatures,
            rules,
            role_rule,
        })
    }
}

fn compile_selector(
    file: &str,
    field: &'static str,
    selector: &str,
) -> Result<Selector, ProfileError> {
    Selector::parse(selector).map_err(|_| ProfileError::InvalidSelector {
        file: file.to_string(),
        field,
        selector: selector.to_string(),
    })
}

fn parse_rule_role(file: &str, role: &str) -> Result<RuleRole, ProfileError> {
    match role {
        "user" => Ok(RuleRole::User),
        "assistant" => Ok(RuleRole::Assistant),
        "system" => Ok(RuleRole::System),
        "turn" => Ok(RuleRole::Turn),
        "code" => Ok(RuleRole::Code),
        "ignore" => Ok(RuleRole::Ignore),
        other => Err(ProfileError::UnknownRole {
            file: file.to_string(),
            role: other.to_string(),
        }),
    }
}
