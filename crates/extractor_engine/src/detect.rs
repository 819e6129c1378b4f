use extractor_logging::extractor_debug;
use scraper::Html;

use crate::profile::{ModelProfile, ProfileRegistry, Signature};

/// Outcome of model detection. `Unknown` is a normal result the caller must
/// handle (generic fallback or user-facing extraction failure), not an error.
#[derive(Debug, Clone, Copy)]
pub enum Detection<'a> {
    Model(&'a ModelProfile),
    Unknown,
}

impl<'a> Detection<'a> {
    pub fn profile(self) -> Option<&'a ModelProfile> {
        match self {
            Detection::Model(profile) => Some(profile),
            Detection::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Detection::Unknown)
    }
}

/// Walk the registry in priority order and return the first profile whose
/// signatures ALL hold in the document. At most one profile is ever returned;
/// overlapping profiles are decided by the registry's explicit ordering.
pub fn detect<'a>(document: &Html, registry: &'a ProfileRegistry) -> Detection<'a> {
    for profile in registry.iter() {
        if profile
            .signatures
            .iter()
            .all(|sig| signature_holds(document, sig))
        {
            extractor_debug!("detected model profile `{}`", profile.id);
            return Detection::Model(profile);
        }
    }
    Detection::Unknown
}

/// A signature holds if some node matches its selector and, when required,
/// carries the expected attribute and text substring.
fn signature_holds(document: &Html, signature: &Signature) -> bool {
    for element in document.select(&signature.selector) {
        if let Some(expected) = &signature.attr {
            match element.value().attr(&expected.name) {
                Some(actual) => {
                    if let Some(value) = &expected.value {
                        if actual != value {
                            continue;
                        }
                    }
                }
                None => continue,
            }
        }
        if let Some(needle) = &signature.text {
            let text: String = element.text().collect();
            if !text.contains(needle.as_str()) {
                continue;
            }
        }
        return true;
    }
    false
}
