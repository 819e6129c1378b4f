//! Extractor engine: clipboard HTML in, Markdown document out.
mod assemble;
mod convert;
mod detect;
mod fallback;
mod filename;
mod payload;
mod persist;
mod profile;
mod types;

pub use assemble::{build_markdown_document, derive_title, DocumentMeta};
pub use convert::{convert, ConvertError};
pub use detect::{detect, Detection};
pub use fallback::{generic_turns, Converter, Html2MdConverter};
pub use filename::{templated_filename, FilenameParts};
pub use payload::{
    decode_payload, fragment_body, parse_document, repair_mojibake, ClipboardPayload, PayloadError,
};
pub use scraper::Html;
pub use persist::{ensure_output_dir, MarkdownWriter, PersistError};
pub use profile::{
    load_profiles, profile_from_yaml, AttrExpectation, ExtractionRule, ModelProfile, ProfileDirError,
    ProfileError, ProfileLoadOutcome, ProfileRegistry, RoleRule, RuleRole, Signature,
};
pub use types::{
    Block, Conversion, ConversionWarning, ListBlock, ListItem, Role, TableBlock, Turn,
};
