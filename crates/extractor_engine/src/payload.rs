use chardetng::EncodingDetector;
use encoding_rs::{Encoding, WINDOWS_1252};
use scraper::Html;

const FRAGMENT_START: &str = "<!--StartFragment-->";
const FRAGMENT_END: &str = "<!--EndFragment-->";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("clipboard payload is empty")]
    Empty,
    #[error("failed to decode payload with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode raw clipboard bytes into UTF-8 using: BOM -> chardetng fallback,
/// then repair text that went through a wrong single-byte decode upstream.
pub fn decode_payload(bytes: &[u8]) -> Result<ClipboardPayload, PayloadError> {
    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }

    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    let mut payload = decode_with(bytes, enc)?;
    payload.html = repair_mojibake(payload.html);
    Ok(payload)
}

/// Build the in-memory DOM for one extraction run. The tree is read-only
/// after construction.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Windows CF_HTML payloads wrap the copied region in fragment markers; the
/// surrounding document is browser chrome. Returns the fragment when the
/// markers are present, otherwise the whole payload.
pub fn fragment_body(raw: &str) -> &str {
    if let Some(start) = raw.find(FRAGMENT_START) {
        let after = &raw[start + FRAGMENT_START.len()..];
        if let Some(end) = after.rfind(FRAGMENT_END) {
            return &after[..end];
        }
    }
    raw
}

/// Repair strings whose UTF-8 bytes were mis-decoded as Latin-1 or CP1252
/// somewhere upstream (the classic "ã ®" for CJK text). Text that already
/// carries high codepoints is assumed correct and returned untouched.
pub fn repair_mojibake(text: String) -> String {
    if text.chars().any(|c| c as u32 > 0x1000) {
        return text;
    }

    if let Some(repaired) = reencode_latin1(&text).or_else(|| reencode_cp1252(&text)) {
        // Only accept the round-trip if it surfaces CJK characters.
        if repaired.chars().any(|c| c as u32 >= 0x3000) {
            return repaired;
        }
    }
    text
}

fn reencode_latin1(text: &str) -> Option<String> {
    let bytes: Option<Vec<u8>> = text
        .chars()
        .map(|c| {
            let cp = c as u32;
            if cp <= 0xFF {
                Some(cp as u8)
            } else {
                None
            }
        })
        .collect();
    String::from_utf8(bytes?).ok()
}

fn reencode_cp1252(text: &str) -> Option<String> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        return None;
    }
    String::from_utf8(bytes.into_owned()).ok()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<ClipboardPayload, PayloadError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(PayloadError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(ClipboardPayload {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, fragment_body, repair_mojibake, PayloadError};

    #[test]
    fn empty_payload_is_an_error() {
        assert_eq!(decode_payload(b""), Err(PayloadError::Empty));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let payload = decode_payload(b"\xEF\xBB\xBF<p>hello</p>").unwrap();
        assert_eq!(payload.html, "<p>hello</p>");
        assert_eq!(payload.encoding_label, "UTF-8");
    }

    #[test]
    fn fragment_markers_are_honored() {
        let raw = "Version:0.9\r\nStartHTML:0000\r\n<html><body>\
                   <!--StartFragment--><p>copied</p><!--EndFragment--></body></html>";
        assert_eq!(fragment_body(raw), "<p>copied</p>");
    }

    #[test]
    fn payload_without_markers_passes_through() {
        assert_eq!(fragment_body("<p>plain</p>"), "<p>plain</p>");
    }

    #[test]
    fn mojibake_round_trip_restores_cjk() {
        let original = "日本語";
        let garbled: String = original.bytes().map(|b| b as char).collect();
        assert_eq!(repair_mojibake(garbled), original);
    }

    #[test]
    fn clean_ascii_is_left_alone() {
        let text = "just ascii".to_string();
        assert_eq!(repair_mojibake(text.clone()), text);
    }

    #[test]
    fn genuine_cjk_is_left_alone() {
        let text = "既に正しい".to_string();
        assert_eq!(repair_mojibake(text.clone()), text);
    }
}
