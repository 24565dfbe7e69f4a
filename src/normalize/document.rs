//! Document pre/post-processing
//!
//! Canonicalizes encodings and whitespace so DOM parsing and text erasure
//! operate on predictable input.

use regex::Regex;
use std::sync::OnceLock;

static RE_HEX_ESCAPE: OnceLock<Regex> = OnceLock::new();
static RE_WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn re_hex_escape() -> &'static Regex {
    RE_HEX_ESCAPE.get_or_init(|| Regex::new(r"\\x[0-9a-fA-F]{2}").unwrap())
}

fn re_whitespace() -> &'static Regex {
    RE_WHITESPACE.get_or_init(|| Regex::new(r"[\r\n]+|\s+").unwrap())
}

/// Normalize the given document by:
/// - Lowercasing it
/// - Converting `\xHH` escape sequences to HTML numeric entities
/// - HTML entity decoding it
/// - URL decoding it (the pre-decode string is kept if decoding fails)
/// - Replacing all whitespace variations with a single space
/// - Trimming leading and trailing whitespace
pub fn normalize_document(text: &str) -> String {
    let lowercased = text.to_lowercase();

    let converted = convert_hex_escapes(&lowercased);
    let unescaped = decode_html_entities(&converted);

    let url_decoded = match urlencoding::decode(&unescaped) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => unescaped,
    };

    let collapsed = re_whitespace().replace_all(&url_decoded, " ");
    collapsed.trim().to_string()
}

/// Rewrite every `\xHH` escape sequence to the HTML numeric entity `&#xHH;`.
/// Matches that do not parse as hexadecimal are left intact.
fn convert_hex_escapes(input: &str) -> String {
    re_hex_escape()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let m = &caps[0];
            match u32::from_str_radix(&m[2..], 16) {
                Ok(value) => format!("&#x{:x};", value),
                Err(_) => m.to_string(),
            }
        })
        .into_owned()
}

/// Decode named and numeric HTML entities. Unknown or malformed entities are
/// copied through unchanged.
pub(crate) fn decode_html_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match decode_entity(tail) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the entity at the start of `s` (which begins with `&`), returning
/// the character and the number of bytes consumed.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    // Position of the terminating semicolon; entities are short
    let end = s[1..].find(';')? + 1;
    if end > 10 {
        return None;
    }
    let body = &s[1..end];

    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        char::from_u32(u32::from_str_radix(hex, 16).ok()?)?
    } else if let Some(dec) = body.strip_prefix('#') {
        char::from_u32(dec.parse().ok()?)?
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => ' ',
            _ => return None,
        }
    };
    Some((decoded, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(
            normalize_document("  Hello\r\n\tWORLD   again "),
            "hello world again"
        );
    }

    #[test]
    fn test_hex_escapes_become_characters() {
        // \x61 -> &#x61; -> 'a'
        assert_eq!(normalize_document(r"\x61BC"), "abc");
    }

    #[test]
    fn test_hex_escape_decodes_after_lowercasing() {
        // Entity decoding runs after lowercasing, so a decoded uppercase
        // code point survives a single pass
        assert_eq!(normalize_document(r"\x41bc"), "Abc");
    }

    #[test]
    fn test_named_entities_decoded() {
        assert_eq!(normalize_document("a &amp; b &lt;c&gt;"), "a & b <c>");
    }

    #[test]
    fn test_numeric_entities_decoded() {
        assert_eq!(normalize_document("&#97;&#x62;"), "ab");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(normalize_document("&bogus; &nosemi"), "&bogus; &nosemi");
    }

    #[test]
    fn test_url_decoding() {
        assert_eq!(normalize_document("a%20b%3Dc"), "a b=c");
    }

    #[test]
    fn test_lone_percent_kept() {
        assert_eq!(normalize_document("50% off"), "50% off");
    }

    #[test]
    fn test_idempotent() {
        let input = "Visit /a?x=1&amp;y=2 \r\n NOW";
        let once = normalize_document(input);
        assert_eq!(normalize_document(&once), once);
    }
}
