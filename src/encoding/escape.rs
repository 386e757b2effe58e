//! XML escaping rules.
//!
//! Text and attribute values are escaped when they are serialized, never when
//! they are stored, so raw values can be edited and re-serialized freely.
//! CDATA content is written verbatim and is instead validated once, when the
//! CDATA node is created.

use crate::error::{BuildError, BuildResult};

/// The sequence that terminates a CDATA section.
pub const CDATA_END: &str = "]]>";

/// Returns `true` if `c` is a legal XML 1.0 `Char`.
///
/// `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
#[must_use]
pub fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns the first character in `text` that XML 1.0 does not allow.
#[must_use]
pub fn first_illegal_char(text: &str) -> Option<char> {
    text.chars().find(|&c| !is_xml_char(c))
}

/// Checks that `content` can be written verbatim inside `<![CDATA[...]]>`.
///
/// # Errors
///
/// Returns `InvalidCdataContent` if the content contains the `]]>` terminator
/// or a character XML 1.0 does not allow.
pub fn check_cdata(content: &str) -> BuildResult<()> {
    if let Some(pos) = content.find(CDATA_END) {
        return Err(BuildError::invalid_cdata(format!(
            "terminator \"]]>\" at byte offset {pos}"
        )));
    }
    if let Some(c) = first_illegal_char(content) {
        return Err(BuildError::invalid_cdata(format!(
            "character U+{:04X} is not allowed in XML",
            c as u32
        )));
    }
    Ok(())
}

/// Escapes text content for XML output.
///
/// - `<`, `>`, `&` are escaped with named entity references
/// - `\r` is encoded as `&#13;` so it survives end-of-line normalization
/// - `\t` and `\n` are passed through
/// - characters XML 1.0 does not allow are dropped
pub fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c if !is_xml_char(c) => {}
            _ => out.push(ch),
        }
    }
}

/// Escapes attribute values for XML output.
///
/// - `<`, `>`, `&`, `"` are escaped with named entity references
/// - `\t` → `&#9;`, `\n` → `&#10;`, `\r` → `&#13;` so attribute-value
///   normalization does not turn them into spaces
/// - characters XML 1.0 does not allow are dropped
pub fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if !is_xml_char(c) => {}
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(s: &str) -> String {
        let mut out = String::new();
        write_escaped_text(&mut out, s);
        out
    }

    fn attr(s: &str) -> String {
        let mut out = String::new();
        write_escaped_attr(&mut out, s);
        out
    }

    #[test]
    fn test_escape_text_markup() {
        assert_eq!(text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn test_escape_text_keeps_quotes_and_newlines() {
        assert_eq!(text("say \"hi\"\n\tok"), "say \"hi\"\n\tok");
        assert_eq!(text("a\r\nb"), "a&#13;\nb");
    }

    #[test]
    fn test_escape_text_drops_illegal_chars() {
        assert_eq!(text("a\u{1}b\u{FFFE}c"), "abc");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(
            attr("He said \"hello\" & <bye>"),
            "He said &quot;hello&quot; &amp; &lt;bye&gt;"
        );
        assert_eq!(attr("a\tb\nc"), "a&#9;b&#10;c");
    }

    #[test]
    fn test_escape_passes_non_ascii() {
        assert_eq!(text("caf\u{e9} \u{2603}"), "caf\u{e9} \u{2603}");
    }

    #[test]
    fn test_check_cdata_accepts_markup() {
        assert!(check_cdata("<strong>HTML Content</strong> & more").is_ok());
        assert!(check_cdata("]] >").is_ok());
        assert!(check_cdata("").is_ok());
    }

    #[test]
    fn test_check_cdata_rejects_terminator() {
        let err = check_cdata("before]]>after").unwrap_err();
        assert!(matches!(err, BuildError::InvalidCdataContent { ref message } if message.contains("offset 6")));
    }

    #[test]
    fn test_check_cdata_rejects_control_char() {
        assert!(matches!(
            check_cdata("bell\u{7}"),
            Err(BuildError::InvalidCdataContent { .. })
        ));
    }

    #[test]
    fn test_first_illegal_char() {
        assert_eq!(first_illegal_char("ok\ttext"), None);
        assert_eq!(first_illegal_char("no\u{0}pe"), Some('\u{0}'));
    }
}
