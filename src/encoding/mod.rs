//! Charset resolution and conversion.
//!
//! Bridges to `encoding_rs` for every charset concern of the builder:
//!
//! 1. Resolving the declared input and output encoding labels.
//! 2. Converting caller bytes from the input encoding into text when a CDATA
//!    node is created.
//! 3. Checking whether text can be represented in the output encoding.
//! 4. Encoding serialized text into output bytes for files and streams.
//!
//! `encoding_rs` follows the WHATWG label table, where `US-ASCII` and
//! `ISO-8859-1` (and their aliases) are labels of windows-1252. XML takes
//! those labels literally, so a [`Charset`] remembers when a label names
//! the narrower repertoire and applies it on every conversion.
//!
//! Escaping rules for markup live in [`escape`].

pub mod escape;

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// An error that occurs during charset resolution or conversion.
#[derive(Debug, Clone)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    /// Creates a new `EncodingError` with the given message.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Labels that `encoding_rs` maps to windows-1252 but that name US-ASCII.
const ASCII_LABELS: &[&str] = &["ansi_x3.4-1968", "ascii", "us-ascii"];

/// Labels that `encoding_rs` maps to windows-1252 but that name ISO-8859-1.
const LATIN1_LABELS: &[&str] = &[
    "cp819",
    "csisolatin1",
    "ibm819",
    "iso-8859-1",
    "iso-ir-100",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "l1",
    "latin1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Repertoire {
    /// Everything the underlying `encoding_rs` encoding covers.
    Full,
    /// U+0000 to U+007F, one byte each.
    Ascii,
    /// U+0000 to U+00FF, one byte each.
    Latin1,
}

impl Repertoire {
    fn max_code_point(self) -> Option<u32> {
        match self {
            Self::Full => None,
            Self::Ascii => Some(0x7F),
            Self::Latin1 => Some(0xFF),
        }
    }
}

/// A resolved character set: an `encoding_rs` encoding, narrowed to
/// US-ASCII or ISO-8859-1 when the label named one of those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
    repertoire: Repertoire,
}

impl Charset {
    /// UTF-8, the default for both input and output.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            repertoire: Repertoire::Full,
        }
    }

    /// Returns the underlying `encoding_rs` encoding.
    #[must_use]
    pub fn encoding(self) -> &'static Encoding {
        self.encoding
    }

    /// Returns the canonical name of the character set.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self.repertoire {
            Repertoire::Full => self.encoding.name(),
            Repertoire::Ascii => "US-ASCII",
            Repertoire::Latin1 => "ISO-8859-1",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Looks up a character set by its label (case-insensitive, WHATWG aliases).
///
/// # Errors
///
/// Returns `EncodingError` if the label is not recognized.
///
/// # Examples
///
/// ```
/// use xmlbuilder::encoding::resolve;
///
/// assert_eq!(resolve("latin1").unwrap().name(), "ISO-8859-1");
/// assert_eq!(resolve("cp1252").unwrap().name(), "windows-1252");
/// assert!(resolve("UNKNOWN-ENCODING-42").is_err());
/// ```
pub fn resolve(label: &str) -> Result<Charset, EncodingError> {
    let trimmed = label.trim();
    let encoding = Encoding::for_label(trimmed.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))?;
    let repertoire = if encoding == WINDOWS_1252 {
        let lower = trimmed.to_ascii_lowercase();
        if ASCII_LABELS.contains(&lower.as_str()) {
            Repertoire::Ascii
        } else if LATIN1_LABELS.contains(&lower.as_str()) {
            Repertoire::Latin1
        } else {
            Repertoire::Full
        }
    } else {
        Repertoire::Full
    };
    Ok(Charset {
        encoding,
        repertoire,
    })
}

/// Looks up a character set that documents can be written in.
///
/// `encoding_rs` only encodes to ASCII-compatible charsets; UTF-16 variants
/// and the `replacement` encoding are decode-only and are rejected here.
///
/// # Errors
///
/// Returns `EncodingError` if the label is unknown or decode-only.
pub fn resolve_output(label: &str) -> Result<Charset, EncodingError> {
    let charset = resolve(label)?;
    if charset.encoding.output_encoding() != charset.encoding {
        return Err(EncodingError::new(format!(
            "encoding {label} cannot be used for output"
        )));
    }
    Ok(charset)
}

/// Converts bytes in `input` encoding into text.
///
/// No BOM sniffing is done: the declared input encoding is authoritative.
///
/// # Errors
///
/// Returns `EncodingError` if the bytes are malformed for `input`.
///
/// # Examples
///
/// ```
/// use xmlbuilder::encoding::{convert_input, resolve};
///
/// let latin1 = resolve("ISO-8859-1").unwrap();
/// assert_eq!(convert_input(b"caf\xE9", latin1).unwrap(), "caf\u{e9}");
/// ```
pub fn convert_input(bytes: &[u8], input: Charset) -> Result<Cow<'_, str>, EncodingError> {
    let malformed = || {
        EncodingError::new(format!(
            "malformed byte sequence for encoding {}",
            input.name()
        ))
    };
    match input.repertoire {
        Repertoire::Full => input
            .encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(malformed),
        Repertoire::Ascii => std::str::from_utf8(bytes)
            .ok()
            .filter(|text| text.is_ascii())
            .map(Cow::Borrowed)
            .ok_or_else(malformed),
        Repertoire::Latin1 => match std::str::from_utf8(bytes) {
            Ok(text) if text.is_ascii() => Ok(Cow::Borrowed(text)),
            _ => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
        },
    }
}

/// Returns the first character of `text` that `output` cannot represent.
#[must_use]
pub fn first_unmappable(text: &str, output: Charset) -> Option<char> {
    if let Some(max) = output.repertoire.max_code_point() {
        return text.chars().find(|&c| u32::from(c) > max);
    }
    if output.encoding == UTF_8 || text.is_ascii() {
        return None;
    }
    let mut buf = [0u8; 4];
    text.chars().find(|c| {
        let (_, _, unmappable) = output.encoding.encode(c.encode_utf8(&mut buf));
        unmappable
    })
}

/// Encodes serialized text into bytes of the `output` encoding.
///
/// Characters the encoding cannot represent are written as decimal numeric
/// character references, which is valid inside XML text and attribute values.
#[must_use]
pub fn encode_output(text: &str, output: Charset) -> Cow<'_, [u8]> {
    if output.encoding == UTF_8 || text.is_ascii() {
        return Cow::Borrowed(text.as_bytes());
    }
    match output.repertoire.max_code_point() {
        Some(max) => Cow::Owned(encode_single_byte(text, max)),
        None => {
            let (bytes, _, _) = output.encoding.encode(text);
            bytes
        }
    }
}

/// Writes each character up to `max` as its code point byte and everything
/// else as `&#N;`.
fn encode_single_byte(text: &str, max: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(byte) if u32::from(byte) <= max => out.push(byte),
            _ => out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes()),
        }
    }
    out
}
