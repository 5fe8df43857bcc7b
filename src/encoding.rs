//! Character encoding detection and conversion
//!
//! Documents enter the engine as bytes and are decoded exactly once, here.
//! Everything downstream (tree, instances, queries) works on `String`; the
//! only other conversion is [`Encoding::encode`] at the serialization
//! boundary.

use crate::error::{Error, Result, SyntaxError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static ENCODING_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z][A-Za-z0-9._-]*)["']"#).unwrap()
});

/// Character encodings supported for input and output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 (the default)
    #[default]
    Utf8,
    /// UTF-16, little endian
    Utf16Le,
    /// UTF-16, big endian
    Utf16Be,
}

impl Encoding {
    /// Name used in XML declarations
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le | Encoding::Utf16Be => "UTF-16",
        }
    }

    /// Byte-order mark written before encoded output
    pub fn bom(&self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => &[],
            Encoding::Utf16Le => &[0xFF, 0xFE],
            Encoding::Utf16Be => &[0xFE, 0xFF],
        }
    }

    /// Encode text, without BOM
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }

    /// Decode bytes that carry no BOM.
    ///
    /// Undecodable bytes are malformed input and fail with [`Error::Syntax`].
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                SyntaxError::new("Invalid UTF-8 input")
                    .with_position(e.utf8_error().valid_up_to())
                    .with_cause(e)
                    .into()
            }),
            Encoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Encoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("utf-8"),
            Encoding::Utf16Le => f.write_str("utf-16le"),
            Encoding::Utf16Be => f.write_str("utf-16be"),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    /// Parse an encoding label; bare `utf-16` means little endian
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(Encoding::Utf8),
            "utf-16" | "utf16" | "utf-16le" | "utf16le" => Ok(Encoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(Encoding::Utf16Be),
            other => Err(Error::Encoding(format!("Unsupported encoding: '{}'", other))),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        let message = format!("UTF-16 input has odd length {}", bytes.len());
        return Err(SyntaxError::new(message).into());
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| SyntaxError::new("Invalid UTF-16 input").with_cause(e).into())
}

/// Read the `encoding="..."` pseudo-attribute of an ASCII-compatible prolog
pub fn declared_encoding(prolog: &[u8]) -> Option<String> {
    let head = &prolog[..prolog.len().min(256)];
    let head = String::from_utf8_lossy(head);
    ENCODING_DECL
        .captures(&head)
        .map(|caps| caps[1].to_string())
}

/// Detect the encoding of a document.
///
/// Returns the encoding and the length of the byte-order mark to skip.
/// Detection order: BOM, UTF-16 null-byte pattern of `<`, prolog
/// declaration, then UTF-8.
pub fn detect(bytes: &[u8]) -> Result<(Encoding, usize)> {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => return Ok((Encoding::Utf8, 3)),
        [0xFF, 0xFE, ..] => return Ok((Encoding::Utf16Le, 2)),
        [0xFE, 0xFF, ..] => return Ok((Encoding::Utf16Be, 2)),
        [b'<', 0x00, ..] => return Ok((Encoding::Utf16Le, 0)),
        [0x00, b'<', ..] => return Ok((Encoding::Utf16Be, 0)),
        _ => {}
    }
    match declared_encoding(bytes) {
        Some(label) => {
            // A readable 8-bit prolog rules out UTF-16, so only the label is checked.
            label.parse::<Encoding>()?;
            Ok((Encoding::Utf8, 0))
        }
        None => Ok((Encoding::Utf8, 0)),
    }
}

/// Decode a whole document to text, honoring BOM and declaration
pub fn decode_document(bytes: &[u8]) -> Result<(String, Encoding)> {
    let (encoding, bom_len) = detect(bytes)?;
    let text = encoding.decode(&bytes[bom_len..])?;
    log::debug!("decoded {} bytes of {} input", bytes.len(), encoding);
    Ok((text, encoding))
}
