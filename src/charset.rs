//! Named text encodings, including legacy Windows/ISO/DOS code pages.
//!
//! The code-page table is process-wide state built by [`init`]. `init` is idempotent and
//! must run before any lookup; lookups made earlier fail with
//! [`CharsetError::NotInitialized`]. [`crate::digest::DigestService::new`] and
//! [`crate::init`] both call it.

use crate::errors::CharsetError;
use encoding_rs::{EncoderResult, Encoding};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Code pages and the transforms they map to.
fn code_pages() -> Vec<(u16, Repr)> {
    vec![
        (65001, Repr::Web(encoding_rs::UTF_8)),
        (1200, Repr::Utf16Le),
        (1201, Repr::Utf16Be),
        (874, Repr::Web(encoding_rs::WINDOWS_874)),
        (1250, Repr::Web(encoding_rs::WINDOWS_1250)),
        (1251, Repr::Web(encoding_rs::WINDOWS_1251)),
        (1252, Repr::Web(encoding_rs::WINDOWS_1252)),
        (1253, Repr::Web(encoding_rs::WINDOWS_1253)),
        (1254, Repr::Web(encoding_rs::WINDOWS_1254)),
        (1255, Repr::Web(encoding_rs::WINDOWS_1255)),
        (1256, Repr::Web(encoding_rs::WINDOWS_1256)),
        (1257, Repr::Web(encoding_rs::WINDOWS_1257)),
        (1258, Repr::Web(encoding_rs::WINDOWS_1258)),
        (866, Repr::Web(encoding_rs::IBM866)),
        (28592, Repr::Web(encoding_rs::ISO_8859_2)),
        (28593, Repr::Web(encoding_rs::ISO_8859_3)),
        (28594, Repr::Web(encoding_rs::ISO_8859_4)),
        (28595, Repr::Web(encoding_rs::ISO_8859_5)),
        (28596, Repr::Web(encoding_rs::ISO_8859_6)),
        (28597, Repr::Web(encoding_rs::ISO_8859_7)),
        (28598, Repr::Web(encoding_rs::ISO_8859_8)),
        (38598, Repr::Web(encoding_rs::ISO_8859_8_I)),
        (28603, Repr::Web(encoding_rs::ISO_8859_13)),
        (28605, Repr::Web(encoding_rs::ISO_8859_15)),
        (20866, Repr::Web(encoding_rs::KOI8_R)),
        (21866, Repr::Web(encoding_rs::KOI8_U)),
        (10000, Repr::Web(encoding_rs::MACINTOSH)),
        (10007, Repr::Web(encoding_rs::X_MAC_CYRILLIC)),
        (932, Repr::Web(encoding_rs::SHIFT_JIS)),
        (936, Repr::Web(encoding_rs::GBK)),
        (54936, Repr::Web(encoding_rs::GB18030)),
        (949, Repr::Web(encoding_rs::EUC_KR)),
        (950, Repr::Web(encoding_rs::BIG5)),
        (51932, Repr::Web(encoding_rs::EUC_JP)),
        (50220, Repr::Web(encoding_rs::ISO_2022_JP)),
    ]
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Repr {
    // encoding_rs encodes UTF-16 labels as UTF-8 (WHATWG output encoding), so both byte
    // orders are handled here.
    Utf16Le,
    Utf16Be,
    Web(&'static Encoding),
}

struct Registry {
    by_code_page: HashMap<u16, Charset>,
}

impl Registry {
    fn with_code_pages() -> Self {
        let by_code_page: HashMap<u16, Charset> = code_pages()
            .into_iter()
            .map(|(cp, repr)| (cp, Charset { code_page: Some(cp), repr }))
            .collect();
        log::debug!("registered {} code pages", by_code_page.len());
        Registry { by_code_page }
    }

    fn by_encoding(&self, encoding: &'static Encoding) -> Option<Charset> {
        let repr = if encoding == encoding_rs::UTF_16LE {
            Repr::Utf16Le
        } else if encoding == encoding_rs::UTF_16BE {
            Repr::Utf16Be
        } else if encoding == encoding_rs::REPLACEMENT {
            return None;
        } else {
            Repr::Web(encoding)
        };
        let registered = self.by_code_page.values().find(|c| c.repr == repr).copied();
        Some(registered.unwrap_or(Charset { code_page: None, repr }))
    }
}

/// Registers the legacy code pages. Safe to call any number of times from any thread.
pub fn init() {
    REGISTRY.get_or_init(Registry::with_code_pages);
}

pub fn is_initialized() -> bool {
    REGISTRY.get().is_some()
}

fn registry() -> Result<&'static Registry, CharsetError> {
    REGISTRY.get().ok_or(CharsetError::NotInitialized)
}

/// Registered `(code page, name)` pairs, ordered by code page.
pub fn registered() -> Result<Vec<(u16, &'static str)>, CharsetError> {
    let reg = registry()?;
    let mut out: Vec<_> = reg.by_code_page.iter().map(|(cp, c)| (*cp, c.name())).collect();
    out.sort_unstable_by_key(|(cp, _)| *cp);
    Ok(out)
}

/// A registered character encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    code_page: Option<u16>,
    repr: Repr,
}

impl Charset {
    pub fn from_code_page(code_page: u16) -> Result<Self, CharsetError> {
        registry()?
            .by_code_page
            .get(&code_page)
            .copied()
            .ok_or(CharsetError::UnknownCodePage(code_page))
    }

    /// Resolves a label: WHATWG names (`windows-1250`, `utf-8`, `iso-8859-2`, ...),
    /// `cpNNNN`, or a bare code page number.
    pub fn for_label(label: &str) -> Result<Self, CharsetError> {
        let reg = registry()?;
        let trimmed = label.trim();
        let lower = trimmed.to_ascii_lowercase();
        let numeric = lower.strip_prefix("cp").unwrap_or(&lower);
        if let Ok(cp) = numeric.parse::<u16>() {
            return Self::from_code_page(cp);
        }
        if lower == "unicodefffe" {
            return Self::from_code_page(1201);
        }
        Encoding::for_label(trimmed.as_bytes())
            .and_then(|enc| reg.by_encoding(enc))
            .ok_or_else(|| CharsetError::UnknownLabel(trimmed.to_string()))
    }

    pub fn code_page(&self) -> Option<u16> {
        self.code_page
    }

    pub fn name(&self) -> &'static str {
        match self.repr {
            Repr::Utf16Le => "UTF-16LE",
            Repr::Utf16Be => "UTF-16BE",
            Repr::Web(enc) => enc.name(),
        }
    }

    /// Encodes `text`. Characters the charset cannot represent become `?`, the
    /// substitution legacy code-page encoders apply, so both sides of the gateway
    /// produce the same bytes.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self.repr {
            Repr::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Repr::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Repr::Web(enc) if enc == encoding_rs::UTF_8 => text.as_bytes().to_vec(),
            Repr::Web(enc) => {
                let Ok(bytes) = encode_web(enc, text, |_| Ok::<_, Infallible>(()));
                bytes
            }
        }
    }

    /// Like [`Charset::encode`], but an unmappable character is an error.
    pub fn encode_strict(&self, text: &str) -> Result<Vec<u8>, CharsetError> {
        match self.repr {
            Repr::Web(enc) if enc != encoding_rs::UTF_8 => encode_web(enc, text, |ch| {
                Err(CharsetError::Unmappable { charset: enc.name(), ch })
            }),
            _ => Ok(self.encode(text)),
        }
    }

    /// Decodes bytes produced by [`Charset::encode`]; malformed sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let enc = match self.repr {
            Repr::Utf16Le => encoding_rs::UTF_16LE,
            Repr::Utf16Be => encoding_rs::UTF_16BE,
            Repr::Web(enc) => enc,
        };
        enc.decode_without_bom_handling(bytes).0.into_owned()
    }
}

/// Runs the encoder, calling `on_unmappable` for each character the encoding lacks;
/// when it returns `Ok`, `?` is written in its place.
fn encode_web<E>(
    enc: &'static Encoding,
    text: &str,
    mut on_unmappable: impl FnMut(char) -> Result<(), E>,
) -> Result<Vec<u8>, E> {
    let mut encoder = enc.new_encoder();
    let mut out = Vec::with_capacity(
        encoder
            .max_buffer_length_from_utf8_without_replacement(text.len())
            .unwrap_or(text.len()),
    );
    let mut consumed = 0;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut out, true);
        consumed += read;
        match result {
            EncoderResult::InputEmpty => return Ok(out),
            EncoderResult::OutputFull => out.reserve(text.len() - consumed + 16),
            EncoderResult::Unmappable(ch) => {
                on_unmappable(ch)?;
                out.push(b'?');
            }
        }
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Charset")
            .field("name", &self.name())
            .field("code_page", &self.code_page)
            .finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = CharsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Charset::for_label(s)
    }
}
