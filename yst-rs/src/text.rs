//! Character encodings and small string helpers.
//!
//! | Encoding name (case-insensitive)          | Decode            | Encode         |
//! |-------------------------------------------|-------------------|----------------|
//! | `UTF-8`, `UTF8`                           | lossy UTF-8       | as is          |
//! | `ISO-8859-1`, `ISO8859-1`, `latin1`, `Latin-1` | byte = code point | `?` above U+FF |
//! | `US-ASCII`, `ASCII`                       | bytes above 0x7F become U+FFFD | `?` above U+7F |

use std::borrow::Cow;

/// An encoding name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported encoding: {0}")]
pub struct UnsupportedEncoding(pub String);

/// A supported template encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn from_name(name: &str) -> Result<Self, UnsupportedEncoding> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859_1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            "us-ascii" | "ascii" => Ok(Encoding::Ascii),
            _ => Err(UnsupportedEncoding(name.to_owned())),
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect::<String>().into(),
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect::<String>()
                .into(),
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        let limit = match self {
            Encoding::Utf8 => return text.as_bytes().to_vec(),
            Encoding::Latin1 => 0xFF,
            Encoding::Ascii => 0x7F,
        };
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).ok().filter(|&b| u32::from(b) <= limit).unwrap_or(b'?'))
            .collect()
    }
}

/// Decode `bytes` per the encoding called `name`.
pub fn decode<'a>(bytes: &'a [u8], name: &str) -> Result<Cow<'a, str>, UnsupportedEncoding> {
    Ok(Encoding::from_name(name)?.decode(bytes))
}

/// Encode `text` per the encoding called `name`.
pub fn encode(text: &str, name: &str) -> Result<Vec<u8>, UnsupportedEncoding> {
    Ok(Encoding::from_name(name)?.encode(text))
}

/// Escape the five XML special characters.
pub fn xml_escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// `yes`, `true`, `on` or `1`, ignoring case and surrounding blanks.
pub fn is_true(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "on" | "1")
}

/// `no`, `false`, `off` or `0`, ignoring case and surrounding blanks.
pub fn is_false(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "no" | "false" | "off" | "0")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_names() {
        assert_eq!(Encoding::from_name("utf-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_name(" ISO-8859-1 ").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name("Latin1").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name("US-ASCII").unwrap(), Encoding::Ascii);
        assert_eq!(
            Encoding::from_name("EBCDIC").unwrap_err(),
            UnsupportedEncoding("EBCDIC".into())
        );
    }

    #[test]
    fn decode_latin1() {
        assert_eq!(decode(b"caf\xe9", "ISO-8859-1").unwrap(), "café");
    }

    #[test]
    fn decode_utf8_is_lossy() {
        assert_eq!(decode(b"ok\xff", "UTF-8").unwrap(), "ok\u{FFFD}");
    }

    #[test]
    fn decode_ascii_replaces_high_bytes() {
        assert_eq!(decode(b"a\xe9b", "ascii").unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn encode_unmappable_becomes_question_mark() {
        assert_eq!(encode("café €", "latin1").unwrap(), b"caf\xe9 ?".to_vec());
        assert_eq!(encode("café", "US-ASCII").unwrap(), b"caf?".to_vec());
        assert_eq!(encode("café", "UTF-8").unwrap(), "café".as_bytes().to_vec());
    }

    #[test]
    fn xml_escape_specials() {
        assert_eq!(xml_escape("plain"), Cow::Borrowed("plain"));
        assert_eq!(xml_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }

    #[test]
    fn truthy_and_falsy_words() {
        for s in ["yes", "TRUE", " on ", "1"] {
            assert!(is_true(s), "{s}");
            assert!(!is_false(s), "{s}");
        }
        for s in ["no", "False", "off", "0"] {
            assert!(is_false(s), "{s}");
            assert!(!is_true(s), "{s}");
        }
        assert!(!is_true("maybe") && !is_false("maybe"));
    }
}
