//! # Keyword Record Parser
//!
//! Turns one raw fixed-width keyword line (name token + value token +
//! comment, already isolated by the file engine) into a typed
//! [`Record`]. The value token's intrinsic type is determined by a
//! one-character sniffing grammar before conversion, so a record's value
//! variant is fully determined by its type class; parsing never mixes
//! variants.
//!
//! ## Type Classes
//!
//! | Class | Token shape | Variant |
//! |-------|-------------|---------|
//! | `C` | starts with `'` | `Value::Text` |
//! | `L` | bare `T` or `F` | `Value::Bool` |
//! | `X` | `(re, im)` | `Value::Complex` |
//! | `F` | numeric with `.` or exponent | `Value::Float` |
//! | `I` | plain digits | `Value::Int` |
//! | `T` | never sniffed; accepted as an integer subtype | `Value::Int` |
//!
//! ## Continuation
//!
//! A value token whose trailing non-whitespace character (quotes aside) is
//! `&` is continued on following lines; the full value is fetched from the
//! long-value-string side channel keyed by the same keyword name and the
//! opening quote is re-applied around the joined result.

use crate::engine::FileEngine;
use crate::error::Error;
use eyre::{bail, Result};
use phf::phf_map;

/// Typed value of one header record. Closed variant: the type class
/// derived from the raw token picks exactly one arm.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Text(String),
}

impl Value {
    /// Formats this value back into a raw value token that re-parses to
    /// the identical value.
    pub fn to_raw_token(&self) -> String {
        match self {
            Value::Bool(true) => "T".to_string(),
            Value::Bool(false) => "F".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => {
                // force a float-classified token for integral values
                let s = v.to_string();
                if s.contains(['.', 'e', 'E']) {
                    s
                } else {
                    format!("{s}.0")
                }
            }
            Value::Complex { re, im } => format!("({re}, {im})"),
            Value::Text(s) => format!("'{s}'"),
        }
    }
}

/// One keyword record: `name = value / comment`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub value: Value,
    pub comment: String,
}

impl Record {
    pub fn new(name: impl Into<String>, value: Value, comment: impl Into<String>) -> Record {
        Record {
            name: name.into(),
            value,
            comment: comment.into(),
        }
    }
}

/// Class of a keyword name, deciding how its record is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Block-structure keywords (SIMPLE, BITPIX, NAXISn, table layout).
    Structural,
    /// Compressed-image shadow keywords (ZBITPIX, ZNAXIS, ...).
    Compression,
    /// Commentary records (COMMENT, HISTORY, blank name).
    Comment,
    /// Long-string continuation records (CONTINUE).
    Continuation,
    /// Everything else.
    User,
}

static KEY_CLASSES: phf::Map<&'static str, KeyClass> = phf_map! {
    "SIMPLE" => KeyClass::Structural,
    "BITPIX" => KeyClass::Structural,
    "NAXIS" => KeyClass::Structural,
    "EXTEND" => KeyClass::Structural,
    "XTENSION" => KeyClass::Structural,
    "PCOUNT" => KeyClass::Structural,
    "GCOUNT" => KeyClass::Structural,
    "TFIELDS" => KeyClass::Structural,
    "END" => KeyClass::Structural,
    "ZIMAGE" => KeyClass::Compression,
    "ZBITPIX" => KeyClass::Compression,
    "ZNAXIS" => KeyClass::Compression,
    "ZCMPTYPE" => KeyClass::Compression,
    "COMMENT" => KeyClass::Comment,
    "HISTORY" => KeyClass::Comment,
    "" => KeyClass::Comment,
    "CONTINUE" => KeyClass::Continuation,
};

// numbered structural families: NAXISn plus the per-column table keywords
const NUMBERED_STRUCTURAL: &[&str] = &[
    "NAXIS", "ZNAXIS", "TTYPE", "TFORM", "TUNIT", "TBCOL", "TDIM", "TNULL", "TSCAL", "TZERO",
    "TDISP",
];

/// Classifies a keyword name.
pub fn key_class(name: &str) -> KeyClass {
    let name = name.trim();
    if let Some(class) = KEY_CLASSES.get(name) {
        return *class;
    }
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.len() < name.len() && NUMBERED_STRUCTURAL.contains(&stem) {
        if stem == "ZNAXIS" {
            return KeyClass::Compression;
        }
        return KeyClass::Structural;
    }
    KeyClass::User
}

/// Reports whether the last non-whitespace character of the raw value
/// token (quotes aside) is an ampersand, marking a continued string.
pub fn is_continued(raw: &str) -> bool {
    let trimmed = raw.trim_matches([' ', '\n', '\t', '\'']);
    trimmed.ends_with('&')
}

/// Determines the intrinsic type class of a trimmed raw value token.
fn sniff_type(token: &str) -> Option<char> {
    let mut chars = token.chars();
    let first = chars.next()?;
    match first {
        '\'' => Some('C'),
        '(' => Some('X'),
        'T' | 'F' if token.len() == 1 => Some('L'),
        '+' | '-' | '.' | '0'..='9' => {
            if token
                .chars()
                .any(|c| matches!(c, '.' | 'E' | 'e' | 'D' | 'd'))
            {
                Some('F')
            } else {
                Some('I')
            }
        }
        _ => None,
    }
}

fn parse_float(token: &str) -> Result<f64> {
    // fixed-format exponents may use D instead of E
    let normalized = token.replace(['D', 'd'], "E");
    normalized.trim().parse::<f64>().map_err(|_| {
        Error::ValueParse {
            token: token.to_string(),
            expected: "float",
        }
        .into()
    })
}

/// Parses one raw keyword line into a typed record.
///
/// The value token must already be continuation-resolved; see
/// [`read_record`] for the engine-backed path.
pub fn parse_record(name: &str, value: &str, comment: &str) -> Result<Record> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MalformedValue {
            keyword: name.to_string(),
            reason: "undefined or blank value".to_string(),
        }
        .into());
    }

    let class = sniff_type(trimmed).ok_or_else(|| Error::InvalidKeywordType {
        keyword: name.to_string(),
        class: trimmed.chars().next().unwrap_or('?'),
    })?;

    // strip one leading and one trailing quote, nothing more
    let mut token = trimmed;
    if token.starts_with('\'') {
        token = &token[1..];
        if token.ends_with('\'') {
            token = &token[..token.len() - 1];
        }
    }

    let value = match class {
        'L' => Value::Bool(token == "T"),
        'F' => Value::Float(parse_float(token)?),
        'I' | 'T' => Value::Int(token.trim().parse::<i64>().map_err(|_| Error::ValueParse {
            token: token.to_string(),
            expected: "integer",
        })?),
        'X' => {
            let inner = token
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| Error::ValueParse {
                    token: token.to_string(),
                    expected: "complex pair",
                })?;
            let (re, im) = inner.split_once(',').ok_or_else(|| Error::ValueParse {
                token: token.to_string(),
                expected: "complex pair",
            })?;
            Value::Complex {
                re: parse_float(re.trim_matches([' ', '\t', '\n']))?,
                im: parse_float(im.trim_matches([' ', '\t', '\n']))?,
            }
        }
        'C' => Value::Text(token.trim_end_matches(' ').to_string()),
        other => {
            return Err(Error::InvalidKeywordType {
                keyword: name.to_string(),
                class: other,
            }
            .into())
        }
    };

    Ok(Record {
        name: name.to_string(),
        value,
        comment: comment.to_string(),
    })
}

/// Reads and parses the `index`-th keyword slot (1-based) of the current
/// block.
///
/// Commentary and continuation records are rejected here; callers wanting
/// them must route them to a separate accumulator. Continued string values
/// are resolved through the engine's long-value side channel.
pub fn read_record<E: FileEngine + ?Sized>(engine: &E, index: usize) -> Result<Record> {
    let (name, mut raw, comment) = engine.read_keyword_slot(index)?;

    match key_class(&name) {
        KeyClass::Comment | KeyClass::Continuation => {
            bail!("keyword {name:?} is a commentary or continuation record")
        }
        _ => {}
    }

    if is_continued(&raw) && raw.starts_with('\'') {
        let long = engine.read_long_value_string(&name)?;
        raw = format!("'{long}'");
    }

    parse_record(&name, &raw, &comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_text_with_comment() {
        let rec = parse_record("EXTNAME", "'primary hdu'", "the primary HDU").unwrap();
        assert_eq!(rec.name, "EXTNAME");
        assert_eq!(rec.value, Value::Text("primary hdu".to_string()));
        assert_eq!(rec.comment, "the primary HDU");
    }

    #[test]
    fn text_keeps_leading_spaces_trims_trailing() {
        let rec = parse_record("OBSERVER", "'  E. Hubble   '", "").unwrap();
        assert_eq!(rec.value, Value::Text("  E. Hubble".to_string()));
    }

    #[test]
    fn parses_logical() {
        assert_eq!(
            parse_record("SIMPLE", "T", "").unwrap().value,
            Value::Bool(true)
        );
        assert_eq!(
            parse_record("EXTEND", "F", "").unwrap().value,
            Value::Bool(false)
        );
    }

    #[test]
    fn parses_integer_and_float() {
        assert_eq!(
            parse_record("BITPIX", "-32", "").unwrap().value,
            Value::Int(-32)
        );
        assert_eq!(
            parse_record("BSCALE", "1.25", "").unwrap().value,
            Value::Float(1.25)
        );
        // fixed-format exponent letter
        assert_eq!(
            parse_record("CRVAL1", "2.5D2", "").unwrap().value,
            Value::Float(250.0)
        );
    }

    #[test]
    fn parses_complex_pair() {
        let rec = parse_record("GAIN", "(1.5, -2.0)", "").unwrap();
        assert_eq!(rec.value, Value::Complex { re: 1.5, im: -2.0 });
    }

    #[test]
    fn malformed_complex_fails_with_token() {
        let err = parse_record("GAIN", "(1.5)", "").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::Error>(),
            Some(crate::Error::ValueParse { .. })
        ));
    }

    #[test]
    fn unknown_class_is_invalid_keyword_type() {
        let err = parse_record("WEIRD", "@oops", "").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::Error>(),
            Some(crate::Error::InvalidKeywordType { class: '@', .. })
        ));
    }

    #[test]
    fn numeric_garbage_is_value_parse_error() {
        let err = parse_record("NAXIS", "12x4", "").unwrap_err();
        match err.downcast_ref::<crate::Error>() {
            Some(crate::Error::ValueParse { token, .. }) => assert_eq!(token, "12x4"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn every_variant_round_trips_through_raw_token() {
        let values = vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(-98),
            Value::Float(3.0),
            Value::Float(6.62607015e-34),
            Value::Complex { re: 0.5, im: 42.0 },
            Value::Text("primary hdu".to_string()),
        ];
        for value in values {
            let rec = parse_record("KEY", &value.to_raw_token(), "c").unwrap();
            assert_eq!(rec.value, value);
            assert_eq!(rec.comment, "c");
        }
    }

    #[test]
    fn continuation_marker_detection() {
        assert!(is_continued("'first part &'"));
        assert!(is_continued("'first part &  '"));
        assert!(!is_continued("'plain value'"));
        assert!(!is_continued("   "));
    }

    #[test]
    fn keyword_classes() {
        assert_eq!(key_class("SIMPLE"), KeyClass::Structural);
        assert_eq!(key_class("NAXIS2"), KeyClass::Structural);
        assert_eq!(key_class("TTYPE12"), KeyClass::Structural);
        assert_eq!(key_class("ZNAXIS1"), KeyClass::Compression);
        assert_eq!(key_class("COMMENT"), KeyClass::Comment);
        assert_eq!(key_class("CONTINUE"), KeyClass::Continuation);
        assert_eq!(key_class("OBSERVER"), KeyClass::User);
        assert_eq!(key_class("T1"), KeyClass::User);
    }
}
