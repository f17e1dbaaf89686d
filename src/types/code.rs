//! # Column Type Codes
//!
//! The container identifies a column's storage type with a signed integer
//! code: the magnitude selects the primitive kind, the sign selects the
//! array-length discipline (positive = fixed repeat, negative = per-row
//! variable length). This module provides the `TypeKind` magnitude enum,
//! the `ColumnType` sign wrapper, and the bidirectional mapping between
//! codes and the textual format tokens stored in table headers.
//!
//! ## Code Magnitudes
//!
//! | Kind | Code | Element size | Binary letter |
//! |------|------|--------------|---------------|
//! | Bit | 1 | 1 | X |
//! | Byte | 11 | 1 | B |
//! | SByte | 12 | 1 | S |
//! | Logical | 14 | 1 | L |
//! | Text | 16 | 1 | A |
//! | UShort | 20 | 2 | U |
//! | Short | 21 | 2 | I |
//! | UInt | 30 | 4 | V |
//! | Int | 31 | 4 | J |
//! | ULong | 40 | 8 | V |
//! | Long | 41 | 8 | K |
//! | Float | 42 | 4 | E |
//! | LongLong | 81 | 8 | K |
//! | Double | 82 | 8 | D |
//! | Complex | 83 | 8 | C |
//! | DblComplex | 163 | 16 | M |
//!
//! ## Format Token Grammars
//!
//! Binary tables: `[repeat][P|Q]<letter>[(max)]`, e.g. `4E`, `QD`, `1PB(32)`.
//! Character tables: `<letter>[w[.d]]`, e.g. `I11`, `D26.17`, `A20`.
//!
//! Element buffers exchanged with the file engine are little-endian;
//! `element_size` is the per-element byte count in those buffers.

use crate::error::Error;
use eyre::Result;

/// Primitive storage kind of a column, identified by code magnitude.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bit = 1,
    Byte = 11,
    SByte = 12,
    Logical = 14,
    Text = 16,
    UShort = 20,
    Short = 21,
    UInt = 30,
    Int = 31,
    ULong = 40,
    Long = 41,
    Float = 42,
    LongLong = 81,
    Double = 82,
    Complex = 83,
    DblComplex = 163,
}

impl TypeKind {
    /// Returns the per-element byte size in engine buffers.
    pub fn element_size(&self) -> usize {
        match self {
            TypeKind::Bit | TypeKind::Byte | TypeKind::SByte | TypeKind::Logical | TypeKind::Text => 1,
            TypeKind::UShort | TypeKind::Short => 2,
            TypeKind::UInt | TypeKind::Int | TypeKind::Float => 4,
            TypeKind::ULong | TypeKind::Long | TypeKind::LongLong | TypeKind::Double => 8,
            TypeKind::Complex => 8,
            TypeKind::DblComplex => 16,
        }
    }

    /// Returns the binary-table format letter for this kind.
    pub fn binary_letter(&self) -> char {
        match self {
            TypeKind::Bit => 'X',
            TypeKind::Byte => 'B',
            TypeKind::SByte => 'S',
            TypeKind::Logical => 'L',
            TypeKind::Text => 'A',
            TypeKind::UShort => 'U',
            TypeKind::Short => 'I',
            TypeKind::UInt | TypeKind::ULong => 'V',
            TypeKind::Int => 'J',
            TypeKind::Long | TypeKind::LongLong => 'K',
            TypeKind::Float => 'E',
            TypeKind::Double => 'D',
            TypeKind::Complex => 'C',
            TypeKind::DblComplex => 'M',
        }
    }

    fn from_binary_letter(letter: char) -> Option<TypeKind> {
        Some(match letter {
            'X' => TypeKind::Bit,
            'B' => TypeKind::Byte,
            'S' => TypeKind::SByte,
            'L' => TypeKind::Logical,
            'A' => TypeKind::Text,
            'U' => TypeKind::UShort,
            'I' => TypeKind::Short,
            'V' => TypeKind::UInt,
            'J' => TypeKind::Int,
            'K' => TypeKind::LongLong,
            'E' => TypeKind::Float,
            'D' => TypeKind::Double,
            'C' => TypeKind::Complex,
            'M' => TypeKind::DblComplex,
            _ => return None,
        })
    }
}

impl TryFrom<i64> for TypeKind {
    type Error = eyre::Report;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(TypeKind::Bit),
            11 => Ok(TypeKind::Byte),
            12 => Ok(TypeKind::SByte),
            14 => Ok(TypeKind::Logical),
            16 => Ok(TypeKind::Text),
            20 => Ok(TypeKind::UShort),
            21 => Ok(TypeKind::Short),
            30 => Ok(TypeKind::UInt),
            31 => Ok(TypeKind::Int),
            40 => Ok(TypeKind::ULong),
            41 => Ok(TypeKind::Long),
            42 => Ok(TypeKind::Float),
            81 => Ok(TypeKind::LongLong),
            82 => Ok(TypeKind::Double),
            83 => Ok(TypeKind::Complex),
            163 => Ok(TypeKind::DblComplex),
            _ => Err(Error::InvalidTypeCode(value).into()),
        }
    }
}

/// A column's full storage type: primitive kind plus length discipline.
///
/// `variable == true` corresponds to a negative code; the per-row element
/// count of such a column lives in a side descriptor, not in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub kind: TypeKind,
    pub variable: bool,
}

impl ColumnType {
    /// Fixed-repeat column of the given kind.
    pub fn scalar(kind: TypeKind) -> Self {
        ColumnType {
            kind,
            variable: false,
        }
    }

    /// Variable-length column of the given kind.
    pub fn variable(kind: TypeKind) -> Self {
        ColumnType {
            kind,
            variable: true,
        }
    }

    /// Returns the signed integer code for this type.
    pub fn code(&self) -> i64 {
        let magnitude = self.kind as i64;
        if self.variable {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Resolves a signed code into a column type.
    pub fn from_code(code: i64) -> Result<Self> {
        let kind = TypeKind::try_from(code.abs())?;
        Ok(ColumnType {
            kind,
            variable: code < 0,
        })
    }
}

/// A format token resolved to its schema triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFormat {
    pub ty: ColumnType,
    pub repeat: usize,
    /// Element width in bytes; for Text this is the string length.
    pub width: usize,
}

/// Parses a binary-table format token (`4E`, `QD`, `20A`, `1PB(32)`).
pub fn parse_binary_format(form: &str) -> Result<ParsedFormat> {
    let form = form.trim();
    let bad = || Error::MalformedFormat(form.to_string());

    let digits: String = form.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &form[digits.len()..];
    let repeat: usize = if digits.is_empty() {
        1
    } else {
        digits.parse().map_err(|_| bad())?
    };

    let mut chars = rest.chars();
    let mut letter = chars.next().ok_or_else(bad)?;
    let variable = letter == 'P' || letter == 'Q';
    if variable {
        letter = chars.next().ok_or_else(bad)?;
    }
    // anything after the letter is the optional "(max)" hint, ignored here
    let kind = TypeKind::from_binary_letter(letter).ok_or_else(bad)?;

    // rA stores one string of r characters, not r strings
    let (repeat, width) = if kind == TypeKind::Text {
        (repeat, repeat)
    } else {
        (repeat, kind.element_size())
    };

    Ok(ParsedFormat {
        ty: ColumnType {
            kind,
            variable,
        },
        repeat,
        width,
    })
}

/// Parses a character-table format token (`I11`, `F8.3`, `D26.17`, `A20`).
///
/// Character tables hold one scalar per cell; floats always resolve to the
/// 64-bit kind so a full-precision write survives the read back.
pub fn parse_ascii_format(form: &str) -> Result<ParsedFormat> {
    let form = form.trim();
    let bad = || Error::MalformedFormat(form.to_string());

    let mut chars = form.chars();
    let letter = chars.next().ok_or_else(bad)?;
    let spec = chars.as_str();
    let width_digits: String = spec.chars().take_while(|c| c.is_ascii_digit()).collect();
    let width: usize = if width_digits.is_empty() {
        0
    } else {
        width_digits.parse().map_err(|_| bad())?
    };

    let (kind, width) = match letter {
        'A' => (TypeKind::Text, if width == 0 { 1 } else { width }),
        'I' => (TypeKind::Long, TypeKind::Long.element_size()),
        'F' | 'E' | 'D' => (TypeKind::Double, TypeKind::Double.element_size()),
        _ => return Err(bad().into()),
    };

    Ok(ParsedFormat {
        ty: ColumnType::scalar(kind),
        repeat: if kind == TypeKind::Text { width } else { 1 },
        width,
    })
}

/// Emits the binary-table format token for a column shape. Inverse of
/// [`parse_binary_format`] up to the implicit repeat of 1.
pub fn binary_form(kind: TypeKind, repeat: usize, variable: bool) -> String {
    if kind == TypeKind::Text {
        return format!("{}A", repeat.max(1));
    }
    let letter = kind.binary_letter();
    if variable {
        format!("Q{letter}")
    } else if repeat > 1 {
        format!("{repeat}{letter}")
    } else {
        letter.to_string()
    }
}

/// Emits the character-table format token for one scalar cell. Integer
/// kinds take the caller's field width; floats are fixed at widths that
/// survive a write-read cycle.
pub fn ascii_form(kind: TypeKind, width: usize) -> Result<String> {
    use TypeKind::*;
    Ok(match kind {
        Text => format!("A{}", width.max(1)),
        Byte | SByte | Short | UShort | Int | UInt | Long | ULong | LongLong => {
            format!("I{}", width.max(1))
        }
        Float => "E16.9".to_string(),
        Double => "D26.17".to_string(),
        _ => {
            return Err(Error::UnsupportedColumnType {
                shape: format!("{kind:?}"),
                kind: "character-table",
            }
            .into())
        }
    })
}

/// Parses a format token according to the owning block's kind.
pub fn parse_format(form: &str, kind: crate::header::BlockKind) -> Result<ParsedFormat> {
    match kind {
        crate::header::BlockKind::AsciiTable => parse_ascii_format(form),
        _ => parse_binary_format(form),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BlockKind;

    #[test]
    fn code_sign_selects_length_discipline() {
        let fixed = ColumnType::scalar(TypeKind::Float);
        assert_eq!(fixed.code(), 42);
        let var = ColumnType::variable(TypeKind::Float);
        assert_eq!(var.code(), -42);
        assert_eq!(ColumnType::from_code(-42).unwrap(), var);
        assert_eq!(ColumnType::from_code(42).unwrap(), fixed);
    }

    #[test]
    fn unknown_magnitude_is_rejected() {
        let err = ColumnType::from_code(-999).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::Error>(),
            Some(&crate::Error::InvalidTypeCode(999))
        );
    }

    #[test]
    fn binary_format_fixed_array() {
        let f = parse_binary_format("4E").unwrap();
        assert_eq!(f.ty.kind, TypeKind::Float);
        assert!(!f.ty.variable);
        assert_eq!(f.repeat, 4);
        assert_eq!(f.width, 4);
    }

    #[test]
    fn binary_format_variable_array() {
        for form in ["QD", "PD", "1PD(100)"] {
            let f = parse_binary_format(form).unwrap();
            assert_eq!(f.ty.kind, TypeKind::Double);
            assert!(f.ty.variable, "{form} should parse as variable-length");
        }
    }

    #[test]
    fn binary_format_text_repeat_is_string_length() {
        let f = parse_binary_format("20A").unwrap();
        assert_eq!(f.ty.kind, TypeKind::Text);
        assert_eq!(f.repeat, 20);
        assert_eq!(f.width, 20);
    }

    #[test]
    fn ascii_formats_resolve_to_scalars() {
        let f = parse_ascii_format("I11").unwrap();
        assert_eq!(f.ty.kind, TypeKind::Long);
        assert_eq!(f.repeat, 1);

        let f = parse_ascii_format("D26.17").unwrap();
        assert_eq!(f.ty.kind, TypeKind::Double);

        let f = parse_format("A16", BlockKind::AsciiTable).unwrap();
        assert_eq!(f.ty.kind, TypeKind::Text);
        assert_eq!(f.width, 16);
    }

    #[test]
    fn emitted_tokens_parse_back_to_the_same_shape() {
        for (kind, repeat, variable) in [
            (TypeKind::Float, 1, false),
            (TypeKind::Float, 4, false),
            (TypeKind::Double, 1, true),
            (TypeKind::Text, 20, false),
        ] {
            let form = binary_form(kind, repeat, variable);
            let parsed = parse_binary_format(&form).unwrap();
            assert_eq!(parsed.ty.variable, variable, "{form}");
            assert_eq!(parsed.repeat, repeat, "{form}");
        }

        assert_eq!(ascii_form(TypeKind::Long, 21).unwrap(), "I21");
        assert_eq!(ascii_form(TypeKind::Double, 0).unwrap(), "D26.17");
        assert!(ascii_form(TypeKind::Complex, 0).is_err());
    }

    #[test]
    fn garbage_formats_fail() {
        assert!(parse_binary_format("").is_err());
        assert!(parse_binary_format("4Z").is_err());
        assert!(parse_ascii_format("Q9").is_err());
    }
}
