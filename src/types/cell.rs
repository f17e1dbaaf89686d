//! # Native Cell Values
//!
//! `CellValue` is the closed tagged-variant representation of one table
//! cell: a scalar or a sequence of one primitive kind. The original
//! implementation dispatched on dynamic runtime types once per read, once
//! per write and once per inference; here a single enum drives all three
//! through plain `match` tables, so adding a primitive kind is a one-place
//! change.
//!
//! ## Shapes
//!
//! | Shape | Variants | Column schema |
//! |-------|----------|---------------|
//! | scalar | `Logical`, `Byte`, …, `DblComplex`, `Text` | `repeat <= 1`, positive code |
//! | fixed sequence | `Logicals`, `Bytes`, … | `repeat > 1`, positive code |
//! | growable sequence | same vector variants | negative code, per-row length |
//!
//! Fixed and growable sequences share vector variants; the distinction is
//! carried by the column's type code sign and enforced at write time.
//!
//! ## Wire Codec
//!
//! `decode`/`encode` translate between variants and the raw little-endian
//! element buffers exchanged with the file engine. Logical elements travel
//! as `'T'`/`'F'` bytes, not as raw bit patterns. Complex elements are
//! ordered pairs of same-width floats. Text is space-padded on the wire and
//! right-trimmed on decode. Bit columns decode into logical sequences of
//! 0/1 elements.

use crate::error::Error;
use crate::header::BlockKind;
use crate::types::code::{self, ColumnType, TypeKind};
use eyre::{ensure, Result};

/// One table cell in native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Logical(bool),
    Logicals(Vec<bool>),
    Byte(u8),
    Bytes(Vec<u8>),
    SByte(i8),
    SBytes(Vec<i8>),
    Short(i16),
    Shorts(Vec<i16>),
    UShort(u16),
    UShorts(Vec<u16>),
    Int(i32),
    Ints(Vec<i32>),
    UInt(u32),
    UInts(Vec<u32>),
    Long(i64),
    Longs(Vec<i64>),
    ULong(u64),
    ULongs(Vec<u64>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
    Complex([f32; 2]),
    Complexes(Vec<[f32; 2]>),
    DblComplex([f64; 2]),
    DblComplexes(Vec<[f64; 2]>),
    Text(String),
}

impl CellValue {
    /// Allocates the zero-valued slot matching `(type, repeat)`.
    ///
    /// Scalar for `repeat <= 1` on a fixed column, a fixed sequence of
    /// `repeat` zeros otherwise, an empty growable sequence for
    /// variable-length columns. This is how a freshly-opened table fills
    /// each column's current-value slot before any row is read.
    pub fn default_for(ty: ColumnType, repeat: usize, width: usize) -> CellValue {
        use TypeKind::*;
        if ty.kind == Text {
            return CellValue::Text(" ".repeat(width.max(1)));
        }
        if ty.variable {
            return match ty.kind {
                Bit | Logical => CellValue::Logicals(Vec::new()),
                Byte => CellValue::Bytes(Vec::new()),
                SByte => CellValue::SBytes(Vec::new()),
                Short => CellValue::Shorts(Vec::new()),
                UShort => CellValue::UShorts(Vec::new()),
                Int => CellValue::Ints(Vec::new()),
                UInt => CellValue::UInts(Vec::new()),
                Long | LongLong => CellValue::Longs(Vec::new()),
                ULong => CellValue::ULongs(Vec::new()),
                Float => CellValue::Floats(Vec::new()),
                Double => CellValue::Doubles(Vec::new()),
                Complex => CellValue::Complexes(Vec::new()),
                DblComplex => CellValue::DblComplexes(Vec::new()),
                Text => unreachable!(),
            };
        }
        if repeat > 1 {
            return match ty.kind {
                Bit | Logical => CellValue::Logicals(vec![false; repeat]),
                Byte => CellValue::Bytes(vec![0; repeat]),
                SByte => CellValue::SBytes(vec![0; repeat]),
                Short => CellValue::Shorts(vec![0; repeat]),
                UShort => CellValue::UShorts(vec![0; repeat]),
                Int => CellValue::Ints(vec![0; repeat]),
                UInt => CellValue::UInts(vec![0; repeat]),
                Long | LongLong => CellValue::Longs(vec![0; repeat]),
                ULong => CellValue::ULongs(vec![0; repeat]),
                Float => CellValue::Floats(vec![0.0; repeat]),
                Double => CellValue::Doubles(vec![0.0; repeat]),
                Complex => CellValue::Complexes(vec![[0.0; 2]; repeat]),
                DblComplex => CellValue::DblComplexes(vec![[0.0; 2]; repeat]),
                Text => unreachable!(),
            };
        }
        match ty.kind {
            Bit | Logical => CellValue::Logical(false),
            Byte => CellValue::Byte(0),
            SByte => CellValue::SByte(0),
            Short => CellValue::Short(0),
            UShort => CellValue::UShort(0),
            Int => CellValue::Int(0),
            UInt => CellValue::UInt(0),
            Long | LongLong => CellValue::Long(0),
            ULong => CellValue::ULong(0),
            Float => CellValue::Float(0.0),
            Double => CellValue::Double(0.0),
            Complex => CellValue::Complex([0.0; 2]),
            DblComplex => CellValue::DblComplex([0.0; 2]),
            Text => unreachable!(),
        }
    }

    /// Returns the primitive kind this value stores.
    pub fn kind(&self) -> TypeKind {
        use CellValue::*;
        match self {
            Logical(_) | Logicals(_) => TypeKind::Logical,
            Byte(_) | Bytes(_) => TypeKind::Byte,
            SByte(_) | SBytes(_) => TypeKind::SByte,
            Short(_) | Shorts(_) => TypeKind::Short,
            UShort(_) | UShorts(_) => TypeKind::UShort,
            Int(_) | Ints(_) => TypeKind::Int,
            UInt(_) | UInts(_) => TypeKind::UInt,
            Long(_) | Longs(_) => TypeKind::Long,
            ULong(_) | ULongs(_) => TypeKind::ULong,
            Float(_) | Floats(_) => TypeKind::Float,
            Double(_) | Doubles(_) => TypeKind::Double,
            Complex(_) | Complexes(_) => TypeKind::Complex,
            DblComplex(_) | DblComplexes(_) => TypeKind::DblComplex,
            Text(_) => TypeKind::Text,
        }
    }

    /// Returns true for sequence-shaped values (fixed or growable).
    pub fn is_array(&self) -> bool {
        use CellValue::*;
        matches!(
            self,
            Logicals(_)
                | Bytes(_)
                | SBytes(_)
                | Shorts(_)
                | UShorts(_)
                | Ints(_)
                | UInts(_)
                | Longs(_)
                | ULongs(_)
                | Floats(_)
                | Doubles(_)
                | Complexes(_)
                | DblComplexes(_)
        )
    }

    /// Returns the element count: sequence length, string length in
    /// characters, or 1 for scalars.
    pub fn element_count(&self) -> usize {
        use CellValue::*;
        match self {
            Logicals(v) => v.len(),
            Bytes(v) => v.len(),
            SBytes(v) => v.len(),
            Shorts(v) => v.len(),
            UShorts(v) => v.len(),
            Ints(v) => v.len(),
            UInts(v) => v.len(),
            Longs(v) => v.len(),
            ULongs(v) => v.len(),
            Floats(v) => v.len(),
            Doubles(v) => v.len(),
            Complexes(v) => v.len(),
            DblComplexes(v) => v.len(),
            Text(s) => s.len(),
            _ => 1,
        }
    }

    /// Human-readable shape for error messages, e.g. `f32[4]` or `i64`.
    pub fn shape_name(&self) -> String {
        let base = match self.kind() {
            TypeKind::Bit => "bit",
            TypeKind::Logical => "bool",
            TypeKind::Byte => "u8",
            TypeKind::SByte => "i8",
            TypeKind::Short => "i16",
            TypeKind::UShort => "u16",
            TypeKind::Int => "i32",
            TypeKind::UInt => "u32",
            TypeKind::Long | TypeKind::LongLong => "i64",
            TypeKind::ULong => "u64",
            TypeKind::Float => "f32",
            TypeKind::Double => "f64",
            TypeKind::Complex => "c64",
            TypeKind::DblComplex => "c128",
            TypeKind::Text => "str",
        };
        if self.is_array() {
            format!("{}[{}]", base, self.element_count())
        } else {
            base.to_string()
        }
    }

    /// Decodes `count` elements of `kind` from a little-endian engine
    /// buffer into a scalar (`as_array == false`) or sequence value.
    pub fn decode(kind: TypeKind, as_array: bool, buf: &[u8], count: usize) -> Result<CellValue> {
        let esize = kind.element_size();
        ensure!(
            buf.len() == count * esize,
            "cell buffer holds {} bytes, expected {} ({} x {} elements)",
            buf.len(),
            count * esize,
            count,
            esize
        );

        if kind == TypeKind::Text {
            let s = String::from_utf8_lossy(buf);
            return Ok(CellValue::Text(s.trim_end_matches([' ', '\0']).to_string()));
        }

        macro_rules! scalars {
            ($ty:ty, $scalar:ident, $vector:ident) => {{
                let mut out: Vec<$ty> = Vec::with_capacity(count);
                for chunk in buf.chunks_exact(esize) {
                    out.push(<$ty>::from_le_bytes(chunk.try_into().unwrap()));
                }
                if as_array {
                    CellValue::$vector(out)
                } else {
                    CellValue::$scalar(out[0])
                }
            }};
        }

        ensure!(count > 0 || as_array, "scalar cell decoded zero elements");

        let value = match kind {
            TypeKind::Bit | TypeKind::Logical => {
                let mut out = Vec::with_capacity(count);
                for b in buf {
                    out.push(*b == b'T' || *b == 1);
                }
                if as_array {
                    CellValue::Logicals(out)
                } else {
                    CellValue::Logical(out[0])
                }
            }
            TypeKind::Byte => scalars!(u8, Byte, Bytes),
            TypeKind::SByte => scalars!(i8, SByte, SBytes),
            TypeKind::Short => scalars!(i16, Short, Shorts),
            TypeKind::UShort => scalars!(u16, UShort, UShorts),
            TypeKind::Int => scalars!(i32, Int, Ints),
            TypeKind::UInt => scalars!(u32, UInt, UInts),
            TypeKind::Long | TypeKind::LongLong => scalars!(i64, Long, Longs),
            TypeKind::ULong => scalars!(u64, ULong, ULongs),
            TypeKind::Float => scalars!(f32, Float, Floats),
            TypeKind::Double => scalars!(f64, Double, Doubles),
            TypeKind::Complex => {
                let mut out: Vec<[f32; 2]> = Vec::with_capacity(count);
                for chunk in buf.chunks_exact(8) {
                    out.push([
                        f32::from_le_bytes(chunk[0..4].try_into().unwrap()),
                        f32::from_le_bytes(chunk[4..8].try_into().unwrap()),
                    ]);
                }
                if as_array {
                    CellValue::Complexes(out)
                } else {
                    CellValue::Complex(out[0])
                }
            }
            TypeKind::DblComplex => {
                let mut out: Vec<[f64; 2]> = Vec::with_capacity(count);
                for chunk in buf.chunks_exact(16) {
                    out.push([
                        f64::from_le_bytes(chunk[0..8].try_into().unwrap()),
                        f64::from_le_bytes(chunk[8..16].try_into().unwrap()),
                    ]);
                }
                if as_array {
                    CellValue::DblComplexes(out)
                } else {
                    CellValue::DblComplex(out[0])
                }
            }
            TypeKind::Text => unreachable!(),
        };
        Ok(value)
    }

    /// Encodes this value into a little-endian engine buffer.
    pub fn encode(&self) -> Vec<u8> {
        use CellValue::*;

        fn pack<T, const N: usize>(items: &[T], f: impl Fn(&T) -> [u8; N]) -> Vec<u8> {
            let mut out = Vec::with_capacity(items.len() * N);
            for item in items {
                out.extend_from_slice(&f(item));
            }
            out
        }

        match self {
            Logical(b) => vec![if *b { b'T' } else { b'F' }],
            Logicals(v) => v.iter().map(|b| if *b { b'T' } else { b'F' }).collect(),
            Byte(v) => vec![*v],
            Bytes(v) => v.clone(),
            SByte(v) => vec![*v as u8],
            SBytes(v) => v.iter().map(|x| *x as u8).collect(),
            Short(v) => v.to_le_bytes().to_vec(),
            Shorts(v) => pack(v, |x| x.to_le_bytes()),
            UShort(v) => v.to_le_bytes().to_vec(),
            UShorts(v) => pack(v, |x| x.to_le_bytes()),
            Int(v) => v.to_le_bytes().to_vec(),
            Ints(v) => pack(v, |x| x.to_le_bytes()),
            UInt(v) => v.to_le_bytes().to_vec(),
            UInts(v) => pack(v, |x| x.to_le_bytes()),
            Long(v) => v.to_le_bytes().to_vec(),
            Longs(v) => pack(v, |x| x.to_le_bytes()),
            ULong(v) => v.to_le_bytes().to_vec(),
            ULongs(v) => pack(v, |x| x.to_le_bytes()),
            Float(v) => v.to_le_bytes().to_vec(),
            Floats(v) => pack(v, |x| x.to_le_bytes()),
            Double(v) => v.to_le_bytes().to_vec(),
            Doubles(v) => pack(v, |x| x.to_le_bytes()),
            Complex(c) => {
                let mut out = c[0].to_le_bytes().to_vec();
                out.extend_from_slice(&c[1].to_le_bytes());
                out
            }
            Complexes(v) => {
                let mut out = Vec::with_capacity(v.len() * 8);
                for c in v {
                    out.extend_from_slice(&c[0].to_le_bytes());
                    out.extend_from_slice(&c[1].to_le_bytes());
                }
                out
            }
            DblComplex(c) => {
                let mut out = c[0].to_le_bytes().to_vec();
                out.extend_from_slice(&c[1].to_le_bytes());
                out
            }
            DblComplexes(v) => {
                let mut out = Vec::with_capacity(v.len() * 16);
                for c in v {
                    out.extend_from_slice(&c[0].to_le_bytes());
                    out.extend_from_slice(&c[1].to_le_bytes());
                }
                out
            }
            Text(s) => s.as_bytes().to_vec(),
        }
    }

    /// Infers the minimal format descriptor for this native value when a
    /// new column is defined without an explicit format.
    ///
    /// Sequence values infer variable-length storage; fixed-repeat columns
    /// require an explicit format. Character-table floats are emitted with
    /// enough significant digits to survive a write-read cycle.
    pub fn infer_form(&self, block: BlockKind) -> Result<String> {
        let unsupported = || -> eyre::Report {
            Error::UnsupportedColumnType {
                shape: self.shape_name(),
                kind: match block {
                    BlockKind::Image => "image",
                    BlockKind::AsciiTable => "character-table",
                    BlockKind::BinaryTable => "binary-table",
                },
            }
            .into()
        };

        match block {
            BlockKind::BinaryTable => {
                if let CellValue::Text(s) = self {
                    return Ok(code::binary_form(TypeKind::Text, s.len(), false));
                }
                Ok(code::binary_form(self.kind(), 1, self.is_array()))
            }
            BlockKind::AsciiTable => {
                if self.is_array() {
                    return Err(unsupported());
                }
                // integer field widths sized to the widest value of the kind
                match self {
                    CellValue::Byte(_) | CellValue::SByte(_) => code::ascii_form(self.kind(), 4),
                    CellValue::Short(_) | CellValue::UShort(_) => code::ascii_form(self.kind(), 6),
                    CellValue::Int(_) | CellValue::UInt(_) => code::ascii_form(self.kind(), 11),
                    CellValue::Long(_) | CellValue::ULong(_) => code::ascii_form(self.kind(), 21),
                    CellValue::Float(_) | CellValue::Double(_) => code::ascii_form(self.kind(), 0),
                    CellValue::Text(s) => code::ascii_form(TypeKind::Text, s.len()),
                    _ => Err(unsupported()),
                }
            }
            BlockKind::Image => Err(unsupported()),
        }
    }

    /// Returns the value as a signed 64-bit integer, when it is one of the
    /// scalar integer kinds.
    pub fn as_i64(&self) -> Option<i64> {
        use CellValue::*;
        match self {
            Byte(v) => Some(*v as i64),
            SByte(v) => Some(*v as i64),
            Short(v) => Some(*v as i64),
            UShort(v) => Some(*v as i64),
            Int(v) => Some(*v as i64),
            UInt(v) => Some(*v as i64),
            Long(v) => Some(*v),
            ULong(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as a 64-bit float, when it is a scalar float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v as f64),
            CellValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, when it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}
