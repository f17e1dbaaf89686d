//! # Column Cell Access
//!
//! A `Column` carries the per-column schema resolved from the table
//! header, plus a typed current-value slot. Reading or writing one cell
//! selects one of four distinct physical paths (scalar, fixed array,
//! variable-length array, text), driven solely by the type code sign, the
//! repeat count and the primitive kind. The native value carries no
//! persistent link to the schema, so the shape binding is re-validated on
//! every access; selecting the wrong path would corrupt or truncate data,
//! which is the central correctness risk of this module.

use crate::engine::FileEngine;
use crate::error::Error;
use crate::types::{CellValue, ColumnType, TypeKind};
use eyre::{Result, WrapErr};
use smallvec::SmallVec;

/// Per-column schema and current value.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name (TTYPE).
    pub name: String,
    /// Format token (TFORM); inferred from `value` when left empty at
    /// table creation.
    pub form: String,
    /// Physical unit (TUNIT).
    pub unit: String,
    /// Null marker (TNULL).
    pub null: String,
    /// Linear scale factor (TSCAL).
    pub bscale: f64,
    /// Zero point (TZERO).
    pub bzero: f64,
    /// Display hint (TDISP).
    pub display: String,
    /// Multidimensional cell layout (TDIM).
    pub dim: SmallVec<[i64; 4]>,
    /// Starting byte offset within a row (TBCOL, character tables).
    pub start: i64,
    /// Resolved storage type.
    pub ty: ColumnType,
    /// Elements per cell for fixed columns.
    pub repeat: usize,
    /// Element width in bytes; string length for text columns.
    pub width: usize,
    /// Value at the current row.
    pub value: CellValue,
}

impl Column {
    /// Creates a column definition from a name and a prototype value; the
    /// format is inferred from the prototype when the table is created.
    pub fn new(name: impl Into<String>, prototype: CellValue) -> Column {
        let kind = prototype.kind();
        Column {
            name: name.into(),
            form: String::new(),
            unit: String::new(),
            null: String::new(),
            bscale: 1.0,
            bzero: 0.0,
            display: String::new(),
            dim: SmallVec::new(),
            start: 0,
            ty: ColumnType {
                kind,
                variable: prototype.is_array(),
            },
            repeat: prototype.element_count().max(1),
            width: kind.element_size(),
            value: prototype,
        }
    }

    /// Attaches a unit to the definition.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Column {
        self.unit = unit.into();
        self
    }

    /// Attaches an explicit format token to the definition.
    pub fn with_form(mut self, form: impl Into<String>) -> Column {
        self.form = form.into();
        self
    }

    /// Element count transferred for one cell read.
    fn read_count<E: FileEngine + ?Sized>(
        &self,
        engine: &E,
        icol: usize,
        irow: u64,
    ) -> Result<usize> {
        if self.ty.variable {
            // per-row element count lives in the side descriptor, never
            // in the schema
            let (len, _offset) = engine
                .variable_length_descriptor(icol, irow)
                .wrap_err_with(|| {
                    format!(
                        "reading length descriptor of column {:?} row {}",
                        self.name, irow
                    )
                })?;
            Ok(len as usize)
        } else if self.ty.kind == TypeKind::Text {
            Ok(self.repeat.max(self.width).max(1))
        } else {
            Ok(self.repeat.max(1))
        }
    }

    /// Whether cells of this column decode into sequence values.
    fn reads_as_array(&self) -> bool {
        self.ty.variable || (self.repeat > 1 && self.ty.kind != TypeKind::Text)
    }

    /// Reads the cell at `irow`, storing the decoded value in the
    /// current-value slot.
    pub fn read<E: FileEngine + ?Sized>(
        &mut self,
        engine: &E,
        icol: usize,
        irow: u64,
    ) -> Result<()> {
        let count = self.read_count(engine, icol, irow)?;
        let raw = engine
            .decode_cell(self.ty, icol, irow, count)
            .wrap_err_with(|| format!("reading column {:?} row {}", self.name, irow))?;
        self.value = CellValue::decode(self.ty.kind, self.reads_as_array(), &raw, count)
            .wrap_err_with(|| format!("decoding column {:?} row {}", self.name, irow))?;
        Ok(())
    }

    /// Validates that `value`'s native shape matches this column's schema.
    ///
    /// Fixed-array columns only accept sequences of exactly `repeat`
    /// elements; variable-length columns accept any sequence length;
    /// scalar columns accept scalars. Runs before any physical write, and
    /// row-level writers run it over the whole row first so a rejected
    /// value never leaves earlier cells committed.
    pub(crate) fn check_shape(&self, value: &CellValue) -> Result<()> {
        let mismatch = |expected: String| -> eyre::Report {
            Error::TypeMismatch {
                column: self.name.clone(),
                expected,
                actual: value.shape_name(),
            }
            .into()
        };

        let kind_ok = value.kind() == self.ty.kind
            || (self.ty.kind == TypeKind::Bit && value.kind() == TypeKind::Logical)
            || (self.ty.kind == TypeKind::LongLong && value.kind() == TypeKind::Long);
        if !kind_ok {
            return Err(mismatch(format!("{:?}", self.ty.kind)));
        }

        if self.ty.kind == TypeKind::Text {
            // variable-length text has no schema width to cap against
            return match value {
                CellValue::Text(_) if self.ty.variable => Ok(()),
                CellValue::Text(s) if s.len() <= self.width.max(self.repeat) => Ok(()),
                CellValue::Text(_) => Err(mismatch(format!("str[<= {}]", self.width.max(self.repeat)))),
                _ => Err(mismatch("str".to_string())),
            };
        }

        if self.ty.variable {
            if !value.is_array() {
                return Err(mismatch("sequence".to_string()));
            }
            return Ok(());
        }

        if self.repeat > 1 {
            if !value.is_array() || value.element_count() != self.repeat {
                return Err(mismatch(format!("{:?}[{}]", self.ty.kind, self.repeat)));
            }
            return Ok(());
        }

        if value.is_array() {
            return Err(mismatch(format!("scalar {:?}", self.ty.kind)));
        }
        Ok(())
    }

    /// Writes `value` into the cell at `irow`.
    ///
    /// The element count written is the length of the supplied value: a
    /// variable-length cell may legally grow or shrink per row, while a
    /// fixed-array cell of the wrong length fails before any physical
    /// write is issued. On success the written value is copied into the
    /// current-value slot.
    pub fn write<E: FileEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        icol: usize,
        irow: u64,
        value: &CellValue,
    ) -> Result<()> {
        self.check_shape(value)?;
        let mut raw = value.encode();
        if self.ty.kind == TypeKind::Text && !self.ty.variable {
            // text travels space-padded to the column width
            raw.resize(self.width.max(self.repeat).max(raw.len()), b' ');
        }
        engine
            .encode_cell(self.ty, icol, irow, &raw)
            .wrap_err_with(|| format!("writing column {:?} row {}", self.name, irow))?;
        self.value = value.clone();
        Ok(())
    }
}
