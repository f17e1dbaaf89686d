//! # Table Abstraction
//!
//! A `Table` is the ordered column set and row count of one table block.
//! Column schemas are resolved from the block header's per-column keyword
//! records plus the engine's raw descriptors; the same resolution path
//! runs for pre-existing and freshly created tables, so a table just
//! created behaves identically, under read, to one opened from disk.
//!
//! Row access goes through [`Rows`], a range-bounded forward cursor
//! created by [`Table::read`]. Cursors snapshot `[begin, end)` at
//! creation: rows appended while a cursor is mid-iteration are not
//! observed by it.

mod column;
mod rows;

pub use column::Column;
pub use rows::{Rows, ScanRecord};

use crate::engine::{ColumnSpec, FileEngine};
use crate::error::Error;
use crate::header::{read_header, BlockKind, Header};
use crate::types::{CellValue, ColumnType};
use eyre::{ensure, Result, WrapErr};
use smallvec::SmallVec;

/// One table block: ordered columns plus a row count.
#[derive(Debug, Clone)]
pub struct Table {
    cols: Vec<Column>,
    nrows: u64,
    block: usize,
    kind: BlockKind,
    name: String,
}

/// Parses a dimension record like `(3,4)` into its extents.
fn parse_dim(raw: &str) -> SmallVec<[i64; 4]> {
    let inner = raw
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    inner
        .split(',')
        .filter_map(|tok| tok.trim().parse::<i64>().ok())
        .collect()
}

impl Table {
    /// Opens the table described by `header`, resolving every column's
    /// schema from the per-column keyword records and the engine's raw
    /// descriptors.
    pub fn open<E: FileEngine + ?Sized>(
        engine: &mut E,
        header: &Header,
        block: usize,
    ) -> Result<Table> {
        ensure!(
            header.kind().is_table(),
            "block {} is not a table (kind {:?})",
            block,
            header.kind()
        );

        let ncols = header.get_int("TFIELDS").unwrap_or(0);
        ensure!(ncols >= 0, "negative TFIELDS in block {}", block);

        let mut cols = Vec::with_capacity(ncols as usize);
        for i in 0..ncols as usize {
            let n = i + 1;
            let info = engine
                .column_descriptor(i)
                .wrap_err_with(|| format!("resolving column {} of block {}", i, block))?;
            let ty = ColumnType::from_code(info.code)?;

            let null = header
                .get(&format!("TNULL{n}"))
                .map(|r| r.value.to_raw_token())
                .unwrap_or_default();

            cols.push(Column {
                name: header
                    .get_str(&format!("TTYPE{n}"))
                    .unwrap_or_default()
                    .to_string(),
                form: header
                    .get_str(&format!("TFORM{n}"))
                    .unwrap_or_default()
                    .to_string(),
                unit: header
                    .get_str(&format!("TUNIT{n}"))
                    .unwrap_or_default()
                    .to_string(),
                null,
                bscale: header.get_float(&format!("TSCAL{n}")).unwrap_or(1.0),
                bzero: header.get_float(&format!("TZERO{n}")).unwrap_or(0.0),
                display: header
                    .get_str(&format!("TDISP{n}"))
                    .unwrap_or_default()
                    .to_string(),
                dim: header
                    .get_str(&format!("TDIM{n}"))
                    .map(parse_dim)
                    .unwrap_or_default(),
                start: header.get_int(&format!("TBCOL{n}")).unwrap_or(0),
                ty,
                repeat: info.repeat,
                width: info.width,
                value: CellValue::default_for(ty, info.repeat, info.width),
            });
        }

        Ok(Table {
            cols,
            nrows: engine.row_count()?,
            block,
            kind: header.kind(),
            name: header.get_str("EXTNAME").unwrap_or_default().to_string(),
        })
    }

    /// Creates a new table block from column definitions and opens it.
    ///
    /// Columns without an explicit format get one inferred from their
    /// prototype value. The fresh block is re-read through the regular
    /// header/open path on purpose: creation must not produce a table
    /// that behaves differently from one opened from disk.
    pub fn create<E: FileEngine + ?Sized>(
        engine: &mut E,
        cols: &[Column],
        kind: BlockKind,
    ) -> Result<Table> {
        ensure!(
            !engine.read_only(),
            "cannot create a table in a read-only container"
        );
        ensure!(!cols.is_empty(), "a table needs at least one column");

        let mut specs = Vec::with_capacity(cols.len());
        for col in cols {
            let form = if col.form.is_empty() {
                col.value.infer_form(kind)?
            } else {
                col.form.clone()
            };
            specs.push(ColumnSpec {
                name: col.name.clone(),
                form,
                unit: col.unit.clone(),
            });
        }

        let block = engine.create_table_block(&specs, kind)?;
        let header = read_header(engine, block)?;
        Table::open(engine, &header, block)
    }

    /// Returns the position of the first column named `name`.
    ///
    /// Duplicate column names are legal; first match wins, the rest are
    /// reachable positionally.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.name == name)
    }

    /// Returns column `i`.
    pub fn col(&self, i: usize) -> &Column {
        &self.cols[i]
    }

    pub(crate) fn col_mut(&mut self, i: usize) -> &mut Column {
        &mut self.cols[i]
    }

    pub fn cols(&self) -> &[Column] {
        &self.cols
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn num_rows(&self) -> u64 {
        self.nrows
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Table name, from the EXTNAME record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opens a cursor over rows `[begin, end)` with every column active.
    ///
    /// The range is clamped to the current row count; the clamped bounds
    /// are the cursor's snapshot.
    pub fn read<'a, E: FileEngine + ?Sized>(
        &'a mut self,
        engine: &'a mut E,
        begin: u64,
        end: u64,
    ) -> Rows<'a, E> {
        let active = (0..self.cols.len()).collect();
        self.cursor(engine, active, begin, end)
    }

    /// Opens a cursor restricted to the named columns.
    pub fn read_columns<'a, E: FileEngine + ?Sized>(
        &'a mut self,
        engine: &'a mut E,
        names: &[&str],
        begin: u64,
        end: u64,
    ) -> Result<Rows<'a, E>> {
        let mut active = Vec::with_capacity(names.len());
        for name in names {
            let icol = self
                .index(name)
                .ok_or_else(|| eyre::eyre!("no column {:?} in table {:?}", name, self.name))?;
            active.push(icol);
        }
        Ok(self.cursor(engine, active, begin, end))
    }

    fn cursor<'a, E: FileEngine + ?Sized>(
        &'a mut self,
        engine: &'a mut E,
        active: Vec<usize>,
        begin: u64,
        end: u64,
    ) -> Rows<'a, E> {
        let end = end.min(self.nrows);
        let begin = begin.min(end);
        Rows::new(self, engine, active, begin, end)
    }

    /// Writes one cell.
    pub fn write_cell<E: FileEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        icol: usize,
        irow: u64,
        value: &CellValue,
    ) -> Result<()> {
        ensure!(
            icol < self.cols.len(),
            "column index {} out of range ({} columns)",
            icol,
            self.cols.len()
        );
        self.cols[icol].write(engine, icol, irow, value)?;
        self.nrows = engine.row_count()?;
        Ok(())
    }

    /// Appends one row; `values` must supply every column in order.
    ///
    /// Every value's shape is validated against its column before any
    /// physical write is issued, so a rejected row leaves no cell
    /// committed and the row count unchanged. The row count is
    /// re-synchronized from the engine after the write, so it is
    /// authoritative once this returns.
    pub fn append<E: FileEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        values: &[CellValue],
    ) -> Result<()> {
        if values.len() != self.cols.len() {
            return Err(Error::ArityMismatch {
                got: values.len(),
                expected: self.cols.len(),
            }
            .into());
        }
        for (icol, value) in values.iter().enumerate() {
            self.cols[icol].check_shape(value)?;
        }
        let irow = self.nrows;
        for (icol, value) in values.iter().enumerate() {
            self.cols[icol].write(engine, icol, irow, value)?;
        }
        self.nrows = engine.row_count()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_record_parsing() {
        assert_eq!(parse_dim("(3,4)").as_slice(), &[3, 4]);
        assert_eq!(parse_dim(" (128) ").as_slice(), &[128]);
        assert!(parse_dim("()").is_empty());
    }
}
