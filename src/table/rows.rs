//! # Row Cursor
//!
//! `Rows` iterates a half-open row range of one table. The state machine
//! is BeforeFirst → (next → true)* → Exhausted, with an orthogonal Closed
//! state reachable from anywhere through `close` and entered
//! automatically when `next` first returns false.
//!
//! ```ignore
//! let mut rows = table.read(&mut engine, 0, table.num_rows());
//! while rows.next() {
//!     let mut dest = [CellValue::Long(0), CellValue::Double(0.0)];
//!     rows.scan(&mut dest)?;
//! }
//! if let Some(err) = rows.err() { ... }
//! ```
//!
//! A column-read failure is recorded as the cursor's sticky first error
//! and returned by the failing call; iteration itself keeps advancing, so
//! both "check every call" and "iterate everything, check once at the
//! end" callers are supported.
//!
//! Scanned-out values are copies. Mutating a value obtained from `scan`
//! never mutates the column's cached slot, and vice versa.

use crate::engine::FileEngine;
use crate::error::Error;
use crate::table::Table;
use crate::types::CellValue;
use eyre::{bail, Result};
use hashbrown::HashMap;
use std::any::TypeId;

/// Binds a record type's fields to column names for [`Rows::scan_struct`].
///
/// `columns` lists the column name bound to each field, in field order;
/// `store` receives the decoded value for one field. The field-to-column
/// index map is built once per concrete type and cached by type identity
/// inside the cursor.
pub trait ScanRecord: 'static {
    /// Column name bound to each scannable field, in field order.
    fn columns(&self) -> &'static [&'static str];

    /// Stores the decoded value of field `field`.
    fn store(&mut self, field: usize, value: CellValue) -> Result<()>;
}

/// Forward-only cursor over a table's row range.
///
/// Holds a snapshot of `[begin, end)` taken at creation; rows appended
/// while the cursor is live are not observed.
pub struct Rows<'a, E: FileEngine + ?Sized> {
    table: Option<&'a mut Table>,
    engine: &'a mut E,
    active: Vec<usize>,
    begin: i64,
    end: i64,
    step: i64,
    cur: i64,
    err: Option<eyre::Report>,
    field_maps: HashMap<TypeId, Vec<(usize, usize)>>,
}

impl<'a, E: FileEngine + ?Sized> Rows<'a, E> {
    pub(crate) fn new(
        table: &'a mut Table,
        engine: &'a mut E,
        active: Vec<usize>,
        begin: u64,
        end: u64,
    ) -> Rows<'a, E> {
        let step = 1i64;
        Rows {
            table: Some(table),
            engine,
            active,
            begin: begin as i64,
            end: end as i64,
            step,
            cur: begin as i64 - step,
            err: None,
            field_maps: HashMap::new(),
        }
    }

    /// Advances to the next row. Returns false once the range is
    /// exhausted or the cursor is closed; the first false auto-closes the
    /// cursor, leaving any sticky error intact.
    pub fn next(&mut self) -> bool {
        if self.table.is_none() {
            return false;
        }
        self.cur += self.step;
        if self.cur < self.end {
            true
        } else {
            self.close();
            false
        }
    }

    /// Closes the cursor, releasing the table back-reference. Idempotent;
    /// `err` stays valid afterwards.
    pub fn close(&mut self) {
        self.table = None;
    }

    /// Returns the sticky error recorded by the first failing scan, if
    /// any. Valid after close.
    pub fn err(&self) -> Option<&eyre::Report> {
        self.err.as_ref()
    }

    /// Number of active columns a positional scan must match.
    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    /// Records the first failure as the sticky error and hands the
    /// original back to the caller.
    fn stick(&mut self, err: eyre::Report) -> eyre::Report {
        if self.err.is_none() {
            self.err = Some(eyre::eyre!("{err:#}"));
        }
        err
    }

    fn position(&self) -> Result<u64> {
        if self.table.is_none() {
            bail!("row cursor is closed");
        }
        if self.cur < self.begin || self.cur >= self.end {
            bail!("scan called outside iteration (call next first)");
        }
        Ok(self.cur as u64)
    }

    fn read_cell(&mut self, icol: usize, row: u64) -> Result<CellValue> {
        // table and engine are disjoint borrows of self
        let table = self.table.as_deref_mut().expect("checked by position");
        table.col_mut(icol).read(&*self.engine, icol, row)?;
        Ok(table.col(icol).value.clone())
    }

    /// Scans the current row.
    ///
    /// With an empty `dest`, every active column's cell is read into the
    /// column's own current-value slot and nothing is returned to the
    /// caller. Otherwise the scan is positional: `dest` must hold exactly
    /// one target per active column or the call fails with an arity error
    /// before any target is written.
    pub fn scan(&mut self, dest: &mut [CellValue]) -> Result<()> {
        let row = self.position()?;
        let active = self.active.clone();

        if dest.is_empty() {
            for icol in active {
                if let Err(e) = self.read_cell(icol, row) {
                    return Err(self.stick(e));
                }
            }
            return Ok(());
        }

        if dest.len() != active.len() {
            let e = Error::ArityMismatch {
                got: dest.len(),
                expected: active.len(),
            }
            .into();
            return Err(self.stick(e));
        }

        for (slot, icol) in dest.iter_mut().zip(active) {
            match self.read_cell(icol, row) {
                Ok(value) => *slot = value,
                Err(e) => return Err(self.stick(e)),
            }
        }
        Ok(())
    }

    /// Scans the current row into a map keyed by column name.
    ///
    /// A pre-populated map selects columns by its keys (keys naming no
    /// column are skipped); an empty map receives every active column.
    pub fn scan_map(&mut self, dest: &mut HashMap<String, CellValue>) -> Result<()> {
        let row = self.position()?;
        let table = self.table.as_deref_mut().expect("checked by position");

        let icols: Vec<usize> = if dest.is_empty() {
            self.active.clone()
        } else {
            dest.keys().filter_map(|k| table.index(k)).collect()
        };

        for icol in icols {
            match self.read_cell(icol, row) {
                Ok(value) => {
                    let table = self.table.as_deref().expect("open");
                    dest.insert(table.col(icol).name.clone(), value);
                }
                Err(e) => return Err(self.stick(e)),
            }
        }
        Ok(())
    }

    /// Scans the current row into a record type implementing
    /// [`ScanRecord`]. Fields bound to no column are skipped.
    pub fn scan_struct<T: ScanRecord>(&mut self, dest: &mut T) -> Result<()> {
        let row = self.position()?;

        let tid = TypeId::of::<T>();
        if !self.field_maps.contains_key(&tid) {
            let table = self.table.as_deref().expect("checked by position");
            let map: Vec<(usize, usize)> = dest
                .columns()
                .iter()
                .enumerate()
                .filter_map(|(field, name)| table.index(name).map(|icol| (field, icol)))
                .collect();
            self.field_maps.insert(tid, map);
        }

        let map = self.field_maps[&tid].clone();
        for (field, icol) in map {
            match self.read_cell(icol, row) {
                Ok(value) => {
                    if let Err(e) = dest.store(field, value) {
                        return Err(self.stick(e));
                    }
                }
                Err(e) => return Err(self.stick(e)),
            }
        }
        Ok(())
    }
}
