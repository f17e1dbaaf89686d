//! # fitscore - Scientific Container Table Core
//!
//! fitscore is the format-level core of a FITS-style scientific data
//! container: fixed-width keyword records, ordered name-indexed headers,
//! typed table columns and a forward row cursor, all decoupled from
//! physical I/O through the [`engine::FileEngine`] trait.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fitscore::{CellValue, Column, MemoryEngine, Table};
//! use fitscore::header::BlockKind;
//!
//! let mut engine = MemoryEngine::new();
//! let cols = vec![
//!     Column::new("id", CellValue::Long(0)),
//!     Column::new("flux", CellValue::Floats(vec![0.0; 4])).with_unit("Jy"),
//! ];
//! let mut table = Table::create(&mut engine, &cols, BlockKind::BinaryTable)?;
//! table.append(&mut engine, &[
//!     CellValue::Long(1),
//!     CellValue::Floats(vec![1.0, 2.0, 3.0, 4.0]),
//! ])?;
//!
//! let mut rows = table.read(&mut engine, 0, table.num_rows());
//! while rows.next() {
//!     rows.scan(&mut [])?;
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is layered, lowest first:
//!
//! | Layer | Module | Role |
//! |-------|--------|------|
//! | Engine | [`engine`] | physical-layer contract + in-memory reference |
//! | Types | [`types`] | type codes, format grammar, typed cell values |
//! | Header | [`header`] | keyword records and the ordered header |
//! | Table | [`table`] | columns, cell access and the row cursor |
//!
//! Nothing above the engine trait knows about block padding, byte order
//! on disk or heap layout; everything below it knows nothing about
//! keyword semantics or native value types.

pub mod engine;
pub mod error;
pub mod header;
pub mod table;
pub mod types;

pub use engine::{FileEngine, MemoryEngine};
pub use error::{Error, Result};
pub use header::{Header, Record, Value};
pub use table::{Column, Rows, ScanRecord, Table};
pub use types::{CellValue, ColumnType, TypeKind};
