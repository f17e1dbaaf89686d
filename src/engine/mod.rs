//! # File Engine Contract
//!
//! The core never touches bytes on disk. Block seeking, record-offset
//! bookkeeping, padding, checksums and pixel codecs all live behind this
//! narrow trait, implemented by whatever owns the physical container. The
//! core calls it synchronously; a stalled engine call stalls the core, and
//! all physical operations on one container must be serialized externally
//! if several threads share it.
//!
//! ## Buffer Convention
//!
//! `decode_cell`/`encode_cell` exchange raw element buffers: `count`
//! elements of the column's primitive kind, little-endian, with logical
//! elements as `'T'`/`'F'` bytes. The physical on-disk representation is
//! the engine's concern.

pub mod memory;

pub use memory::MemoryEngine;

use crate::header::BlockKind;
use crate::types::ColumnType;
use eyre::Result;

/// Raw column descriptor reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Signed column type code (negative = variable length).
    pub code: i64,
    /// Elements per cell for fixed columns; string length for text.
    pub repeat: usize,
    /// Element width in bytes (string length for text columns).
    pub width: usize,
}

/// Column creation triple handed to `create_table_block`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub form: String,
    pub unit: String,
}

/// The narrow interface the core consumes from the physical layer.
pub trait FileEngine {
    /// Makes block `index` (0-based) current and reports its kind.
    fn seek_block(&mut self, index: usize) -> Result<BlockKind>;

    /// Number of keyword slots in the current block's header.
    fn keyword_count(&self) -> Result<usize>;

    /// Reads keyword slot `index` (1-based): `(name, raw value, comment)`.
    fn read_keyword_slot(&self, index: usize) -> Result<(String, String, String)>;

    /// Side channel joining `&`-continued long string values by keyword.
    fn read_long_value_string(&self, name: &str) -> Result<String>;

    /// Element width and dimensions of the current block, resolved through
    /// the structural keywords (compressed images report their true
    /// geometry here, not under the nominal keyword names).
    fn block_geometry(&self) -> Result<(i64, Vec<i64>)>;

    /// Raw descriptor of column `col` (0-based) in the current block.
    fn column_descriptor(&self, col: usize) -> Result<ColumnInfo>;

    /// Per-row `(element count, heap offset)` of a variable-length cell.
    fn variable_length_descriptor(&self, col: usize, row: u64) -> Result<(u64, u64)>;

    /// Decodes `count` elements of one cell into a raw buffer.
    fn decode_cell(&self, ty: ColumnType, col: usize, row: u64, count: usize) -> Result<Vec<u8>>;

    /// Encodes a raw buffer into one cell.
    fn encode_cell(&mut self, ty: ColumnType, col: usize, row: u64, data: &[u8]) -> Result<()>;

    /// Number of rows in the current block.
    fn row_count(&self) -> Result<u64>;

    /// Materializes a new table block and makes it current; returns its
    /// block index.
    fn create_table_block(&mut self, cols: &[ColumnSpec], kind: BlockKind) -> Result<usize>;

    /// Whether the container was opened read-only.
    fn read_only(&self) -> bool;
}
