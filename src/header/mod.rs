//! # Header: Ordered, Name-Indexed Record Collection
//!
//! A `Header` carries every parsed keyword record of one block together
//! with block-level metadata: the block kind, element width (bitpix) and
//! the data dimensions. Records keep insertion order; a name index maps
//! keyword names to positions and is kept consistent on every append
//! (last write wins for duplicate names).
//!
//! ## Lifecycle
//!
//! A header is constructed once, when a block is opened or created, and is
//! only mutated through explicit `append`/`set` calls. `set` is
//! update-only: addressing a missing keyword is a programmer error and
//! fails loudly instead of silently creating the record.
//!
//! ## Reading
//!
//! `read_header` determines the block kind and dimensions first, through
//! the engine's structural-keyword path (compressed images store their
//! true geometry under shadow keywords, so generic record scanning cannot
//! be trusted for this), then enumerates every keyword slot and parses
//! each one. A record that fails to parse, most likely because of an
//! undefined or blank value, is skipped rather than aborting the whole
//! header. One bad keyword must not make the rest of a header unreadable;
//! the cost is that a genuinely corrupt header opens silently minus its
//! bad records.

mod record;

pub use record::{is_continued, key_class, parse_record, read_record, KeyClass, Record, Value};

use crate::engine::FileEngine;
use crate::error::Error;
use eyre::Result;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Kind of one header+data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BlockKind {
    /// N-dimensional numeric array.
    Image = 0,
    /// Fixed-column character table.
    AsciiTable = 1,
    /// Binary row/column table.
    BinaryTable = 2,
}

impl BlockKind {
    /// Returns true for either table flavor.
    pub fn is_table(&self) -> bool {
        matches!(self, BlockKind::AsciiTable | BlockKind::BinaryTable)
    }
}

impl TryFrom<i32> for BlockKind {
    type Error = eyre::Report;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(BlockKind::Image),
            1 => Ok(BlockKind::AsciiTable),
            2 => Ok(BlockKind::BinaryTable),
            _ => eyre::bail!("invalid block kind code: {}", value),
        }
    }
}

/// Parsed header of one block.
#[derive(Debug, Clone)]
pub struct Header {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    kind: BlockKind,
    bitpix: i64,
    axes: SmallVec<[i64; 4]>,
}

impl Header {
    /// Creates a header from a set of records and block metadata.
    pub fn new(
        records: impl IntoIterator<Item = Record>,
        kind: BlockKind,
        bitpix: i64,
        axes: &[i64],
    ) -> Header {
        let mut hdr = Header {
            records: Vec::new(),
            index: HashMap::new(),
            kind,
            bitpix,
            axes: SmallVec::from_slice(axes),
        };
        hdr.append(records);
        hdr
    }

    /// Creates an empty image header with the default element width.
    pub fn default_image() -> Header {
        Header::new([], BlockKind::Image, 8, &[])
    }

    /// Returns the record named `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Returns the integer value of record `name`, if present and integer.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)?.value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the float value of record `name`, accepting integer records.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)?.value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Returns the text value of record `name`, if present and textual.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match &self.get(name)?.value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Updates an existing record's value and comment.
    ///
    /// Update-only: a missing keyword is an error, never an insert.
    pub fn set(&mut self, name: &str, value: Value, comment: impl Into<String>) -> Result<()> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| Error::NoSuchRecord(name.to_string()))?;
        self.records[idx].value = value;
        self.records[idx].comment = comment.into();
        Ok(())
    }

    /// Appends records, keeping the name index consistent. A duplicated
    /// name leaves both records in place; the index points at the latest.
    pub fn append(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            let pos = self.records.len();
            self.index.insert(record.name.clone(), pos);
            self.records.push(record);
        }
    }

    /// Returns all keyword names in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Returns the position of record `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Drops every record and resets the block metadata to an empty
    /// 8-bit image geometry.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.bitpix = 8;
        self.axes.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the block kind this header describes.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Returns the element width (bits per element for images).
    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    /// Returns the data dimensions.
    pub fn axes(&self) -> &[i64] {
        &self.axes
    }
}

/// Reads the header of block `block` (0-based) from the engine.
///
/// Individually unparseable records are skipped, per the leniency policy
/// described in the module docs.
pub fn read_header<E: FileEngine + ?Sized>(engine: &mut E, block: usize) -> Result<Header> {
    let kind = engine.seek_block(block)?;
    let (bitpix, axes) = engine.block_geometry()?;

    let n = engine.keyword_count()?;
    let mut hdr = Header {
        records: Vec::with_capacity(n),
        index: HashMap::with_capacity(n),
        kind,
        bitpix,
        axes: SmallVec::from_vec(axes),
    };
    for i in 1..=n {
        match read_record(engine, i) {
            Ok(record) => hdr.append([record]),
            Err(_) => continue,
        }
    }
    Ok(hdr)
}
