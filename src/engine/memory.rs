//! # In-Memory Reference Engine
//!
//! A complete, single-container implementation of the [`FileEngine`]
//! contract with no physical I/O: keyword slots, the long-string side
//! channel, per-cell byte storage and variable-length bookkeeping all live
//! in plain maps. Every integration test in this crate runs against it,
//! and it doubles as executable documentation of the contract.
//!
//! Cell buffers are stored exactly as exchanged (little-endian elements),
//! so a round-trip through this engine is byte-faithful.

use super::{ColumnInfo, ColumnSpec, FileEngine};
use crate::header::BlockKind;
use crate::types::{code, ColumnType};
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;

#[derive(Debug, Clone)]
struct MemBlock {
    kind: BlockKind,
    bitpix: i64,
    axes: Vec<i64>,
    /// (name, raw value token, comment), in slot order.
    keywords: Vec<(String, String, String)>,
    /// long-string side channel, keyed by keyword name
    longs: HashMap<String, String>,
    columns: Vec<ColumnInfo>,
    /// raw cell buffers keyed by (column, row)
    cells: HashMap<(usize, u64), Vec<u8>>,
    nrows: u64,
}

impl MemBlock {
    fn image() -> MemBlock {
        MemBlock {
            kind: BlockKind::Image,
            bitpix: 8,
            axes: Vec::new(),
            keywords: vec![
                ("SIMPLE".into(), "T".into(), "conforming container".into()),
                ("BITPIX".into(), "8".into(), "bits per element".into()),
                ("NAXIS".into(), "0".into(), "".into()),
            ],
            longs: HashMap::new(),
            columns: Vec::new(),
            cells: HashMap::new(),
            nrows: 0,
        }
    }
}

/// In-memory container. Starts with an empty primary image block.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    blocks: Vec<MemBlock>,
    current: usize,
    read_only: bool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> MemoryEngine {
        MemoryEngine {
            blocks: vec![MemBlock::image()],
            current: 0,
            read_only: false,
        }
    }

    /// Marks the container read-only; table creation fails afterwards.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Number of blocks in the container.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Appends a keyword slot to the current block's header.
    pub fn push_keyword(&mut self, name: &str, raw: &str, comment: &str) {
        self.blocks[self.current]
            .keywords
            .push((name.into(), raw.into(), comment.into()));
    }

    /// Stores a joined long string in the side channel of the current block.
    pub fn push_long_string(&mut self, name: &str, value: &str) {
        self.blocks[self.current]
            .longs
            .insert(name.into(), value.into());
    }

    /// Sets the current block's geometry directly (used to model
    /// compressed images, whose keyword records disagree with the true
    /// geometry).
    pub fn set_geometry(&mut self, bitpix: i64, axes: &[i64]) {
        let block = &mut self.blocks[self.current];
        block.bitpix = bitpix;
        block.axes = axes.to_vec();
    }

    fn block(&self) -> &MemBlock {
        &self.blocks[self.current]
    }

    fn block_mut(&mut self) -> &mut MemBlock {
        &mut self.blocks[self.current]
    }

    fn column(&self, col: usize) -> Result<&ColumnInfo> {
        self.block()
            .columns
            .get(col)
            .ok_or_else(|| eyre::eyre!("no column {} in block {}", col, self.current))
    }
}

impl FileEngine for MemoryEngine {
    fn seek_block(&mut self, index: usize) -> Result<BlockKind> {
        ensure!(
            index < self.blocks.len(),
            "block {} out of range ({} blocks)",
            index,
            self.blocks.len()
        );
        self.current = index;
        Ok(self.block().kind)
    }

    fn keyword_count(&self) -> Result<usize> {
        Ok(self.block().keywords.len())
    }

    fn read_keyword_slot(&self, index: usize) -> Result<(String, String, String)> {
        // 1-based, matching the physical record enumeration
        let slot = self
            .block()
            .keywords
            .get(index.checked_sub(1).unwrap_or(usize::MAX))
            .ok_or_else(|| eyre::eyre!("keyword slot {} out of range", index))?;
        Ok(slot.clone())
    }

    fn read_long_value_string(&self, name: &str) -> Result<String> {
        self.block()
            .longs
            .get(name)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no long value string for keyword {:?}", name))
    }

    fn block_geometry(&self) -> Result<(i64, Vec<i64>)> {
        let block = self.block();
        Ok((block.bitpix, block.axes.clone()))
    }

    fn column_descriptor(&self, col: usize) -> Result<ColumnInfo> {
        self.column(col).copied()
    }

    fn variable_length_descriptor(&self, col: usize, row: u64) -> Result<(u64, u64)> {
        let info = self.column(col)?;
        let ty = ColumnType::from_code(info.code)?;
        ensure!(ty.variable, "column {} is not variable length", col);
        let len = self
            .block()
            .cells
            .get(&(col, row))
            .map(|buf| buf.len() / ty.kind.element_size())
            .unwrap_or(0);
        Ok((len as u64, 0))
    }

    fn decode_cell(&self, ty: ColumnType, col: usize, row: u64, count: usize) -> Result<Vec<u8>> {
        let info = self.column(col)?;
        ensure!(
            info.code.abs() == ty.code().abs(),
            "column {} stores type code {}, requested {}",
            col,
            info.code,
            ty.code()
        );
        let want = count * ty.kind.element_size();
        match self.block().cells.get(&(col, row)) {
            Some(buf) => {
                ensure!(
                    buf.len() >= want,
                    "cell ({}, {}) holds {} bytes, requested {}",
                    col,
                    row,
                    buf.len(),
                    want
                );
                Ok(buf[..want].to_vec())
            }
            // unwritten cells read back as zero fill
            None => Ok(vec![0; want]),
        }
    }

    fn encode_cell(&mut self, ty: ColumnType, col: usize, row: u64, data: &[u8]) -> Result<()> {
        if self.read_only {
            bail!("container is read-only");
        }
        let info = *self.column(col)?;
        ensure!(
            info.code.abs() == ty.code().abs(),
            "column {} stores type code {}, got {}",
            col,
            info.code,
            ty.code()
        );
        ensure!(
            data.len() % ty.kind.element_size() == 0,
            "cell buffer of {} bytes is not a whole number of {}-byte elements",
            data.len(),
            ty.kind.element_size()
        );
        let block = self.block_mut();
        block.cells.insert((col, row), data.to_vec());
        block.nrows = block.nrows.max(row + 1);
        Ok(())
    }

    fn row_count(&self) -> Result<u64> {
        Ok(self.block().nrows)
    }

    fn create_table_block(&mut self, cols: &[ColumnSpec], kind: BlockKind) -> Result<usize> {
        if self.read_only {
            bail!("container is read-only");
        }
        ensure!(kind.is_table(), "cannot create a table block of kind {:?}", kind);

        let mut columns = Vec::with_capacity(cols.len());
        let mut keywords = vec![
            (
                "XTENSION".to_string(),
                if kind == BlockKind::BinaryTable {
                    "'BINTABLE'".to_string()
                } else {
                    "'TABLE   '".to_string()
                },
                "table extension".to_string(),
            ),
            ("BITPIX".into(), "8".into(), "".into()),
            ("NAXIS".into(), "2".into(), "".into()),
            ("NAXIS1".into(), "0".into(), "bytes per row".into()),
            ("NAXIS2".into(), "0".into(), "number of rows".into()),
            ("TFIELDS".into(), cols.len().to_string(), "number of columns".into()),
        ];
        for (i, spec) in cols.iter().enumerate() {
            let parsed = code::parse_format(&spec.form, kind)?;
            columns.push(ColumnInfo {
                code: parsed.ty.code(),
                repeat: parsed.repeat,
                width: parsed.width,
            });
            let n = i + 1;
            keywords.push((format!("TTYPE{n}"), format!("'{}'", spec.name), String::new()));
            keywords.push((format!("TFORM{n}"), format!("'{}'", spec.form), String::new()));
            if !spec.unit.is_empty() {
                keywords.push((format!("TUNIT{n}"), format!("'{}'", spec.unit), String::new()));
            }
        }

        self.blocks.push(MemBlock {
            kind,
            bitpix: 8,
            axes: vec![0, 0],
            keywords,
            longs: HashMap::new(),
            columns,
            cells: HashMap::new(),
            nrows: 0,
        });
        self.current = self.blocks.len() - 1;
        Ok(self.current)
    }

    fn read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    #[test]
    fn fresh_container_has_primary_image() {
        let mut engine = MemoryEngine::new();
        assert_eq!(engine.block_count(), 1);
        assert_eq!(engine.seek_block(0).unwrap(), BlockKind::Image);
        assert!(engine.keyword_count().unwrap() >= 3);
    }

    #[test]
    fn keyword_slots_are_one_based() {
        let engine = MemoryEngine::new();
        let (name, raw, _) = engine.read_keyword_slot(1).unwrap();
        assert_eq!(name, "SIMPLE");
        assert_eq!(raw, "T");
        assert!(engine.read_keyword_slot(0).is_err());
    }

    #[test]
    fn create_table_synthesizes_structural_keywords() {
        let mut engine = MemoryEngine::new();
        let cols = vec![
            ColumnSpec {
                name: "flux".into(),
                form: "4E".into(),
                unit: "Jy".into(),
            },
            ColumnSpec {
                name: "id".into(),
                form: "K".into(),
                unit: String::new(),
            },
        ];
        let block = engine
            .create_table_block(&cols, BlockKind::BinaryTable)
            .unwrap();
        assert_eq!(block, 1);
        let names: Vec<String> = (1..=engine.keyword_count().unwrap())
            .map(|i| engine.read_keyword_slot(i).unwrap().0)
            .collect();
        assert!(names.contains(&"TFIELDS".to_string()));
        assert!(names.contains(&"TTYPE1".to_string()));
        assert!(names.contains(&"TFORM2".to_string()));
        assert!(names.contains(&"TUNIT1".to_string()));
        assert!(!names.contains(&"TUNIT2".to_string()));
    }

    #[test]
    fn unwritten_cells_read_as_zero_fill() {
        let mut engine = MemoryEngine::new();
        engine
            .create_table_block(
                &[ColumnSpec {
                    name: "x".into(),
                    form: "J".into(),
                    unit: String::new(),
                }],
                BlockKind::BinaryTable,
            )
            .unwrap();
        let ty = ColumnType::scalar(TypeKind::Int);
        let buf = engine.decode_cell(ty, 0, 5, 1).unwrap();
        assert_eq!(buf, vec![0; 4]);
    }

    #[test]
    fn writes_advance_row_count() {
        let mut engine = MemoryEngine::new();
        engine
            .create_table_block(
                &[ColumnSpec {
                    name: "x".into(),
                    form: "J".into(),
                    unit: String::new(),
                }],
                BlockKind::BinaryTable,
            )
            .unwrap();
        let ty = ColumnType::scalar(TypeKind::Int);
        engine.encode_cell(ty, 0, 2, &7i32.to_le_bytes()).unwrap();
        assert_eq!(engine.row_count().unwrap(), 3);
    }

    #[test]
    fn read_only_blocks_writes() {
        let mut engine = MemoryEngine::new();
        engine.set_read_only(true);
        let err = engine.create_table_block(&[], BlockKind::BinaryTable);
        assert!(err.is_err());
    }
}
