//! # Column Type System
//!
//! Bidirectional mapping between the container's signed column type codes
//! and native value shapes:
//!
//! - `code`: `TypeKind` / `ColumnType` and the format-token grammars for
//!   both table flavors (code → shape direction starts here).
//! - `cell`: `CellValue` native representation, zero-value allocation,
//!   the element wire codec, and format inference from a native value
//!   (shape → code direction).
//!
//! Both directions are pure; nothing in this module touches the file
//! engine.

mod cell;
pub mod code;

pub use cell::CellValue;
pub use code::{parse_format, ColumnType, ParsedFormat, TypeKind};
