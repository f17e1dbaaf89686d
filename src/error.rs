//! # Error Taxonomy
//!
//! Every failure the core can produce on its own is one variant of the
//! closed [`Error`] enum. Errors coming back from the file engine are
//! `eyre::Report`s and are propagated verbatim, with row/column/keyword
//! context attached at the call site via `wrap_err_with`.
//!
//! ## Categories
//!
//! | Variant | Source | Scope |
//! |---------|--------|-------|
//! | `MalformedValue` | record parser | one record |
//! | `InvalidKeywordType` | record parser | one record |
//! | `ValueParse` | record parser | one record |
//! | `TypeMismatch` | column write path | fails before any physical write |
//! | `UnsupportedColumnType` | format inference | column creation |
//! | `ArityMismatch` | positional scan | fails before any target is written |
//! | `NoSuchRecord` | update-only `Header::set` | programmer error |
//! | `InvalidTypeCode` | code → kind mapping | schema resolution |
//! | `MalformedFormat` | format-token parsing | schema resolution |
//!
//! Parser errors are always local to a single record; header construction
//! recovers from them by skipping the record. Everything else fails fast
//! with no partial state committed.
//!
//! Callers holding an `eyre::Report` can recover the variant:
//!
//! ```ignore
//! if let Some(Error::ArityMismatch { got, expected }) = report.downcast_ref::<Error>() {
//!     ...
//! }
//! ```

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = eyre::Result<T>;

/// Closed error taxonomy for the container core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A raw record line could not be interpreted at all.
    #[error("malformed value for keyword {keyword:?}: {reason}")]
    MalformedValue { keyword: String, reason: String },

    /// The value token's sniffed type class is not one of L/F/I/T/X/C.
    #[error("invalid keyword type class {class:?} for keyword {keyword:?}")]
    InvalidKeywordType { keyword: String, class: char },

    /// A value token failed numeric conversion.
    #[error("cannot parse {token:?} as {expected}")]
    ValueParse {
        token: String,
        expected: &'static str,
    },

    /// A native value's shape does not match the column schema.
    #[error("type mismatch on column {column:?}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// No format descriptor exists for the supplied native value shape.
    #[error("unsupported column type for {shape} in a {kind} block")]
    UnsupportedColumnType { shape: String, kind: &'static str },

    /// Positional scan called with the wrong number of targets.
    #[error("invalid number of scan arguments (got {got}, expected {expected})")]
    ArityMismatch { got: usize, expected: usize },

    /// Update-only `Header::set` addressed a keyword that is not present.
    #[error("no such record {0:?} in header")]
    NoSuchRecord(String),

    /// A column type code whose magnitude maps to no primitive kind.
    #[error("invalid column type code {0}")]
    InvalidTypeCode(i64),

    /// A format token that does not follow either table grammar.
    #[error("malformed column format {0:?}")]
    MalformedFormat(String),
}
