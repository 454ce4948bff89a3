//! Core types and traits for LiteModel.
//!
//! This crate has no engine dependency. It provides:
//!
//! - `Value`, the storage-class value type, and `FromValue` decoding
//! - `Row` and its shared `ColumnInfo`
//! - `QueryArguments` with the `args!` and `named_args!` builders
//! - `RowModel`, the capability table a record implements to be persisted
//! - the crate-wide `Error` type

pub mod arguments;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod representable;
pub mod row;
pub mod value;

pub use arguments::QueryArguments;
pub use error::{
    BindingError, BindingErrorKind, DatabaseError, Error, RecordError, Result, TypeError,
    UsageError, UsageErrorKind,
};
pub use identifiers::quote_ident;
pub use model::{ColumnMapping, DeletionResult, PrimaryKey, RowModel, Table, render_key};
pub use representable::{IntRepresentable, StringRepresentable};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
