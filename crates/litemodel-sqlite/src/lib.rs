//! SQLite engine layer for LiteModel.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate wraps the SQLite C API (through `libsqlite3-sys`) in a small
//! synchronous interface:
//!
//! - [`Database`]: one connection, with one-off execution, compiled
//!   statements, fetch helpers and transaction blocks
//! - [`SelectStatement`] and [`UpdateStatement`]: reusable compiled SQL
//! - [`DatabaseQueue`]: a connection shared between threads, one call at a time
//!
//! # Example
//!
//! ```
//! use litemodel_core::args;
//! use litemodel_sqlite::{Database, TransactionCompletion, TransactionKind};
//!
//! let db = Database::open_memory().unwrap();
//! db.execute("CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT)", None)
//!     .unwrap();
//!
//! db.in_transaction(TransactionKind::default(), |db| {
//!     db.execute("INSERT INTO persons (name) VALUES (?)", args!["Arthur"])?;
//!     Ok(TransactionCompletion::Commit)
//! })
//! .unwrap();
//!
//! let names = db.fetch_values::<String>("SELECT name FROM persons", None).unwrap();
//! assert_eq!(names, vec![Some("Arthur".to_string())]);
//! ```
//!
//! # Type Mapping
//!
//! | Rust Type | SQLite Type |
//! |-----------|-------------|
//! | `bool` | INTEGER (0/1) |
//! | `i8`, `i16`, `i32`, `i64` | INTEGER |
//! | `u8`, `u16`, `u32` | INTEGER |
//! | `f32`, `f64` | REAL |
//! | `String`, `&str` | TEXT |
//! | `Vec<u8>`, `&[u8]` | BLOB |
//! | `serde_json::Value` | TEXT (compact JSON) |
//! | `Option<T>` | NULL or T |
//!
//! # Thread Safety
//!
//! `Database` is `Send` but not `Sync`. Wrap it in a [`DatabaseQueue`] to use
//! one connection from several threads.

pub mod config;
pub mod database;
pub mod ffi;
pub mod queue;
pub mod statement;
pub mod types;

pub use config::{Configuration, TraceFunction};
pub use database::{Database, TransactionCompletion, TransactionKind};
pub use queue::DatabaseQueue;
pub use statement::{Changes, Rows, SelectStatement, Statement, UpdateStatement};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
