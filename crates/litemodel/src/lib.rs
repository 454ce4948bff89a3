//! LiteModel - typed row-model persistence over SQLite.
//!
//! LiteModel provides:
//!
//! - A connection with one-off execution, reusable compiled statements and
//!   transaction blocks
//! - A serialized queue for sharing one connection between threads
//! - Typed decoding of fetched values
//! - Row models: records mapped onto table rows through a column table,
//!   with insert, update, save, delete, reload and exists
//! - Ordered, apply-once migrations
//!
//! # Quick Start
//!
//! ```
//! use litemodel::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     id: Option<i64>,
//!     name: Option<String>,
//!     age: Option<i64>,
//! }
//!
//! impl RowModel for Person {
//!     const TABLE: Table = Table::new("persons", PrimaryKey::RowId("id"));
//!     const COLUMNS: &'static [ColumnMapping<Self>] = &[
//!         ColumnMapping {
//!             name: "id",
//!             get: |p: &Person| Value::from(p.id),
//!             set: |p: &mut Person, v: &Value| {
//!                 p.id = FromValue::from_value(v)?;
//!                 Ok(())
//!             },
//!         },
//!         ColumnMapping {
//!             name: "name",
//!             get: |p: &Person| Value::from(p.name.clone()),
//!             set: |p: &mut Person, v: &Value| {
//!                 p.name = FromValue::from_value(v)?;
//!                 Ok(())
//!             },
//!         },
//!         ColumnMapping {
//!             name: "age",
//!             get: |p: &Person| Value::from(p.age),
//!             set: |p: &mut Person, v: &Value| {
//!                 p.age = FromValue::from_value(v)?;
//!                 Ok(())
//!             },
//!         },
//!     ];
//! }
//!
//! let mut migrator = Migrator::new();
//! migrator
//!     .register_migration("createPersons", |db| {
//!         db.execute_batch("CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT, age INT)")
//!     })
//!     .unwrap();
//!
//! let queue = DatabaseQueue::open_memory().unwrap();
//! migrator.migrate(&queue).unwrap();
//!
//! let arthur = queue
//!     .in_database(|db| {
//!         let mut arthur = Person { id: None, name: Some("Arthur".into()), age: Some(41) };
//!         arthur.insert(db)?;
//!         Ok(arthur)
//!     })
//!     .unwrap();
//! assert_eq!(arthur.id, Some(1));
//!
//! let fetched = queue
//!     .in_database(|db| fetch_all::<Person>(db, "SELECT * FROM persons", None))
//!     .unwrap();
//! assert_eq!(fetched, vec![arthur]);
//! ```

pub mod persistence;

pub use litemodel_core::{
    BindingError, BindingErrorKind, ColumnInfo, ColumnMapping, DatabaseError, DeletionResult,
    Error, FromValue, IntRepresentable, PrimaryKey, QueryArguments, RecordError, Result, Row,
    RowModel, StringRepresentable, Table, TypeError, UsageError, UsageErrorKind, Value,
    quote_ident, render_key,
};
pub use litemodel_core::{args, int_representable, named_args, string_representable};

pub use litemodel_sqlite::{
    Changes, Configuration, Database, DatabaseQueue, Rows, SelectStatement, TraceFunction,
    TransactionCompletion, TransactionKind, UpdateStatement, sqlite_version,
    sqlite_version_number,
};

pub use litemodel_schema::{MIGRATIONS_TABLE, Migration, MigrationStatus, Migrator};

pub use persistence::{Record, fetch_all, fetch_by_key, fetch_by_primary_key, fetch_one};

/// Prelude module for convenient imports.
///
/// ```
/// use litemodel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ColumnMapping, Configuration, Database, DatabaseQueue, DeletionResult, Error, FromValue,
        Migrator, PrimaryKey, QueryArguments, Record, Result, Row, RowModel, Table,
        TransactionCompletion, TransactionKind, Value, args, fetch_all, fetch_by_key,
        fetch_by_primary_key, fetch_one, named_args,
    };
}
