//! Row model trait for mapping records onto table rows.
//!
//! A row model declares its table, its primary-key shape and a capability
//! table of columns. Each column entry pairs a column name with a getter that
//! reads the field into a [`Value`] and a setter that decodes a fetched
//! [`Value`] back into the field. The persistence operations in the
//! `litemodel` crate are generic over this trait.
//!
//! ```
//! use litemodel_core::{ColumnMapping, FromValue, PrimaryKey, RowModel, Table, Value};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: Option<i64>,
//!     name: Option<String>,
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
//!     ];
//! }
//!
//! let person = Person { id: None, name: Some("Arthur".into()) };
//! assert_eq!(person.primary_key_values(), vec![("id", Value::Null)]);
//! ```

use crate::Result;
use crate::row::Row;
use crate::value::Value;
use std::fmt;

/// The primary-key shape of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    /// No primary key: records can only be inserted and fetched.
    None,
    /// An `INTEGER PRIMARY KEY` column aliasing the row id. The engine
    /// assigns it on insert when left NULL.
    RowId(&'static str),
    /// A single key column the application must set.
    Column(&'static str),
    /// Several key columns, compared together.
    Columns(&'static [&'static str]),
}

impl PrimaryKey {
    /// Key column names, in declaration order.
    pub fn columns(&self) -> &[&'static str] {
        match self {
            PrimaryKey::None => &[],
            PrimaryKey::RowId(column) | PrimaryKey::Column(column) => std::slice::from_ref(column),
            PrimaryKey::Columns(columns) => columns,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PrimaryKey::None)
    }
}

/// A table descriptor: name plus primary-key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub primary_key: PrimaryKey,
}

impl Table {
    pub const fn new(name: &'static str, primary_key: PrimaryKey) -> Self {
        Self { name, primary_key }
    }
}

/// One entry of a row model's capability table.
pub struct ColumnMapping<M> {
    /// Column name, matched case-sensitively against fetched rows
    pub name: &'static str,
    /// Read the field as a database value
    pub get: fn(&M) -> Value,
    /// Decode a fetched value into the field
    pub set: fn(&mut M, &Value) -> Result<()>,
}

impl<M> fmt::Debug for ColumnMapping<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMapping")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Trait for records stored as rows of one table.
pub trait RowModel: Sized + 'static {
    /// The table this record is stored in.
    const TABLE: Table;

    /// The persisted columns. Key columns must be listed too.
    const COLUMNS: &'static [ColumnMapping<Self>];

    /// Find the capability entry for a column.
    fn column(name: &str) -> Option<&'static ColumnMapping<Self>> {
        Self::COLUMNS.iter().find(|column| column.name == name)
    }

    /// The column dictionary: every persisted column with its current value.
    fn column_values(&self) -> Vec<(&'static str, Value)> {
        Self::COLUMNS
            .iter()
            .map(|column| (column.name, (column.get)(self)))
            .collect()
    }

    /// Current values of the primary-key columns.
    ///
    /// Empty for `PrimaryKey::None`. A key column missing from `COLUMNS`
    /// reads as NULL.
    fn primary_key_values(&self) -> Vec<(&'static str, Value)> {
        Self::TABLE
            .primary_key
            .columns()
            .iter()
            .map(|&name| {
                let value = Self::column(name).map_or(Value::Null, |column| (column.get)(self));
                (name, value)
            })
            .collect()
    }

    /// Decode `value` into the named column's field.
    ///
    /// Returns `Ok(false)` when the model has no such column.
    #[allow(clippy::result_large_err)]
    fn apply_column(&mut self, name: &str, value: &Value) -> Result<bool> {
        match Self::column(name) {
            Some(column) => {
                (column.set)(self, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply every column of `row` that the model maps; others are ignored.
    #[allow(clippy::result_large_err)]
    fn apply_row(&mut self, row: &Row) -> Result<()> {
        for (name, value) in row.iter() {
            self.apply_column(name, value)?;
        }
        Ok(())
    }

    /// Build a record from a fetched row.
    #[allow(clippy::result_large_err)]
    fn from_row(row: &Row) -> Result<Self>
    where
        Self: Default,
    {
        let mut record = Self::default();
        record.apply_row(row)?;
        Ok(record)
    }
}

/// Outcome of deleting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionResult {
    RowDeleted,
    NoRowDeleted,
}

/// Render key columns for diagnostics, e.g. `a = 1 AND b = 'x'`.
pub fn render_key(key: &[(&str, Value)]) -> String {
    key.iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect::<Vec<_>>()
        .join(" AND ")
}
