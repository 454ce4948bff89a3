//! Row-model persistence.
//!
//! [`Record`] adds `insert`, `update`, `save`, `delete`, `reload` and
//! `exists` to every [`RowModel`]. The SQL is generated from the model's
//! table descriptor and column dictionary, and every statement is keyed on
//! all primary-key columns.
//!
//! Error kinds are kept apart:
//!
//! - a model whose table declares no primary key cannot be updated, deleted
//!   or reloaded: `Usage(UnsupportedOperation)`
//! - a key column that is NULL: `InvalidPrimaryKey`
//! - a well-formed key that matches no row: `RowNotFound`

#![allow(clippy::result_large_err)]

use litemodel_core::identifiers::{equality_conditions, placeholders, quote_ident_list};
use litemodel_core::{
    DeletionResult, Error, PrimaryKey, QueryArguments, RecordError, Result, RowModel,
    UsageErrorKind, Value, quote_ident, render_key,
};
use litemodel_sqlite::Database;

/// Persistence operations for row models.
///
/// Implemented for every [`RowModel`].
pub trait Record: RowModel {
    /// Insert a new row.
    ///
    /// When the key is the row id and is NULL, the id assigned by the engine
    /// is written back into the record.
    fn insert(&mut self, database: &Database) -> Result<()>;

    /// Update the row with the record's primary key.
    fn update(&self, database: &Database) -> Result<()>;

    /// Update the record's row if it exists, insert it otherwise.
    fn save(&mut self, database: &Database) -> Result<()>;

    /// Delete the row with the record's primary key.
    ///
    /// Deleting a key that matches no row is not an error.
    fn delete(&self, database: &Database) -> Result<DeletionResult>;

    /// Overwrite the record's fields from its stored row.
    fn reload(&mut self, database: &Database) -> Result<()>;

    /// Whether a row with the record's primary key exists. A NULL key and a
    /// table without primary key both report `false`.
    fn exists(&self, database: &Database) -> Result<bool>;
}

impl<M: RowModel> Record for M {
    fn insert(&mut self, database: &Database) -> Result<()> {
        insert(database, self)
    }

    fn update(&self, database: &Database) -> Result<()> {
        update(database, self)
    }

    fn save(&mut self, database: &Database) -> Result<()> {
        save(database, self)
    }

    fn delete(&self, database: &Database) -> Result<DeletionResult> {
        delete(database, self)
    }

    fn reload(&mut self, database: &Database) -> Result<()> {
        reload(database, self)
    }

    fn exists(&self, database: &Database) -> Result<bool> {
        exists(database, self)
    }
}

/// Fetch every row of `sql` as a record.
pub fn fetch_all<M>(
    database: &Database,
    sql: &str,
    arguments: impl Into<Option<QueryArguments>>,
) -> Result<Vec<M>>
where
    M: RowModel + Default,
{
    database
        .select_statement(sql)?
        .rows(arguments)?
        .map(|row| M::from_row(&row?))
        .collect()
}

/// Fetch the first row of `sql` as a record.
pub fn fetch_one<M>(
    database: &Database,
    sql: &str,
    arguments: impl Into<Option<QueryArguments>>,
) -> Result<Option<M>>
where
    M: RowModel + Default,
{
    database
        .fetch_one_row(sql, arguments)?
        .map(|row| M::from_row(&row))
        .transpose()
}

/// Fetch a record by its primary-key values, given in key column order.
pub fn fetch_by_primary_key<M>(database: &Database, key: &[Value]) -> Result<Option<M>>
where
    M: RowModel + Default,
{
    let columns = M::TABLE.primary_key.columns();
    if columns.is_empty() {
        return Err(no_primary_key::<M>("fetch by primary key"));
    }
    if columns.len() != key.len() {
        return Err(Error::InvalidPrimaryKey(RecordError {
            table: M::TABLE.name.to_string(),
            key: Some(format!(
                "expected {} key values, got {}",
                columns.len(),
                key.len()
            )),
        }));
    }
    let key: Vec<(&str, Value)> = columns.iter().copied().zip(key.iter().cloned()).collect();
    fetch_by_key(database, &key)
}

/// Fetch the first record whose columns equal the given values.
///
/// A NULL value matches no row.
pub fn fetch_by_key<M>(database: &Database, key: &[(&str, Value)]) -> Result<Option<M>>
where
    M: RowModel + Default,
{
    if key.is_empty() {
        return Err(Error::usage(
            UsageErrorKind::UnsupportedOperation,
            format!("fetching from {} needs at least one key column", M::TABLE.name),
        ));
    }
    if key.iter().any(|(_, value)| value.is_null()) {
        return Ok(None);
    }
    let names: Vec<&str> = key.iter().map(|(name, _)| *name).collect();
    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        quote_ident(M::TABLE.name),
        equality_conditions(&names, " AND ")
    );
    let arguments = QueryArguments::Positional(key.iter().map(|(_, value)| value.clone()).collect());
    fetch_one(database, &sql, arguments)
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn insert<M: RowModel>(database: &Database, record: &mut M) -> Result<()> {
    let values = record.column_values();
    let table = quote_ident(M::TABLE.name);
    let sql = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        let names: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            quote_ident_list(&names),
            placeholders(names.len())
        )
    };

    let arguments = QueryArguments::Positional(values.into_iter().map(|(_, value)| value).collect());
    let changes = database.execute(&sql, arguments)?;

    if let PrimaryKey::RowId(column) = M::TABLE.primary_key {
        let unset = record
            .primary_key_values()
            .first()
            .is_none_or(|(_, value)| value.is_null());
        if unset {
            // No row id when the engine stored nothing, e.g. a trigger raised
            // IGNORE. The key then stays unset.
            match changes.inserted_row_id {
                Some(row_id) => {
                    record.apply_column(column, &Value::Integer(row_id))?;
                    tracing::debug!(row_id, "assigned row id");
                }
                None => tracing::debug!("insert stored no row; row id left unset"),
            }
        }
    }
    Ok(())
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn update<M: RowModel>(database: &Database, record: &M) -> Result<()> {
    if M::TABLE.primary_key.is_none() {
        return Err(no_primary_key::<M>("update"));
    }
    let key = valid_key(record)?;
    let key_names: Vec<&str> = key.iter().map(|(name, _)| *name).collect();

    let mut assignments: Vec<(&str, Value)> = record
        .column_values()
        .into_iter()
        .filter(|(name, _)| !key_names.contains(name))
        .collect();
    if assignments.is_empty() {
        // Nothing but the key: rewrite the key to itself so the statement
        // still reports whether a row matched.
        assignments = key.clone();
    }
    let assigned: Vec<&str> = assignments.iter().map(|(name, _)| *name).collect();

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(M::TABLE.name),
        equality_conditions(&assigned, ", "),
        equality_conditions(&key_names, " AND ")
    );
    let arguments: Vec<Value> = assignments
        .into_iter()
        .chain(key.iter().cloned())
        .map(|(_, value)| value)
        .collect();

    let changes = database.execute(&sql, QueryArguments::Positional(arguments))?;
    if changes.changed_row_count == 0 {
        return Err(Error::RowNotFound(RecordError {
            table: M::TABLE.name.to_string(),
            key: Some(render_key(&key)),
        }));
    }
    Ok(())
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn save<M: RowModel>(database: &Database, record: &mut M) -> Result<()> {
    if M::TABLE.primary_key.is_none() || !key_is_set(record) {
        return insert(database, record);
    }
    if exists(database, record)? {
        update(database, record)
    } else {
        insert(database, record)
    }
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn delete<M: RowModel>(database: &Database, record: &M) -> Result<DeletionResult> {
    if M::TABLE.primary_key.is_none() {
        return Err(no_primary_key::<M>("delete"));
    }
    let (condition, arguments) = key_condition(&valid_key(record)?);
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(M::TABLE.name),
        condition
    );
    let changes = database.execute(&sql, arguments)?;
    Ok(if changes.changed_row_count > 0 {
        DeletionResult::RowDeleted
    } else {
        DeletionResult::NoRowDeleted
    })
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn reload<M: RowModel>(database: &Database, record: &mut M) -> Result<()> {
    if M::TABLE.primary_key.is_none() {
        return Err(no_primary_key::<M>("reload"));
    }
    let key = valid_key(record)?;
    let (condition, arguments) = key_condition(&key);
    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        quote_ident(M::TABLE.name),
        condition
    );
    match database.fetch_one_row(&sql, arguments)? {
        Some(row) => record.apply_row(&row),
        None => Err(Error::RowNotFound(RecordError {
            table: M::TABLE.name.to_string(),
            key: Some(render_key(&key)),
        })),
    }
}

#[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE.name))]
fn exists<M: RowModel>(database: &Database, record: &M) -> Result<bool> {
    if M::TABLE.primary_key.is_none() || !key_is_set(record) {
        return Ok(false);
    }
    let (condition, arguments) = key_condition(&record.primary_key_values());
    let sql = format!(
        "SELECT 1 FROM {} WHERE {}",
        quote_ident(M::TABLE.name),
        condition
    );
    Ok(database.fetch_one_row(&sql, arguments)?.is_some())
}

fn key_is_set<M: RowModel>(record: &M) -> bool {
    record
        .primary_key_values()
        .iter()
        .all(|(_, value)| !value.is_null())
}

/// The record's key values, or `InvalidPrimaryKey` if any is NULL.
fn valid_key<M: RowModel>(record: &M) -> Result<Vec<(&'static str, Value)>> {
    let key = record.primary_key_values();
    if key.iter().any(|(_, value)| value.is_null()) {
        return Err(Error::InvalidPrimaryKey(RecordError {
            table: M::TABLE.name.to_string(),
            key: Some(render_key(&key)),
        }));
    }
    Ok(key)
}

fn key_condition(key: &[(&'static str, Value)]) -> (String, QueryArguments) {
    let names: Vec<&str> = key.iter().map(|(name, _)| *name).collect();
    (
        equality_conditions(&names, " AND "),
        QueryArguments::Positional(key.iter().map(|(_, value)| value.clone()).collect()),
    )
}

fn no_primary_key<M: RowModel>(operation: &str) -> Error {
    Error::usage(
        UsageErrorKind::UnsupportedOperation,
        format!(
            "cannot {} a record of table {}: the table has no primary key",
            operation,
            M::TABLE.name
        ),
    )
}
