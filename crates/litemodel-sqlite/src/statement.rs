//! Prepared statements.
//!
//! A statement is compiled once from SQL text and can run many times with
//! different arguments. Each run resets the program and clears the previous
//! bindings before binding the new arguments. The compiled program is
//! finalized when the statement is dropped.
//!
//! Statements borrow the [`Database`] that compiled them, so the borrow
//! checker rejects any attempt to keep one past its connection.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::result_large_err)]

use crate::database::Database;
use crate::ffi;
use crate::types;
use litemodel_core::{
    BindingError, BindingErrorKind, ColumnInfo, DatabaseError, Error, FromValue, QueryArguments,
    Result, Row,
};
use std::ffi::{CString, c_char, c_int};
use std::ptr;
use std::sync::Arc;

/// Change metadata reported by an update statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changes {
    /// Rows inserted, updated or deleted by the statement itself.
    pub changed_row_count: usize,
    /// Row id of the inserted row, for an INSERT or REPLACE that changed a row.
    pub inserted_row_id: Option<i64>,
}

/// The compiled program shared by select and update statements.
pub struct Statement<'db> {
    database: &'db Database,
    handle: *mut ffi::sqlite3_stmt,
    sql: String,
    columns: Arc<ColumnInfo>,
    parameter_count: usize,
    arguments: Option<QueryArguments>,
}

impl<'db> Statement<'db> {
    pub(crate) fn prepare(database: &'db Database, sql: &str) -> Result<Self> {
        let db = database.handle()?;
        let c_sql = CString::new(sql).map_err(|_| {
            Error::Compile(DatabaseError {
                code: ffi::SQLITE_MISUSE,
                message: "SQL contains null byte".to_string(),
                sql: Some(sql.to_string()),
                arguments: None,
            })
        })?;

        let mut handle: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                db,
                c_sql.as_ptr(),
                c_sql.as_bytes().len() as c_int,
                &raw mut handle,
                &raw mut tail,
            )
        };

        if rc != ffi::SQLITE_OK {
            // SAFETY: db is valid
            return Err(Error::Compile(unsafe { ffi::last_error(db, Some(sql), None) }));
        }

        let rest = if tail.is_null() {
            ""
        } else {
            // SAFETY: tail points into c_sql, at or after its start
            let offset = unsafe { tail.offset_from(c_sql.as_ptr()) } as usize;
            sql.get(offset..).unwrap_or("")
        };
        if !is_blank_sql(rest) {
            // SAFETY: handle is null or a valid compiled statement
            unsafe {
                ffi::sqlite3_finalize(handle);
            }
            return Err(Error::Compile(DatabaseError {
                code: ffi::SQLITE_MISUSE,
                message: "SQL contains more than one statement; use execute_batch".to_string(),
                sql: Some(sql.to_string()),
                arguments: None,
            }));
        }
        if handle.is_null() {
            return Err(Error::Compile(DatabaseError {
                code: ffi::SQLITE_MISUSE,
                message: "SQL contains no statement".to_string(),
                sql: Some(sql.to_string()),
                arguments: None,
            }));
        }

        // SAFETY: handle is a valid compiled statement
        let (column_count, parameter_count) = unsafe {
            (
                ffi::sqlite3_column_count(handle),
                ffi::sqlite3_bind_parameter_count(handle),
            )
        };
        let names = (0..column_count)
            .map(|i| {
                // SAFETY: handle is valid and i is in range
                unsafe { types::column_name(handle, i) }.unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        tracing::trace!(sql, "compiled statement");

        Ok(Self {
            database,
            handle,
            sql: sql.to_string(),
            columns: Arc::new(ColumnInfo::new(names)),
            parameter_count: parameter_count as usize,
            arguments: None,
        })
    }

    /// The SQL text this statement was compiled from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The connection that compiled this statement.
    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// Number of parameter slots declared by the SQL.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Result column names, in order.
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Reset the program, clear previous bindings and bind `arguments`.
    ///
    /// `None` binds nothing and is only valid for statements without
    /// parameters.
    pub fn bind(&mut self, arguments: Option<QueryArguments>) -> Result<()> {
        // SAFETY: handle is valid until drop
        unsafe {
            ffi::sqlite3_reset(self.handle);
            ffi::sqlite3_clear_bindings(self.handle);
        }
        self.arguments = None;

        match &arguments {
            None => self.check_count(0)?,
            Some(QueryArguments::Positional(values)) => {
                self.check_count(values.len())?;
                for (i, value) in values.iter().enumerate() {
                    self.bind_at(i + 1, value)?;
                }
            }
            Some(QueryArguments::Named(map)) => {
                for index in 1..=self.parameter_count {
                    // SAFETY: handle is valid, index is 1-based and in range
                    let name = unsafe { types::parameter_name(self.handle, index as c_int) };
                    let key = match name.as_deref().map(|n| n.split_at(1)) {
                        Some((":" | "@" | "$", key)) => key,
                        _ => {
                            return Err(self.binding_error(
                                BindingErrorKind::UnnamedParameter,
                                format!(
                                    "parameter {} has no name and cannot take a named argument",
                                    index
                                ),
                            ));
                        }
                    };
                    let Some(value) = map.get(key) else {
                        return Err(self.binding_error(
                            BindingErrorKind::MissingName,
                            format!("missing value for parameter {}", key),
                        ));
                    };
                    self.bind_at(index, value)?;
                }
            }
        }

        self.arguments = arguments;
        Ok(())
    }

    fn check_count(&self, given: usize) -> Result<()> {
        if given == self.parameter_count {
            Ok(())
        } else {
            Err(self.binding_error(
                BindingErrorKind::CountMismatch,
                format!(
                    "wrong number of arguments: expected {}, got {}",
                    self.parameter_count, given
                ),
            ))
        }
    }

    fn bind_at(&self, index: usize, value: &litemodel_core::Value) -> Result<()> {
        // SAFETY: handle is valid, index is 1-based and in range
        let rc = unsafe { types::bind_value(self.handle, index as c_int, value) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            let message = self
                .database
                .last_error_message()
                .unwrap_or_else(|| ffi::error_string(rc).to_string());
            Err(self.binding_error(
                BindingErrorKind::Engine,
                format!("failed to bind parameter {}: {}", index, message),
            ))
        }
    }

    fn binding_error(&self, kind: BindingErrorKind, message: String) -> Error {
        Error::Binding(BindingError {
            kind,
            sql: self.sql.clone(),
            message,
        })
    }

    /// Report the run to the trace hook.
    fn will_execute(&self) {
        self.database.trace(&self.sql, self.arguments.as_ref());
    }

    /// Advance one row. `Ok(true)` when a row is available.
    fn step(&mut self) -> Result<bool> {
        // SAFETY: handle is valid until drop
        let rc = unsafe { ffi::sqlite3_step(self.handle) };
        match rc {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            _ => {
                let error = self.step_error();
                self.reset();
                Err(error)
            }
        }
    }

    fn step_error(&self) -> Error {
        // Handle stays valid while this statement is alive.
        match self.database.handle() {
            // SAFETY: db is valid
            Ok(db) => Error::Query(unsafe {
                ffi::last_error(db, Some(&self.sql), self.arguments.as_ref())
            }),
            Err(e) => e,
        }
    }

    fn reset(&mut self) {
        // SAFETY: handle is valid until drop
        unsafe {
            ffi::sqlite3_reset(self.handle);
        }
    }

    fn read_row(&self) -> Row {
        let values = (0..self.columns.len())
            .map(|i| {
                // SAFETY: the last step returned SQLITE_ROW and i is in range
                unsafe { types::read_column(self.handle, i as c_int) }
            })
            .collect();
        Row::with_columns(Arc::clone(&self.columns), values)
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        // SAFETY: handle is valid and finalized exactly once
        unsafe {
            ffi::sqlite3_finalize(self.handle);
        }
    }
}

/// A statement that produces rows.
pub struct SelectStatement<'db> {
    statement: Statement<'db>,
}

impl<'db> SelectStatement<'db> {
    pub(crate) fn new(statement: Statement<'db>) -> Self {
        Self { statement }
    }

    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn column_names(&self) -> &[String] {
        self.statement.column_names()
    }

    pub fn parameter_count(&self) -> usize {
        self.statement.parameter_count()
    }

    /// Run the statement and iterate its rows lazily.
    ///
    /// Each row is copied out of the engine as it is stepped. The iterator
    /// ends after the first error.
    pub fn rows(&mut self, arguments: impl Into<Option<QueryArguments>>) -> Result<Rows<'_, 'db>> {
        self.statement.bind(arguments.into())?;
        self.statement.will_execute();
        tracing::debug!(sql = %self.statement.sql, "select");
        Ok(Rows {
            statement: &mut self.statement,
            done: false,
        })
    }

    /// Run the statement and collect every row.
    pub fn fetch_rows(&mut self, arguments: impl Into<Option<QueryArguments>>) -> Result<Vec<Row>> {
        self.rows(arguments)?.collect()
    }

    /// Run the statement and return its first row, if any.
    pub fn fetch_one_row(
        &mut self,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Option<Row>> {
        self.rows(arguments)?.next().transpose()
    }

    /// Decode the first column of every row. NULL and mismatched values
    /// are `None`.
    pub fn fetch_values<T: FromValue>(
        &mut self,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Vec<Option<T>>> {
        self.rows(arguments)?
            .map(|row| row.map(|row| first_value(&row)))
            .collect()
    }

    /// Decode the first column of the first row.
    ///
    /// `None` when there is no row, or when the value is NULL or mismatched.
    pub fn fetch_one<T: FromValue>(
        &mut self,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Option<T>> {
        Ok(self
            .fetch_one_row(arguments)?
            .and_then(|row| first_value(&row)))
    }
}

fn first_value<T: FromValue>(row: &Row) -> Option<T> {
    row.get(0).and_then(|value| value.decode())
}

/// Lazy cursor over a select statement's rows.
pub struct Rows<'stmt, 'db> {
    statement: &'stmt mut Statement<'db>,
    done: bool,
}

impl Iterator for Rows<'_, '_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.statement.step() {
            Ok(true) => Some(Ok(self.statement.read_row())),
            Ok(false) => {
                self.done = true;
                self.statement.reset();
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for Rows<'_, '_> {
    fn drop(&mut self) {
        if !self.done {
            self.statement.reset();
        }
    }
}

/// A statement that changes the database.
pub struct UpdateStatement<'db> {
    statement: Statement<'db>,
}

impl<'db> UpdateStatement<'db> {
    pub(crate) fn new(statement: Statement<'db>) -> Self {
        Self { statement }
    }

    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn parameter_count(&self) -> usize {
        self.statement.parameter_count()
    }

    /// Run the statement to completion.
    ///
    /// Every call runs the statement again; call once per argument set.
    pub fn execute(&mut self, arguments: impl Into<Option<QueryArguments>>) -> Result<Changes> {
        self.statement.bind(arguments.into())?;
        self.statement.will_execute();

        let database = self.statement.database;
        let total_before = database.total_changes()?;
        while self.statement.step()? {}
        self.statement.reset();

        // sqlite3_changes keeps the count of the last DML statement, so it is
        // only trusted when this statement changed something.
        let changed_row_count = if database.total_changes()? == total_before {
            0
        } else {
            database.changes()?
        };
        let inserted_row_id = if changed_row_count > 0 && is_insert(&self.statement.sql) {
            Some(database.last_insert_rowid()?)
        } else {
            None
        };

        tracing::debug!(
            sql = %self.statement.sql,
            changed_row_count,
            ?inserted_row_id,
            "execute"
        );

        Ok(Changes {
            changed_row_count,
            inserted_row_id,
        })
    }
}

/// True when `sql` holds only whitespace, `;` and comments.
fn is_blank_sql(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if rest.is_empty() {
            return true;
        }
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            // An unterminated block comment runs to the end of the input.
            rest = comment.split_once("*/").map_or("", |(_, after)| after);
        } else {
            return false;
        }
    }
}

fn is_insert(sql: &str) -> bool {
    matches!(main_verb(sql).as_deref(), Some("INSERT" | "REPLACE"))
}

/// The statement's leading keyword, upper-cased.
///
/// Comments and quoted text are skipped. For `WITH ...` the common table
/// expressions are skipped too, and the verb of the main statement is
/// returned.
fn main_verb(sql: &str) -> Option<String> {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut with_clause = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_past(bytes, i + 2, b"\n");
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_past(bytes, i + 2, b"*/");
            }
            quote @ (b'\'' | b'"' | b'`') => i = skip_past(bytes, i + 1, &[quote]),
            b'[' => i = skip_past(bytes, i + 1, b"]"),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if depth > 0 {
                    continue;
                }
                let word = sql[start..i].to_ascii_uppercase();
                if !with_clause {
                    if word != "WITH" {
                        return Some(word);
                    }
                    with_clause = true;
                } else if matches!(
                    word.as_str(),
                    "INSERT" | "REPLACE" | "UPDATE" | "DELETE" | "SELECT" | "VALUES"
                ) {
                    return Some(word);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Index just past the next `terminator` at or after `from`, or the end.
fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| {
            rest.windows(terminator.len())
                .position(|window| window == terminator)
        })
        .map_or(bytes.len(), |offset| from + offset + terminator.len())
}
