//! SQLite connection.
//!
//! A [`Database`] owns one engine handle. It compiles statements, runs
//! one-off SQL and wraps blocks of work in transactions. It is `Send` but
//! not `Sync`: share it between threads through a
//! [`DatabaseQueue`](crate::DatabaseQueue).

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::result_large_err)] // Error type is defined in litemodel-core

use crate::config::Configuration;
use crate::ffi;
use crate::statement::{Changes, SelectStatement, Statement, UpdateStatement};
use litemodel_core::{
    DatabaseError, Error, FromValue, QueryArguments, Result, Row, UsageErrorKind,
};
use std::cell::Cell;
use std::ffi::{CString, c_int};
use std::fmt;
use std::ptr;

/// Locking behavior of a transaction's `BEGIN` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionKind {
    /// No lock until the first read or write.
    Deferred,
    /// Take the write lock immediately.
    Immediate,
    /// Take an exclusive lock immediately.
    #[default]
    Exclusive,
}

impl TransactionKind {
    fn begin_sql(self) -> &'static str {
        match self {
            TransactionKind::Deferred => "BEGIN DEFERRED TRANSACTION",
            TransactionKind::Immediate => "BEGIN IMMEDIATE TRANSACTION",
            TransactionKind::Exclusive => "BEGIN EXCLUSIVE TRANSACTION",
        }
    }
}

/// How a transaction block wants its transaction to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCompletion {
    Commit,
    Rollback,
}

/// A connection to a SQLite database.
pub struct Database {
    handle: *mut ffi::sqlite3,
    path: String,
    configuration: Configuration,
    in_transaction: Cell<bool>,
}

// SAFETY: the handle is opened in SQLite's default serialized threading mode
// and a Database is only ever used by one thread at a time (it is not Sync).
unsafe impl Send for Database {}

impl Database {
    /// Open or create the database at `path`.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: impl Into<String>, configuration: Configuration) -> Result<Self> {
        let path = path.into();
        let c_path = CString::new(path.as_str()).map_err(|_| {
            Error::Open(DatabaseError {
                code: ffi::SQLITE_CANTOPEN,
                message: "invalid path: contains null byte".to_string(),
                sql: None,
                arguments: None,
            })
        })?;

        let mut handle: *mut ffi::sqlite3 = ptr::null_mut();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe {
            ffi::sqlite3_open_v2(
                c_path.as_ptr(),
                &raw mut handle,
                configuration.open_flags(),
                ptr::null(),
            )
        };

        if rc != ffi::SQLITE_OK {
            let message = if handle.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: handle is allocated even on failure and must be closed
                unsafe {
                    let message = ffi::errmsg(handle);
                    ffi::sqlite3_close(handle);
                    message
                }
            };
            tracing::warn!(path = %path, code = rc, %message, "failed to open database");
            return Err(Error::Open(DatabaseError {
                code: rc,
                message,
                sql: None,
                arguments: None,
            }));
        }

        if configuration.busy_timeout_ms > 0 {
            // SAFETY: handle is valid
            unsafe {
                ffi::sqlite3_busy_timeout(handle, configuration.busy_timeout_ms as c_int);
            }
        }

        let database = Self {
            handle,
            path,
            configuration,
            in_transaction: Cell::new(false),
        };

        // The bundled engine enables foreign keys by default, so the pragma
        // runs in both directions.
        database.execute_batch(if database.configuration.foreign_keys_enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        })?;

        tracing::debug!(
            path = %database.path,
            readonly = database.configuration.readonly,
            foreign_keys = database.configuration.foreign_keys_enabled,
            "opened database"
        );
        Ok(database)
    }

    /// Open a private in-memory database with the default configuration.
    pub fn open_memory() -> Result<Self> {
        Self::open(":memory:", Configuration::default())
    }

    /// The path this database was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_null()
    }

    /// True while an [`in_transaction`](Self::in_transaction) block runs.
    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    /// Close the connection.
    ///
    /// Closing twice is a no-op. Every later use reports a
    /// `ConnectionClosed` usage error.
    pub fn close(&mut self) -> Result<()> {
        if self.handle.is_null() {
            return Ok(());
        }

        // SAFETY: handle is valid; statements borrow self, so none is alive
        let rc = unsafe { ffi::sqlite3_close(self.handle) };
        if rc != ffi::SQLITE_OK {
            // SAFETY: handle is still open after a failed close
            let error = unsafe { ffi::last_error(self.handle, None, None) };
            tracing::warn!(path = %self.path, code = error.code, "failed to close database");
            return Err(Error::Query(error));
        }

        self.handle = ptr::null_mut();
        tracing::debug!(path = %self.path, "closed database");
        Ok(())
    }

    pub(crate) fn handle(&self) -> Result<*mut ffi::sqlite3> {
        if self.handle.is_null() {
            Err(Error::usage(
                UsageErrorKind::ConnectionClosed,
                format!("database {} is closed", self.path),
            ))
        } else {
            Ok(self.handle)
        }
    }

    pub(crate) fn trace(&self, sql: &str, arguments: Option<&QueryArguments>) {
        if let Some(trace) = &self.configuration.trace {
            trace(sql, arguments);
        }
    }

    /// The engine's most recent error message.
    pub fn last_error_message(&self) -> Option<String> {
        let handle = self.handle().ok()?;
        // SAFETY: handle is valid
        Some(unsafe { ffi::errmsg(handle) })
    }

    /// Row id of the most recent successful INSERT on this connection.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        let handle = self.handle()?;
        // SAFETY: handle is valid
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(handle) })
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> Result<usize> {
        let handle = self.handle()?;
        // SAFETY: handle is valid
        Ok(unsafe { ffi::sqlite3_changes(handle) } as usize)
    }

    /// Rows changed since the connection opened.
    pub fn total_changes(&self) -> Result<i64> {
        let handle = self.handle()?;
        // SAFETY: handle is valid
        Ok(i64::from(unsafe { ffi::sqlite3_total_changes(handle) }))
    }

    /// Compile a statement that produces rows.
    pub fn select_statement(&self, sql: &str) -> Result<SelectStatement<'_>> {
        Statement::prepare(self, sql).map(SelectStatement::new)
    }

    /// Compile a statement that changes the database.
    pub fn update_statement(&self, sql: &str) -> Result<UpdateStatement<'_>> {
        Statement::prepare(self, sql).map(UpdateStatement::new)
    }

    /// Compile and run a single statement once.
    pub fn execute(
        &self,
        sql: &str,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Changes> {
        self.update_statement(sql)?.execute(arguments)
    }

    /// Run one or more `;`-separated statements without arguments.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let handle = self.handle()?;
        let c_sql = CString::new(sql).map_err(|_| {
            Error::Compile(DatabaseError {
                code: ffi::SQLITE_MISUSE,
                message: "SQL contains null byte".to_string(),
                sql: Some(sql.to_string()),
                arguments: None,
            })
        })?;

        self.trace(sql, None);
        tracing::debug!(sql, "execute batch");

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(
                handle,
                c_sql.as_ptr(),
                None,
                ptr::null_mut(),
                &raw mut errmsg,
            )
        };

        if rc != ffi::SQLITE_OK {
            // SAFETY: errmsg is null or allocated by sqlite3_exec
            let message = unsafe {
                let message = ffi::string_from_ptr(errmsg);
                ffi::sqlite3_free(errmsg.cast());
                message
            };
            // SAFETY: handle is valid
            let code = unsafe { ffi::sqlite3_extended_errcode(handle) };
            return Err(Error::Query(DatabaseError {
                code,
                message: message.unwrap_or_else(|| ffi::error_string(rc).to_string()),
                sql: Some(sql.to_string()),
                arguments: None,
            }));
        }

        Ok(())
    }

    /// Run a query and collect every row.
    pub fn fetch_rows(
        &self,
        sql: &str,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Vec<Row>> {
        self.select_statement(sql)?.fetch_rows(arguments)
    }

    /// Run a query and return its first row, if any.
    pub fn fetch_one_row(
        &self,
        sql: &str,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Option<Row>> {
        self.select_statement(sql)?.fetch_one_row(arguments)
    }

    /// Decode the first column of every row.
    pub fn fetch_values<T: FromValue>(
        &self,
        sql: &str,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Vec<Option<T>>> {
        self.select_statement(sql)?.fetch_values(arguments)
    }

    /// Decode the first column of the first row.
    pub fn fetch_one<T: FromValue>(
        &self,
        sql: &str,
        arguments: impl Into<Option<QueryArguments>>,
    ) -> Result<Option<T>> {
        self.select_statement(sql)?.fetch_one(arguments)
    }

    /// Whether a table named `name` exists, compared case-insensitively.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let row = self.fetch_one_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND LOWER(name) = LOWER(?)",
            litemodel_core::args![name],
        )?;
        Ok(row.is_some())
    }

    /// Run `block` inside a transaction.
    ///
    /// The transaction commits or rolls back according to the block's
    /// [`TransactionCompletion`]. When the block fails, the transaction is
    /// rolled back and the block's error is returned. When the commit fails,
    /// a rollback is attempted and the commit error is returned.
    ///
    /// Transactions do not nest: calling this from inside a block returns a
    /// `NestedTransaction` usage error.
    pub fn in_transaction<F>(&self, kind: TransactionKind, block: F) -> Result<()>
    where
        F: FnOnce(&Database) -> Result<TransactionCompletion>,
    {
        if self.in_transaction.get() {
            return Err(Error::usage(
                UsageErrorKind::NestedTransaction,
                "a transaction is already active on this connection",
            ));
        }

        self.execute_batch(kind.begin_sql())?;
        tracing::debug!(?kind, "began transaction");
        self.in_transaction.set(true);
        let guard = TransactionGuard { database: self };

        let result = match block(self) {
            Ok(TransactionCompletion::Commit) => match self.execute_batch("COMMIT TRANSACTION") {
                Ok(()) => {
                    tracing::debug!("committed transaction");
                    Ok(())
                }
                Err(e) => {
                    self.rollback_after_error(&e);
                    Err(e)
                }
            },
            Ok(TransactionCompletion::Rollback) => self.rollback(),
            Err(e) => {
                self.rollback_after_error(&e);
                Err(e)
            }
        };

        drop(guard);
        result
    }

    fn rollback(&self) -> Result<()> {
        // SQLite may already have rolled back on its own, e.g. after a
        // failed COMMIT or an I/O error.
        if self.is_autocommit() {
            return Ok(());
        }
        self.execute_batch("ROLLBACK TRANSACTION")?;
        tracing::debug!("rolled back transaction");
        Ok(())
    }

    fn rollback_after_error(&self, error: &Error) {
        if let Err(rollback_error) = self.rollback() {
            tracing::warn!(
                %error,
                %rollback_error,
                "rollback failed after transaction error"
            );
        }
    }

    fn is_autocommit(&self) -> bool {
        match self.handle() {
            // SAFETY: handle is valid
            Ok(handle) => unsafe { ffi::sqlite3_get_autocommit(handle) != 0 },
            Err(_) => true,
        }
    }
}

/// Clears the transaction flag, and rolls back when the block panicked.
struct TransactionGuard<'db> {
    database: &'db Database,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Err(error) = self.database.rollback() {
                tracing::warn!(%error, "rollback failed while unwinding");
            }
        }
        self.database.in_transaction.set(false);
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: handle is valid and closed exactly once; statements
            // borrow self, so none is alive here
            unsafe {
                ffi::sqlite3_close(self.handle);
            }
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("in_transaction", &self.in_transaction.get())
            .field("configuration", &self.configuration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litemodel_core::{BindingErrorKind, args};
    use std::sync::{Arc, Mutex};

    fn with_table() -> Database {
        let db = Database::open_memory().unwrap();
        db.execute_batch("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        db
    }

    fn count(db: &Database) -> i64 {
        db.fetch_one::<i64>("SELECT COUNT(*) FROM test", None)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_open_memory() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.path(), ":memory:");
        assert!(!db.is_closed());
        assert!(!db.is_in_transaction());
    }

    #[test]
    fn test_open_failure() {
        let err = Database::open(
            "/nonexistent-dir/sub/db.sqlite",
            Configuration::new().readonly(true),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Open(_)));
        assert_eq!(err.code(), Some(ffi::SQLITE_CANTOPEN));
    }

    #[test]
    fn test_execute_batch() {
        let db = with_table();
        db.execute_batch("INSERT INTO test (name) VALUES ('Alice'); INSERT INTO test (name) VALUES ('Bob');")
            .unwrap();
        assert_eq!(count(&db), 2);
        assert_eq!(db.last_insert_rowid().unwrap(), 2);
    }

    #[test]
    fn test_execute_reports_changes() {
        let db = with_table();
        let changes = db
            .execute("INSERT INTO test (name) VALUES (?)", args!["Alice"])
            .unwrap();
        assert_eq!(changes.changed_row_count, 1);
        assert_eq!(changes.inserted_row_id, Some(1));

        let changes = db
            .execute("DELETE FROM test WHERE name = ?", args!["Nobody"])
            .unwrap();
        assert_eq!(changes.changed_row_count, 0);
    }

    #[test]
    fn test_execute_rejects_extra_arguments() {
        let db = with_table();
        let err = db
            .execute("INSERT INTO test (name) VALUES ('x')", args!["y"])
            .unwrap_err();
        let Error::Binding(e) = err else {
            panic!("expected a binding error, got {err}");
        };
        assert_eq!(e.kind, BindingErrorKind::CountMismatch);
    }

    #[test]
    fn test_table_exists() {
        let db = with_table();
        assert!(db.table_exists("test").unwrap());
        assert!(db.table_exists("TEST").unwrap());
        assert!(!db.table_exists("missing").unwrap());
    }

    #[test]
    fn test_foreign_keys_pragma() {
        let db = Database::open_memory().unwrap();
        assert_eq!(
            db.fetch_one::<bool>("PRAGMA foreign_keys", None).unwrap(),
            Some(true)
        );

        let db = Database::open(":memory:", Configuration::new().foreign_keys_enabled(false))
            .unwrap();
        assert_eq!(
            db.fetch_one::<bool>("PRAGMA foreign_keys", None).unwrap(),
            Some(false)
        );
    }

    #[test]
    fn test_foreign_keys_disabled_allows_orphans() {
        let db = Database::open(":memory:", Configuration::new().foreign_keys_enabled(false))
            .unwrap();
        db.execute_batch(
            "CREATE TABLE parents (id INTEGER PRIMARY KEY);
             CREATE TABLE children (parent INTEGER REFERENCES parents(id));",
        )
        .unwrap();
        db.execute("INSERT INTO children (parent) VALUES (?)", args![42])
            .unwrap();

        let db = Database::open_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE parents (id INTEGER PRIMARY KEY);
             CREATE TABLE children (parent INTEGER REFERENCES parents(id));",
        )
        .unwrap();
        let err = db
            .execute("INSERT INTO children (parent) VALUES (?)", args![42])
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_transaction_commit_and_rollback() {
        let db = with_table();

        db.in_transaction(TransactionKind::default(), |db| {
            assert!(db.is_in_transaction());
            db.execute("INSERT INTO test (name) VALUES (?)", args!["Alice"])?;
            Ok(TransactionCompletion::Rollback)
        })
        .unwrap();
        assert_eq!(count(&db), 0);
        assert!(!db.is_in_transaction());

        db.in_transaction(TransactionKind::Deferred, |db| {
            db.execute("INSERT INTO test (name) VALUES (?)", args!["Bob"])?;
            Ok(TransactionCompletion::Commit)
        })
        .unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_transaction_error_rolls_back() {
        let db = with_table();
        let err = db
            .in_transaction(TransactionKind::Immediate, |db| {
                db.execute("INSERT INTO test (id, name) VALUES (1, 'a')", None)?;
                db.execute("INSERT INTO test (id, name) VALUES (1, 'b')", None)?;
                Ok(TransactionCompletion::Commit)
            })
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(count(&db), 0);
        assert!(!db.is_in_transaction());
    }

    #[test]
    fn test_nested_transaction_is_rejected() {
        let db = with_table();
        let mut inner = None;
        db.in_transaction(TransactionKind::default(), |db| {
            inner = Some(db.in_transaction(TransactionKind::default(), |_| {
                Ok(TransactionCompletion::Commit)
            }));
            Ok(TransactionCompletion::Commit)
        })
        .unwrap();
        let err = inner.unwrap().unwrap_err();
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::NestedTransaction));
    }

    #[test]
    fn test_transaction_rolls_back_on_panic() {
        let db = with_table();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = db.in_transaction(TransactionKind::default(), |db| {
                db.execute("INSERT INTO test (name) VALUES ('a')", None)?;
                panic!("boom");
            });
        }));
        assert!(outcome.is_err());
        assert!(!db.is_in_transaction());
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut db = with_table();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());
        assert!(db.last_error_message().is_none());

        let err = db.execute("SELECT 1", None).unwrap_err();
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::ConnectionClosed));
    }

    #[test]
    fn test_trace_hook_sees_sql_and_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let config = Configuration::new().trace(move |sql, arguments| {
            let rendered = arguments.map(ToString::to_string).unwrap_or_default();
            sink.lock().unwrap().push(format!("{sql} {rendered}"));
        });
        let db = Database::open(":memory:", config).unwrap();
        db.execute("CREATE TABLE t (x)", None).unwrap();
        db.execute("INSERT INTO t VALUES (?)", args![1]).unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&"CREATE TABLE t (x) ".to_string()));
        assert!(seen.contains(&"INSERT INTO t VALUES (?) [1]".to_string()));
    }

    #[test]
    fn test_last_error_message() {
        let db = Database::open_memory().unwrap();
        let _ = db.execute("SELECT * FROM missing", None);
        assert!(db.last_error_message().unwrap().contains("no such table"));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let path = path.to_str().unwrap().to_string();

        let mut db = Database::open(path.clone(), Configuration::default()).unwrap();
        db.execute_batch("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT); INSERT INTO test (name) VALUES ('Alice');")
            .unwrap();
        db.close().unwrap();

        let db = Database::open(path, Configuration::new().readonly(true)).unwrap();
        assert_eq!(count(&db), 1);
        assert!(db.execute("DELETE FROM test", None).is_err());
    }
}
