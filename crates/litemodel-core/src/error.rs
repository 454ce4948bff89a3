//! Error types for LiteModel operations.

use std::fmt;

/// Primary result code of SQLite constraint violations (`SQLITE_CONSTRAINT`).
const CONSTRAINT_RESULT_CODE: i32 = 19;

/// The primary error type for all LiteModel operations.
#[derive(Debug)]
pub enum Error {
    /// The engine refused to open the database
    Open(DatabaseError),
    /// SQL text failed to compile
    Compile(DatabaseError),
    /// Arguments did not match the statement's parameters
    Binding(BindingError),
    /// The engine failed while executing a statement
    Query(DatabaseError),
    /// Type conversion errors
    Type(TypeError),
    /// A row model's primary key is unset where one is required
    InvalidPrimaryKey(RecordError),
    /// A row model's primary key matched no stored row
    RowNotFound(RecordError),
    /// The API was used in a way it does not support
    Usage(UsageError),
}

/// An error reported by the database engine.
///
/// `code` is the engine's (extended) result code and `message` its error
/// message, both verbatim.
#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub code: i32,
    pub message: String,
    pub sql: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BindingError {
    pub kind: BindingErrorKind,
    pub sql: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// Positional argument count differs from the parameter count
    CountMismatch,
    /// A named parameter has no matching argument
    MissingName,
    /// Named arguments were given to a statement with anonymous parameters
    UnnamedParameter,
    /// The engine rejected a bound value
    Engine,
}

#[derive(Debug, Clone)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

/// The record a primary-key error is about.
#[derive(Debug, Clone)]
pub struct RecordError {
    pub table: String,
    /// Rendered primary key, e.g. `id = 1`
    pub key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// A transaction was requested while one is already active
    NestedTransaction,
    /// The serialized queue was entered from inside one of its own operations
    ReentrantAccess,
    /// The operation needs a primary key and the table declares none
    UnsupportedOperation,
    /// A migration name was registered twice
    DuplicateMigration,
    /// The connection has been closed
    ConnectionClosed,
}

impl Error {
    /// Build a usage error.
    pub fn usage(kind: UsageErrorKind, message: impl Into<String>) -> Self {
        Error::Usage(UsageError {
            kind,
            message: message.into(),
        })
    }

    /// Get the engine's result code, if this error came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Open(e) | Error::Compile(e) | Error::Query(e) => Some(e.code),
            _ => None,
        }
    }

    /// Is this a constraint violation (unique, not null, foreign key, ...)?
    pub fn is_constraint_violation(&self) -> bool {
        self.code()
            .is_some_and(|code| code & 0xff == CONSTRAINT_RESULT_CODE)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Open(e) | Error::Compile(e) | Error::Query(e) => e.sql.as_deref(),
            Error::Binding(e) => Some(&e.sql),
            _ => None,
        }
    }

    /// Get the usage error kind, if this is a usage error.
    pub fn usage_kind(&self) -> Option<UsageErrorKind> {
        match self {
            Error::Usage(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn is_invalid_primary_key(&self) -> bool {
        matches!(self, Error::InvalidPrimaryKey(_))
    }

    pub fn is_row_not_found(&self) -> bool {
        matches!(self, Error::RowNotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Open(e) => write!(f, "Open error: {}", e),
            Error::Compile(e) => write!(f, "Compile error: {}", e),
            Error::Binding(e) => write!(f, "Binding error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::InvalidPrimaryKey(e) => write!(f, "Invalid primary key: {}", e),
            Error::RowNotFound(e) => write!(f, "Row not found: {}", e),
            Error::Usage(e) => write!(f, "Usage error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQLite error {}: {}", self.code, self.message)?;
        if let Some(sql) = &self.sql {
            write!(f, " - while executing `{}`", sql)?;
        }
        if let Some(arguments) = &self.arguments {
            write!(f, " with arguments {}", arguments)?;
        }
        Ok(())
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - in `{}`", self.message, self.sql)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "table {} ({})", self.table, key),
            None => write!(f, "table {}", self.table),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DatabaseError {}
impl std::error::Error for BindingError {}
impl std::error::Error for TypeError {}
impl std::error::Error for UsageError {}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::Binding(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

/// Result type alias for LiteModel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_error(code: i32) -> DatabaseError {
        DatabaseError {
            code,
            message: "UNIQUE constraint failed: persons.id".to_string(),
            sql: Some("INSERT INTO persons (id) VALUES (?)".to_string()),
            arguments: Some("[1]".to_string()),
        }
    }

    #[test]
    fn test_constraint_helpers() {
        // SQLITE_CONSTRAINT_PRIMARYKEY
        let err = Error::Query(engine_error(1555));
        assert_eq!(err.code(), Some(1555));
        assert!(err.is_constraint_violation());
        assert_eq!(err.sql(), Some("INSERT INTO persons (id) VALUES (?)"));

        let busy = Error::Query(engine_error(5));
        assert!(!busy.is_constraint_violation());
    }

    #[test]
    fn test_display_database_error() {
        let err = Error::Query(engine_error(19));
        assert_eq!(
            err.to_string(),
            "Query error: SQLite error 19: UNIQUE constraint failed: persons.id \
             - while executing `INSERT INTO persons (id) VALUES (?)` with arguments [1]"
        );
    }

    #[test]
    fn test_primary_key_errors_are_distinct() {
        let record = RecordError {
            table: "persons".to_string(),
            key: Some("id = 1".to_string()),
        };
        let invalid = Error::InvalidPrimaryKey(record.clone());
        let missing = Error::RowNotFound(record);
        assert!(invalid.is_invalid_primary_key());
        assert!(!invalid.is_row_not_found());
        assert!(missing.is_row_not_found());
        assert_eq!(missing.to_string(), "Row not found: table persons (id = 1)");
        assert_eq!(missing.code(), None);
    }

    #[test]
    fn test_usage_kind() {
        let err = Error::usage(UsageErrorKind::NestedTransaction, "already in a transaction");
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::NestedTransaction));
        assert_eq!(err.to_string(), "Usage error: already in a transaction");
        let type_error = Error::Type(TypeError {
            expected: "i64",
            actual: "TEXT".to_string(),
            column: None,
        });
        assert_eq!(type_error.usage_kind(), None);
    }
}
