//! Value encoding and decoding between Rust and SQLite.
//!
//! SQLite has 5 storage classes and `Value` has one variant for each, so
//! binding and reading are one-to-one:
//! - INTEGER: `Value::Integer`
//! - REAL: `Value::Real`
//! - TEXT: `Value::Text` (UTF-8; invalid sequences are replaced when read)
//! - BLOB: `Value::Blob`
//! - NULL: `Value::Null`

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::ffi;
use litemodel_core::Value;
use std::ffi::{c_int, c_void};

/// Bind a Value to a prepared statement parameter.
///
/// Text and blobs are copied by SQLite (`SQLITE_TRANSIENT`), so the value
/// may be dropped as soon as this returns.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` must be a valid 1-based parameter index
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: stmt and index are valid per the caller's contract; pointers
    // and lengths come from live Rust buffers.
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),

            Value::Integer(v) => ffi::sqlite3_bind_int64(stmt, index, *v),

            Value::Real(v) => ffi::sqlite3_bind_double(stmt, index, *v),

            Value::Text(s) => {
                let bytes = s.as_bytes();
                ffi::sqlite3_bind_text(
                    stmt,
                    index,
                    bytes.as_ptr().cast(),
                    bytes.len() as c_int,
                    ffi::SQLITE_TRANSIENT(),
                )
            }

            Value::Blob(b) => ffi::sqlite3_bind_blob(
                stmt,
                index,
                b.as_ptr().cast::<c_void>(),
                b.len() as c_int,
                ffi::SQLITE_TRANSIENT(),
            ),
        }
    }
}

/// Read a column value from the current result row.
///
/// # Safety
/// - `stmt` must be a valid statement that just returned `SQLITE_ROW`
/// - `index` must be a valid 0-based column index
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Value {
    // SAFETY: stmt is positioned on a row per the caller's contract. The
    // text/blob pointers stay valid until the next step, and are copied
    // before returning.
    unsafe {
        match ffi::sqlite3_column_type(stmt, index) {
            ffi::SQLITE_NULL => Value::Null,

            ffi::SQLITE_INTEGER => Value::Integer(ffi::sqlite3_column_int64(stmt, index)),

            ffi::SQLITE_FLOAT => Value::Real(ffi::sqlite3_column_double(stmt, index)),

            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    Value::Text(String::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr, len as usize);
                    Value::Text(String::from_utf8_lossy(slice).into_owned())
                }
            }

            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() || len == 0 {
                    Value::Blob(Vec::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Blob(slice.to_vec())
                }
            }

            _ => Value::Null,
        }
    }
}

/// Get the name of a result column.
///
/// # Safety
/// - `stmt` must be a valid prepared statement handle
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: per the caller's contract
    unsafe { ffi::string_from_ptr(ffi::sqlite3_column_name(stmt, index)) }
}

/// Get the name of a parameter, including its `:`, `@`, `$` or `?` prefix.
///
/// Returns `None` for anonymous `?` parameters.
///
/// # Safety
/// - `stmt` must be a valid prepared statement handle
/// - `index` must be a valid 1-based parameter index
pub unsafe fn parameter_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: per the caller's contract
    unsafe { ffi::string_from_ptr(ffi::sqlite3_bind_parameter_name(stmt, index)) }
}
