//! Helpers over the raw `libsqlite3-sys` bindings.
//!
//! The bindings themselves are re-exported crate-wide from here so every
//! module reaches the C API through `crate::ffi`.

#![allow(clippy::cast_sign_loss)]

pub(crate) use libsqlite3_sys::*;

use litemodel_core::{DatabaseError, QueryArguments};
use std::ffi::{CStr, c_char, c_int};

/// Get the SQLite library version string.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a static string
    unsafe {
        let ptr = sqlite3_libversion();
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown")
    }
}

/// Get the SQLite library version as a number.
pub fn version_number() -> i32 {
    // SAFETY: sqlite3_libversion_number is always safe to call
    unsafe { sqlite3_libversion_number() }
}

/// Convert an SQLite result code to a human-readable string.
pub fn error_string(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a static string
    unsafe {
        let ptr = sqlite3_errstr(code);
        if ptr.is_null() {
            return "unknown error";
        }
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown error")
    }
}

/// Copy a C string owned by SQLite.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

/// The connection's current error message.
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub(crate) unsafe fn errmsg(db: *mut sqlite3) -> String {
    // SAFETY: db is valid per the caller's contract
    unsafe { string_from_ptr(sqlite3_errmsg(db)) }.unwrap_or_default()
}

/// Capture the connection's current error as a [`DatabaseError`].
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub(crate) unsafe fn last_error(
    db: *mut sqlite3,
    sql: Option<&str>,
    arguments: Option<&QueryArguments>,
) -> DatabaseError {
    // SAFETY: db is valid per the caller's contract
    let (code, message) = unsafe { (sqlite3_extended_errcode(db), errmsg(db)) };
    DatabaseError {
        code,
        message,
        sql: sql.map(str::to_string),
        arguments: arguments
            .filter(|arguments| !arguments.is_empty())
            .map(ToString::to_string),
    }
}
