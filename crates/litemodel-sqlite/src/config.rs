//! Connection configuration.

use crate::ffi;
use litemodel_core::QueryArguments;
use std::ffi::c_int;
use std::fmt;
use std::sync::Arc;

/// A trace hook, called with the SQL text and bound arguments before each
/// statement execution.
pub type TraceFunction = Arc<dyn Fn(&str, Option<&QueryArguments>) + Send + Sync>;

/// Configuration for opening a [`Database`](crate::Database).
///
/// Read once when the connection opens.
///
/// ```
/// use litemodel_sqlite::Configuration;
///
/// let config = Configuration::new()
///     .readonly(true)
///     .trace(Configuration::log_sql);
/// assert!(config.foreign_keys_enabled);
/// ```
#[derive(Clone)]
pub struct Configuration {
    /// Run `PRAGMA foreign_keys = ON` when the connection opens.
    pub foreign_keys_enabled: bool,
    /// Open the database read-only. Otherwise it is opened read-write and
    /// created if missing.
    pub readonly: bool,
    /// Optional statement trace hook.
    pub trace: Option<TraceFunction>,
    /// Busy timeout in milliseconds; 0 disables it.
    pub busy_timeout_ms: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            foreign_keys_enabled: true,
            readonly: false,
            trace: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable foreign key enforcement.
    pub fn foreign_keys_enabled(mut self, enabled: bool) -> Self {
        self.foreign_keys_enabled = enabled;
        self
    }

    /// Open read-only.
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Install a trace hook.
    pub fn trace<F>(mut self, trace: F) -> Self
    where
        F: Fn(&str, Option<&QueryArguments>) + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(trace));
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// A trace hook that logs every statement through `tracing` at INFO.
    pub fn log_sql(sql: &str, arguments: Option<&QueryArguments>) {
        match arguments {
            Some(arguments) if !arguments.is_empty() => {
                tracing::info!(target: "litemodel::sql", sql, %arguments, "SQL");
            }
            _ => tracing::info!(target: "litemodel::sql", sql, "SQL"),
        }
    }

    pub(crate) fn open_flags(&self) -> c_int {
        if self.readonly {
            ffi::SQLITE_OPEN_READONLY
        } else {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("foreign_keys_enabled", &self.foreign_keys_enabled)
            .field("readonly", &self.readonly)
            .field("trace", &self.trace.is_some())
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert!(config.foreign_keys_enabled);
        assert!(!config.readonly);
        assert!(config.trace.is_none());
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_open_flags() {
        assert_eq!(
            Configuration::new().open_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        assert_eq!(
            Configuration::new().readonly(true).open_flags(),
            ffi::SQLITE_OPEN_READONLY
        );
    }

    #[test]
    fn test_trace_hook_is_shared_by_clones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let config = Configuration::new().trace(move |sql, _| {
            sink.lock().unwrap().push(sql.to_string());
        });
        let copy = config.clone();
        (copy.trace.as_ref().unwrap())("SELECT 1", None);
        assert_eq!(*seen.lock().unwrap(), vec!["SELECT 1".to_string()]);
    }

    #[test]
    fn test_debug_hides_trace_function() {
        let config = Configuration::new().trace(Configuration::log_sql);
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("trace: true"));
    }
}
