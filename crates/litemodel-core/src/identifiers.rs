//! SQL identifier quoting and statement fragments.
//!
//! Table and column names declared by row models are always quoted before
//! they are spliced into generated SQL.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
///
/// ```
/// use litemodel_core::quote_ident;
///
/// assert_eq!(quote_ident("persons"), "\"persons\"");
/// assert_eq!(quote_ident("per\"son"), "\"per\"\"son\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote each name and join with commas: `"a", "b"`.
pub fn quote_ident_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `count` anonymous parameters joined with commas: `?, ?, ?`.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Equality conditions on each name, one parameter each: `"a" = ? AND "b" = ?`.
pub fn equality_conditions(names: &[&str], separator: &str) -> String {
    names
        .iter()
        .map(|name| format!("{} = ?", quote_ident(name)))
        .collect::<Vec<_>>()
        .join(separator)
}
