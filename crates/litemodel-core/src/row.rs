//! Database row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// A statement computes this once when it is compiled; every row it produces
/// holds the same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    ///
    /// When a name appears twice, lookups by name resolve to the leftmost
    /// column.
    pub fn new(names: Vec<String>) -> Self {
        let mut name_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            name_to_index.entry(name.clone()).or_insert(i);
        }
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name. Matching is case-sensitive.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get the name of a column by index.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Check if a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a select statement.
///
/// Rows own their values. They stay valid after the statement that produced
/// them is reset, re-executed or dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values in order
    values: Vec<Value>,
    /// Shared column metadata
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    ///
    /// For multiple rows from the same result set, prefer `with_columns`
    /// to share the column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { values, columns }
    }

    /// Get the shared column metadata.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a raw value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a raw value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Check if a column exists by name.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Decode the value at `index`, or `None` for NULL and mismatched types.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Column positions are fixed by the
    /// SQL text, so a bad index is a programming error.
    pub fn value<T: FromValue>(&self, index: usize) -> Option<T> {
        self.value_at(index).decode()
    }

    /// Decode the value of the named column, or `None` for NULL, mismatched
    /// types and unknown columns.
    pub fn value_named<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get_by_name(name).and_then(Value::decode)
    }

    /// Decode the value at `index`, failing on NULL or a type mismatch.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[allow(clippy::result_large_err)]
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.value_at(index);
        T::from_value(value).map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = self.columns.name_at(index).map(str::to_string);
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Decode the value of the named column, failing on NULL, a type
    /// mismatch or an unknown column.
    #[allow(clippy::result_large_err)]
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
            })
        })?;
        T::from_value(value).map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = Some(name.to_string());
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Get all column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    fn value_at(&self, index: usize) -> &Value {
        match self.values.get(index) {
            Some(value) => value,
            None => panic!(
                "row index {} out of range (row has {} columns)",
                index,
                self.values.len()
            ),
        }
    }
}

/// Trait for converting from a `Value` to a typed value.
///
/// Conversions follow the storage class only. Text is never parsed into a
/// number; integers and reals do format into text.
pub trait FromValue: Sized {
    /// Convert from a Value, returning a type error if the conversion fails.
    #[allow(clippy::result_large_err)]
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
    })
}

/// Integer view of a value: integers, and reals with no fractional part.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(v) => Some(*v),
        Value::Real(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
            Some(*v as i64)
        }
        _ => None,
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(*v != 0),
            _ => Err(mismatch("bool", value)),
        }
    }
}

macro_rules! impl_from_value_for_integer {
    ($($ty:ty),* $(,)?) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                let v = integer_of(value).ok_or_else(|| mismatch(stringify!($ty), value))?;
                <$ty>::try_from(v).map_err(|_| {
                    Error::Type(TypeError {
                        expected: stringify!($ty),
                        actual: format!("value {} out of range", v),
                        column: None,
                    })
                })
            }
        }
    )*};
}

impl_from_value_for_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

#[allow(clippy::cast_possible_truncation)]
impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| mismatch("f32", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(v) => Ok(v.to_string()),
            Value::Real(v) => Ok(format!("{:?}", v)),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => serde_json::from_str(s).map_err(|e| {
                Error::Type(TypeError {
                    expected: "valid JSON",
                    actual: format!("invalid JSON: {}", e),
                    column: None,
                })
            }),
            _ => Err(mismatch("JSON", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_row() -> Row {
        Row::new(
            vec!["id".into(), "name".into(), "age".into()],
            vec![Value::Integer(1), Value::Text("Arthur".into()), Value::Null],
        )
    }

    #[test]
    fn test_column_info_lookup() {
        let info = ColumnInfo::new(vec!["id".into(), "name".into(), "id".into()]);
        assert_eq!(info.len(), 3);
        assert_eq!(info.index_of("id"), Some(0));
        assert_eq!(info.index_of("name"), Some(1));
        assert_eq!(info.index_of("NAME"), None);
        assert_eq!(info.name_at(2), Some("id"));
        assert!(!info.contains("age"));
    }

    #[test]
    fn test_value_by_index_and_name_agree() {
        let row = person_row();
        assert_eq!(row.value::<String>(1), row.value_named::<String>("name"));
        assert_eq!(row.value::<i64>(0), Some(1));
        assert_eq!(row.value_named::<i64>("id"), Some(1));
    }

    #[test]
    fn test_name_lookup_is_case_sensitive() {
        let row = person_row();
        assert_eq!(row.value_named::<String>("Name"), None);
        assert!(row.get_named::<String>("Name").is_err());
    }

    #[test]
    fn test_null_decodes_to_none() {
        let row = person_row();
        assert_eq!(row.value::<i64>(2), None);
        assert_eq!(row.get_as::<Option<i64>>(2).unwrap(), None);
        let err = row.get_as::<i64>(2).unwrap_err();
        match err {
            Error::Type(te) => assert_eq!(te.column.as_deref(), Some("age")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_out_of_range_panics() {
        let row = person_row();
        let _ = row.value::<i64>(3);
    }

    #[test]
    fn test_rows_are_repeatable() {
        let row = person_row();
        let first: Vec<_> = row.iter().map(|(n, v)| (n.to_string(), v.clone())).collect();
        let second: Vec<_> = row.iter().map(|(n, v)| (n.to_string(), v.clone())).collect();
        assert_eq!(first, second);
        assert_eq!(row.column_names().collect::<Vec<_>>(), ["id", "name", "age"]);
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i32::from_value(&Value::Integer(41)).unwrap(), 41);
        assert_eq!(u8::from_value(&Value::Integer(255)).unwrap(), 255);
        assert!(u8::from_value(&Value::Integer(256)).is_err());
        assert!(u64::from_value(&Value::Integer(-1)).is_err());
        assert_eq!(i64::from_value(&Value::Real(3.0)).unwrap(), 3);
        assert!(i64::from_value(&Value::Real(3.5)).is_err());
    }

    #[test]
    fn test_text_is_never_parsed_as_number() {
        assert!(i64::from_value(&Value::Text("41".into())).is_err());
        assert!(i64::from_value(&Value::Text("abc".into())).is_err());
        assert!(f64::from_value(&Value::Text("1.5".into())).is_err());
        assert!(bool::from_value(&Value::Text("1".into())).is_err());
    }

    #[test]
    fn test_numbers_format_as_text() {
        assert_eq!(String::from_value(&Value::Integer(41)).unwrap(), "41");
        assert_eq!(String::from_value(&Value::Real(1.5)).unwrap(), "1.5");
        assert!(String::from_value(&Value::Blob(vec![1])).is_err());
    }

    #[test]
    fn test_bool_conversions() {
        assert!(bool::from_value(&Value::Integer(1)).unwrap());
        assert!(bool::from_value(&Value::Integer(-7)).unwrap());
        assert!(!bool::from_value(&Value::Integer(0)).unwrap());
        assert!(bool::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(f64::from_value(&Value::Integer(2)).unwrap(), 2.0);
        assert_eq!(f32::from_value(&Value::Real(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_blob_conversions() {
        assert_eq!(
            Vec::<u8>::from_value(&Value::Blob(vec![1, 2])).unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            Vec::<u8>::from_value(&Value::Text("ab".into())).unwrap(),
            b"ab".to_vec()
        );
        assert!(Vec::<u8>::from_value(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_json_conversion() {
        let doc = serde_json::Value::from_value(&Value::Text("[1,2]".into())).unwrap();
        assert_eq!(doc, serde_json::json!([1, 2]));
        assert!(serde_json::Value::from_value(&Value::Text("{".into())).is_err());
    }
}
