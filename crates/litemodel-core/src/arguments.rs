//! Statement arguments.

use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Arguments bound to a statement before it runs.
///
/// Positional arguments fill `?` (and numbered) parameters in order and must
/// match the parameter count exactly. Named arguments fill `:name`, `@name`
/// and `$name` parameters by the name without its prefix; every parameter
/// needs a value and unused entries are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArguments {
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl QueryArguments {
    /// Build positional arguments from anything convertible to values.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        QueryArguments::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Build named arguments from (name, value) pairs.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        QueryArguments::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            QueryArguments::Positional(values) => values.len(),
            QueryArguments::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a named argument. Always `None` for positional arguments.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            QueryArguments::Positional(_) => None,
            QueryArguments::Named(map) => map.get(name),
        }
    }
}

impl Default for QueryArguments {
    fn default() -> Self {
        QueryArguments::Positional(Vec::new())
    }
}

impl From<Vec<Value>> for QueryArguments {
    fn from(values: Vec<Value>) -> Self {
        QueryArguments::Positional(values)
    }
}

impl From<BTreeMap<String, Value>> for QueryArguments {
    fn from(map: BTreeMap<String, Value>) -> Self {
        QueryArguments::Named(map)
    }
}

impl From<HashMap<String, Value>> for QueryArguments {
    fn from(map: HashMap<String, Value>) -> Self {
        QueryArguments::Named(map.into_iter().collect())
    }
}

impl fmt::Display for QueryArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryArguments::Positional(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            QueryArguments::Named(map) => {
                write!(f, "{{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Build positional [`QueryArguments`].
///
/// ```
/// use litemodel_core::{args, QueryArguments, Value};
///
/// let arguments = args!["Arthur", 41];
/// assert_eq!(
///     arguments,
///     QueryArguments::Positional(vec![Value::Text("Arthur".into()), Value::Integer(41)])
/// );
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::QueryArguments::Positional(::std::vec::Vec::new())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::QueryArguments::Positional(::std::vec![$($crate::Value::from($value)),+])
    };
}

/// Build named [`QueryArguments`].
///
/// ```
/// use litemodel_core::{named_args, Value};
///
/// let arguments = named_args! { "name" => "Barbara" };
/// assert_eq!(arguments.get("name"), Some(&Value::Text("Barbara".into())));
/// ```
#[macro_export]
macro_rules! named_args {
    ($($name:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = ::std::collections::BTreeMap::new();
        $(
            map.insert(::std::string::String::from($name), $crate::Value::from($value));
        )*
        $crate::QueryArguments::Named(map)
    }};
}
