//! Enums stored as their integer or string raw value.
//!
//! [`int_representable!`](crate::int_representable) and
//! [`string_representable!`](crate::string_representable) declare an enum
//! together with its raw values, and make it bindable as an argument and
//! decodable from a column. A stored raw value that names no variant decodes
//! to `None`.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;

/// An enum backed by an integer raw value.
pub trait IntRepresentable: Sized {
    fn raw_value(&self) -> i64;
    fn from_raw_value(raw: i64) -> Option<Self>;
}

/// An enum backed by a string raw value.
pub trait StringRepresentable: Sized {
    fn raw_value(&self) -> &'static str;
    fn from_raw_value(raw: &str) -> Option<Self>;
}

/// Decode an integer-backed enum. Used by [`int_representable!`](crate::int_representable).
#[allow(clippy::result_large_err)]
pub fn decode_int<T: IntRepresentable>(value: &Value, type_name: &'static str) -> Result<T> {
    let Value::Integer(raw) = value else {
        return Err(Error::Type(TypeError {
            expected: type_name,
            actual: value.type_name().to_string(),
            column: None,
        }));
    };
    T::from_raw_value(*raw).ok_or_else(|| {
        Error::Type(TypeError {
            expected: type_name,
            actual: format!("unknown raw value {}", raw),
            column: None,
        })
    })
}

/// Decode a string-backed enum. Used by [`string_representable!`](crate::string_representable).
#[allow(clippy::result_large_err)]
pub fn decode_string<T: StringRepresentable>(value: &Value, type_name: &'static str) -> Result<T> {
    let Value::Text(raw) = value else {
        return Err(Error::Type(TypeError {
            expected: type_name,
            actual: value.type_name().to_string(),
            column: None,
        }));
    };
    T::from_raw_value(raw).ok_or_else(|| {
        Error::Type(TypeError {
            expected: type_name,
            actual: format!("unknown raw value '{}'", raw),
            column: None,
        })
    })
}

/// Declare an enum stored as an integer.
///
/// ```
/// use litemodel_core::{int_representable, Value};
///
/// int_representable! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Color {
///         Red = 0,
///         White = 1,
///         Rose = 2,
///     }
/// }
///
/// assert_eq!(Value::from(Color::White), Value::Integer(1));
/// assert_eq!(Value::Integer(2).decode::<Color>(), Some(Color::Rose));
/// assert_eq!(Value::Integer(4).decode::<Color>(), None);
/// ```
#[macro_export]
macro_rules! int_representable {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $raw:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant),+
        }

        impl $crate::IntRepresentable for $name {
            fn raw_value(&self) -> i64 {
                match self {
                    $(Self::$variant => $raw),+
                }
            }

            fn from_raw_value(raw: i64) -> ::std::option::Option<Self> {
                $(
                    if raw == $raw {
                        return ::std::option::Option::Some(Self::$variant);
                    }
                )+
                ::std::option::Option::None
            }
        }

        impl ::std::convert::From<$name> for $crate::Value {
            fn from(value: $name) -> Self {
                $crate::Value::Integer($crate::IntRepresentable::raw_value(&value))
            }
        }

        impl $crate::FromValue for $name {
            fn from_value(value: &$crate::Value) -> $crate::Result<Self> {
                $crate::representable::decode_int(value, stringify!($name))
            }
        }
    };
}

/// Declare an enum stored as text.
///
/// ```
/// use litemodel_core::{string_representable, Value};
///
/// string_representable! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Grape {
///         Chardonnay = "Chardonnay",
///         Merlot = "Merlot",
///     }
/// }
///
/// assert_eq!(Value::from(Grape::Merlot), Value::Text("Merlot".into()));
/// assert_eq!(Value::Text("Syrah".into()).decode::<Grape>(), None);
/// ```
#[macro_export]
macro_rules! string_representable {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $raw:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant),+
        }

        impl $crate::StringRepresentable for $name {
            fn raw_value(&self) -> &'static str {
                match self {
                    $(Self::$variant => $raw),+
                }
            }

            fn from_raw_value(raw: &str) -> ::std::option::Option<Self> {
                match raw {
                    $($raw => ::std::option::Option::Some(Self::$variant),)+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::std::convert::From<$name> for $crate::Value {
            fn from(value: $name) -> Self {
                $crate::Value::Text(
                    $crate::StringRepresentable::raw_value(&value).to_string(),
                )
            }
        }

        impl $crate::FromValue for $name {
            fn from_value(value: &$crate::Value) -> $crate::Result<Self> {
                $crate::representable::decode_string(value, stringify!($name))
            }
        }
    };
}
