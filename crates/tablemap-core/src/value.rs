//! SQL values and conversions between them and Rust field types.
//!
//! Every value that reaches a statement travels as a named parameter, never
//! spliced into the SQL text.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// A SQL value that can be bound as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the SQL representation for inline use (escaped).
    ///
    /// Only used to render parameters in log output; statements always bind.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Returns `true` for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Hashable projection used to deduplicate hydrated instances.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        match self {
            Self::Null => IdentityKey::Null,
            Self::Bool(b) => IdentityKey::Int(i64::from(*b)),
            Self::Int(n) => IdentityKey::Int(*n),
            Self::Float(f) => IdentityKey::Float(f.to_bits()),
            Self::Text(s) => IdentityKey::Text(s.clone()),
            Self::Blob(b) => IdentityKey::Blob(b.clone()),
        }
    }

    /// Orders two constants of compatible kinds. `None` when either side is
    /// NULL or the kinds cannot be compared.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Blob(a), Self::Blob(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_inline())
    }
}

/// Identity-cache key derived from a [`SqlValue`].
///
/// Booleans collapse onto integers because most drivers hand them back as
/// `0`/`1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// NULL key.
    Null,
    /// Integer key.
    Int(i64),
    /// Float key, compared by bit pattern.
    Float(u64),
    /// Text key.
    Text(String),
    /// Blob key.
    Blob(Vec<u8>),
}

/// Failure converting a [`SqlValue`] into a Rust field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has an incompatible kind.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Rust type being produced.
        expected: &'static str,
        /// Kind of the SQL value.
        found: &'static str,
    },
    /// NULL reached a non-optional field.
    #[error("unexpected NULL for non-nullable {expected}")]
    UnexpectedNull {
        /// Rust type being produced.
        expected: &'static str,
    },
    /// Integer does not fit the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Rust type being produced.
        target: &'static str,
        /// Offending value.
        value: i64,
    },
    /// Text could not be parsed into the target type.
    #[error("cannot parse '{text}' as {target}")]
    Parse {
        /// Rust type being produced.
        target: &'static str,
        /// Offending text.
        text: String,
    },
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be read back from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a `SqlValue` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] when the value kind does not fit.
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(n) => Ok(n != 0),
            SqlValue::Null => Err(ValueError::UnexpectedNull { expected: "bool" }),
            other => Err(ValueError::TypeMismatch {
                expected: "bool",
                found: other.kind_name(),
            }),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty),+) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }

            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
                    match value {
                        SqlValue::Int(n) => <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange {
                            target: stringify!($ty),
                            value: n,
                        }),
                        SqlValue::Bool(b) => Ok(<$ty>::from(b)),
                        SqlValue::Null => Err(ValueError::UnexpectedNull {
                            expected: stringify!($ty),
                        }),
                        other => Err(ValueError::TypeMismatch {
                            expected: stringify!($ty),
                            found: other.kind_name(),
                        }),
                    }
                }
            }
        )+
    };
}

impl_int!(i64, i32, i16, i8, u32, u16, u8);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(n) => Ok(n as Self),
            SqlValue::Null => Err(ValueError::UnexpectedNull { expected: "f64" }),
            other => Err(ValueError::TypeMismatch {
                expected: "f64",
                found: other.kind_name(),
            }),
        }
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        f64::from_sql_value(value).map(|f| f as Self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Null => Err(ValueError::UnexpectedNull { expected: "String" }),
            other => Err(ValueError::TypeMismatch {
                expected: "String",
                found: other.kind_name(),
            }),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            SqlValue::Null => Err(ValueError::UnexpectedNull { expected: "Vec<u8>" }),
            other => Err(ValueError::TypeMismatch {
                expected: "Vec<u8>",
                found: other.kind_name(),
            }),
        }
    }
}

// Temporal values travel as ISO-8601 text, which every shipped dialect
// accepts for its date/time column types.

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn text_for(value: SqlValue, target: &'static str) -> Result<String, ValueError> {
    match value {
        SqlValue::Text(s) => Ok(s),
        SqlValue::Null => Err(ValueError::UnexpectedNull { expected: target }),
        other => Err(ValueError::TypeMismatch {
            expected: target,
            found: other.kind_name(),
        }),
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format("%Y-%m-%d").to_string())
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = text_for(value, "NaiveDate")?;
        Self::parse_from_str(&text, "%Y-%m-%d").map_err(|_| ValueError::Parse {
            target: "NaiveDate",
            text,
        })
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format(DATETIME_FORMAT).to_string())
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = text_for(value, "NaiveDateTime")?;
        Self::parse_from_str(&text, DATETIME_FORMAT)
            .or_else(|_| Self::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|_| ValueError::Parse {
                target: "NaiveDateTime",
                text,
            })
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.to_rfc3339())
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = text_for(value, "DateTime<Utc>")?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValueError::Parse {
                target: "DateTime<Utc>",
                text,
            })
    }
}
