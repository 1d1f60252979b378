//! SQLite dialect.

use super::Dialect;

/// SQLite: double-quoted identifiers, `LIMIT`/`OFFSET` paging and
/// `RETURNING` for generated keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identity_suffix(&self, identity: &str) -> String {
        format!(" RETURNING {identity}")
    }

    fn type_for(&self, rust_type: &str) -> Option<&'static str> {
        let ty = match rust_type {
            "i64" | "i32" | "i16" | "i8" | "u32" | "u16" | "u8" | "bool" => "INTEGER",
            "f64" | "f32" => "REAL",
            "String" | "&str" | "str" => "TEXT",
            "Vec<u8>" => "BLOB",
            "NaiveDate" | "NaiveDateTime" | "DateTime<Utc>" => "TEXT",
            _ => return None,
        };
        Some(ty)
    }
}
