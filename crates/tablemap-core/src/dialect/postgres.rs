//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL: double-quoted identifiers, `LIMIT`/`OFFSET` paging and
/// `RETURNING` for generated keys.
///
/// Placeholders keep the shared `@name` form, which PostgreSQL itself reads
/// as the absolute-value operator. Providers on the native protocol bind
/// through [`crate::SqlStatement::numbered`], which rewrites them to `$n`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn identity_suffix(&self, identity: &str) -> String {
        format!(" RETURNING {identity}")
    }

    fn type_for(&self, rust_type: &str) -> Option<&'static str> {
        let ty = match rust_type {
            "i64" | "u32" => "BIGINT",
            "i32" | "u16" => "INTEGER",
            "i16" | "i8" | "u8" => "SMALLINT",
            "bool" => "BOOLEAN",
            "f64" => "DOUBLE PRECISION",
            "f32" => "REAL",
            "String" | "&str" | "str" => "TEXT",
            "Vec<u8>" => "BYTEA",
            "NaiveDate" => "DATE",
            "NaiveDateTime" => "TIMESTAMP",
            "DateTime<Utc>" => "TIMESTAMPTZ",
            _ => return None,
        };
        Some(ty)
    }
}
