//! SQL Server dialect.

use super::{Dialect, PaginationStyle};

/// SQL Server: bracketed identifiers, `ROW_NUMBER()` paging and
/// `SCOPE_IDENTITY()` for generated keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn identifier_quote(&self) -> char {
        '['
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::RowNumber
    }

    fn identity_suffix(&self, _identity: &str) -> String {
        "; SELECT SCOPE_IDENTITY()".to_string()
    }

    fn type_for(&self, rust_type: &str) -> Option<&'static str> {
        let ty = match rust_type {
            "i64" | "u32" => "BIGINT",
            "i32" | "u16" => "INT",
            "i16" | "i8" => "SMALLINT",
            "u8" => "TINYINT",
            "bool" => "BIT",
            "f64" => "FLOAT",
            "f32" => "REAL",
            "String" | "&str" | "str" => "NVARCHAR(MAX)",
            "Vec<u8>" => "VARBINARY(MAX)",
            "NaiveDate" => "DATE",
            "NaiveDateTime" => "DATETIME2",
            "DateTime<Utc>" => "DATETIMEOFFSET",
            _ => return None,
        };
        Some(ty)
    }
}
