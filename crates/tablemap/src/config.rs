//! Mapper configuration.
//!
//! Loaded from JSON:
//!
//! ```json
//! {
//!     "dialect": "sqlserver",
//!     "table_prefix": "app_",
//!     "default_schema": "dbo",
//!     "isolation": "read_committed"
//! }
//! ```
//!
//! Every key is optional; missing keys take their [`Default`] values.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tablemap_core::{Dialect, PostgresDialect, SqlServerDialect, SqliteDialect, TableNaming};

use crate::error::{OrmError, Result};
use crate::provider::IsolationLevel;

/// Database dialect selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// SQLite.
    #[default]
    Sqlite,
    /// PostgreSQL.
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    /// Microsoft SQL Server.
    #[serde(alias = "mssql")]
    SqlServer,
}

impl DialectKind {
    /// Returns the dialect implementation.
    #[must_use]
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Sqlite => Box::new(SqliteDialect::new()),
            Self::Postgres => Box::new(PostgresDialect::new()),
            Self::SqlServer => Box::new(SqlServerDialect::new()),
        }
    }
}

/// Settings a [`crate::Session`] is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    /// SQL dialect of generated statements.
    pub dialect: DialectKind,
    /// Prefix prepended to every table name.
    pub table_prefix: Option<String>,
    /// Schema for entities that do not declare one.
    pub default_schema: Option<String>,
    /// Isolation of [`crate::Session::transaction_default`].
    pub isolation: IsolationLevel,
}

impl MapperConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Serialization`] for malformed JSON or unknown
    /// keys, and [`OrmError::Config`] for invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Io`] if the file cannot be read, and the errors
    /// of [`MapperConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Sets the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the table prefix.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    /// Sets the default schema.
    #[must_use]
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Sets the default isolation level.
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Checks that names are usable as identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] for an empty prefix or schema.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("table_prefix", &self.table_prefix),
            ("default_schema", &self.default_schema),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(OrmError::Config(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Returns the table naming rules.
    #[must_use]
    pub fn naming(&self) -> TableNaming {
        let mut naming = TableNaming::new();
        if let Some(prefix) = &self.table_prefix {
            naming = naming.with_prefix(prefix.clone());
        }
        if let Some(schema) = &self.default_schema {
            naming = naming.with_default_schema(schema.clone());
        }
        naming
    }
}
