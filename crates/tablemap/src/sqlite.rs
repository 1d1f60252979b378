//! SQLite provider built on rusqlite.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Batch, OpenFlags};
use tablemap_core::{Dialect, ResultSet, SqlStatement, SqlValue, SqliteDialect};
use tracing::trace;

use crate::error::{OrmError, Result};
use crate::provider::{Connection, ConnectionProvider, IsolationLevel};

static MEMORY_DATABASES: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Uri(String),
}

/// Opens rusqlite connections to a database file or a shared in-memory
/// database.
///
/// # Example
///
/// ```ignore
/// let provider = SqliteProvider::file("app.db");
/// let session = Session::new(provider, MapperConfig::default());
/// ```
pub struct SqliteProvider {
    target: Target,
    busy_timeout: Duration,
    // Keeps a shared in-memory database alive between connections.
    anchor: Option<Mutex<rusqlite::Connection>>,
}

impl SqliteProvider {
    /// Provider for a database file, created on first open.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
            busy_timeout: Duration::from_secs(5),
            anchor: None,
        }
    }

    /// Provider for a fresh in-memory database shared by every connection
    /// this provider opens. The database lives as long as the provider.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Database`] if the database cannot be created.
    pub fn memory() -> Result<Self> {
        let n = MEMORY_DATABASES.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:tablemap-{}-{n}?mode=memory&cache=shared",
            std::process::id()
        );
        let anchor = rusqlite::Connection::open_with_flags(&uri, OpenFlags::default())?;
        Ok(Self {
            target: Target::Uri(uri),
            busy_timeout: Duration::from_secs(5),
            anchor: Some(Mutex::new(anchor)),
        })
    }

    /// Provider from a URL: `:memory:` (or `sqlite::memory:`) for an
    /// in-memory database, otherwise a file path with an optional
    /// `sqlite://` or `sqlite:` scheme.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] for an empty path, and the errors of
    /// [`SqliteProvider::memory`].
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url == ":memory:" || url == "sqlite::memory:" {
            return Self::memory();
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if path.is_empty() {
            return Err(OrmError::Config(format!("no database path in '{url}'")));
        }
        Ok(Self::file(path))
    }

    /// Sets how long a connection waits on a locked database.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Returns true for in-memory databases.
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        self.anchor.is_some()
    }
}

impl ConnectionProvider for SqliteProvider {
    type Connection = SqliteConnection;

    fn open(&self) -> Result<SqliteConnection> {
        let conn = match &self.target {
            Target::File(path) => rusqlite::Connection::open(path)?,
            Target::Uri(uri) => rusqlite::Connection::open_with_flags(uri, OpenFlags::default())?,
        };
        conn.busy_timeout(self.busy_timeout)?;
        Ok(SqliteConnection { conn })
    }
}

/// A rusqlite connection speaking the [`Connection`] protocol.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Wraps an existing rusqlite connection.
    #[must_use]
    pub const fn from_connection(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Returns the underlying rusqlite connection, e.g. for schema setup.
    #[must_use]
    pub const fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Runs every statement of `statement`, calling `each` with each prepared
    /// and bound rusqlite statement in order.
    fn for_each_statement<F>(&self, statement: &SqlStatement, mut each: F) -> Result<()>
    where
        F: FnMut(&mut rusqlite::Statement<'_>) -> Result<()>,
    {
        let mut batch = Batch::new(&self.conn, &statement.sql);
        while let Some(mut stmt) = batch.next()? {
            bind(&mut stmt, statement)?;
            trace!(
                parameters = stmt.parameter_count(),
                columns = stmt.column_count(),
                "Running prepared statement"
            );
            each(&mut stmt)?;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute_scalar(&mut self, statement: &SqlStatement) -> Result<SqlValue> {
        let mut scalar = None;
        self.for_each_statement(statement, |stmt| {
            if stmt.column_count() == 0 {
                stmt.raw_execute()?;
                return Ok(());
            }
            let mut rows = stmt.raw_query();
            let first = match rows.next()? {
                Some(row) => from_sqlite(row.get_ref(0)?)?,
                None => SqlValue::Null,
            };
            while rows.next()?.is_some() {}
            scalar.get_or_insert(first);
            Ok(())
        })?;
        Ok(scalar.unwrap_or(SqlValue::Null))
    }

    fn execute_non_query(&mut self, statement: &SqlStatement) -> Result<u64> {
        let mut affected = 0u64;
        self.for_each_statement(statement, |stmt| {
            let changed = stmt.raw_execute()?;
            affected += u64::try_from(changed).unwrap_or(u64::MAX);
            Ok(())
        })?;
        Ok(affected)
    }

    fn execute_reader(&mut self, statement: &SqlStatement) -> Result<Vec<ResultSet>> {
        let mut sets = Vec::new();
        self.for_each_statement(statement, |stmt| {
            if stmt.column_count() == 0 {
                stmt.raw_execute()?;
                return Ok(());
            }
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let width = columns.len();
            let mut set = ResultSet::new(columns);
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let values = (0..width)
                    .map(|idx| from_sqlite(row.get_ref(idx)?))
                    .collect::<Result<Vec<_>>>()?;
                set.push(values);
            }
            sets.push(set);
            Ok(())
        })?;
        Ok(sets)
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        self.conn.execute_batch(begin_sql(isolation))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// SQLite has no isolation levels; the closest locking mode is chosen.
const fn begin_sql(isolation: IsolationLevel) -> &'static str {
    match isolation {
        IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => "BEGIN DEFERRED",
        IsolationLevel::RepeatableRead | IsolationLevel::Snapshot => "BEGIN IMMEDIATE",
        IsolationLevel::Serializable => "BEGIN EXCLUSIVE",
    }
}

/// Binds every parameter the statement references by its `@name`.
/// Parameters it does not reference are skipped, so a multi-statement
/// command can share one parameter list.
fn bind(stmt: &mut rusqlite::Statement<'_>, statement: &SqlStatement) -> Result<()> {
    for param in &statement.params {
        let placeholder = SqliteDialect.parameter(&param.name);
        if let Some(idx) = stmt.parameter_index(&placeholder)? {
            stmt.raw_bind_parameter(idx, to_sqlite(&param.value))?;
        }
    }
    Ok(())
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Int(n) => Value::Integer(*n),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Result<SqlValue> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Int(n),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => SqlValue::Text(
            std::str::from_utf8(bytes)
                .map_err(rusqlite::Error::Utf8Error)?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    })
}
