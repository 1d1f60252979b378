//! # tablemap-core
//!
//! The pure half of a typed table mapper: no I/O, only SQL text, parameters
//! and entities.
//!
//! This crate provides:
//! - The [`Entity`] trait and a per-type accessor cache ([`EntityRegistry`])
//! - A predicate AST built from typed columns and its compiler to
//!   parameterized SQL fragments
//! - Dialect-aware statement generation: insert, update, delete, select,
//!   joins, counts and pagination
//! - Row hydration, including reconstruction of one-to-many graphs from
//!   joined rows
//!
//! ## Building Statements
//!
//! ```ignore
//! use tablemap_core::{EntityRegistry, Query, SqliteDialect, StatementGenerator};
//!
//! let registry = EntityRegistry::default();
//! let generator = StatementGenerator::new(&registry, &SqliteDialect);
//!
//! let stmt = generator.select(
//!     &Query::<Blog>::new()
//!         .filter(Blog::title().starts_with("Rust").and(Blog::rating().gte(4)))
//!         .order_by("-rating")
//!         .page(2, 10),
//! )?;
//! // SELECT "id", "title", "rating" FROM "blogs"
//! //   WHERE (("title" LIKE @title) AND ("rating" >= @rating))
//! //   ORDER BY "rating" DESC LIMIT 10 OFFSET 10
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values never reach the SQL text. Every literal in a predicate, patch or
//! entity becomes a named parameter:
//!
//! ```ignore
//! let user_input = "'; DROP TABLE users; --";
//! let stmt = generator.delete_where::<User>(&User::name().eq(user_input))?;
//!
//! // stmt.sql = "DELETE FROM \"users\" WHERE (\"name\" = @name)"
//! // stmt.params = [Parameter { name: "name", value: Text("'; DROP TABLE users; --") }]
//! ```

pub mod dialect;
pub mod error;
pub mod hydrate;
pub mod predicate;
pub mod registry;
pub mod schema;
pub mod statement;
pub mod value;

pub use dialect::{Dialect, PaginationStyle, PostgresDialect, SqlServerDialect, SqliteDialect};
pub use error::{Error, Result};
pub use hydrate::{Hydrator, NestedHydrator, ResultSet, Row};
pub use predicate::{
    Col, ColumnRef, CompareOp, CompiledPredicate, Fragment, Operand, Parameter, ParameterSet,
    Predicate, PredicateCompiler,
};
pub use registry::{EntityMap, EntityRegistry, TableName, TableNaming, TableShape};
pub use schema::{Entity, EntityKey, Property};
pub use statement::{
    Join, JoinKind, OrderBy, OrderDirection, Page, Patch, Query, SqlStatement, StatementGenerator,
    StatementKind,
};
pub use value::{FromSqlValue, IdentityKey, SqlValue, ToSqlValue, ValueError};
