//! Dialect-aware SQL generation for entities and queries.

use std::sync::Arc;

use tracing::trace;

use super::join::{AliasMap, JoinSource};
use super::query::{OrderBy, Query};
use super::{Page, Patch, SqlStatement, StatementKind};
use crate::dialect::{Dialect, PaginationStyle};
use crate::error::{Error, Result};
use crate::predicate::{Col, ParameterSet, Predicate, PredicateCompiler, Scope};
use crate::registry::{EntityRegistry, TableShape};
use crate::schema::{Entity, EntityKey};
use crate::value::SqlValue;

/// A select decomposed into its clauses, before paging is applied.
struct SelectPlan {
    /// Select-list expressions, aliased for joins.
    columns: Vec<String>,
    /// Names of the select-list columns as seen from an outer query.
    outputs: Vec<String>,
    /// FROM clause body, including joins.
    from: String,
    where_sql: Option<String>,
    order_sql: Option<String>,
    /// Root-only ordering of a join select; pages rank roots by it.
    root_order: Option<String>,
    count_expr: String,
    params: ParameterSet,
}

struct OrderSql {
    full: Option<String>,
    roots: Option<String>,
}

impl SelectPlan {
    fn tail(&self) -> String {
        let mut sql = format!(" FROM {}", self.from);
        if let Some(where_sql) = &self.where_sql {
            sql.push_str(" WHERE ");
            sql.push_str(where_sql);
        }
        sql
    }
}

/// Generates [`SqlStatement`]s for entities of a registry in one dialect.
///
/// # Example
///
/// ```ignore
/// let registry = EntityRegistry::default();
/// let generator = StatementGenerator::new(&registry, &SqliteDialect);
///
/// let stmt = generator.select(
///     &Query::<Blog>::new()
///         .filter(Blog::rating().gt(3))
///         .order_by("title"),
/// )?;
/// // SELECT "id", "title", "rating" FROM "blogs" WHERE ("rating" > @rating) ORDER BY "title" ASC
/// ```
pub struct StatementGenerator<'a> {
    registry: &'a EntityRegistry,
    dialect: &'a dyn Dialect,
}

impl<'a> StatementGenerator<'a> {
    /// Creates a generator.
    #[must_use]
    pub fn new(registry: &'a EntityRegistry, dialect: &'a dyn Dialect) -> Self {
        Self { registry, dialect }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn finish(&self, sql: String, params: ParameterSet, kind: StatementKind) -> SqlStatement {
        trace!(kind = %kind, sql = %sql, params = params.len(), "Generated statement");
        SqlStatement {
            sql,
            params: params.into_vec(),
            kind,
        }
    }

    /// INSERT of every non-identity column, returning the generated identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if `E` has no identity column.
    pub fn insert<E: Entity>(&self, entity: &E) -> Result<SqlStatement> {
        let map = self.registry.entity::<E>();
        let identity = map.identity_position()?;
        let shape = map.shape();

        let mut params = ParameterSet::new();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (idx, property) in map.properties().iter().enumerate() {
            if idx == identity {
                continue;
            }
            let name = params.bind(property.name, property.read(entity));
            columns.push(self.quote(property.name));
            values.push(self.dialect.parameter(&name));
        }

        let table = self.dialect.quote_table(&shape.table);
        let suffix = self
            .dialect
            .identity_suffix(&self.quote(shape.columns[identity]));
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES{suffix}")
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({}){suffix}",
                columns.join(", "),
                values.join(", ")
            )
        };
        Ok(self.finish(sql, params, StatementKind::Insert))
    }

    /// UPDATE of every non-identity column, filtered by the entity's key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if `E` has no identity column, or
    /// [`Error::UnsupportedExpression`] if it has nothing else to set.
    pub fn update<E: Entity>(&self, entity: &E) -> Result<SqlStatement> {
        let map = self.registry.entity::<E>();
        let identity = map.identity_position()?;
        let shape = map.shape();

        let mut params = ParameterSet::new();
        let mut assignments = Vec::new();
        for (idx, property) in map.properties().iter().enumerate() {
            if idx == identity {
                continue;
            }
            let name = params.bind(property.name, property.read(entity));
            assignments.push(format!(
                "{} = {}",
                self.quote(property.name),
                self.dialect.parameter(&name)
            ));
        }
        if assignments.is_empty() {
            return Err(Error::UnsupportedExpression(format!(
                "{} has no columns to update",
                E::NAME
            )));
        }

        let key = shape.columns[identity];
        let key_param = params.bind(key, map.identity_value(entity)?);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.dialect.quote_table(&shape.table),
            assignments.join(", "),
            self.quote(key),
            self.dialect.parameter(&key_param)
        );
        Ok(self.finish(sql, params, StatementKind::Update))
    }

    /// UPDATE of the patched columns on every row matching `predicate`.
    ///
    /// Patch parameters are bound first; predicate parameters that collide
    /// with them are renamed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExpression`] for an empty patch, an
    /// unknown column or an untranslatable predicate.
    pub fn update_where<E: Entity>(
        &self,
        patch: &Patch,
        predicate: &Predicate,
    ) -> Result<SqlStatement> {
        if patch.is_empty() {
            return Err(Error::UnsupportedExpression(
                "update patch assigns no columns".to_string(),
            ));
        }
        let map = self.registry.entity::<E>();
        let shape = map.shape();

        let mut params = ParameterSet::new();
        let mut assignments = Vec::with_capacity(patch.assignments().len());
        for (column, value) in patch.assignments() {
            if map.position(column).is_none() {
                return Err(Error::UnsupportedExpression(format!(
                    "{} has no column '{column}'",
                    E::NAME
                )));
            }
            let name = params.bind(column, value.clone());
            assignments.push(format!(
                "{} = {}",
                self.quote(column),
                self.dialect.parameter(&name)
            ));
        }

        let compiler = PredicateCompiler::new(self.dialect, Scope::Table(EntityKey::of::<E>()));
        let compiled = compiler.compile(predicate, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE ({})",
            self.dialect.quote_table(&shape.table),
            assignments.join(", "),
            compiled.sql
        );
        Ok(self.finish(sql, params, StatementKind::Update))
    }

    /// DELETE of one entity by key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if `E` has no identity column.
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<SqlStatement> {
        let map = self.registry.entity::<E>();
        let shape = map.shape();
        let key = shape.identity_column()?;

        let mut params = ParameterSet::new();
        let key_param = params.bind(key, map.identity_value(entity)?);
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.dialect.quote_table(&shape.table),
            self.quote(key),
            self.dialect.parameter(&key_param)
        );
        Ok(self.finish(sql, params, StatementKind::Delete))
    }

    /// DELETE of every row matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the predicate cannot be compiled.
    pub fn delete_where<E: Entity>(&self, predicate: &Predicate) -> Result<SqlStatement> {
        let shape = self.registry.shape::<E>();
        let mut params = ParameterSet::new();
        let compiler = PredicateCompiler::new(self.dialect, Scope::Table(shape.entity));
        let compiled = compiler.compile(predicate, &mut params)?;
        let sql = format!(
            "DELETE FROM {} WHERE ({})",
            self.dialect.quote_table(&shape.table),
            compiled.sql
        );
        Ok(self.finish(sql, params, StatementKind::Delete))
    }

    /// SELECT of the row whose identity equals `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if `E` has no identity column.
    pub fn select_by_key<E: Entity>(&self, key: SqlValue) -> Result<SqlStatement> {
        let shape = self.registry.shape::<E>();
        let column = shape.identity_column()?;
        self.select(&Query::<E>::new().filter(Col::<E>::new(column).eq(key)))
    }

    /// SELECT for a query, with joins and paging when requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPagination`] for a page without ordering or
    /// with a zero number or size, [`Error::UnresolvedAlias`] for column or
    /// join references outside the query, and compilation errors from the
    /// predicates.
    pub fn select<E: Entity>(&self, query: &Query<E>) -> Result<SqlStatement> {
        let page = Self::check_page(query)?;
        let plan = self.plan(query)?;
        let sql = self.render_select(&plan, page);
        Ok(self.finish(sql, plan.params, StatementKind::Select))
    }

    /// `SELECT COUNT(*)` for a query, ignoring ordering and paging. Join
    /// queries count distinct root keys.
    ///
    /// # Errors
    ///
    /// See [`StatementGenerator::select`].
    pub fn count<E: Entity>(&self, query: &Query<E>) -> Result<SqlStatement> {
        let plan = self.plan(query)?;
        let sql = format!("SELECT {}{}", plan.count_expr, plan.tail());
        Ok(self.finish(sql, plan.params, StatementKind::Scalar))
    }

    /// The (possibly paged) select followed by the unpaged count, as one
    /// `;`-separated batch sharing one parameter list.
    ///
    /// # Errors
    ///
    /// See [`StatementGenerator::select`].
    pub fn select_with_count<E: Entity>(&self, query: &Query<E>) -> Result<SqlStatement> {
        let page = Self::check_page(query)?;
        let plan = self.plan(query)?;
        let select = self.render_select(&plan, page);
        let count = format!("SELECT {}{}", plan.count_expr, plan.tail());
        let sql = format!("{select}; {count}");
        Ok(self.finish(sql, plan.params, StatementKind::MultiResult))
    }

    fn check_page<E: Entity>(query: &Query<E>) -> Result<Option<Page>> {
        let Some(page) = query.paging() else {
            return Ok(None);
        };
        page.validate()?;
        if query.ordering().is_empty() {
            return Err(Error::InvalidPagination(
                "paging requires an ORDER BY".to_string(),
            ));
        }
        Ok(Some(page))
    }

    fn plan<E: Entity>(&self, query: &Query<E>) -> Result<SelectPlan> {
        if query.joins().is_empty() {
            self.plan_flat(query)
        } else {
            self.plan_joined(query)
        }
    }

    fn plan_flat<E: Entity>(&self, query: &Query<E>) -> Result<SelectPlan> {
        let shape = self.registry.shape::<E>();
        let compiler = PredicateCompiler::new(self.dialect, Scope::Table(shape.entity));

        let mut params = ParameterSet::new();
        let where_sql = compiler.compile_all(query.filters(), &mut params)?;
        let order = self.render_order(&compiler, query.ordering(), None)?;

        let columns: Vec<String> = shape.columns.iter().map(|c| self.quote(c)).collect();
        Ok(SelectPlan {
            outputs: columns.clone(),
            columns,
            from: self.dialect.quote_table(&shape.table),
            where_sql,
            order_sql: order.full,
            root_order: None,
            count_expr: "COUNT(*)".to_string(),
            params,
        })
    }

    fn plan_joined<E: Entity>(&self, query: &Query<E>) -> Result<SelectPlan> {
        let root = self.registry.shape::<E>();
        let root_key = root.identity_column()?;

        let mut aliases = AliasMap::new();
        let root_alias = aliases.assign(root.entity);
        let mut params = ParameterSet::new();
        let mut columns = Vec::new();
        let mut outputs = Vec::new();
        self.push_aliased_columns(&root, &root_alias, &mut columns, &mut outputs);

        let mut from = format!("{} {root_alias}", self.dialect.quote_table(&root.table));
        for join in query.joins() {
            let shape = join.shape(self.registry);
            let source_alias = match join.source() {
                JoinSource::Previous => aliases.last().unwrap_or(&root_alias).to_string(),
                JoinSource::Root => root_alias.clone(),
                JoinSource::Nth { entity, occurrence } => {
                    aliases.resolve(entity, Some(occurrence))?.to_string()
                }
            };
            let alias = aliases.assign(shape.entity);
            let mut on = format!(
                "{source_alias}.{} = {alias}.{}",
                self.quote(join.source_column()),
                self.quote(join.dest_column())
            );
            if let Some(extra) = join.on_predicate() {
                let compiler = PredicateCompiler::new(self.dialect, Scope::Aliased(&aliases));
                let compiled = compiler.compile(extra, &mut params)?;
                on.push_str(&format!(" AND ({})", compiled.sql));
            }
            from.push_str(&format!(
                " {} {} {alias} ON {on}",
                join.kind(),
                self.dialect.quote_table(&shape.table)
            ));
            self.push_aliased_columns(&shape, &alias, &mut columns, &mut outputs);
        }

        let compiler = PredicateCompiler::new(self.dialect, Scope::Aliased(&aliases));
        let where_sql = compiler.compile_all(query.filters(), &mut params)?;
        let root_key_sql = format!("{root_alias}.{}", self.quote(root_key));
        let order = self.render_order(
            &compiler,
            query.ordering(),
            Some((&root_alias, &root_key_sql)),
        )?;

        Ok(SelectPlan {
            columns,
            outputs,
            from,
            where_sql,
            order_sql: order.full,
            root_order: order.roots,
            count_expr: format!("COUNT(DISTINCT {root_key_sql})"),
            params,
        })
    }

    fn push_aliased_columns(
        &self,
        shape: &Arc<TableShape>,
        alias: &str,
        columns: &mut Vec<String>,
        outputs: &mut Vec<String>,
    ) {
        for column in &shape.columns {
            let output = self.quote(&format!("{alias}_{column}"));
            columns.push(format!("{alias}.{} AS {output}", self.quote(column)));
            outputs.push(output);
        }
    }

    /// Renders ORDER BY items. For a join, `root` is the root alias and its
    /// key column: the key goes right after the leading root-table items
    /// (at the end when the ordering starts on a joined table, alone when
    /// there is no ordering), unless already ordered on. Root rows are
    /// contiguous whenever the ordering starts with root columns.
    fn render_order(
        &self,
        compiler: &PredicateCompiler<'_>,
        ordering: &[OrderBy],
        root: Option<(&str, &str)>,
    ) -> Result<OrderSql> {
        let mut items = Vec::with_capacity(ordering.len() + 1);
        for order in ordering {
            let column = compiler.column(&order.column)?;
            let item = format!("{column} {}", order.direction);
            items.push((column, item));
        }
        let Some((alias, key)) = root else {
            let full = items.into_iter().map(|(_, item)| item).collect::<Vec<_>>();
            return Ok(OrderSql {
                full: (!full.is_empty()).then(|| full.join(", ")),
                roots: None,
            });
        };

        let prefix = format!("{alias}.");
        let is_root = |column: &str| column.starts_with(&prefix);
        let has_key = items.iter().any(|(column, _)| column == key);
        let key_item = format!("{key} ASC");

        let mut roots: Vec<String> = items
            .iter()
            .filter(|(column, _)| is_root(column))
            .map(|(_, item)| item.clone())
            .collect();
        let leading = items.iter().take_while(|(column, _)| is_root(column)).count();
        let mut full: Vec<String> = items.into_iter().map(|(_, item)| item).collect();
        if !has_key {
            roots.push(key_item.clone());
            let at = if leading > 0 { leading } else { full.len() };
            full.insert(at, key_item);
        }
        Ok(OrderSql {
            full: Some(full.join(", ")),
            roots: Some(roots.join(", ")),
        })
    }

    fn render_select(&self, plan: &SelectPlan, page: Option<Page>) -> String {
        let columns = plan.columns.join(", ");
        let tail = plan.tail();
        let Some(page) = page else {
            return match &plan.order_sql {
                Some(order) => format!("SELECT {columns}{tail} ORDER BY {order}"),
                None => format!("SELECT {columns}{tail}"),
            };
        };

        // Paging is only reached with an ORDER BY in place.
        let order = plan.order_sql.as_deref().unwrap_or_default();
        let offset = page.offset();
        let upper = offset.saturating_add(page.size).saturating_add(1);
        if let Some(root_order) = &plan.root_order {
            // A join pages roots, not rows: every row of a root shares its
            // rank, so a page holds `size` roots with all of their rows.
            let root_num = self.quote("RootNum");
            let row_num = self.quote("RowNum");
            let paged = self.quote("Paged");
            return format!(
                "SELECT {} FROM (SELECT DENSE_RANK() OVER (ORDER BY {root_order}) AS {root_num}, ROW_NUMBER() OVER (ORDER BY {order}) AS {row_num}, {columns}{tail}) AS {paged} WHERE {root_num} > {offset} AND {root_num} < {upper} ORDER BY {root_num}, {row_num}",
                plan.outputs.join(", ")
            );
        }
        match self.dialect.pagination() {
            PaginationStyle::LimitOffset => {
                let mut sql = format!(
                    "SELECT {columns}{tail} ORDER BY {order} LIMIT {}",
                    page.size
                );
                if offset > 0 {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
                sql
            }
            PaginationStyle::RowNumber => {
                let row_num = self.quote("RowNum");
                let paged = self.quote("Paged");
                format!(
                    "SELECT {} FROM (SELECT ROW_NUMBER() OVER (ORDER BY {order}) AS {row_num}, {columns}{tail}) AS {paged} WHERE {row_num} > {offset} AND {row_num} < {upper} ORDER BY {row_num}",
                    plan.outputs.join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqlServerDialect, SqliteDialect};
    use crate::registry::TableNaming;
    use crate::schema::Property;
    use crate::statement::Join;
    use crate::value::FromSqlValue;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Blog {
        id: i64,
        title: String,
        rating: i32,
    }

    impl Blog {
        fn id() -> Col<Self> {
            Col::new("id")
        }

        fn title() -> Col<Self> {
            Col::new("title")
        }

        fn rating() -> Col<Self> {
            Col::new("rating")
        }
    }

    impl Entity for Blog {
        const NAME: &'static str = "Blog";
        const TABLE: &'static str = "blogs";

        fn properties() -> Vec<Property<Self>> {
            vec![
                Property {
                    name: "id",
                    rust_type: "i64",
                    nullable: false,
                    identity: true,
                    get: |e| SqlValue::Int(e.id),
                    set: |e, v| {
                        e.id = i64::from_sql_value(v)?;
                        Ok(())
                    },
                },
                Property {
                    name: "title",
                    rust_type: "String",
                    nullable: false,
                    identity: false,
                    get: |e| SqlValue::Text(e.title.clone()),
                    set: |e, v| {
                        e.title = String::from_sql_value(v)?;
                        Ok(())
                    },
                },
                Property {
                    name: "rating",
                    rust_type: "i32",
                    nullable: false,
                    identity: false,
                    get: |e| SqlValue::Int(i64::from(e.rating)),
                    set: |e, v| {
                        e.rating = i32::from_sql_value(v)?;
                        Ok(())
                    },
                },
            ]
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Post {
        id: i64,
        blog_id: i64,
        body: String,
    }

    impl Post {
        fn id() -> Col<Self> {
            Col::new("id")
        }

        fn body() -> Col<Self> {
            Col::new("body")
        }
    }

    impl Entity for Post {
        const NAME: &'static str = "Post";
        const TABLE: &'static str = "posts";

        fn properties() -> Vec<Property<Self>> {
            vec![
                Property {
                    name: "id",
                    rust_type: "i64",
                    nullable: false,
                    identity: true,
                    get: |e| SqlValue::Int(e.id),
                    set: |e, v| {
                        e.id = i64::from_sql_value(v)?;
                        Ok(())
                    },
                },
                Property {
                    name: "blog_id",
                    rust_type: "i64",
                    nullable: false,
                    identity: false,
                    get: |e| SqlValue::Int(e.blog_id),
                    set: |e, v| {
                        e.blog_id = i64::from_sql_value(v)?;
                        Ok(())
                    },
                },
                Property {
                    name: "body",
                    rust_type: "String",
                    nullable: false,
                    identity: false,
                    get: |e| SqlValue::Text(e.body.clone()),
                    set: |e, v| {
                        e.body = String::from_sql_value(v)?;
                        Ok(())
                    },
                },
            ]
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Event {
        message: String,
    }

    impl Entity for Event {
        const NAME: &'static str = "Event";
        const TABLE: &'static str = "events";

        fn properties() -> Vec<Property<Self>> {
            vec![Property {
                name: "message",
                rust_type: "String",
                nullable: false,
                identity: false,
                get: |e| SqlValue::Text(e.message.clone()),
                set: |e, v| {
                    e.message = String::from_sql_value(v)?;
                    Ok(())
                },
            }]
        }
    }

    fn blog() -> Blog {
        Blog {
            id: 7,
            title: "Rust".into(),
            rating: 5,
        }
    }

    #[test]
    fn test_insert_skips_identity() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let stmt = generator.insert(&blog()).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"blogs\" (\"title\", \"rating\") VALUES (@title, @rating) RETURNING \"id\""
        );
        assert_eq!(stmt.kind, StatementKind::Insert);
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.param("title"), Some(&SqlValue::Text("Rust".into())));
    }

    #[test]
    fn test_insert_sqlserver_scope_identity() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqlServerDialect);
        let stmt = generator.insert(&blog()).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO [blogs] ([title], [rating]) VALUES (@title, @rating); SELECT SCOPE_IDENTITY()"
        );
    }

    #[test]
    fn test_insert_without_identity_fails() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let err = generator.insert(&Event::default()).unwrap_err();
        assert_eq!(err, Error::MissingIdentity { entity: "Event" });
    }

    #[test]
    fn test_update_by_entity() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let stmt = generator.update(&blog()).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"blogs\" SET \"title\" = @title, \"rating\" = @rating WHERE \"id\" = @id"
        );
        assert_eq!(stmt.param("id"), Some(&SqlValue::Int(7)));
        assert_eq!(stmt.kind, StatementKind::Update);
    }

    #[test]
    fn test_update_where_renames_colliding_parameters() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let patch = Patch::new().set("title", "New");
        let stmt = generator
            .update_where::<Blog>(&patch, &Blog::title().eq("Old"))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"blogs\" SET \"title\" = @title WHERE (\"title\" = @title2)"
        );
        assert_eq!(stmt.param("title"), Some(&SqlValue::Text("New".into())));
        assert_eq!(stmt.param("title2"), Some(&SqlValue::Text("Old".into())));
    }

    #[test]
    fn test_update_where_rejects_unknown_column() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let patch = Patch::new().set("nope", 1);
        let err = generator
            .update_where::<Blog>(&patch, &Predicate::always())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedExpression(_)));
    }

    #[test]
    fn test_delete_by_entity_and_predicate() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let stmt = generator.delete(&blog()).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"blogs\" WHERE \"id\" = @id");
        assert_eq!(stmt.kind, StatementKind::Delete);

        let stmt = generator
            .delete_where::<Blog>(&Blog::rating().lt(2))
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"blogs\" WHERE (\"rating\" < @rating)");
    }

    #[test]
    fn test_select_with_filters_and_order() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .filter(Blog::rating().gte(3))
            .filter(Blog::title().contains("rust"))
            .order_by("-rating");
        let stmt = generator.select(&query).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"title\", \"rating\" FROM \"blogs\" WHERE (\"rating\" >= @rating) AND (\"title\" LIKE @title) ORDER BY \"rating\" DESC"
        );
        assert_eq!(stmt.param("title"), Some(&SqlValue::Text("%rust%".into())));
    }

    #[test]
    fn test_select_uses_naming_convention() {
        let registry = EntityRegistry::new(
            TableNaming::new()
                .with_prefix("app_")
                .with_default_schema("dbo"),
        );
        let generator = StatementGenerator::new(&registry, &SqlServerDialect);
        let stmt = generator.select(&Query::<Blog>::new()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT [id], [title], [rating] FROM [dbo].[app_blogs]"
        );
    }

    #[test]
    fn test_select_by_key() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &PostgresDialect);
        let stmt = generator.select_by_key::<Blog>(SqlValue::Int(3)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"title\", \"rating\" FROM \"blogs\" WHERE (\"id\" = @id)"
        );
    }

    #[test]
    fn test_paging_without_order_is_rejected() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqlServerDialect);
        let err = generator
            .select(&Query::<Blog>::new().page(2, 10))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPagination(_)));

        let err = generator
            .select(&Query::<Blog>::new().order_by("id").page(0, 10))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPagination(_)));
    }

    #[test]
    fn test_row_number_paging() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqlServerDialect);
        let stmt = generator
            .select(&Query::<Blog>::new().order_by("title").page(2, 10))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT [id], [title], [rating] FROM (SELECT ROW_NUMBER() OVER (ORDER BY [title] ASC) AS [RowNum], [id], [title], [rating] FROM [blogs]) AS [Paged] WHERE [RowNum] > 10 AND [RowNum] < 21 ORDER BY [RowNum]"
        );
    }

    #[test]
    fn test_limit_offset_paging() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let stmt = generator
            .select(&Query::<Blog>::new().order_by("id").page(3, 20))
            .unwrap();
        assert!(stmt.sql.ends_with("ORDER BY \"id\" ASC LIMIT 20 OFFSET 40"));

        let stmt = generator
            .select(&Query::<Blog>::new().order_by("id").page(1, 20))
            .unwrap();
        assert!(stmt.sql.ends_with("ORDER BY \"id\" ASC LIMIT 20"));
    }

    #[test]
    fn test_count_ignores_order() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let stmt = generator
            .count(&Query::<Blog>::new().filter(Blog::rating().gt(1)).order_by("id"))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) FROM \"blogs\" WHERE (\"rating\" > @rating)"
        );
        assert_eq!(stmt.kind, StatementKind::Scalar);
    }

    #[test]
    fn test_select_with_count_shares_parameters() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .filter(Blog::rating().gt(1))
            .order_by("id")
            .page(1, 5);
        let stmt = generator.select_with_count(&query).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"title\", \"rating\" FROM \"blogs\" WHERE (\"rating\" > @rating) ORDER BY \"id\" ASC LIMIT 5; SELECT COUNT(*) FROM \"blogs\" WHERE (\"rating\" > @rating)"
        );
        assert_eq!(stmt.params.len(), 1);
        assert_eq!(stmt.kind, StatementKind::MultiResult);
    }

    #[test]
    fn test_join_select_aliases_and_orders_by_root_key() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .join(Join::left::<Post>("id", "blog_id"))
            .filter(Post::body().contains("x"));
        let stmt = generator.select(&query).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT t1.\"id\" AS \"t1_id\", t1.\"title\" AS \"t1_title\", t1.\"rating\" AS \"t1_rating\", \
             t2.\"id\" AS \"t2_id\", t2.\"blog_id\" AS \"t2_blog_id\", t2.\"body\" AS \"t2_body\" \
             FROM \"blogs\" t1 LEFT JOIN \"posts\" t2 ON t1.\"id\" = t2.\"blog_id\" \
             WHERE (t2.\"body\" LIKE @body) ORDER BY t1.\"id\" ASC"
        );
    }

    #[test]
    fn test_join_appends_root_key_tiebreaker() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .join(Join::inner::<Post>("id", "blog_id"))
            .order(Blog::title().desc());
        let stmt = generator.select(&query).unwrap();
        assert!(stmt
            .sql
            .ends_with("ORDER BY t1.\"title\" DESC, t1.\"id\" ASC"));

        let query = Query::<Blog>::new()
            .join(Join::inner::<Post>("id", "blog_id"))
            .order(Blog::id().desc());
        let stmt = generator.select(&query).unwrap();
        assert!(stmt.sql.ends_with("ORDER BY t1.\"id\" DESC"));
    }

    #[test]
    fn test_join_extra_on_predicate_and_from_nth() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .join(Join::inner::<Post>("id", "blog_id").on(Post::body().ne("")))
            .join(Join::left::<Blog>("blog_id", "id").from_nth::<Post>(1))
            .filter(Blog::rating().nth(2).gt(4));
        let stmt = generator.select(&query).unwrap();
        assert!(stmt.sql.contains(
            "INNER JOIN \"posts\" t2 ON t1.\"id\" = t2.\"blog_id\" AND (t2.\"body\" != @body)"
        ));
        assert!(stmt
            .sql
            .contains("LEFT JOIN \"blogs\" t3 ON t2.\"blog_id\" = t3.\"id\""));
        assert!(stmt.sql.contains("WHERE (t3.\"rating\" > @rating)"));
    }

    #[test]
    fn test_join_unresolved_alias() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .join(Join::inner::<Post>("id", "blog_id").from_nth::<Post>(2));
        assert!(matches!(
            generator.select(&query),
            Err(Error::UnresolvedAlias(_))
        ));

        let query = Query::<Blog>::new().filter(Post::body().eq("x"));
        assert!(matches!(
            generator.select(&query),
            Err(Error::UnresolvedAlias(_))
        ));
    }

    #[test]
    fn test_join_count_distinct_root() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &PostgresDialect);
        let query = Query::<Blog>::new().join(Join::inner::<Post>("id", "blog_id"));
        let stmt = generator.count(&query).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(DISTINCT t1.\"id\") FROM \"blogs\" t1 INNER JOIN \"posts\" t2 ON t1.\"id\" = t2.\"blog_id\""
        );
    }

    #[test]
    fn test_join_root_key_follows_leading_root_columns() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqliteDialect);
        let query = Query::<Blog>::new()
            .join(Join::left::<Post>("id", "blog_id"))
            .order(Blog::title().asc())
            .order(Post::id().asc());
        let stmt = generator.select(&query).unwrap();
        assert!(stmt
            .sql
            .ends_with("ORDER BY t1.\"title\" ASC, t1.\"id\" ASC, t2.\"id\" ASC"));

        let query = Query::<Blog>::new()
            .join(Join::left::<Post>("id", "blog_id"))
            .order(Post::id().desc());
        let stmt = generator.select(&query).unwrap();
        assert!(stmt.sql.ends_with("ORDER BY t2.\"id\" DESC, t1.\"id\" ASC"));
    }

    #[test]
    fn test_join_paging_ranks_roots() {
        let registry = EntityRegistry::default();
        let generator = StatementGenerator::new(&registry, &SqlServerDialect);
        let query = Query::<Blog>::new()
            .join(Join::left::<Post>("id", "blog_id"))
            .order(Blog::title().asc())
            .order(Post::id().desc())
            .page(2, 2);
        let stmt = generator.select(&query).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT [t1_id], [t1_title], [t1_rating], [t2_id], [t2_blog_id], [t2_body] \
             FROM (SELECT DENSE_RANK() OVER (ORDER BY t1.[title] ASC, t1.[id] ASC) AS [RootNum], \
             ROW_NUMBER() OVER (ORDER BY t1.[title] ASC, t1.[id] ASC, t2.[id] DESC) AS [RowNum], \
             t1.[id] AS [t1_id], t1.[title] AS [t1_title], t1.[rating] AS [t1_rating], \
             t2.[id] AS [t2_id], t2.[blog_id] AS [t2_blog_id], t2.[body] AS [t2_body] \
             FROM [blogs] t1 LEFT JOIN [posts] t2 ON t1.[id] = t2.[blog_id]) AS [Paged] \
             WHERE [RootNum] > 2 AND [RootNum] < 5 ORDER BY [RootNum], [RowNum]"
        );
    }
}
