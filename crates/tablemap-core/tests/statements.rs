//! Statement generation for derived entities.

mod common;

use common::{registry, Blog, Category, Comment, Post};
use tablemap_core::{
    EntityRegistry, Error, Join, Patch, Query, SqlServerDialect, SqlValue, SqliteDialect,
    StatementGenerator, StatementKind, TableNaming,
};

const BLOG_COLUMNS: &str = "t1.\"id\" AS \"t1_id\", t1.\"title\" AS \"t1_title\", t1.\"rating\" AS \"t1_rating\"";
const POST_COLUMNS: &str = "t2.\"id\" AS \"t2_id\", t2.\"blog_id\" AS \"t2_blog_id\", t2.\"body\" AS \"t2_body\", t2.\"published\" AS \"t2_published\"";

// =============================================================================
// Test: Writes
// =============================================================================

#[test]
fn test_insert_skips_identity_and_binds_null() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);
    let post = Post {
        blog_id: 3,
        body: "hello".into(),
        ..Post::default()
    };

    let stmt = generator.insert(&post).unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"posts\" (\"blog_id\", \"body\", \"published\") VALUES (@blog_id, @body, @published) RETURNING \"id\""
    );
    assert_eq!(stmt.kind, StatementKind::Insert);
    assert_eq!(stmt.param("blog_id"), Some(&SqlValue::Int(3)));
    assert_eq!(stmt.param("published"), Some(&SqlValue::Null));
}

#[test]
fn test_update_where_renames_colliding_parameter() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let stmt = generator
        .update_where::<Blog>(&Patch::new().set("rating", 5), &Blog::rating().lt(3))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE \"blogs\" SET \"rating\" = @rating WHERE (\"rating\" < @rating2)"
    );
    assert_eq!(stmt.param("rating"), Some(&SqlValue::Int(5)));
    assert_eq!(stmt.param("rating2"), Some(&SqlValue::Int(3)));
}

#[test]
fn test_update_where_rejects_unknown_column() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let err = generator
        .update_where::<Blog>(&Patch::new().set("posts", 1), &Blog::id().eq(1))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedExpression(_)));
}

#[test]
fn test_delete_where_with_membership() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let stmt = generator
        .delete_where::<Comment>(&Comment::post_id().is_in([4, 5]))
        .unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM \"comments\" WHERE (\"post_id\" IN (@post_id_InParam_1, @post_id_InParam_2))"
    );
    assert_eq!(stmt.params.len(), 2);
}

// =============================================================================
// Test: Naming
// =============================================================================

#[test]
fn test_prefix_and_default_schema() {
    let registry = EntityRegistry::new(
        TableNaming::new()
            .with_prefix("app_")
            .with_default_schema("main"),
    );
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let stmt = generator.delete(&Comment { id: 7, ..Comment::default() }).unwrap();
    assert_eq!(
        stmt.sql,
        "DELETE FROM \"main\".\"app_comments\" WHERE \"id\" = @id"
    );
    assert_eq!(stmt.param("id"), Some(&SqlValue::Int(7)));
}

// =============================================================================
// Test: Joins
// =============================================================================

#[test]
fn test_left_join_with_filter_on_child() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let query = Query::<Blog>::new()
        .join(Join::left::<Post>("id", "blog_id"))
        .filter(Post::body().contains("rust"))
        .order_by("title");
    let stmt = generator.select(&query).unwrap();

    assert_eq!(
        stmt.sql,
        format!(
            "SELECT {BLOG_COLUMNS}, {POST_COLUMNS} FROM \"blogs\" t1 LEFT JOIN \"posts\" t2 ON t1.\"id\" = t2.\"blog_id\" WHERE (t2.\"body\" LIKE @body) ORDER BY t1.\"title\" ASC, t1.\"id\" ASC"
        )
    );
    assert_eq!(stmt.param("body"), Some(&SqlValue::Text("%rust%".into())));
}

#[test]
fn test_chained_joins_follow_previous_table() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let query = Query::<Blog>::new()
        .join(Join::left::<Post>("id", "blog_id"))
        .join(Join::left::<Comment>("id", "post_id"));
    let stmt = generator.select(&query).unwrap();

    assert!(stmt.sql.contains(
        "FROM \"blogs\" t1 LEFT JOIN \"posts\" t2 ON t1.\"id\" = t2.\"blog_id\" LEFT JOIN \"comments\" t3 ON t2.\"id\" = t3.\"post_id\""
    ));
    assert!(stmt.sql.ends_with("ORDER BY t1.\"id\" ASC"));
}

#[test]
fn test_self_join_addresses_second_alias() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let query = Query::<Category>::new()
        .join(Join::inner::<Category>("parent_id", "id"))
        .filter(Category::label().nth(2).eq("root"));
    let stmt = generator.select(&query).unwrap();

    assert!(stmt
        .sql
        .contains("FROM \"category\" t1 INNER JOIN \"category\" t2 ON t1.\"parent_id\" = t2.\"id\""));
    assert!(stmt.sql.contains("WHERE (t2.\"label\" = @label)"));
}

#[test]
fn test_filter_on_unjoined_entity_is_unresolved() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let query = Query::<Blog>::new()
        .join(Join::left::<Post>("id", "blog_id"))
        .filter(Comment::text().eq("x"));
    assert!(matches!(
        generator.select(&query).unwrap_err(),
        Error::UnresolvedAlias(_)
    ));
}

#[test]
fn test_join_select_with_count() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let query = Query::<Blog>::new()
        .join(Join::left::<Post>("id", "blog_id"))
        .filter(Blog::rating().gt(2))
        .order_by("-rating")
        .page(1, 5);
    let stmt = generator.select_with_count(&query).unwrap();

    assert_eq!(stmt.kind, StatementKind::MultiResult);
    assert!(stmt.sql.starts_with(
        "SELECT \"t1_id\", \"t1_title\", \"t1_rating\", \"t2_id\", \"t2_blog_id\", \"t2_body\", \"t2_published\" \
         FROM (SELECT DENSE_RANK() OVER (ORDER BY t1.\"rating\" DESC, t1.\"id\" ASC) AS \"RootNum\""
    ));
    assert!(stmt.sql.contains(
        "WHERE \"RootNum\" > 0 AND \"RootNum\" < 6 ORDER BY \"RootNum\", \"RowNum\"; SELECT COUNT(DISTINCT t1.\"id\") FROM"
    ));
    assert_eq!(stmt.params.len(), 1);
}

// =============================================================================
// Test: Pagination
// =============================================================================

#[test]
fn test_row_number_paging() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqlServerDialect);

    let query = Query::<Blog>::new()
        .filter(Blog::rating().gte(3))
        .order_by("-rating")
        .page(3, 10);
    let stmt = generator.select(&query).unwrap();

    assert_eq!(
        stmt.sql,
        "SELECT [id], [title], [rating] FROM (SELECT ROW_NUMBER() OVER (ORDER BY [rating] DESC) AS [RowNum], [id], [title], [rating] FROM [blogs] WHERE ([rating] >= @rating)) AS [Paged] WHERE [RowNum] > 20 AND [RowNum] < 31 ORDER BY [RowNum]"
    );
}

#[test]
fn test_paging_requires_ordering() {
    let registry = registry();
    let generator = StatementGenerator::new(&registry, &SqliteDialect);

    let err = generator
        .select(&Query::<Blog>::new().page(1, 10))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPagination(_)));

    let err = generator
        .select(&Query::<Blog>::new().order_by("id").page(0, 10))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPagination(_)));
}
