#![allow(dead_code)]

use tablemap_core::{Entity, EntityRegistry, ResultSet, SqlValue};
use tablemap_derive::Entity;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "blogs")]
pub struct Blog {
    #[column(identity)]
    pub id: i64,
    pub title: String,
    pub rating: i32,
    #[column(skip)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "posts")]
pub struct Post {
    #[column(identity)]
    pub id: i64,
    pub blog_id: i64,
    pub body: String,
    pub published: Option<chrono::NaiveDate>,
    #[column(skip)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "comments")]
pub struct Comment {
    #[column(identity)]
    pub id: i64,
    pub post_id: i64,
    pub text: String,
}

/// Category tree, used for self-joins.
#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Category {
    #[column(identity)]
    pub id: i64,
    #[column(nullable)]
    pub parent_id: Option<i64>,
    pub label: String,
}

pub fn registry() -> EntityRegistry {
    EntityRegistry::default()
}

/// Builds a result set from column names and rows.
pub fn result_set(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> ResultSet {
    let mut set = ResultSet::new(columns.iter().map(|c| (*c).to_string()).collect());
    for row in rows {
        set.push(row);
    }
    set
}

pub fn columns_of<E: Entity>(registry: &EntityRegistry) -> Vec<&'static str> {
    registry.shape::<E>().columns.clone()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}
