#![allow(dead_code)]

use std::ops::Deref;
use std::sync::Once;

use chrono::NaiveDateTime;
use tablemap::{ConnectionProvider, MapperConfig, Session, SqliteProvider};
use tablemap_derive::Entity;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "blogs")]
pub struct Blog {
    #[column(identity)]
    pub id: i64,
    pub title: String,
    pub rating: i32,
    pub published: bool,
    pub created: Option<NaiveDateTime>,
    #[column(skip)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "posts")]
pub struct Post {
    #[column(identity)]
    pub id: i64,
    pub blog_id: i64,
    pub title: String,
    pub body: Option<String>,
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

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "accounts")]
pub struct Account {
    #[column(identity)]
    pub id: i64,
    pub owner: String,
    pub balance: i64,
}

pub const SCHEMA: &str = "
    CREATE TABLE blogs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        rating INTEGER NOT NULL,
        published INTEGER NOT NULL,
        created TEXT
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        blog_id INTEGER NOT NULL REFERENCES blogs(id),
        title TEXT NOT NULL,
        body TEXT
    );
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL REFERENCES posts(id),
        text TEXT NOT NULL
    );
    CREATE TABLE accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL UNIQUE,
        balance INTEGER NOT NULL
    );
";

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary. Set `RUST_LOG`
/// to see statements.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A session over a fresh on-disk database with [`SCHEMA`] applied.
pub struct TestDb {
    session: Session<SqliteProvider>,
    _dir: TempDir,
}

impl Deref for TestDb {
    type Target = Session<SqliteProvider>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

pub fn setup() -> TestDb {
    setup_with(MapperConfig::default())
}

pub fn setup_with(config: MapperConfig) -> TestDb {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = SqliteProvider::file(dir.path().join("test.db"));
    provider
        .open()
        .expect("open database")
        .inner()
        .execute_batch(SCHEMA)
        .expect("create schema");
    TestDb {
        session: Session::new(provider, config),
        _dir: dir,
    }
}

pub fn blog(title: &str, rating: i32) -> Blog {
    Blog {
        title: title.to_string(),
        rating,
        ..Blog::default()
    }
}

/// Inserts `blogs` blogs with `posts` posts each; post titles are
/// `"<blog title>/<n>"`.
pub fn seed(session: &Session<SqliteProvider>, blogs: usize, posts: usize) -> Vec<Blog> {
    let mut seeded = Vec::with_capacity(blogs);
    for b in 0..blogs {
        let rating = i32::try_from(b % 5).expect("rating");
        let mut entry = blog(&format!("blog {b}"), rating);
        session.insert(&mut entry).expect("insert blog");
        for p in 0..posts {
            let mut post = Post {
                blog_id: entry.id,
                title: format!("{}/{p}", entry.title),
                body: (p % 2 == 0).then(|| format!("body {p}")),
                ..Post::default()
            };
            session.insert(&mut post).expect("insert post");
            entry.posts.push(post);
        }
        seeded.push(entry);
    }
    seeded
}
