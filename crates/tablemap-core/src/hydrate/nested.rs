//! Object-graph reconstruction from joined rows.
//!
//! A joined select returns one row per (root, child, ...) combination. The
//! nested hydrator walks the rows once, splits each row into one column
//! range per entity type in join order, deduplicates instances by identity
//! key and calls a wiring callback for every present child so the caller can
//! attach it to its root.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::row::{ResultSet, Row};
use crate::error::{Error, Result};
use crate::registry::{EntityMap, EntityRegistry};
use crate::schema::Entity;
use crate::value::{IdentityKey, SqlValue};

/// Per-call identity cache for one entity type.
struct IdentityCache<E> {
    map: Arc<EntityMap<E>>,
    key_position: usize,
    previous: Option<(Vec<SqlValue>, Option<usize>)>,
    instances: Vec<E>,
    by_key: HashMap<IdentityKey, usize>,
}

impl<E: Entity> IdentityCache<E> {
    fn new(map: Arc<EntityMap<E>>) -> Result<Self> {
        let key_position = map.identity_position()?;
        Ok(Self {
            map,
            key_position,
            previous: None,
            instances: Vec::new(),
            by_key: HashMap::new(),
        })
    }

    fn width(&self) -> usize {
        self.map.width()
    }

    /// Resolves the instance for one column slice. `None` means the entity
    /// is absent from the row.
    fn resolve(&mut self, slice: Row<'_>) -> Result<Option<usize>> {
        if let Some((values, resolved)) = &self.previous {
            if values.as_slice() == slice.values() {
                return Ok(*resolved);
            }
        }

        let resolved = if slice.is_all_null() {
            None
        } else {
            let key = slice
                .value(self.key_position)
                .map_or(IdentityKey::Null, SqlValue::identity_key);
            match self.by_key.get(&key) {
                Some(&idx) => Some(idx),
                None => {
                    let mut instance = E::default();
                    for (idx, value) in slice.values().iter().enumerate() {
                        self.map.assign(&mut instance, idx, value.clone())?;
                    }
                    self.instances.push(instance);
                    let idx = self.instances.len() - 1;
                    self.by_key.insert(key, idx);
                    Some(idx)
                }
            }
        };
        self.previous = Some((slice.values().to_vec(), resolved));
        Ok(resolved)
    }
}

/// Hydration state for one joined slot.
trait SlotState<R> {
    fn width(&self) -> usize;
    fn resolve(&mut self, slice: Row<'_>) -> Result<Option<usize>>;
    fn wire(&self, root: &mut R, idx: usize);
}

struct ChildState<'w, C, F> {
    cache: IdentityCache<C>,
    wire: &'w F,
}

impl<R, C, F> SlotState<R> for ChildState<'_, C, F>
where
    C: Entity,
    F: Fn(&mut R, &C),
{
    fn width(&self) -> usize {
        self.cache.width()
    }

    fn resolve(&mut self, slice: Row<'_>) -> Result<Option<usize>> {
        self.cache.resolve(slice)
    }

    fn wire(&self, root: &mut R, idx: usize) {
        (self.wire)(root, &self.cache.instances[idx]);
    }
}

/// A joined type and its wiring callback.
trait Slot<R>: Send + Sync {
    fn begin<'s>(&'s self, registry: &EntityRegistry) -> Result<Box<dyn SlotState<R> + 's>>;
}

struct Wiring<C, F> {
    wire: F,
    _child: PhantomData<fn() -> C>,
}

impl<R, C, F> Slot<R> for Wiring<C, F>
where
    R: 'static,
    C: Entity,
    F: Fn(&mut R, &C) + Send + Sync,
{
    fn begin<'s>(&'s self, registry: &EntityRegistry) -> Result<Box<dyn SlotState<R> + 's>> {
        Ok(Box::new(ChildState {
            cache: IdentityCache::new(registry.entity::<C>())?,
            wire: &self.wire,
        }))
    }
}

/// Rebuilds root entities of type `R` and their joined children from a
/// joined result set.
///
/// Slots are declared in join order, matching the column ranges of the
/// select. Wiring callbacks run once per row in which the child is present,
/// so they must be idempotent (append only if absent).
///
/// # Example
///
/// ```ignore
/// let blogs = NestedHydrator::<Blog>::new()
///     .with::<Post, _>(|blog, post| {
///         if !blog.posts.iter().any(|p| p.id == post.id) {
///             blog.posts.push(post.clone());
///         }
///     })
///     .hydrate(&registry, &result_set)?;
/// ```
pub struct NestedHydrator<R> {
    slots: Vec<Box<dyn Slot<R>>>,
}

impl<R: Entity> Default for NestedHydrator<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Entity> NestedHydrator<R> {
    /// Creates a hydrator for root type `R` with no joined slots.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds the next joined type and its wiring callback.
    #[must_use]
    pub fn with<C, F>(mut self, wire: F) -> Self
    where
        C: Entity,
        F: Fn(&mut R, &C) + Send + Sync + 'static,
    {
        self.slots.push(Box::new(Wiring::<C, F> {
            wire,
            _child: PhantomData,
        }));
        self
    }

    /// Returns the number of joined slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Hydrates roots in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnCountMismatch`] if the rows are not as wide as
    /// the joined types together, [`Error::MissingIdentity`] if a type has
    /// no identity, and [`Error::ValueConversion`] for values that do not fit
    /// their fields.
    pub fn hydrate(&self, registry: &EntityRegistry, set: &ResultSet) -> Result<Vec<R>> {
        let mut roots = IdentityCache::new(registry.entity::<R>())?;
        let mut states = self
            .slots
            .iter()
            .map(|slot| slot.begin(registry))
            .collect::<Result<Vec<_>>>()?;

        let root_width = roots.width();
        let expected = root_width + states.iter().map(|s| s.width()).sum::<usize>();
        let mismatch = |actual: usize| Error::ColumnCountMismatch { expected, actual };
        if set.columns().len() != expected {
            return Err(mismatch(set.columns().len()));
        }

        let mut resolved = Vec::with_capacity(states.len());
        for row in set.rows() {
            if row.len() != expected {
                return Err(mismatch(row.len()));
            }
            let root_slice = row.slice(0..root_width).ok_or_else(|| mismatch(row.len()))?;
            let Some(root_idx) = roots.resolve(root_slice)? else {
                continue;
            };

            resolved.clear();
            let mut offset = root_width;
            for state in &mut states {
                let width = state.width();
                let slice = row
                    .slice(offset..offset + width)
                    .ok_or_else(|| mismatch(row.len()))?;
                resolved.push(state.resolve(slice)?);
                offset += width;
            }

            let root = &mut roots.instances[root_idx];
            for (state, idx) in states.iter().zip(&resolved) {
                if let Some(idx) = idx {
                    state.wire(root, *idx);
                }
            }
        }

        debug!(
            entity = R::NAME,
            rows = set.len(),
            roots = roots.instances.len(),
            "Hydrated nested result"
        );
        Ok(roots.instances)
    }
}

/// Hydrates the roots of a joined result set from its leading columns, one
/// instance per identity in first-seen order. Columns past the root's width
/// are ignored.
pub(super) fn leading_roots<E: Entity>(
    registry: &EntityRegistry,
    set: &ResultSet,
) -> Result<Vec<E>> {
    let mut roots = IdentityCache::new(registry.entity::<E>())?;
    let width = roots.width();
    for row in set.rows() {
        let slice = row.slice(0..width).ok_or(Error::ColumnCountMismatch {
            expected: width,
            actual: row.len(),
        })?;
        roots.resolve(slice)?;
    }
    Ok(roots.instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Property;
    use crate::value::FromSqlValue;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Author {
        id: i64,
        name: String,
        books: Vec<Book>,
    }

    impl Entity for Author {
        const NAME: &'static str = "Author";
        const TABLE: &'static str = "authors";

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
                    name: "name",
                    rust_type: "String",
                    nullable: false,
                    identity: false,
                    get: |e| SqlValue::Text(e.name.clone()),
                    set: |e, v| {
                        e.name = String::from_sql_value(v)?;
                        Ok(())
                    },
                },
            ]
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Book {
        id: i64,
        title: String,
    }

    impl Entity for Book {
        const NAME: &'static str = "Book";
        const TABLE: &'static str = "books";

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
            ]
        }
    }

    fn columns() -> Vec<String> {
        ["t1_id", "t1_name", "t2_id", "t2_title"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    fn row(author: i64, book: Option<i64>) -> Vec<SqlValue> {
        let mut values = vec![
            SqlValue::Int(author),
            SqlValue::Text(format!("author {author}")),
        ];
        match book {
            Some(id) => {
                values.push(SqlValue::Int(id));
                values.push(SqlValue::Text(format!("book {id}")));
            }
            None => {
                values.push(SqlValue::Null);
                values.push(SqlValue::Null);
            }
        }
        values
    }

    fn hydrator() -> NestedHydrator<Author> {
        NestedHydrator::<Author>::new().with::<Book, _>(|author, book| {
            if !author.books.iter().any(|b| b.id == book.id) {
                author.books.push(book.clone());
            }
        })
    }

    #[test]
    fn test_roots_with_children() {
        let mut set = ResultSet::new(columns());
        for author in 1..=3 {
            for book in 1..=4 {
                set.push(row(author, Some(author * 10 + book)));
            }
        }
        let registry = EntityRegistry::default();
        let authors = hydrator().hydrate(&registry, &set).unwrap();
        assert_eq!(authors.len(), 3);
        for (i, author) in authors.iter().enumerate() {
            assert_eq!(author.id, i as i64 + 1);
            assert_eq!(author.books.len(), 4);
        }
    }

    #[test]
    fn test_null_child_is_not_wired() {
        let mut set = ResultSet::new(columns());
        set.push(row(1, None));
        set.push(row(2, Some(5)));
        let registry = EntityRegistry::default();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let authors = NestedHydrator::<Author>::new()
            .with::<Book, _>(move |author, book| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                author.books.push(book.clone());
            })
            .hydrate(&registry, &set)
            .unwrap();
        assert_eq!(authors.len(), 2);
        assert!(authors[0].books.is_empty());
        assert_eq!(authors[1].books.len(), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_contiguous_roots_merge() {
        let mut set = ResultSet::new(columns());
        set.push(row(1, Some(1)));
        set.push(row(2, Some(2)));
        set.push(row(1, Some(3)));
        let registry = EntityRegistry::default();
        let authors = hydrator().hydrate(&registry, &set).unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].books.len(), 2);
        assert_eq!(authors[1].books.len(), 1);
    }

    #[test]
    fn test_shared_child_is_one_instance_per_key() {
        let mut set = ResultSet::new(columns());
        set.push(row(1, Some(9)));
        set.push(row(2, Some(9)));
        let registry = EntityRegistry::default();
        let authors = hydrator().hydrate(&registry, &set).unwrap();
        assert_eq!(authors[0].books, authors[1].books);
    }

    #[test]
    fn test_absent_root_skips_row() {
        let mut set = ResultSet::new(columns());
        set.push(vec![
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Int(1),
            SqlValue::Text("orphan".into()),
        ]);
        let registry = EntityRegistry::default();
        assert!(hydrator().hydrate(&registry, &set).unwrap().is_empty());
    }

    #[test]
    fn test_leading_roots_ignore_joined_columns() {
        let mut set = ResultSet::new(columns());
        set.push(row(1, Some(1)));
        set.push(row(1, Some(2)));
        set.push(row(2, None));
        let registry = EntityRegistry::default();
        let authors: Vec<Author> = leading_roots(&registry, &set).unwrap();
        let ids: Vec<_> = authors.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(authors[0].books.is_empty());
    }

    #[test]
    fn test_width_mismatch() {
        let set = ResultSet::new(vec!["t1_id".into(), "t1_name".into()]);
        let registry = EntityRegistry::default();
        assert_eq!(
            hydrator().hydrate(&registry, &set).unwrap_err(),
            Error::ColumnCountMismatch {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_conversion_error_names_column() {
        let mut set = ResultSet::new(columns());
        set.push(vec![
            SqlValue::Int(1),
            SqlValue::Int(5),
            SqlValue::Null,
            SqlValue::Null,
        ]);
        let registry = EntityRegistry::default();
        let err = hydrator().hydrate(&registry, &set).unwrap_err();
        assert!(matches!(err, Error::ValueConversion { ref column, .. } if column == "name"));
    }
}
