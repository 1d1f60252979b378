//! Join descriptors and table alias assignment.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::registry::{EntityRegistry, TableShape};
use crate::schema::{Entity, EntityKey};

/// SQL join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
    /// FULL OUTER JOIN
    Full,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER JOIN"),
            Self::Left => write!(f, "LEFT JOIN"),
            Self::Right => write!(f, "RIGHT JOIN"),
            Self::Full => write!(f, "FULL OUTER JOIN"),
        }
    }
}

/// Which already-joined table the source column of a join belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSource {
    /// The table joined just before this one (or the root for the first join).
    Previous,
    /// The root table.
    Root,
    /// The n-th (1-based) alias assigned to an entity type.
    Nth {
        /// Entity type.
        entity: EntityKey,
        /// 1-based occurrence.
        occurrence: usize,
    },
}

/// A join from an already-joined table to entity `T`'s table.
#[derive(Clone)]
pub struct Join {
    kind: JoinKind,
    target: EntityKey,
    shape: fn(&EntityRegistry) -> Arc<TableShape>,
    source_column: Cow<'static, str>,
    dest_column: Cow<'static, str>,
    source: JoinSource,
    on: Option<Predicate>,
}

impl Join {
    /// Creates a join to `T` on `source.source_column = T.dest_column`.
    pub fn new<T: Entity>(
        kind: JoinKind,
        source_column: impl Into<Cow<'static, str>>,
        dest_column: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            kind,
            target: EntityKey::of::<T>(),
            shape: EntityRegistry::shape::<T>,
            source_column: source_column.into(),
            dest_column: dest_column.into(),
            source: JoinSource::Previous,
            on: None,
        }
    }

    /// INNER JOIN to `T`.
    pub fn inner<T: Entity>(
        source_column: impl Into<Cow<'static, str>>,
        dest_column: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new::<T>(JoinKind::Inner, source_column, dest_column)
    }

    /// LEFT JOIN to `T`.
    pub fn left<T: Entity>(
        source_column: impl Into<Cow<'static, str>>,
        dest_column: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new::<T>(JoinKind::Left, source_column, dest_column)
    }

    /// RIGHT JOIN to `T`.
    pub fn right<T: Entity>(
        source_column: impl Into<Cow<'static, str>>,
        dest_column: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new::<T>(JoinKind::Right, source_column, dest_column)
    }

    /// FULL OUTER JOIN to `T`.
    pub fn full<T: Entity>(
        source_column: impl Into<Cow<'static, str>>,
        dest_column: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new::<T>(JoinKind::Full, source_column, dest_column)
    }

    /// Takes the source column from the root table.
    #[must_use]
    pub fn from_root(mut self) -> Self {
        self.source = JoinSource::Root;
        self
    }

    /// Takes the source column from the n-th (1-based) alias of `S`.
    #[must_use]
    pub fn from_nth<S: Entity>(mut self, occurrence: usize) -> Self {
        self.source = JoinSource::Nth {
            entity: EntityKey::of::<S>(),
            occurrence,
        };
        self
    }

    /// Adds an extra predicate to the ON clause.
    #[must_use]
    pub fn on(mut self, predicate: Predicate) -> Self {
        self.on = Some(match self.on.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Returns the join kind.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Returns the joined entity.
    #[must_use]
    pub const fn target(&self) -> EntityKey {
        self.target
    }

    /// Returns the source alias strategy.
    #[must_use]
    pub const fn source(&self) -> JoinSource {
        self.source
    }

    /// Returns the source-side column name.
    #[must_use]
    pub fn source_column(&self) -> &str {
        &self.source_column
    }

    /// Returns the joined-side column name.
    #[must_use]
    pub fn dest_column(&self) -> &str {
        &self.dest_column
    }

    /// Returns the extra ON predicate.
    #[must_use]
    pub const fn on_predicate(&self) -> Option<&Predicate> {
        self.on.as_ref()
    }

    /// Resolves the joined table's shape.
    #[must_use]
    pub fn shape(&self, registry: &EntityRegistry) -> Arc<TableShape> {
        (self.shape)(registry)
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("source_column", &self.source_column)
            .field("dest_column", &self.dest_column)
            .field("source", &self.source)
            .field("on", &self.on)
            .finish_non_exhaustive()
    }
}

/// Aliases assigned to the tables of one select: `t1` for the root, then
/// `t2`, `t3`, ... in join order.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    by_entity: HashMap<EntityKey, Vec<String>>,
    assigned: Vec<String>,
}

impl AliasMap {
    /// Creates an empty alias map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next alias to an entity and returns it.
    pub fn assign(&mut self, entity: EntityKey) -> String {
        let alias = format!("t{}", self.assigned.len() + 1);
        self.by_entity
            .entry(entity)
            .or_default()
            .push(alias.clone());
        self.assigned.push(alias.clone());
        alias
    }

    /// Resolves the n-th (1-based, default 1) alias of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedAlias`] if the entity has no such alias.
    pub fn resolve(&self, entity: EntityKey, occurrence: Option<usize>) -> Result<&str> {
        let n = occurrence.unwrap_or(1);
        n.checked_sub(1)
            .and_then(|idx| self.by_entity.get(&entity)?.get(idx))
            .map(String::as_str)
            .ok_or_else(|| {
                Error::UnresolvedAlias(format!("{entity} has no alias #{n} in this query"))
            })
    }

    /// Returns the most recently assigned alias.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.assigned.last().map(String::as_str)
    }

    /// Returns the root alias.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.assigned.first().map(String::as_str)
    }

    /// Returns the aliases assigned to an entity, in order.
    #[must_use]
    pub fn aliases(&self, entity: EntityKey) -> &[String] {
        self.by_entity.get(&entity).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the number of assigned aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Returns true if no alias was assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Property;

    #[derive(Debug, Default, Clone)]
    struct Folder;

    impl Entity for Folder {
        const NAME: &'static str = "Folder";
        const TABLE: &'static str = "folders";

        fn properties() -> Vec<Property<Self>> {
            Vec::new()
        }
    }

    #[derive(Debug, Default, Clone)]
    struct File;

    impl Entity for File {
        const NAME: &'static str = "File";
        const TABLE: &'static str = "files";

        fn properties() -> Vec<Property<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn test_alias_assignment() {
        let mut aliases = AliasMap::new();
        let folder = EntityKey::of::<Folder>();
        let file = EntityKey::of::<File>();
        assert_eq!(aliases.assign(folder), "t1");
        assert_eq!(aliases.assign(file), "t2");
        assert_eq!(aliases.assign(folder), "t3");

        assert_eq!(aliases.resolve(folder, None).unwrap(), "t1");
        assert_eq!(aliases.resolve(folder, Some(2)).unwrap(), "t3");
        assert_eq!(aliases.aliases(folder), ["t1", "t3"]);
        assert_eq!(aliases.root(), Some("t1"));
        assert_eq!(aliases.last(), Some("t3"));
        assert!(aliases.resolve(file, Some(2)).is_err());
        assert!(aliases.resolve(file, Some(0)).is_err());
    }

    #[test]
    fn test_join_builder() {
        let join = Join::left::<File>("id", "folder_id")
            .from_nth::<Folder>(2)
            .on(crate::predicate::Predicate::always());
        assert_eq!(join.kind(), JoinKind::Left);
        assert_eq!(join.target(), EntityKey::of::<File>());
        assert_eq!(
            join.source(),
            JoinSource::Nth {
                entity: EntityKey::of::<Folder>(),
                occurrence: 2
            }
        );
        assert!(join.on_predicate().is_some());
        assert_eq!(JoinKind::Full.to_string(), "FULL OUTER JOIN");
    }
}
