//! Per-type accessor cache.
//!
//! The first use of an entity type builds its [`EntityMap`]: the resolved
//! table name, the ordered column list and the property accessors. Later
//! uses hit the cache. The registry is shared by reference between the
//! generator, the hydrator and the session, so it can be swapped out in
//! tests without any global state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{Error, Result};
use crate::schema::{Entity, EntityKey, Property};
use crate::value::SqlValue;

/// Naming convention applied when resolving table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNaming {
    /// Prefix prepended to every table name.
    pub prefix: Option<String>,
    /// Schema used when the entity does not declare one.
    pub default_schema: Option<String>,
}

impl TableNaming {
    /// Creates a naming convention with no prefix and no default schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the default schema.
    #[must_use]
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Resolves the full table name for a table declared with an optional
    /// schema. An explicit schema wins over the default.
    #[must_use]
    pub fn resolve(&self, table: &str, schema: Option<&str>) -> TableName {
        let name = match &self.prefix {
            Some(prefix) => format!("{prefix}{table}"),
            None => table.to_string(),
        };
        let schema = schema
            .map(str::to_string)
            .or_else(|| self.default_schema.clone());
        TableName { schema, name }
    }
}

/// A resolved table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Schema, if any.
    pub schema: Option<String>,
    /// Table name with any prefix applied.
    pub name: String,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// The type-erased part of an entity map: everything statement generation
/// needs without knowing the Rust type.
#[derive(Debug, Clone)]
pub struct TableShape {
    /// The entity this shape belongs to.
    pub entity: EntityKey,
    /// Resolved table name.
    pub table: TableName,
    /// Column names in property order.
    pub columns: Vec<&'static str>,
    /// Position of the identity column in `columns`.
    pub identity: Option<usize>,
}

impl TableShape {
    /// Returns the number of mapped columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Returns the identity column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if the entity has no identity.
    pub fn identity_column(&self) -> Result<&'static str> {
        self.identity
            .map(|idx| self.columns[idx])
            .ok_or(Error::MissingIdentity {
                entity: self.entity.name(),
            })
    }

    /// Returns the position of a column.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// Cached metadata and accessors for one entity type.
pub struct EntityMap<E> {
    shape: Arc<TableShape>,
    properties: Vec<Property<E>>,
    by_name: HashMap<&'static str, usize>,
}

impl<E: Entity> EntityMap<E> {
    fn build(naming: &TableNaming) -> Self {
        let properties = E::properties();
        let by_name = properties
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.name, idx))
            .collect();
        let identity = properties.iter().position(|p| p.identity);
        let shape = TableShape {
            entity: EntityKey::of::<E>(),
            table: naming.resolve(E::TABLE, E::SCHEMA),
            columns: properties.iter().map(|p| p.name).collect(),
            identity,
        };
        Self {
            shape: Arc::new(shape),
            properties,
            by_name,
        }
    }

    /// Returns the type-erased table shape.
    #[must_use]
    pub fn shape(&self) -> &Arc<TableShape> {
        &self.shape
    }

    /// Returns the properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[Property<E>] {
        &self.properties
    }

    /// Returns the number of mapped columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.properties.len()
    }

    /// Looks up a property by column name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property<E>> {
        self.position(name).map(|idx| &self.properties[idx])
    }

    /// Returns the position of a property by column name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Returns the identity property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if the entity has no identity.
    pub fn identity(&self) -> Result<&Property<E>> {
        self.identity_position().map(|idx| &self.properties[idx])
    }

    /// Returns the position of the identity property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if the entity has no identity.
    pub fn identity_position(&self) -> Result<usize> {
        self.shape.identity.ok_or(Error::MissingIdentity { entity: E::NAME })
    }

    /// Reads the identity value of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] if the entity has no identity.
    pub fn identity_value(&self, entity: &E) -> Result<SqlValue> {
        Ok(self.identity()?.read(entity))
    }

    /// Writes a value into the property at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueConversion`] if the value does not fit the field.
    pub fn assign(&self, entity: &mut E, index: usize, value: SqlValue) -> Result<()> {
        let property = &self.properties[index];
        property
            .write(entity, value)
            .map_err(|source| Error::ValueConversion {
                column: property.name.to_string(),
                source,
            })
    }
}

impl<E> fmt::Debug for EntityMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMap")
            .field("shape", &self.shape)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Cache of entity maps keyed by type.
///
/// Population happens at most once per type under concurrent first use;
/// readers never observe a partially built map.
pub struct EntityRegistry {
    naming: TableNaming,
    maps: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl EntityRegistry {
    /// Creates an empty registry with the given naming convention.
    #[must_use]
    pub fn new(naming: TableNaming) -> Self {
        Self {
            naming,
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the naming convention.
    #[must_use]
    pub const fn naming(&self) -> &TableNaming {
        &self.naming
    }

    /// Returns the cached map for an entity type, building it on first use.
    pub fn entity<E: Entity>(&self) -> Arc<EntityMap<E>> {
        let key = TypeId::of::<E>();
        if let Some(map) = self.maps.read().get(&key).cloned() {
            if let Ok(map) = map.downcast::<EntityMap<E>>() {
                return map;
            }
        }

        let built = Arc::new(EntityMap::<E>::build(&self.naming));
        let mut maps = self.maps.write();
        let entry = maps.entry(key).or_insert_with(|| {
            trace!(entity = E::NAME, table = %built.shape.table, "Cached entity map");
            let erased: Arc<dyn Any + Send + Sync> = built.clone();
            erased
        });
        entry.clone().downcast::<EntityMap<E>>().unwrap_or(built)
    }

    /// Returns the table shape for an entity type.
    pub fn shape<E: Entity>(&self) -> Arc<TableShape> {
        self.entity::<E>().shape.clone()
    }

    /// Returns the number of cached entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.read().len()
    }

    /// Returns true if no entity type has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.read().is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(TableNaming::default())
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("naming", &self.naming)
            .field("cached", &self.len())
            .finish()
    }
}
