//! Entity metadata traits.
//!
//! This module provides the [`Entity`] trait implemented by the
//! `#[derive(Entity)]` macro. An entity describes one table: its name, an
//! optional schema and an ordered list of [`Property`] accessors, one per
//! mapped field.

use std::any::TypeId;
use std::fmt;

use crate::value::{SqlValue, ValueError};

/// Trait for table-mapped record types.
///
/// Implemented by types generated from `#[derive(Entity)]`. The property
/// order returned by [`Entity::properties`] is the declaration order of the
/// fields and is the column order used by every generated statement.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// The Rust type name of the entity.
    const NAME: &'static str;

    /// The SQL table name, before any naming prefix is applied.
    const TABLE: &'static str;

    /// Explicit schema for the table, overriding the default schema.
    const SCHEMA: Option<&'static str> = None;

    /// Returns the mapped properties in declaration order.
    fn properties() -> Vec<Property<Self>>;
}

/// A mapped field of an entity: column name, declared type and accessors.
pub struct Property<E> {
    /// SQL column name.
    pub name: &'static str,
    /// Declared Rust type, as written on the field.
    pub rust_type: &'static str,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether this is the identity (auto-generated key) column.
    pub identity: bool,
    /// Reads the field as a SQL value.
    pub get: fn(&E) -> SqlValue,
    /// Writes a SQL value into the field.
    pub set: fn(&mut E, SqlValue) -> Result<(), ValueError>,
}

impl<E> Property<E> {
    /// Reads this property from an entity.
    pub fn read(&self, entity: &E) -> SqlValue {
        (self.get)(entity)
    }

    /// Writes a value into this property of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to the field type.
    pub fn write(&self, entity: &mut E, value: SqlValue) -> Result<(), ValueError> {
        (self.set)(entity, value)
    }
}

impl<E> Clone for Property<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Property<E> {}

impl<E> fmt::Debug for Property<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("rust_type", &self.rust_type)
            .field("nullable", &self.nullable)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Identifies an entity type at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    id: TypeId,
    name: &'static str,
}

impl EntityKey {
    /// Returns the key for an entity type.
    #[must_use]
    pub fn of<E: Entity>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::NAME,
        }
    }

    /// Returns the Rust type name of the entity.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type id of the entity.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
