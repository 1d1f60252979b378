//! Row hydration: result sets back into entities.
//!
//! Flat hydration maps each row to one `E` by column name. Nested hydration
//! ([`NestedHydrator`]) rebuilds roots and their joined children from the
//! positional columns of a join select.

mod nested;
mod row;

pub use nested::NestedHydrator;
pub use row::{ResultSet, Row};

use tracing::trace;

use crate::error::Result;
use crate::registry::EntityRegistry;
use crate::schema::Entity;

/// Maps result sets to entities using the registry's accessor tables.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'a> {
    registry: &'a EntityRegistry,
}

impl<'a> Hydrator<'a> {
    /// Creates a hydrator over a registry.
    #[must_use]
    pub const fn new(registry: &'a EntityRegistry) -> Self {
        Self { registry }
    }

    /// Hydrates one `E` per row. Columns are matched to properties by name;
    /// columns without a property are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ValueConversion`] if a value does not fit its
    /// field.
    pub fn flat<E: Entity>(&self, set: &ResultSet) -> Result<Vec<E>> {
        let map = self.registry.entity::<E>();
        let targets: Vec<Option<usize>> = set
            .columns()
            .iter()
            .map(|column| map.position(column))
            .collect();

        let mut out = Vec::with_capacity(set.len());
        for row in set.rows() {
            let mut entity = E::default();
            for (value, target) in row.values().iter().zip(&targets) {
                if let Some(idx) = target {
                    map.assign(&mut entity, *idx, value.clone())?;
                }
            }
            out.push(entity);
        }
        trace!(entity = E::NAME, rows = out.len(), "Hydrated flat result");
        Ok(out)
    }

    /// Hydrates the distinct roots of a join select, ignoring the joined
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingIdentity`] if `E` has no identity,
    /// [`crate::Error::ColumnCountMismatch`] for rows narrower than `E`, and
    /// conversion errors.
    pub fn roots<E: Entity>(&self, set: &ResultSet) -> Result<Vec<E>> {
        nested::leading_roots(self.registry, set)
    }

    /// Hydrates the joined result of a nested select.
    ///
    /// # Errors
    ///
    /// See [`NestedHydrator::hydrate`].
    pub fn nested<R: Entity>(&self, hydrator: &NestedHydrator<R>, set: &ResultSet) -> Result<Vec<R>> {
        hydrator.hydrate(self.registry, set)
    }
}
