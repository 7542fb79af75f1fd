//! Record sameness for update and delete.
//!
//! Types with a declared key compare by key value. Key-less types fall back to
//! reference identity: two records are the same only when they are the same
//! instance. Value-equal copies of a key-less type never match; callers must
//! pass back the handle they obtained from the collection.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::{Entity, Record, SchemaError, SchemaMapper};

/// How records of one entity type are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Compare the value of the key field.
    ByKey { field: &'static str },
    /// Compare instance identity.
    ByReference,
}

impl IdentityStrategy {
    /// True when `a` and `b` denote the same record.
    ///
    /// Under [`IdentityStrategy::ByKey`] a record with no key value yet (an
    /// unassigned auto-generated key) only matches its own instance.
    pub fn is_match<T: Entity>(&self, a: &Record<T>, b: &Record<T>) -> bool {
        match self {
            IdentityStrategy::ByKey { .. } => match (a.key(), b.key()) {
                (Some(ka), Some(kb)) => ka == kb,
                _ => a.same_instance(b),
            },
            IdentityStrategy::ByReference => a.same_instance(b),
        }
    }

    pub fn is_by_key(&self) -> bool {
        matches!(self, IdentityStrategy::ByKey { .. })
    }
}

static STRATEGIES: OnceLock<RwLock<HashMap<TypeId, IdentityStrategy>>> = OnceLock::new();

/// Selects and caches the [`IdentityStrategy`] of each entity type.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    /// Strategy for `T`, decided once from its schema and cached.
    /// Fails when the entity's key declaration is invalid.
    pub fn resolver_for<T: Entity>() -> Result<IdentityStrategy, SchemaError> {
        let type_id = TypeId::of::<T>();
        let cache = STRATEGIES.get_or_init(|| RwLock::new(HashMap::new()));

        if let Some(strategy) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(*strategy);
        }

        // Key presence does not depend on the naming convention.
        let mapping = SchemaMapper::document().mapping_for::<T>()?;
        let strategy = match &mapping.key {
            Some(key) => IdentityStrategy::ByKey { field: key.field },
            None => IdentityStrategy::ByReference,
        };
        cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_id, strategy);
        Ok(strategy)
    }

    pub fn is_match<T: Entity>(strategy: &IdentityStrategy, a: &Record<T>, b: &Record<T>) -> bool {
        strategy.is_match(a, b)
    }
}
