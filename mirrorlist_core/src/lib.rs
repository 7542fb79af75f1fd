#![forbid(unsafe_code)]
//! Core traits for the mirrorlist synchronized-collection library.
//! This crate is store-agnostic and should not contain any backend-specific logic.

// Re-export for downstream store implementations.
pub use async_trait::async_trait;

pub mod identity;
pub mod record;
pub mod schema;
pub mod store;

pub use identity::{IdentityResolver, IdentityStrategy};
pub use record::{InstanceId, Record};
pub use schema::{
    CamelCase, ColumnMapping, KeyDescriptor, NamingConvention, PascalCase, SchemaMapper,
    SnakeCase, TableMapping, Verbatim,
};
pub use store::Store;

/// Semantic kind of a field, as far as key handling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    String,
    Other,
}

/// Static description of one declared field of an entity.
/// Emitted by `#[derive(Entity)]`; hand-written impls fill it in directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    /// Explicit column name override.
    pub column: Option<&'static str>,
    pub key: bool,
    pub auto_increment: bool,
    pub full_text: bool,
    pub kind: FieldKind,
    /// True when the field is an `Option<_>`.
    pub nullable: bool,
    pub max_length: Option<u32>,
}

impl FieldShape {
    /// A plain, non-key, non-nullable field with no overrides.
    pub const fn plain(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column: None,
            key: false,
            auto_increment: false,
            full_text: false,
            kind,
            nullable: false,
            max_length: None,
        }
    }
}

/// Static description of an entity type: its name, optional table override
/// and fields in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityShape {
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub fields: &'static [FieldShape],
}

/// Key type used by entities that declare no primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoKey;

/// Trait for record types held by a `SyncedCollection` and persisted by a [`Store`].
/// Implemented via `#[derive(Entity)]` from `mirrorlist_macros`.
///
/// The shape is plain metadata; it is validated by [`SchemaMapper`] the first
/// time the type is mapped.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The type of the primary key, or [`NoKey`] for key-less entities.
    type Key: PartialEq + Clone + std::fmt::Debug + Send + Sync;

    const SHAPE: EntityShape;

    /// Returns a copy of the entity's key value, if it has one.
    fn key(&self) -> Option<Self::Key>;

    /// Overwrite the key field.
    fn set_key(&mut self, key: Self::Key);

    /// Write a store-generated sequence value into an auto-increment key.
    /// Returns false when the entity has no integer key or the value does not fit.
    fn set_generated_key(&mut self, _seq: i64) -> bool {
        false
    }
}

/// Invalid entity declaration, detected the first time a type is mapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// More than one field carries the primary-key marker.
    #[error("entity `{entity}` declares more than one key field: {}", .fields.join(", "))]
    AmbiguousKey {
        entity: &'static str,
        fields: Vec<&'static str>,
    },
    /// An auto-generated key whose type is not integer-like.
    #[error("auto-generated key `{entity}.{field}` must have an integer type (found {kind:?})")]
    AutoKeyNotInteger {
        entity: &'static str,
        field: &'static str,
        kind: FieldKind,
    },
    /// An auto-generated key that is not an `Option`, so unsaved records
    /// would all share the same key value.
    #[error("auto-generated key `{entity}.{field}` must be optional")]
    AutoKeyNotOptional {
        entity: &'static str,
        field: &'static str,
    },
    /// `auto_increment` on a field that is not the key.
    #[error("field `{entity}.{field}` is marked auto_increment but is not the key")]
    AutoIncrementWithoutKey {
        entity: &'static str,
        field: &'static str,
    },
    /// Two fields resolve to the same column name.
    #[error("entity `{entity}` maps more than one field to column `{column}`")]
    DuplicateColumn {
        entity: &'static str,
        column: String,
    },
    /// A table or column name that is not a plain ASCII identifier.
    #[error("entity `{entity}` uses invalid identifier `{name}`")]
    InvalidIdentifier { entity: &'static str, name: String },
}

/// Persistence-layer failure, surfaced unmodified to the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A record could not be encoded or decoded.
    #[error("serialization error")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The store rejected a write.
    #[error("constraint violation: {message}")]
    Constraint { message: String },
    /// Opaque error from the underlying driver or adapter.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a connectivity error.
    pub fn unavailable<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Unavailable {
            source: Box::new(e),
        }
    }
    /// Wrap an encode/decode error.
    pub fn serialization<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Serialization {
            source: Box::new(e),
        }
    }
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend {
            source: Box::new(e),
        }
    }
    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::Constraint {
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by store methods.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by collection operations.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CollectionResult<T> = Result<T, CollectionError>;
