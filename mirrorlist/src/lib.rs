#![forbid(unsafe_code)]
//! Facade crate re-exporting core traits and macros for the `mirrorlist` library,
//! plus the [`SyncedCollection`] itself.
//!
//! A `SyncedCollection` behaves like an ordered in-memory list of records.
//! When bound to a [`Store`] it loads the store's contents on construction and
//! forwards every mutation to it afterwards.
//!
//! # Example: Deriving `Entity`
//!
//! ```ignore
//! // Not run: the derive expands to `::mirrorlist_core` paths, which doctests
//! // do not see. See `mirrorlist/tests/` for runnable versions.
//! use mirrorlist::{Entity, SchemaMapper, SyncedCollection};
//!
//! #[derive(Entity, Clone, Debug)]
//! #[entity(table = "customers")]
//! pub struct Customer {
//!     // Key field; the store assigns it on insert.
//!     #[field(key, auto_increment)]
//!     pub id: Option<i64>,
//!     #[field(column = "email_address", length = 254)]
//!     pub email: String,
//!     #[field(full_text)]
//!     pub notes: String,
//! }
//!
//! let mapping = SchemaMapper::relational().mapping_for::<Customer>()?;
//! assert_eq!(mapping.select_columns(), vec!["id", "email_address", "notes"]);
//!
//! let mut customers = SyncedCollection::<Customer>::in_memory()?;
//! let c = customers.add(Customer { id: None, email: "a@x".into(), notes: String::new() }).await?;
//! customers.remove(&c).await?;
//! ```
//!
//! # Identity
//!
//! `update` and `remove` locate records by key value when the entity declares
//! a key, and by instance otherwise. For key-less entities, pass back the
//! [`Record`] handle obtained from the collection: a value-equal copy is a
//! different record and matches nothing.

pub mod collection;

// Re-export all core traits and types.
pub use mirrorlist_core::{
    async_trait, CamelCase, CollectionError, CollectionResult, ColumnMapping, Entity,
    EntityShape, FieldKind, FieldShape, IdentityResolver, IdentityStrategy, InstanceId,
    KeyDescriptor, NamingConvention, NoKey, PascalCase, Record, SchemaError, SchemaMapper,
    SnakeCase, Store, StoreError, StoreResult, TableMapping, Verbatim,
};

// Re-export the derive macro.
pub use mirrorlist_macros::Entity;

pub use collection::{CollectionOptions, Page, SharedCollection, SyncedCollection};
