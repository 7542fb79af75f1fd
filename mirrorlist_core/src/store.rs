//! The persistence contract a collection forwards its mutations to.

use crate::schema::{NamingConvention, Verbatim};
use crate::{Entity, StoreResult};

/// A minimal, asynchronous persistence interface for entity `T`.
/// This is intentionally store-agnostic. Concrete backends provide implementations.
///
/// Records are matched by the entity's key when it declares one. Stores never
/// roll back the caller's in-memory state on failure.
#[async_trait::async_trait]
pub trait Store<T: Entity>: Send + Sync {
    /// Full current contents in a stable, store-defined order.
    /// An empty store yields an empty Vec, not an error.
    async fn load_all(&self) -> StoreResult<Vec<T>>;

    /// Append one record. An auto-generated key is written back onto `item`.
    async fn add(&self, item: &mut T) -> StoreResult<()>;

    /// Append many records; generated keys are written back onto each item.
    async fn add_batch(&self, items: &mut [T]) -> StoreResult<()>;

    /// Apply `item` to its persisted counterpart. Without one, this may be a
    /// no-op but must never create a duplicate.
    async fn update(&self, item: &T) -> StoreResult<()>;

    async fn update_batch(&self, items: &[T]) -> StoreResult<()>;

    /// Remove `item`. Deleting a missing record is a no-op.
    async fn delete(&self, item: &T) -> StoreResult<()>;

    async fn delete_batch(&self, items: &[T]) -> StoreResult<()>;

    async fn delete_all(&self) -> StoreResult<()>;

    /// Naming convention used to derive this store's column names.
    fn naming(&self) -> &dyn NamingConvention {
        &Verbatim
    }
}
