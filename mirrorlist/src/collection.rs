//! The synchronized collection: an ordered in-memory list of records that
//! mirrors an optional [`Store`].
//!
//! Every mutation is applied to the in-memory list first and then forwarded to
//! the store, one store call per logical operation. A failing store call is
//! returned to the caller as-is; the in-memory mutation that preceded it is
//! kept. Callers that need the two to agree again must repair the list
//! themselves.
//!
//! `update` and `remove` forward to the store even when no in-memory record
//! matched, so a stale mirror never hides a store-level record. An unmatched
//! `update` is never added locally.

use std::sync::Arc;
use std::time::Instant;

use mirrorlist_core::{
    CollectionResult, Entity, IdentityResolver, IdentityStrategy, Record, SchemaMapper, Store,
    TableMapping,
};

#[cfg(feature = "tracing")]
use tracing::{info, trace};

#[inline]
#[allow(unused_variables)]
fn obs_record(op: &str, table: &str, start: Instant, rows: usize, success: bool) {
    let elapsed = start.elapsed().as_millis() as u64;
    #[cfg(feature = "tracing")]
    {
        info!(
            table = table,
            op = op,
            rows = rows,
            elapsed_ms = elapsed,
            success = success,
            "collection op"
        );
    }
    #[cfg(feature = "metrics")]
    {
        metrics::counter!("collection_ops_total", 1, "op" => op.to_string(), "table" => table.to_string(), "success" => success.to_string());
        metrics::histogram!("collection_op_duration_ms", elapsed as f64, "op" => op.to_string(), "table" => table.to_string());
        if !success {
            metrics::counter!("collection_op_errors_total", 1, "op" => op.to_string(), "table" => table.to_string());
        }
    }
}

#[inline]
#[allow(unused_variables)]
fn obs_detached(op: &str, table: &str, rows: usize) {
    #[cfg(feature = "tracing")]
    {
        trace!(table = table, op = op, rows = rows, "detached collection op");
    }
}

/// Construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Never touch the store, not even to load. The collection starts empty.
    pub memory_only: bool,
}

impl CollectionOptions {
    pub fn memory_only() -> Self {
        Self { memory_only: true }
    }
}

/// One page of an in-memory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// A collection shared between tasks. Readers run concurrently; a mutation,
/// including its store call, holds the write lock.
pub type SharedCollection<T> = Arc<tokio::sync::RwLock<SyncedCollection<T>>>;

/// Ordered list of `T` records, optionally mirrored to a [`Store`].
pub struct SyncedCollection<T: Entity> {
    items: Vec<Record<T>>,
    store: Option<Box<dyn Store<T>>>,
    identity: IdentityStrategy,
    mapping: Arc<TableMapping>,
}

impl<T: Entity> SyncedCollection<T> {
    /// Attach to `store` and load its current contents.
    pub async fn open<S>(store: S) -> CollectionResult<Self>
    where
        S: Store<T> + 'static,
    {
        Self::with_options(Some(Box::new(store)), CollectionOptions::default()).await
    }

    /// A detached collection with no store.
    pub fn in_memory() -> CollectionResult<Self> {
        let identity = IdentityResolver::resolver_for::<T>()?;
        let mapping = SchemaMapper::document().mapping_for::<T>()?;
        Ok(Self {
            items: Vec::new(),
            store: None,
            identity,
            mapping,
        })
    }

    /// General constructor. Without a store, or with `memory_only`, the
    /// collection is detached for its whole lifetime and the store is dropped
    /// unused. Schema problems with `T` are reported here.
    pub async fn with_options(
        store: Option<Box<dyn Store<T>>>,
        options: CollectionOptions,
    ) -> CollectionResult<Self> {
        let identity = IdentityResolver::resolver_for::<T>()?;
        let store = match store {
            Some(store) if !options.memory_only => store,
            other => {
                let mapping = match &other {
                    Some(s) => SchemaMapper::new(s.naming()).mapping_for::<T>()?,
                    None => SchemaMapper::document().mapping_for::<T>()?,
                };
                return Ok(Self {
                    items: Vec::new(),
                    store: None,
                    identity,
                    mapping,
                });
            }
        };
        let mapping = SchemaMapper::new(store.naming()).mapping_for::<T>()?;

        let start = Instant::now();
        let loaded = store.load_all().await;
        obs_record(
            "load_all",
            &mapping.table,
            start,
            loaded.as_ref().map_or(0, Vec::len),
            loaded.is_ok(),
        );
        let items = loaded?.into_iter().map(Record::new).collect();

        Ok(Self {
            items,
            store: Some(store),
            identity,
            mapping,
        })
    }

    /// Attach, load, and wrap for shared use.
    pub async fn open_shared<S>(store: S) -> CollectionResult<SharedCollection<T>>
    where
        S: Store<T> + 'static,
    {
        Ok(Self::open(store).await?.into_shared())
    }

    pub fn into_shared(self) -> SharedCollection<T> {
        Arc::new(tokio::sync::RwLock::new(self))
    }

    pub fn is_detached(&self) -> bool {
        self.store.is_none()
    }

    pub fn identity(&self) -> IdentityStrategy {
        self.identity
    }

    /// Table mapping of `T` under the bound store's naming convention.
    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    // --- mutations ---

    /// Append `item`. When attached, the store sees the in-memory instance
    /// itself, so a generated key lands on it. The returned handle is that
    /// instance.
    pub async fn add(&mut self, item: impl Into<Record<T>>) -> CollectionResult<Record<T>> {
        self.items.push(item.into());
        let idx = self.items.len() - 1;

        match &self.store {
            Some(store) => {
                let start = Instant::now();
                let result = store.add(self.items[idx].value_mut()).await;
                obs_record("add", &self.mapping.table, start, 1, result.is_ok());
                result?;
            }
            None => obs_detached("add", &self.mapping.table, 1),
        }
        Ok(self.items[idx].clone())
    }

    /// Append all `items` in order with a single store call.
    pub async fn add_batch<I>(&mut self, items: I) -> CollectionResult<Vec<Record<T>>>
    where
        I: IntoIterator,
        I::Item: Into<Record<T>>,
    {
        let first = self.items.len();
        self.items.extend(items.into_iter().map(Into::into));
        let added = self.items.len() - first;
        if added == 0 {
            return Ok(Vec::new());
        }

        match &self.store {
            Some(store) => {
                let mut values: Vec<T> = self.items[first..]
                    .iter()
                    .map(|r| r.value().clone())
                    .collect();
                let start = Instant::now();
                let result = store.add_batch(&mut values).await;
                obs_record("add_batch", &self.mapping.table, start, added, result.is_ok());
                result?;

                if self.mapping.key.as_ref().is_some_and(|k| k.auto_generated) {
                    for (slot, stored) in self.items[first..].iter_mut().zip(values) {
                        if let Some(key) = stored.key() {
                            slot.set_key(key);
                        }
                    }
                }
            }
            None => obs_detached("add_batch", &self.mapping.table, added),
        }
        Ok(self.items[first..].to_vec())
    }

    /// Replace the record matching `item` in its slot. Returns whether an
    /// in-memory record matched; the store is called either way.
    pub async fn update(&mut self, item: impl Into<Record<T>>) -> CollectionResult<bool> {
        let record = item.into();
        let replaced = self.replace_matching(&record);

        match &self.store {
            Some(store) => {
                let start = Instant::now();
                let result = store.update(record.value()).await;
                obs_record("update", &self.mapping.table, start, 1, result.is_ok());
                result?;
            }
            None => obs_detached("update", &self.mapping.table, usize::from(replaced)),
        }
        Ok(replaced)
    }

    /// Per-item [`update`](Self::update) with a single store call.
    /// Returns how many in-memory records were replaced.
    pub async fn update_batch<I>(&mut self, items: I) -> CollectionResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<Record<T>>,
    {
        let records: Vec<Record<T>> = items.into_iter().map(Into::into).collect();
        if records.is_empty() {
            return Ok(0);
        }
        let replaced = records
            .iter()
            .filter(|r| self.replace_matching(r))
            .count();

        match &self.store {
            Some(store) => {
                let values: Vec<T> = records.into_iter().map(Record::into_inner).collect();
                let start = Instant::now();
                let result = store.update_batch(&values).await;
                obs_record(
                    "update_batch",
                    &self.mapping.table,
                    start,
                    values.len(),
                    result.is_ok(),
                );
                result?;
            }
            None => obs_detached("update_batch", &self.mapping.table, replaced),
        }
        Ok(replaced)
    }

    /// Remove the first record matching `item`. Removing something that is
    /// not there is a no-op. Returns whether an in-memory record was removed.
    pub async fn remove(&mut self, item: &Record<T>) -> CollectionResult<bool> {
        let removed = self.remove_matching(item);

        match &self.store {
            Some(store) => {
                let start = Instant::now();
                let result = store.delete(item.value()).await;
                obs_record("delete", &self.mapping.table, start, 1, result.is_ok());
                result?;
            }
            None => obs_detached("delete", &self.mapping.table, usize::from(removed)),
        }
        Ok(removed)
    }

    /// Per-item [`remove`](Self::remove) with a single store call.
    /// Returns how many in-memory records were removed.
    pub async fn remove_batch(&mut self, items: &[Record<T>]) -> CollectionResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let removed = items.iter().filter(|r| self.remove_matching(r)).count();

        match &self.store {
            Some(store) => {
                let values: Vec<T> = items.iter().map(|r| r.value().clone()).collect();
                let start = Instant::now();
                let result = store.delete_batch(&values).await;
                obs_record(
                    "delete_batch",
                    &self.mapping.table,
                    start,
                    values.len(),
                    result.is_ok(),
                );
                result?;
            }
            None => obs_detached("delete_batch", &self.mapping.table, removed),
        }
        Ok(removed)
    }

    /// Empty the collection and, when attached, the store.
    pub async fn clear(&mut self) -> CollectionResult<()> {
        let rows = self.items.len();
        self.items.clear();

        match &self.store {
            Some(store) => {
                let start = Instant::now();
                let result = store.delete_all().await;
                obs_record("delete_all", &self.mapping.table, start, rows, result.is_ok());
                result?;
            }
            None => obs_detached("delete_all", &self.mapping.table, rows),
        }
        Ok(())
    }

    fn position(&self, item: &Record<T>) -> Option<usize> {
        self.items.iter().position(|r| self.identity.is_match(r, item))
    }

    fn replace_matching(&mut self, item: &Record<T>) -> bool {
        match self.position(item) {
            Some(pos) => {
                self.items[pos] = item.clone();
                true
            }
            None => false,
        }
    }

    fn remove_matching(&mut self, item: &Record<T>) -> bool {
        match self.position(item) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    // --- in-memory queries ---

    pub fn iter(&self) -> std::slice::Iter<'_, Record<T>> {
        self.items.iter()
    }

    /// Entity values in order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().map(Record::value)
    }

    pub fn filter<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a Record<T>> + 'a
    where
        P: FnMut(&T) -> bool + 'a,
    {
        self.items.iter().filter(move |r| predicate(r.value()))
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<&Record<T>>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().find(|r| predicate(r.value()))
    }

    /// First record whose key equals `key`. Always `None` for key-less types.
    pub fn find_by_key(&self, key: &T::Key) -> Option<&Record<T>> {
        self.items.iter().find(|r| r.key().as_ref() == Some(key))
    }

    /// Whether a record matching `item` under the identity strategy is present.
    pub fn contains(&self, item: &Record<T>) -> bool {
        self.position(item).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Record<T>> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&Record<T>> {
        self.items.first()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of the current records; handles keep their identity.
    pub fn to_vec(&self) -> Vec<Record<T>> {
        self.items.clone()
    }

    /// Zero-based page of `size` records.
    pub fn page(&self, page: usize, size: usize) -> Page<Record<T>> {
        let total = self.items.len();
        let start = page.saturating_mul(size);
        if start >= total {
            return Page {
                items: Vec::new(),
                total,
            };
        }
        let end = usize::min(start.saturating_add(size), total);
        Page {
            items: self.items[start..end].to_vec(),
            total,
        }
    }
}

impl<'a, T: Entity> IntoIterator for &'a SyncedCollection<T> {
    type Item = &'a Record<T>;
    type IntoIter = std::slice::Iter<'a, Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Entity + std::fmt::Debug> std::fmt::Debug for SyncedCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedCollection")
            .field("table", &self.mapping.table)
            .field("detached", &self.is_detached())
            .field("identity", &self.identity)
            .field("items", &self.items)
            .finish()
    }
}
