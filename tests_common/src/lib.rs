//! Common integration testing utilities: in-memory store fakes and generic
//! collection scenarios reusable across store implementations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mirrorlist::{
    CollectionResult, Entity, NamingConvention, SnakeCase, Store, StoreError, StoreResult,
    SyncedCollection, Verbatim,
};

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "users")] // consistent across stores
pub struct User {
    #[field(key, auto_increment)]
    pub id: Option<i64>,
    #[field(length = 254)]
    pub email: String,
    pub active: bool,
}

/// Key-less entity; records are told apart by instance only.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Widget {
    pub sku: String,
    pub name: String,
}

/// Two records are the same row when both carry a key and the keys agree;
/// key-less rows are compared by value.
pub fn same_row<T: Entity + PartialEq>(a: &T, b: &T) -> bool {
    match (a.key(), b.key()) {
        (Some(ka), Some(kb)) => ka == kb,
        _ => a == b,
    }
}

struct MemState<T> {
    rows: Vec<T>,
    next_id: i64,
}

/// Vec-backed store. Assigns sequential keys to auto-increment entities.
pub struct MemoryStore<T> {
    state: Arc<Mutex<MemState<T>>>,
    snake_case: bool,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            snake_case: self.snake_case,
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::seeded(Vec::new())
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `rows`, in that order.
    pub fn seeded(rows: Vec<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState { rows, next_id: 0 })),
            snake_case: false,
        }
    }

    /// Report snake_case column names instead of verbatim field names.
    pub fn with_snake_case(mut self) -> Self {
        self.snake_case = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> MemoryStore<T> {
    /// Snapshot of the persisted rows.
    pub fn rows(&self) -> Vec<T> {
        self.lock().rows.clone()
    }
}

impl<T: Entity> MemoryStore<T> {
    fn insert(state: &mut MemState<T>, item: &mut T) {
        if item.key().is_none() {
            state.next_id += 1;
            item.set_generated_key(state.next_id);
        }
        state.rows.push(item.clone());
    }
}

#[async_trait]
impl<T: Entity + PartialEq> Store<T> for MemoryStore<T> {
    async fn load_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.rows())
    }

    async fn add(&self, item: &mut T) -> StoreResult<()> {
        Self::insert(&mut self.lock(), item);
        Ok(())
    }

    async fn add_batch(&self, items: &mut [T]) -> StoreResult<()> {
        let mut g = self.lock();
        for item in items.iter_mut() {
            Self::insert(&mut g, item);
        }
        Ok(())
    }

    async fn update(&self, item: &T) -> StoreResult<()> {
        let mut g = self.lock();
        if let Some(row) = g.rows.iter_mut().find(|r| same_row(&**r, item)) {
            *row = item.clone();
        }
        Ok(())
    }

    async fn update_batch(&self, items: &[T]) -> StoreResult<()> {
        for item in items {
            self.update(item).await?;
        }
        Ok(())
    }

    async fn delete(&self, item: &T) -> StoreResult<()> {
        let mut g = self.lock();
        if let Some(pos) = g.rows.iter().position(|r| same_row(r, item)) {
            g.rows.remove(pos);
        }
        Ok(())
    }

    async fn delete_batch(&self, items: &[T]) -> StoreResult<()> {
        for item in items {
            self.delete(item).await?;
        }
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.lock().rows.clear();
        Ok(())
    }

    fn naming(&self) -> &dyn NamingConvention {
        if self.snake_case {
            &SnakeCase
        } else {
            &Verbatim
        }
    }
}

/// Shared handle to the calls a [`RecordingStore`] has seen.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    fn push(&self, op: &'static str) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls to `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }
}

/// Wraps another store and logs every call before delegating.
pub struct RecordingStore<S> {
    inner: S,
    log: CallLog,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl<T, S> Store<T> for RecordingStore<S>
where
    T: Entity,
    S: Store<T>,
{
    async fn load_all(&self) -> StoreResult<Vec<T>> {
        self.log.push("load_all");
        self.inner.load_all().await
    }

    async fn add(&self, item: &mut T) -> StoreResult<()> {
        self.log.push("add");
        self.inner.add(item).await
    }

    async fn add_batch(&self, items: &mut [T]) -> StoreResult<()> {
        self.log.push("add_batch");
        self.inner.add_batch(items).await
    }

    async fn update(&self, item: &T) -> StoreResult<()> {
        self.log.push("update");
        self.inner.update(item).await
    }

    async fn update_batch(&self, items: &[T]) -> StoreResult<()> {
        self.log.push("update_batch");
        self.inner.update_batch(items).await
    }

    async fn delete(&self, item: &T) -> StoreResult<()> {
        self.log.push("delete");
        self.inner.delete(item).await
    }

    async fn delete_batch(&self, items: &[T]) -> StoreResult<()> {
        self.log.push("delete_batch");
        self.inner.delete_batch(items).await
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.log.push("delete_all");
        self.inner.delete_all().await
    }

    fn naming(&self) -> &dyn NamingConvention {
        self.inner.naming()
    }
}

/// Store whose writes always fail. `load_all` returns the seed rows unless the
/// store was built with [`FailingStore::offline`].
pub struct FailingStore<T> {
    rows: Vec<T>,
    offline: bool,
}

impl<T> FailingStore<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            offline: false,
        }
    }

    /// Fails on load too.
    pub fn offline() -> Self {
        Self {
            rows: Vec::new(),
            offline: true,
        }
    }

    fn refuse(&self) -> StoreError {
        if self.offline {
            StoreError::unavailable(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store offline",
            ))
        } else {
            StoreError::constraint("writes rejected")
        }
    }
}

#[async_trait]
impl<T: Entity> Store<T> for FailingStore<T> {
    async fn load_all(&self) -> StoreResult<Vec<T>> {
        if self.offline {
            return Err(self.refuse());
        }
        Ok(self.rows.clone())
    }

    async fn add(&self, _item: &mut T) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn add_batch(&self, _items: &mut [T]) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn update(&self, _item: &T) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn update_batch(&self, _items: &[T]) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn delete(&self, _item: &T) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn delete_batch(&self, _items: &[T]) -> StoreResult<()> {
        Err(self.refuse())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        Err(self.refuse())
    }
}

#[async_trait]
pub trait StoreFactory {
    /// Construct an empty store ready to persist `User` records.
    async fn new_user_store(&self) -> StoreResult<Box<dyn Store<User>>>;

    /// Construct an empty store for the key-less `Widget`.
    async fn new_widget_store(&self) -> StoreResult<Box<dyn Store<Widget>>>;
}

async fn attach<T: Entity>(store: Box<dyn Store<T>>) -> CollectionResult<SyncedCollection<T>> {
    SyncedCollection::with_options(Some(store), Default::default()).await
}

/// Generic add/update/remove roundtrip through a collection.
pub async fn test_crud_roundtrip<F: StoreFactory + Sync>(f: &F) -> CollectionResult<()> {
    let mut users = attach(f.new_user_store().await?).await?;
    assert!(users.is_empty());

    let created = users
        .add(User {
            id: None,
            email: "a@example.com".to_string(),
            active: true,
        })
        .await?;
    let id = created.id.expect("store assigns a key");

    let mut changed = created.duplicate();
    changed.active = false;
    assert!(users.update(changed).await?);
    assert_eq!(users.find_by_key(&id).map(|u| u.active), Some(false));

    assert!(users.remove(&created).await?);
    assert!(users.is_empty());
    assert!(!users.remove(&created).await?);
    Ok(())
}

/// One batch insert; every record comes back with its own generated key.
pub async fn test_batch_add_assigns_keys<F: StoreFactory + Sync>(f: &F) -> CollectionResult<()> {
    let mut users = attach(f.new_user_store().await?).await?;
    let added = users
        .add_batch(["a@example.com", "b@example.com", "c@example.com"].map(|email| User {
            id: None,
            email: email.into(),
            active: true,
        }))
        .await?;
    assert_eq!(added.len(), 3);
    assert_eq!(users.len(), 3);

    let mut keys: Vec<i64> = users.values().filter_map(|u| u.id).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 3);
    Ok(())
}

/// Key-less records: a value-equal copy does not match, the handle does.
pub async fn test_keyless_identity<F: StoreFactory + Sync>(f: &F) -> CollectionResult<()> {
    let mut widgets = attach(f.new_widget_store().await?).await?;
    let w = widgets
        .add(Widget {
            sku: "A".into(),
            name: "Bolt".into(),
        })
        .await?;

    let copy = mirrorlist::Record::new(w.value().clone());
    assert!(!widgets.remove(&copy).await?);
    assert_eq!(widgets.len(), 1);

    assert!(widgets.remove(&w).await?);
    assert!(widgets.is_empty());
    Ok(())
}
