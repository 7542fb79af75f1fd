//! Instance handles used for reference identity.
//!
//! A [`Record`] pairs an entity value with a process-unique [`InstanceId`].
//! Cloning a record clones the handle: the clone refers to the same instance
//! and matches the original under reference identity. A fresh identity is only
//! minted by [`Record::new`], `From<T>` and [`Record::duplicate`].

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one entity instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        InstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// An entity value together with its instance identity.
#[derive(Debug, Clone)]
pub struct Record<T> {
    id: InstanceId,
    value: T,
}

impl<T> Record<T> {
    /// Wrap a value as a brand-new instance.
    pub fn new(value: T) -> Self {
        Self {
            id: InstanceId::next(),
            value,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.id
    }

    /// True when both handles refer to the same instance.
    pub fn same_instance(&self, other: &Record<T>) -> bool {
        self.id == other.id
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// Replace the value while keeping the instance identity.
    pub fn set(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Clone> Record<T> {
    /// A value-equal copy with its own identity.
    pub fn duplicate(&self) -> Self {
        Record::new(self.value.clone())
    }
}

impl<T> From<T> for Record<T> {
    fn from(value: T) -> Self {
        Record::new(value)
    }
}

impl<T> Deref for Record<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> AsRef<T> for Record<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
