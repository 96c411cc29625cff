// src/store/memory.rs

//! In-memory object store
//!
//! Keeps objects in a sorted map and appends every mutating call to an
//! operation log, so callers can check the order in which a publish
//! touched the store.

use super::{ExistingObject, ObjectStore, Visibility, WriteOptions, check_existing};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An object held by [`MemoryStore`], with the metadata it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub visibility: Visibility,
}

/// A mutating call recorded by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Write(String),
    Remove(String),
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    log: Vec<StoreOp>,
    failing: BTreeSet<String>,
}

/// Object store backed by a map in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object without recording an operation
    pub fn insert(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.lock().objects.insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: super::CONTENT_TYPE_PACKAGE.to_string(),
                cache_control: None,
                visibility: Visibility::default(),
            },
        );
    }

    /// Make every later write to `key` fail with a store error
    pub fn fail_writes_to(&self, key: &str) {
        self.lock().failing.insert(key.to_string());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().objects.contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Every write and remove issued so far, in order
    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().log.clone()
    }

    /// Keys written so far, in order (repeated writes appear repeatedly)
    pub fn written_keys(&self) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter_map(|op| match op {
                StoreOp::Write(key) => Some(key.clone()),
                StoreOp::Remove(_) => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }
}

impl ObjectStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().objects.get(key).map(|o| o.data.clone()))
    }

    fn write(&self, key: &str, data: &[u8], options: &WriteOptions<'_>) -> Result<()> {
        let mut inner = self.lock();

        if inner.failing.contains(key) {
            return Err(Error::StoreError(format!("injected write failure for {}", key)));
        }

        if options.fail_if_exists {
            let existing = inner.objects.get(key).map(|o| o.data.as_slice());
            if check_existing(key, existing, data)? == ExistingObject::Identical {
                return Ok(());
            }
        }

        inner.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: options.content_type.to_string(),
                cache_control: options.cache_control.map(str::to_string),
                visibility: options.visibility,
            },
        );
        inner.log.push(StoreOp::Write(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.objects.remove(key);
        inner.log.push(StoreOp::Remove(key.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
