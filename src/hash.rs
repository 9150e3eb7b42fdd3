// src/hash.rs
//! Descriptor fingerprints.
//!
//! A descriptor hash combines the numeric type id handed out by the host's
//! type registry with the variant:
//!
//! ```text
//! hash = type_id | ((variant + 1) << 16)   // concrete variant
//! hash = type_id                           // wildcard variant
//! hash = -1                                // type unknown (degraded)
//! hash = -1                                // variant above WILDCARD
//! ```
//!
//! The `+ 1` keeps variant 0 distinguishable from the wildcard entry.

use crate::stack::{ResourceDescriptor, TypeKey, WILDCARD};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

pub type DescriptorHash = i32;

/// Marker for descriptors whose type the registry does not know yet.
pub const DEGRADED_HASH: DescriptorHash = -1;

/// The host's registry of resource types.
pub trait TypeRegistry: Send + Sync {
    /// Numeric id of `key`, or `None` if the type has not been registered.
    fn type_id(&self, key: &TypeKey) -> Option<i32>;
}

/// In-memory [`TypeRegistry`] handing out sequential ids.
pub struct TypeTable {
    ids: DashMap<TypeKey, i32>,
    next: AtomicI32,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable {
            ids: DashMap::new(),
            next: AtomicI32::new(1),
        }
    }

    /// Build a table that already knows every key in `keys`.
    pub fn with_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        let table = Self::new();
        for key in keys {
            table.register(key);
        }
        table
    }

    /// Register a type and return its id. Re-registering returns the old id.
    pub fn register(&self, key: impl Into<TypeKey>) -> i32 {
        *self
            .ids
            .entry(key.into())
            .or_insert_with(|| self.next.fetch_add(1, Ordering::SeqCst))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for TypeTable {
    fn type_id(&self, key: &TypeKey) -> Option<i32> {
        self.ids.get(key).map(|id| *id)
    }
}

/// Computes [`DescriptorHash`] values against a [`TypeRegistry`].
#[derive(Clone)]
pub struct DescriptorHasher {
    types: Arc<dyn TypeRegistry>,
}

impl DescriptorHasher {
    pub fn new(types: Arc<dyn TypeRegistry>) -> Self {
        Self { types }
    }

    pub fn hash(&self, descriptor: &ResourceDescriptor) -> DescriptorHash {
        // (variant + 1) << 16 wraps into the wildcard hash past this range
        if descriptor.variant() > WILDCARD {
            return DEGRADED_HASH;
        }
        match self.types.type_id(descriptor.type_key()) {
            Some(type_id) => combine(type_id, descriptor),
            None => DEGRADED_HASH,
        }
    }

    pub fn is_known(&self, key: &TypeKey) -> bool {
        self.types.type_id(key).is_some()
    }
}

fn combine(type_id: i32, descriptor: &ResourceDescriptor) -> DescriptorHash {
    if descriptor.is_wildcard() {
        type_id
    } else {
        type_id | ((descriptor.variant() as i32 + 1) << 16)
    }
}
