// src/entry.rs
//! Tag entries and live views over them.

use crate::hash::{DescriptorHash, DEGRADED_HASH};
use crate::registry::TagIndex;
use crate::stack::{self, ResourceDescriptor};
use dashmap::DashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Stable numeric tag id (i32 so it stays compatible with legacy callers).
pub type TagId = i32;

/// Id held by an entry that has not been baked yet.
pub const UNASSIGNED: TagId = -1;

/// One tag and the descriptors registered under it.
///
/// Each descriptor is stored together with the hash it had when it was added,
/// so the hash buckets stay consistent even if the type registry learns about
/// the type later.
pub struct TagEntry {
    name: Arc<str>,
    explicit_id: Option<TagId>,
    id: AtomicI32,
    descriptors: DashMap<ResourceDescriptor, DescriptorHash>,
    /// Serialises add/remove on this entry so the set and its buckets move together.
    write: Mutex<()>,
}

impl TagEntry {
    pub(crate) fn new(name: Arc<str>) -> Self {
        TagEntry {
            name,
            explicit_id: None,
            id: AtomicI32::new(UNASSIGNED),
            descriptors: DashMap::new(),
            write: Mutex::new(()),
        }
    }

    /// Entry created through the legacy numeric-id path.
    pub(crate) fn with_explicit_id(name: Arc<str>, id: TagId) -> Self {
        TagEntry {
            explicit_id: Some(id),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigned id, or `None` while the entry is unbaked.
    pub fn id(&self) -> Option<TagId> {
        match self.raw_id() {
            UNASSIGNED => None,
            id => Some(id),
        }
    }

    pub(crate) fn raw_id(&self) -> TagId {
        self.id.load(Ordering::SeqCst)
    }

    pub fn explicit_id(&self) -> Option<TagId> {
        self.explicit_id
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn contains(&self, descriptor: &ResourceDescriptor) -> bool {
        self.descriptors.contains_key(descriptor)
    }

    /// Whether any stored descriptor was recorded under `hash`.
    pub(crate) fn holds_hash(&self, hash: DescriptorHash) -> bool {
        self.descriptors.iter().any(|kv| *kv.value() == hash)
    }

    pub(crate) fn recorded_hashes(&self) -> Vec<(ResourceDescriptor, DescriptorHash)> {
        self.descriptors
            .iter()
            .map(|kv| (kv.key().clone(), *kv.value()))
            .collect()
    }

    /// Sorted copy of the current descriptors.
    pub fn snapshot(&self) -> Vec<ResourceDescriptor> {
        let mut out: Vec<ResourceDescriptor> =
            self.descriptors.iter().map(|kv| kv.key().clone()).collect();
        out.sort();
        out
    }

    /// Swap the sentinel for `id`. Fails with the current id if one is set.
    pub(crate) fn assign_id(&self, id: TagId) -> Result<(), TagId> {
        self.id
            .compare_exchange(UNASSIGNED, id, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
    }

    /// Add a copy of `descriptor`; returns whether it was new.
    ///
    /// Re-adding a descriptor that was recorded under the degraded hash, once
    /// its type is known, moves it to its real bucket (still not "new").
    pub(crate) fn add_descriptor(
        self: &Arc<Self>,
        descriptor: &ResourceDescriptor,
        hash: DescriptorHash,
        index: &TagIndex,
    ) -> bool {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let upgraded = match self.descriptors.get_mut(descriptor) {
            Some(mut recorded) => {
                if *recorded != DEGRADED_HASH || hash == DEGRADED_HASH {
                    return false;
                }
                *recorded = hash;
                true
            }
            None => false,
        };
        if upgraded {
            index.on_descriptor_added(self, hash);
            if !self.holds_hash(DEGRADED_HASH) {
                index.on_descriptor_removed(self, DEGRADED_HASH);
            }
            return false;
        }
        self.descriptors.insert(descriptor.clone(), hash);
        index.on_descriptor_added(self, hash);
        true
    }

    /// Remove every stored descriptor equal to `descriptor` or recorded under
    /// the same (non-degraded) hash. Returns how many were removed.
    pub(crate) fn remove_descriptor(
        self: &Arc<Self>,
        descriptor: &ResourceDescriptor,
        hash: DescriptorHash,
        index: &TagIndex,
    ) -> usize {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<(ResourceDescriptor, DescriptorHash)> = self
            .descriptors
            .iter()
            .filter(|kv| kv.key() == descriptor || (hash != DEGRADED_HASH && *kv.value() == hash))
            .map(|kv| (kv.key().clone(), *kv.value()))
            .collect();

        for (d, _) in &doomed {
            self.descriptors.remove(d);
        }

        let mut touched: Vec<DescriptorHash> = doomed.iter().map(|(_, h)| *h).collect();
        touched.sort_unstable();
        touched.dedup();
        for h in touched {
            if !self.holds_hash(h) {
                index.on_descriptor_removed(self, h);
            }
        }

        doomed.len()
    }
}

impl PartialEq for TagEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TagEntry {}

impl Hash for TagEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Debug for TagEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagEntry")
            .field("name", &self.name)
            .field("id", &self.raw_id())
            .field("explicit_id", &self.explicit_id)
            .field("len", &self.len())
            .finish()
    }
}

/// Read-only, live view of a tag's descriptors.
///
/// Descriptors registered after the view was obtained are visible through it.
/// A view of a tag that does not exist is permanently empty.
#[derive(Clone, Debug)]
pub struct TagView {
    entry: Option<Arc<TagEntry>>,
}

impl TagView {
    pub(crate) fn of(entry: Arc<TagEntry>) -> Self {
        TagView { entry: Some(entry) }
    }

    pub fn empty() -> Self {
        TagView { entry: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.entry.as_deref().map(TagEntry::name)
    }

    pub fn len(&self) -> usize {
        self.entry.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, descriptor: &ResourceDescriptor) -> bool {
        self.entry.as_ref().is_some_and(|e| e.contains(descriptor))
    }

    /// Whether any descriptor in the tag matches `input` under the matcher rules.
    pub fn contains_match(&self, input: &ResourceDescriptor, strict: bool) -> bool {
        match &self.entry {
            Some(e) => e
                .descriptors
                .iter()
                .any(|kv| stack::matches(Some(kv.key()), Some(input), strict)),
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<ResourceDescriptor> {
        self.entry.as_ref().map(|e| e.snapshot()).unwrap_or_default()
    }
}
