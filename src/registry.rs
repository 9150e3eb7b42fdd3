// src/registry.rs
//! Tag indices.
//!
//! `TagIndex` owns every derived index over the tag entries:
//! - name -> entry (unique, one entry per name)
//! - id -> entry (only for entries holding an id)
//! - descriptor hash -> set of entries holding a descriptor with that hash
//! - descriptor hash -> root owner (first tag registered under a hash)
//!
//! All maps are sharded (`DashMap`/`DashSet`), so readers and writers of
//! different shards never wait on each other. A reader may briefly see an
//! entry's descriptor before its bucket is updated, never a half-built set.

use crate::entry::{TagEntry, TagId, UNASSIGNED};
use crate::error::RegistryError;
use crate::hash::{DescriptorHash, DEGRADED_HASH};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::error;

pub struct TagIndex {
    by_name: DashMap<Arc<str>, Arc<TagEntry>>,
    by_id: DashMap<TagId, Arc<TagEntry>>,
    by_hash: DashMap<DescriptorHash, DashSet<Arc<TagEntry>>>,
    roots: DashMap<DescriptorHash, Arc<TagEntry>>,
    /// Entries created without an id that have not been baked yet.
    unassigned: AtomicUsize,
}

impl TagIndex {
    pub fn new() -> Self {
        TagIndex {
            by_name: DashMap::new(),
            by_id: DashMap::new(),
            by_hash: DashMap::new(),
            roots: DashMap::new(),
            unassigned: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TagEntry>> {
        self.by_name.get(name).map(|e| e.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Find the entry for `name`, creating an unbaked one if absent.
    /// The flag is true when this call created it.
    pub fn entry_or_create(&self, name: &str) -> (Arc<TagEntry>, bool) {
        if let Some(existing) = self.get(name) {
            return (existing, false);
        }

        let key: Arc<str> = Arc::from(name);
        let mut created = false;
        let entry = self
            .by_name
            .entry(key.clone())
            .or_insert_with(|| {
                created = true;
                self.unassigned.fetch_add(1, Ordering::SeqCst);
                Arc::new(TagEntry::new(key))
            })
            .value()
            .clone();
        (entry, created)
    }

    /// Create `name` already holding `id`. Used by the legacy numeric path.
    pub fn insert_explicit(&self, name: &str, id: TagId) -> Result<Arc<TagEntry>, RegistryError> {
        let key: Arc<str> = Arc::from(name);
        match self.by_name.entry(key.clone()) {
            Entry::Occupied(slot) => {
                let existing = slot.get().clone();
                drop(slot);
                if existing.raw_id() == id {
                    Ok(existing)
                } else {
                    Err(RegistryError::invalid(
                        name,
                        format!("tag already exists with id {}", existing.raw_id()),
                    ))
                }
            }
            Entry::Vacant(name_slot) => match self.by_id.entry(id) {
                Entry::Occupied(holder) => Err(RegistryError::DuplicateId {
                    id,
                    holder: holder.get().name().to_string(),
                }),
                Entry::Vacant(id_slot) => {
                    let entry = Arc::new(TagEntry::with_explicit_id(key, id));
                    // fresh entry, cannot already hold an id
                    let _ = entry.assign_id(id);
                    id_slot.insert(entry.clone());
                    name_slot.insert(entry.clone());
                    Ok(entry)
                }
            },
        }
    }

    pub(crate) fn on_descriptor_added(&self, entry: &Arc<TagEntry>, hash: DescriptorHash) {
        self.by_hash.entry(hash).or_default().insert(entry.clone());
        if hash != DEGRADED_HASH {
            self.roots.entry(hash).or_insert_with(|| entry.clone());
        }
    }

    /// Drop `entry` from the bucket of `hash`. Empty buckets are kept.
    ///
    /// If `entry` owned the hash, the successor is picked and installed while
    /// the root slot is held, and only among members still holding the hash.
    /// A concurrent removal of that successor therefore sees it as root and
    /// hands ownership on in turn.
    pub(crate) fn on_descriptor_removed(&self, entry: &Arc<TagEntry>, hash: DescriptorHash) {
        if let Some(bucket) = self.by_hash.get(&hash) {
            bucket.remove(entry);
        }

        let Entry::Occupied(mut slot) = self.roots.entry(hash) else {
            return;
        };
        if !Arc::ptr_eq(slot.get(), entry) {
            return;
        }
        let next = self
            .bucket(hash)
            .into_iter()
            .find(|e| !Arc::ptr_eq(e, entry) && e.holds_hash(hash));
        match next {
            Some(next) => {
                slot.insert(next);
            }
            None => {
                slot.remove();
            }
        }
    }

    /// Record `id` for `entry`. A second id for the same entry, or an id held
    /// by another entry, breaks the name/id bijection and aborts.
    pub(crate) fn on_id_assigned(&self, entry: &Arc<TagEntry>, id: TagId) {
        if let Err(current) = entry.assign_id(id) {
            error!(name = entry.name(), current, id, "duplicate id assignment");
            panic!("tag '{}' already holds id {current}, refusing to assign {id}", entry.name());
        }
        match self.by_id.entry(id) {
            Entry::Occupied(holder) => {
                let holder = holder.get().name().to_string();
                error!(name = entry.name(), id, %holder, "id collision during assignment");
                panic!("id {id} is already held by '{holder}', cannot assign it to '{}'", entry.name());
            }
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
            }
        }
        self.unassigned.fetch_sub(1, Ordering::SeqCst);
    }

    /// Entries holding a descriptor with `hash`, sorted by name.
    pub fn bucket(&self, hash: DescriptorHash) -> Vec<Arc<TagEntry>> {
        let mut out: Vec<Arc<TagEntry>> = match self.by_hash.get(&hash) {
            Some(bucket) => bucket.iter().map(|e| e.key().clone()).collect(),
            None => Vec::new(),
        };
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    pub fn root(&self, hash: DescriptorHash) -> Option<Arc<TagEntry>> {
        self.roots.get(&hash).map(|e| e.value().clone())
    }

    pub fn by_id(&self, id: TagId) -> Option<Arc<TagEntry>> {
        self.by_id.get(&id).map(|e| e.value().clone())
    }

    pub fn id_taken(&self, id: TagId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Highest id currently held, 0 when none.
    pub fn max_id(&self) -> TagId {
        self.by_id.iter().map(|kv| *kv.key()).max().unwrap_or(0)
    }

    /// Snapshot of every entry, sorted by name.
    pub fn entries(&self) -> Vec<Arc<TagEntry>> {
        let mut out: Vec<Arc<TagEntry>> = self.by_name.iter().map(|kv| kv.value().clone()).collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_name.iter().map(|kv| kv.key().to_string()).collect();
        out.sort();
        out
    }

    pub fn unassigned_count(&self) -> usize {
        self.unassigned.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Verify the name/id bijection and the bucket membership rules.
    /// Only meaningful while no writer is active.
    pub fn check_consistency(&self) -> Result<(), RegistryError> {
        let mut problems = Vec::new();

        for entry in self.entries() {
            if let Some(id) = entry.id() {
                match self.by_id(id) {
                    Some(held) if Arc::ptr_eq(&held, &entry) => {}
                    _ => problems.push(format!("'{}' holds id {id} missing from the id index", entry.name())),
                }
            }
            for (descriptor, hash) in entry.recorded_hashes() {
                let listed = self
                    .by_hash
                    .get(&hash)
                    .is_some_and(|bucket| bucket.contains(&entry));
                if !listed {
                    problems.push(format!("'{}' missing from bucket {hash} for {descriptor}", entry.name()));
                }
            }
        }

        let ids: Vec<(TagId, Arc<TagEntry>)> = self
            .by_id
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect();
        for (id, entry) in &ids {
            let id = *id;
            if entry.raw_id() != id {
                problems.push(format!("id index maps {id} to '{}' holding {}", entry.name(), entry.raw_id()));
            }
            if !self.by_name.get(entry.name()).is_some_and(|e| Arc::ptr_eq(e.value(), entry)) {
                problems.push(format!("id {id} points at '{}' unknown by name", entry.name()));
            }
        }

        for kv in self.by_hash.iter() {
            let hash = *kv.key();
            for member in kv.value().iter() {
                if !member.key().holds_hash(hash) {
                    problems.push(format!("bucket {hash} lists '{}' without a matching descriptor", member.key().name()));
                }
            }
        }

        let roots: Vec<(DescriptorHash, Arc<TagEntry>)> = self
            .roots
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect();
        for (hash, root) in &roots {
            if !root.holds_hash(*hash) {
                problems.push(format!("root of {hash} is '{}', which no longer holds it", root.name()));
            }
        }
        let occupied: Vec<DescriptorHash> = self
            .by_hash
            .iter()
            .filter(|kv| *kv.key() != DEGRADED_HASH && !kv.value().is_empty())
            .map(|kv| *kv.key())
            .collect();
        for hash in occupied {
            if !self.roots.contains_key(&hash) {
                problems.push(format!("bucket {hash} has members but no root"));
            }
        }

        let unbaked = self
            .by_name
            .iter()
            .filter(|kv| kv.value().raw_id() == UNASSIGNED)
            .count();
        if unbaked != self.unassigned_count() {
            problems.push(format!(
                "unassigned counter {} disagrees with {unbaked} unbaked entries",
                self.unassigned_count()
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::InconsistentState(problems.join("; ")))
        }
    }
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ResourceDescriptor;

    #[test]
    fn create_is_idempotent() {
        let index = TagIndex::new();
        let (a, created_a) = index.entry_or_create("ingotIron");
        let (b, created_b) = index.entry_or_create("ingotIron");
        assert!(created_a);
        assert!(!created_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(index.unassigned_count(), 1);
    }

    #[test]
    fn id_assignment_fills_id_index() {
        let index = TagIndex::new();
        let (e, _) = index.entry_or_create("ingotGold");
        index.on_id_assigned(&e, 3);
        assert_eq!(index.by_id(3).map(|e| e.name().to_string()), Some("ingotGold".into()));
        assert_eq!(index.unassigned_count(), 0);
        assert_eq!(index.max_id(), 3);
        index.check_consistency().unwrap();
    }

    #[test]
    #[should_panic(expected = "already holds id")]
    fn second_id_is_fatal() {
        let index = TagIndex::new();
        let (e, _) = index.entry_or_create("gemDiamond");
        index.on_id_assigned(&e, 1);
        index.on_id_assigned(&e, 2);
    }

    #[test]
    #[should_panic(expected = "already held by")]
    fn shared_id_is_fatal() {
        let index = TagIndex::new();
        let (a, _) = index.entry_or_create("a");
        let (b, _) = index.entry_or_create("b");
        index.on_id_assigned(&a, 1);
        index.on_id_assigned(&b, 1);
    }

    #[test]
    fn root_moves_when_owner_leaves() {
        let index = TagIndex::new();
        let d = ResourceDescriptor::new("minecraft:glass", 0);
        let (first, _) = index.entry_or_create("blockGlassColorless");
        let (second, _) = index.entry_or_create("blockGlass");
        first.add_descriptor(&d, 20, &index);
        second.add_descriptor(&d, 20, &index);
        assert_eq!(index.root(20).unwrap().name(), "blockGlassColorless");

        first.remove_descriptor(&d, 20, &index);
        assert_eq!(index.root(20).unwrap().name(), "blockGlass");
        second.remove_descriptor(&d, 20, &index);
        assert!(index.root(20).is_none());
        assert!(index.bucket(20).is_empty());
        index.check_consistency().unwrap();
    }

    #[test]
    fn successor_must_still_hold_the_hash() {
        let index = TagIndex::new();
        let d = ResourceDescriptor::new("minecraft:glass", 0);
        let (a, _) = index.entry_or_create("a");
        let (b, _) = index.entry_or_create("b");
        let (c, _) = index.entry_or_create("c");
        for e in [&a, &b, &c] {
            e.add_descriptor(&d, 20, &index);
        }
        assert_eq!(index.root(20).unwrap().name(), "a");

        // a non-root leaves first; the root hand-off then skips it
        b.remove_descriptor(&d, 20, &index);
        a.remove_descriptor(&d, 20, &index);
        assert_eq!(index.root(20).unwrap().name(), "c");
        index.check_consistency().unwrap();
    }

    #[test]
    fn degraded_hash_has_no_root() {
        let index = TagIndex::new();
        let (e, _) = index.entry_or_create("oreMystery");
        e.add_descriptor(&ResourceDescriptor::new("mod:ore", 0), DEGRADED_HASH, &index);
        assert!(index.root(DEGRADED_HASH).is_none());
        assert_eq!(index.bucket(DEGRADED_HASH).len(), 1);
    }

    #[test]
    fn explicit_ids_are_checked() {
        let index = TagIndex::new();
        let e = index.insert_explicit("legacyOre", 40).unwrap();
        assert_eq!(e.explicit_id(), Some(40));
        assert_eq!(e.id(), Some(40));
        assert_eq!(index.unassigned_count(), 0);

        assert!(index.insert_explicit("legacyOre", 40).is_ok());
        assert!(matches!(
            index.insert_explicit("otherOre", 40),
            Err(RegistryError::DuplicateId { id: 40, .. })
        ));
        assert!(matches!(
            index.insert_explicit("legacyOre", 41),
            Err(RegistryError::InvalidRegistration { .. })
        ));
        index.check_consistency().unwrap();
    }
}
