// src/lifecycle.rs
//! Open -> Solidified state machine and id baking.
//!
//! Baking walks a name-sorted snapshot of the index so that identical
//! registrations always produce identical ids. Entries created while a bake
//! is running may miss it; they keep the unassigned sentinel until the next
//! rebake picks them up.

use crate::entry::{TagEntry, TagId, UNASSIGNED};
use crate::error::RegistryError;
use crate::registry::TagIndex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

pub struct Lifecycle {
    solidified: AtomicBool,
    /// Held for the duration of solidify/rebake and explicit id reservation.
    bake_lock: Mutex<()>,
    bakes: AtomicU64,
    rebakes: AtomicU64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            solidified: AtomicBool::new(false),
            bake_lock: Mutex::new(()),
            bakes: AtomicU64::new(0),
            rebakes: AtomicU64::new(0),
        }
    }

    pub fn is_solidified(&self) -> bool {
        self.solidified.load(Ordering::SeqCst)
    }

    /// Completed bakes, including those run by rebakes.
    pub fn bake_count(&self) -> u64 {
        self.bakes.load(Ordering::SeqCst)
    }

    /// Whether a bake has ever completed. Stays true while a rebake briefly
    /// reopens the dictionary, so lookups never observe that window.
    pub fn has_baked(&self) -> bool {
        self.bake_count() > 0
    }

    pub fn rebake_count(&self) -> u64 {
        self.rebakes.load(Ordering::SeqCst)
    }

    /// Assign ids and freeze. Returns how many entries received an id.
    ///
    /// A full bake numbers unbaked entries from 1 in name order, skipping ids
    /// already held. A partial bake continues after the highest id in use.
    pub fn solidify(&self, index: &TagIndex, partial: bool) -> Result<usize, RegistryError> {
        let _guard = self.bake_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.solidify_locked(index, partial)
    }

    /// Reopen and bake again with the previous solidified flag as the
    /// `partial` argument, so rebaking a solidified dictionary keeps every
    /// existing id.
    pub fn rebake(&self, index: &TagIndex) -> Result<usize, RegistryError> {
        let _guard = self.bake_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let was_solidified = self.solidified.swap(false, Ordering::SeqCst);
        self.rebakes.fetch_add(1, Ordering::SeqCst);
        warn!(
            unassigned = index.unassigned_count(),
            partial = was_solidified,
            "rebaking tag ids"
        );
        self.solidify_locked(index, was_solidified)
    }

    /// Create `name` holding `id` while no bake can run. Only allowed before
    /// the first bake.
    pub fn reserve_explicit(
        &self,
        index: &TagIndex,
        name: &str,
        id: TagId,
    ) -> Result<Arc<TagEntry>, RegistryError> {
        let _guard = self.bake_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.has_baked() {
            return Err(RegistryError::AlreadySolidified);
        }
        index.insert_explicit(name, id)
    }

    fn solidify_locked(&self, index: &TagIndex, partial: bool) -> Result<usize, RegistryError> {
        if self.is_solidified() {
            warn!("the tag dictionary has already been solidified");
            return Err(RegistryError::AlreadySolidified);
        }

        let assigned = if partial {
            bake_partial(index)
        } else {
            bake_full(index)
        };

        self.solidified.store(true, Ordering::SeqCst);
        self.bakes.fetch_add(1, Ordering::SeqCst);
        info!(assigned, partial, tags = index.len(), "tag ids baked");
        Ok(assigned)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn bake_full(index: &TagIndex) -> usize {
    let mut counter: TagId = 0;
    let mut assigned = 0;
    for entry in unbaked(index) {
        counter += 1;
        while index.id_taken(counter) {
            counter += 1;
        }
        index.on_id_assigned(&entry, counter);
        assigned += 1;
    }
    assigned
}

fn bake_partial(index: &TagIndex) -> usize {
    let mut counter = index.max_id();
    let mut assigned = 0;
    for entry in unbaked(index) {
        counter += 1;
        index.on_id_assigned(&entry, counter);
        assigned += 1;
    }
    assigned
}

fn unbaked(index: &TagIndex) -> impl Iterator<Item = Arc<TagEntry>> {
    index
        .entries()
        .into_iter()
        .filter(|e| e.raw_id() == UNASSIGNED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(names: &[&str]) -> TagIndex {
        let index = TagIndex::new();
        for name in names {
            index.entry_or_create(name);
        }
        index
    }

    fn id(index: &TagIndex, name: &str) -> Option<TagId> {
        index.get(name).and_then(|e| e.id())
    }

    #[test]
    fn full_bake_is_name_ordered() {
        let index = index_with(&["oreIron", "dyeRed", "logWood"]);
        let lc = Lifecycle::new();
        assert_eq!(lc.solidify(&index, false).unwrap(), 3);
        assert!(lc.is_solidified());
        assert_eq!(id(&index, "dyeRed"), Some(1));
        assert_eq!(id(&index, "logWood"), Some(2));
        assert_eq!(id(&index, "oreIron"), Some(3));
        index.check_consistency().unwrap();
    }

    #[test]
    fn double_solidify_reports() {
        let index = index_with(&["a"]);
        let lc = Lifecycle::new();
        lc.solidify(&index, false).unwrap();
        assert_eq!(lc.solidify(&index, false), Err(RegistryError::AlreadySolidified));
        assert_eq!(lc.bake_count(), 1);
    }

    #[test]
    fn full_bake_skips_reserved_ids() {
        let index = index_with(&["b", "c"]);
        let lc = Lifecycle::new();
        lc.reserve_explicit(&index, "a", 1).unwrap();
        lc.solidify(&index, false).unwrap();
        assert_eq!(id(&index, "a"), Some(1));
        assert_eq!(id(&index, "b"), Some(2));
        assert_eq!(id(&index, "c"), Some(3));
    }

    #[test]
    fn partial_bake_continues_after_max() {
        let index = index_with(&["z"]);
        let lc = Lifecycle::new();
        lc.reserve_explicit(&index, "legacy", 10).unwrap();
        lc.solidify(&index, true).unwrap();
        assert_eq!(id(&index, "legacy"), Some(10));
        assert_eq!(id(&index, "z"), Some(11));
    }

    #[test]
    fn rebake_keeps_existing_ids() {
        let index = index_with(&["m", "n"]);
        let lc = Lifecycle::new();
        lc.solidify(&index, false).unwrap();
        let before: Vec<_> = ["m", "n"].iter().map(|n| id(&index, n)).collect();

        // "a" sorts first but must not disturb the ids already handed out
        index.entry_or_create("a");
        assert_eq!(index.unassigned_count(), 1);
        assert_eq!(lc.rebake(&index).unwrap(), 1);

        let after: Vec<_> = ["m", "n"].iter().map(|n| id(&index, n)).collect();
        assert_eq!(before, after);
        assert_eq!(id(&index, "a"), Some(3));
        assert_eq!(lc.rebake_count(), 1);
        assert_eq!(lc.bake_count(), 2);
        index.check_consistency().unwrap();
    }

    #[test]
    fn rebake_before_solidify_is_full() {
        let index = index_with(&["b", "a"]);
        let lc = Lifecycle::new();
        lc.rebake(&index).unwrap();
        assert!(lc.is_solidified());
        assert_eq!(id(&index, "a"), Some(1));
        assert_eq!(id(&index, "b"), Some(2));
    }

    #[test]
    fn reservation_closes_after_first_bake() {
        let index = index_with(&[]);
        let lc = Lifecycle::new();
        assert!(!lc.has_baked());
        lc.solidify(&index, false).unwrap();
        assert!(lc.has_baked());
        assert_eq!(
            lc.reserve_explicit(&index, "late", 4).map(|_| ()),
            Err(RegistryError::AlreadySolidified)
        );
        assert!(!index.contains("late"));
    }
}
