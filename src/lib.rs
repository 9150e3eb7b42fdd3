// src/lib.rs
//! oredict: concurrent tag dictionary
//!
//! Maps symbolic tags (`"ingotIron"`) to sets of resource descriptors and, once
//! solidified, to stable numeric ids. Producers register from any thread;
//! every index is sharded so registration never queues behind a single lock.
//!
//! Lifecycle: tags are created lazily while the dictionary is open, get ids
//! when it is solidified, and any tag created afterwards is picked up by an
//! automatic rebake the first time a lookup notices it.

pub mod bootstrap;
pub mod compat;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod hash;
pub mod lifecycle;
pub mod registry;
pub mod stack;

pub use config::RegistryConfig;
pub use entry::{TagEntry, TagId, TagView, UNASSIGNED};
pub use error::RegistryError;
pub use events::{SubscriberId, TagRegistered};
pub use hash::{DescriptorHash, DescriptorHasher, TypeRegistry, TypeTable, DEGRADED_HASH};
pub use stack::{contains_match, matches, ResourceDescriptor, TypeKey, WILDCARD};

use crate::events::EventBus;
use crate::lifecycle::Lifecycle;
use crate::registry::TagIndex;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, Once, PoisonError};
use tokio::runtime::Runtime as TokioRuntime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reserved name returned for ids that resolve to nothing; never a valid tag.
pub const UNKNOWN_TAG: &str = "Unknown";

/// Multi-threaded runtime that runs background work such as seeding.
pub(crate) static RUNTIME: Lazy<TokioRuntime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("oredict-worker")
        .enable_all()
        .build()
        .expect("Failed to create oredict Tokio Runtime")
});

static GLOBAL_TYPES: Lazy<Arc<TypeTable>> =
    Lazy::new(|| Arc::new(TypeTable::with_keys(bootstrap::vanilla_type_keys())));

static GLOBAL: Lazy<OreDictionary> =
    Lazy::new(|| OreDictionary::with_config(GLOBAL_TYPES.clone(), RegistryConfig::default()));

static GLOBAL_SEED: Once = Once::new();

/// The process-wide dictionary.
///
/// Seeding is scheduled on the worker runtime only after the instance has been
/// constructed, so the seeding thread never waits on this initialiser.
pub fn global() -> &'static OreDictionary {
    let dict = &*GLOBAL;
    GLOBAL_SEED.call_once(|| dict.schedule_seed());
    dict
}

/// Type table backing [`global`], primed with the well-known vanilla types.
pub fn global_types() -> &'static Arc<TypeTable> {
    &GLOBAL_TYPES
}

/// Handle to a tag dictionary. Clones share the same state.
#[derive(Clone)]
pub struct OreDictionary {
    index: Arc<TagIndex>,
    lifecycle: Arc<Lifecycle>,
    hasher: DescriptorHasher,
    events: Arc<EventBus>,
    create_on_miss: Arc<Mutex<bool>>,
    warn_on_degraded: bool,
    seeding: Arc<Mutex<Option<JoinHandle<usize>>>>,
}

impl OreDictionary {
    /// Empty, open dictionary resolving types through `types`.
    pub fn new(types: Arc<dyn TypeRegistry>) -> Self {
        Self::with_config(types, RegistryConfig::default())
    }

    /// Empty dictionary built from `config`; schedules seeding if asked to.
    pub fn with_config(types: Arc<dyn TypeRegistry>, config: RegistryConfig) -> Self {
        let dict = OreDictionary {
            index: Arc::new(TagIndex::new()),
            lifecycle: Arc::new(Lifecycle::new()),
            hasher: DescriptorHasher::new(types),
            events: Arc::new(EventBus::new()),
            create_on_miss: Arc::new(Mutex::new(config.create_on_miss)),
            warn_on_degraded: config.warn_on_degraded,
            seeding: Arc::new(Mutex::new(None)),
        };
        if config.seed_vanilla {
            dict.schedule_seed();
        }
        dict
    }

    // --- Configuration ---

    /// Toggle create-on-miss for later `id_of` calls.
    pub fn set_create_on_miss(&self, enabled: bool) {
        *self.create_on_miss.lock().unwrap_or_else(PoisonError::into_inner) = enabled;
    }

    /// Whether `id_of` currently creates unknown tags after solidify.
    pub fn is_create_on_miss(&self) -> bool {
        *self.create_on_miss.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Registration ---

    /// Add `descriptor` to `name`, creating the tag if needed.
    ///
    /// Returns `Ok(true)` when the descriptor was new (and a notification was
    /// sent), `Ok(false)` when it was already present.
    pub fn register_tag(&self, name: &str, descriptor: &ResourceDescriptor) -> Result<bool, RegistryError> {
        validate_name(name)?;
        validate_descriptor(name, descriptor)?;

        let hash = self.hash_of(name, descriptor, "registration");
        let (entry, _) = self.index.entry_or_create(name);
        if !entry.add_descriptor(descriptor, hash, &self.index) {
            return Ok(false);
        }

        self.events.emit(&TagRegistered {
            name: name.to_string(),
            descriptor: descriptor.clone(),
        });
        Ok(true)
    }

    /// Remove `descriptor` (by hash equivalence) from `name`. The tag itself
    /// stays. Unknown tags, absent or malformed descriptors are a no-op.
    pub fn remove_tag(&self, name: &str, descriptor: &ResourceDescriptor) -> bool {
        if validate_descriptor(name, descriptor).is_err() {
            return false;
        }
        let Some(entry) = self.index.get(name) else {
            return false;
        };
        let hash = self.hash_of(name, descriptor, "removal");
        entry.remove_descriptor(descriptor, hash, &self.index) > 0
    }

    // --- Lifecycle ---

    /// Assign ids to every tag lacking one and freeze id assignment.
    pub fn solidify(&self, partial: bool) -> Result<usize, RegistryError> {
        self.lifecycle.solidify(&self.index, partial)
    }

    /// Reopen and re-run id assignment, keeping ids already handed out.
    pub fn rebake(&self) -> Result<usize, RegistryError> {
        self.lifecycle.rebake(&self.index)
    }

    /// Whether ids are currently frozen. Briefly false during a rebake.
    pub fn is_solidified(&self) -> bool {
        self.lifecycle.is_solidified()
    }

    /// Completed bakes, rebakes included.
    pub fn bake_count(&self) -> u64 {
        self.lifecycle.bake_count()
    }

    /// Rebakes run so far, explicit or triggered by a lookup.
    pub fn rebake_count(&self) -> u64 {
        self.lifecycle.rebake_count()
    }

    // --- Queries ---

    /// Stable id of `name`.
    ///
    /// Fails with `NotFinalized` before the first solidify. After it, an
    /// unknown name is created on the spot and a rebake assigns its id
    /// (unless create-on-miss is disabled, then `NotFound`).
    pub fn id_of(&self, name: &str) -> Result<TagId, RegistryError> {
        if !self.lifecycle.has_baked() {
            return Err(RegistryError::NotFinalized);
        }
        self.resolve_id(name, true)
    }

    fn resolve_id(&self, name: &str, may_rebake: bool) -> Result<TagId, RegistryError> {
        match self.index.get(name) {
            Some(entry) => match entry.id() {
                Some(id) => Ok(id),
                None if may_rebake => {
                    self.repair("id lookup")?;
                    self.resolve_id(name, false)
                }
                None => Err(RegistryError::InconsistentState(format!(
                    "tag '{name}' still has no id after a rebake"
                ))),
            },
            None if !self.is_create_on_miss() => Err(RegistryError::NotFound(name.to_string())),
            None => {
                validate_name(name)?;
                warn!(%name, "requested the id of a tag that does not exist, creating it after solidify");
                self.index.entry_or_create(name);
                self.repair("create on miss")?;
                self.resolve_id(name, false)
            }
        }
    }

    /// Name of the tag holding `id`, or `None`.
    pub fn name_of(&self, id: TagId) -> Option<String> {
        if !self.lifecycle.has_baked() {
            return None;
        }
        if self.index.unassigned_count() > 0 && self.repair("name lookup").is_err() {
            return None;
        }
        self.index.by_id(id).map(|e| e.name().to_string())
    }

    /// Id of the tag that first claimed `descriptor`, falling back to the
    /// owner of its type-wide wildcard. Never creates anything.
    pub fn id_of_descriptor(&self, descriptor: &ResourceDescriptor) -> Option<TagId> {
        if !self.lifecycle.has_baked() {
            return None;
        }
        let hash = self.hasher.hash(descriptor);
        if hash == DEGRADED_HASH {
            debug!(%descriptor, "id lookup for a descriptor of an unknown type");
            return None;
        }

        let root = self.index.root(hash).or_else(|| {
            if descriptor.is_wildcard() {
                None
            } else {
                self.index.root(self.hasher.hash(&descriptor.to_wildcard()))
            }
        });
        let Some(root) = root else {
            debug!(%descriptor, "id lookup for an unregistered descriptor");
            return None;
        };

        match root.id() {
            Some(id) => Some(id),
            None => {
                self.repair("descriptor lookup").ok()?;
                root.id()
            }
        }
    }

    /// Ids of every tag holding `descriptor` or its type-wide wildcard, ascending.
    pub fn ids_of(&self, descriptor: &ResourceDescriptor) -> Vec<TagId> {
        if !self.lifecycle.has_baked() {
            return Vec::new();
        }
        let members = self.members_of(descriptor);
        if members.iter().any(|e| e.id().is_none()) && self.repair("descriptor lookup").is_err() {
            return Vec::new();
        }
        let mut ids: Vec<TagId> = members.iter().filter_map(|e| e.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Names of every tag holding `descriptor` or its type-wide wildcard.
    /// Works before solidify.
    pub fn tags_of(&self, descriptor: &ResourceDescriptor) -> Vec<String> {
        let mut names: Vec<String> = self
            .members_of(descriptor)
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Names of every tag with a descriptor matching `input` under the
    /// matcher rules. Scans all tags, so it also sees degraded registrations.
    pub fn tags_matching(&self, input: &ResourceDescriptor, strict: bool) -> Vec<String> {
        self.index
            .entries()
            .into_iter()
            .filter(|e| TagView::of(e.clone()).contains_match(input, strict))
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Live view of `name`, empty if the tag does not exist.
    pub fn descriptors_of(&self, name: &str) -> TagView {
        self.descriptors_of_with(name, false)
    }

    /// Live view of `name`; with `create_if_absent` an empty tag is created,
    /// even after solidify (it gets an id on the next rebake).
    pub fn descriptors_of_with(&self, name: &str, create_if_absent: bool) -> TagView {
        if let Some(entry) = self.index.get(name) {
            return TagView::of(entry);
        }
        if !create_if_absent {
            return TagView::empty();
        }
        if validate_name(name).is_err() {
            return TagView::empty();
        }
        let (entry, created) = self.index.entry_or_create(name);
        if created && self.is_solidified() {
            debug!(%name, "tag created lazily after solidify");
        }
        TagView::of(entry)
    }

    /// Whether `name` exists, with or without descriptors.
    pub fn tag_exists(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Every tag name, sorted.
    pub fn all_tag_names(&self) -> Vec<String> {
        self.index.names()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Verify that the name, id and hash indices agree. Call while quiescent.
    pub fn check_consistency(&self) -> Result<(), RegistryError> {
        self.index.check_consistency()
    }

    // --- Notifications ---

    /// Register a callback run for every newly added descriptor.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriberId
    where
        F: Fn(&TagRegistered) -> Result<(), String> + Send + Sync + 'static,
    {
        self.events.subscribe(Arc::new(subscriber))
    }

    /// Remove a subscriber; false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Failures reported by subscribers so far.
    pub fn notification_errors(&self) -> Vec<String> {
        self.events.errors()
    }

    // --- Bootstrap ---

    /// Schedule the well-known seed set on the worker runtime (once).
    pub fn schedule_seed(&self) {
        let mut slot = self.seeding.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(bootstrap::spawn_seed(self.clone()));
        }
    }

    /// Await the scheduled seeding task. Returns the number of descriptors
    /// it newly registered, or `None` if nothing was scheduled (or it was
    /// already awaited).
    pub async fn seeded(&self) -> Option<usize> {
        let handle = self
            .seeding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        match handle.await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "seeding task failed");
                None
            }
        }
    }

    /// Block the current thread until seeding finishes. Must not be called
    /// from inside an async context.
    pub fn wait_seeded(&self) -> Option<usize> {
        RUNTIME.block_on(self.seeded())
    }

    // --- Internals ---

    fn hash_of(&self, name: &str, descriptor: &ResourceDescriptor, context: &str) -> DescriptorHash {
        let hash = self.hasher.hash(descriptor);
        if hash == DEGRADED_HASH && self.warn_on_degraded {
            warn!(
                %name,
                %descriptor,
                context,
                "descriptor type is unknown to the type registry; this tag cannot dedupe it reliably"
            );
        }
        hash
    }

    fn members_of(&self, descriptor: &ResourceDescriptor) -> Vec<Arc<TagEntry>> {
        let hash = self.hasher.hash(descriptor);
        if hash == DEGRADED_HASH {
            return Vec::new();
        }
        let mut members = self.index.bucket(hash);
        if !descriptor.is_wildcard() {
            members.extend(self.index.bucket(self.hasher.hash(&descriptor.to_wildcard())));
        }
        members
    }

    fn repair(&self, context: &str) -> Result<(), RegistryError> {
        warn!(context, "solidified dictionary holds tags without ids, forcing a rebake");
        self.lifecycle.rebake(&self.index).map(|_| ())
    }

    pub(crate) fn index(&self) -> &TagIndex {
        &self.index
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "tag name is empty"
    } else if name == UNKNOWN_TAG {
        "tag name is reserved"
    } else {
        return Ok(());
    };
    warn!(%name, reason, "invalid tag registration denied");
    Err(RegistryError::invalid(name, reason))
}

fn validate_descriptor(name: &str, descriptor: &ResourceDescriptor) -> Result<(), RegistryError> {
    let reason = if descriptor.type_key().is_empty() {
        "descriptor has no type"
    } else if descriptor.variant() > WILDCARD {
        "descriptor variant is out of range"
    } else {
        return Ok(());
    };
    warn!(%name, %descriptor, reason, "invalid tag registration denied");
    Err(RegistryError::invalid(name, reason))
}
