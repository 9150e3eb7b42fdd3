// src/compat.rs
//! Compatibility shim for callers that address tags by numeric id.
//!
//! Everything here maps through [`OreDictionary::name_of`] /
//! [`OreDictionary::id_of`]; the name-keyed API stays canonical.

use crate::entry::{TagId, TagView};
use crate::error::RegistryError;
use crate::stack::ResourceDescriptor;
use crate::{OreDictionary, UNKNOWN_TAG};
use tracing::warn;

impl OreDictionary {
    /// Name for `id`, or the reserved unknown marker.
    pub fn name_or_unknown(&self, id: TagId) -> String {
        self.name_of(id).unwrap_or_else(|| UNKNOWN_TAG.to_string())
    }

    /// Register under the tag currently holding `id`. Unknown ids resolve to
    /// the reserved marker and are denied like any other reserved name.
    #[deprecated(note = "register by tag name")]
    pub fn register_by_id(&self, id: TagId, descriptor: &ResourceDescriptor) -> Result<bool, RegistryError> {
        let name = self.name_or_unknown(id);
        self.register_tag(&name, descriptor)
    }

    #[deprecated(note = "look tags up by name")]
    pub fn descriptors_by_id(&self, id: TagId) -> TagView {
        match self.name_of(id) {
            Some(name) => self.descriptors_of(&name),
            None => TagView::empty(),
        }
    }

    /// Create `name` pinned to `id` before ids are baked. Bakes never renumber
    /// it. Re-reserving the same pair is accepted.
    pub fn reserve_id(&self, name: &str, id: TagId) -> Result<(), RegistryError> {
        if id <= 0 {
            return Err(RegistryError::invalid(name, format!("id {id} is not positive")));
        }
        if name.is_empty() || name == UNKNOWN_TAG {
            return Err(RegistryError::invalid(name, "tag name is empty or reserved"));
        }
        self.lifecycle()
            .reserve_explicit(self.index(), name, id)
            .map(|_| ())
            .inspect_err(|e| warn!(%name, id, error = %e, "explicit id reservation denied"))
    }
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use crate::{OreDictionary, RegistryError, ResourceDescriptor, TypeTable, UNKNOWN_TAG};
    use std::sync::Arc;

    fn dict() -> OreDictionary {
        OreDictionary::new(Arc::new(TypeTable::with_keys(["minecraft:gold_ingot"])))
    }

    #[test]
    fn numeric_paths_follow_names() {
        let d = dict();
        let gold = ResourceDescriptor::new("minecraft:gold_ingot", 0);
        d.register_tag("ingotGold", &gold).unwrap();
        d.solidify(false).unwrap();
        let id = d.id_of("ingotGold").unwrap();

        assert_eq!(d.name_or_unknown(id), "ingotGold");
        assert_eq!(d.name_or_unknown(id + 100), UNKNOWN_TAG);
        assert!(d.descriptors_by_id(id).contains(&gold));
        assert!(d.descriptors_by_id(id + 100).is_empty());

        let nugget = ResourceDescriptor::new("minecraft:gold_ingot", 1);
        assert_eq!(d.register_by_id(id, &nugget), Ok(true));
        assert!(d.descriptors_of("ingotGold").contains(&nugget));
        assert!(matches!(
            d.register_by_id(id + 100, &nugget),
            Err(RegistryError::InvalidRegistration { .. })
        ));
    }

    #[test]
    fn reserved_ids_survive_solidify() {
        let d = dict();
        d.reserve_id("legacyGold", 7).unwrap();
        d.reserve_id("legacyGold", 7).unwrap();
        assert!(matches!(d.reserve_id("other", 7), Err(RegistryError::DuplicateId { id: 7, .. })));
        assert!(d.reserve_id("zero", 0).is_err());

        d.register_tag("aaa", &ResourceDescriptor::new("minecraft:gold_ingot", 0)).unwrap();
        d.solidify(false).unwrap();
        assert_eq!(d.id_of("legacyGold"), Ok(7));
        assert_eq!(d.id_of("aaa"), Ok(1));
        assert_eq!(d.reserve_id("late", 9), Err(RegistryError::AlreadySolidified));
        d.check_consistency().unwrap();
    }
}
