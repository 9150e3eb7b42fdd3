// src/config.rs
//! Dictionary configuration.

/// Knobs applied when an [`crate::OreDictionary`] is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Post-solidify `id_of(name)` for an unknown name creates the tag and
    /// rebakes instead of failing with `NotFound`. Note this makes a lookup
    /// mutate the dictionary.
    pub create_on_miss: bool,
    /// Log a warning whenever a descriptor of an unknown type is registered
    /// or removed.
    pub warn_on_degraded: bool,
    /// Schedule the well-known seed set on the shared runtime after construction.
    pub seed_vanilla: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            create_on_miss: true,
            warn_on_degraded: true,
            seed_vanilla: false,
        }
    }
}

impl RegistryConfig {
    pub fn create_on_miss(mut self, enabled: bool) -> Self {
        self.create_on_miss = enabled;
        self
    }

    pub fn warn_on_degraded(mut self, enabled: bool) -> Self {
        self.warn_on_degraded = enabled;
        self
    }

    pub fn seed_vanilla(mut self, enabled: bool) -> Self {
        self.seed_vanilla = enabled;
        self
    }
}
