// src/stack.rs
//! Resource descriptors and the wildcard-aware matcher.
//!
//! A descriptor names one concrete resource (type + variant) or, with the
//! [`WILDCARD`] variant, every variant of a type.

use std::fmt;
use std::sync::Arc;

/// Variant value meaning "any variant of this type".
pub const WILDCARD: u16 = i16::MAX as u16;

/// Opaque identifier of a resource type, e.g. `minecraft:iron_ingot`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        TypeKey(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(s: &str) -> Self {
        TypeKey::new(s)
    }
}

/// Immutable (type, variant) value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceDescriptor {
    type_key: TypeKey,
    variant: u16,
}

impl ResourceDescriptor {
    pub fn new(type_key: impl Into<TypeKey>, variant: u16) -> Self {
        Self {
            type_key: type_key.into(),
            variant,
        }
    }

    /// Descriptor covering every variant of `type_key`.
    pub fn wildcard(type_key: impl Into<TypeKey>) -> Self {
        Self::new(type_key, WILDCARD)
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn variant(&self) -> u16 {
        self.variant
    }

    pub fn is_wildcard(&self) -> bool {
        self.variant == WILDCARD
    }

    /// The type-wide wildcard descriptor for this descriptor's type.
    pub fn to_wildcard(&self) -> Self {
        Self::new(self.type_key.clone(), WILDCARD)
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            write!(f, "{}@*", self.type_key)
        } else {
            write!(f, "{}@{}", self.type_key, self.variant)
        }
    }
}

/// Compare `input` against `target`.
///
/// Only the target side may act as a wildcard, and only when `strict` is off.
/// Exactly one side absent never matches; both absent is not a meaningful
/// query and is treated as no match.
pub fn matches(
    target: Option<&ResourceDescriptor>,
    input: Option<&ResourceDescriptor>,
    strict: bool,
) -> bool {
    match (target, input) {
        (Some(target), Some(input)) => {
            target.type_key == input.type_key
                && (target.variant == input.variant || (!strict && target.is_wildcard()))
        }
        _ => false,
    }
}

/// True if any `(target, input)` pair matches.
pub fn contains_match(
    strict: bool,
    inputs: &[ResourceDescriptor],
    targets: &[ResourceDescriptor],
) -> bool {
    inputs.iter().any(|input| {
        targets
            .iter()
            .any(|target| matches(Some(target), Some(input), strict))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron(variant: u16) -> ResourceDescriptor {
        ResourceDescriptor::new("minecraft:iron_ingot", variant)
    }

    #[test]
    fn wildcard_target_matches_any_variant_when_lenient() {
        let target = iron(WILDCARD);
        for v in [0, 1, 7, 32766, WILDCARD] {
            assert!(matches(Some(&target), Some(&iron(v)), false));
            assert_eq!(matches(Some(&target), Some(&iron(v)), true), v == WILDCARD);
        }
    }

    #[test]
    fn wildcard_input_is_not_a_wildcard() {
        assert!(!matches(Some(&iron(3)), Some(&iron(WILDCARD)), false));
    }

    #[test]
    fn absent_side_never_matches() {
        assert!(!matches(None, Some(&iron(0)), false));
        assert!(!matches(Some(&iron(0)), None, false));
    }

    #[test]
    fn different_types_do_not_match() {
        let gold = ResourceDescriptor::wildcard("minecraft:gold_ingot");
        assert!(!matches(Some(&gold), Some(&iron(0)), false));
    }

    #[test]
    fn contains_match_scans_pairs() {
        let targets = [ResourceDescriptor::new("minecraft:stick", 0), iron(WILDCARD)];
        assert!(contains_match(false, &[iron(4)], &targets));
        assert!(!contains_match(true, &[iron(4)], &targets));
        assert!(!contains_match(false, &[], &targets));
    }

    #[test]
    fn display_marks_wildcards() {
        assert_eq!(iron(2).to_string(), "minecraft:iron_ingot@2");
        assert_eq!(iron(WILDCARD).to_string(), "minecraft:iron_ingot@*");
    }
}
