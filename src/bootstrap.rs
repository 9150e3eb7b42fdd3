// src/bootstrap.rs
//! Well-known seed tags.
//!
//! The seed set is plain data fed through [`OreDictionary::register_tag`]. It
//! runs as a one-shot blocking task on the shared worker runtime so that the
//! thread constructing a dictionary never performs (or waits on) seeding.

use crate::stack::{ResourceDescriptor, WILDCARD};
use crate::{OreDictionary, RUNTIME};
use tokio::task::JoinHandle;
use tracing::info;

/// Bumped whenever the seed table changes.
pub const SEED_VERSION: u32 = 1;

/// One `(tag, type, variant)` seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub tag: &'static str,
    pub type_key: &'static str,
    pub variant: u16,
}

const fn seed(tag: &'static str, type_key: &'static str, variant: u16) -> Seed {
    Seed { tag, type_key, variant }
}

const ANY: u16 = WILDCARD;

const BASE: &[Seed] = &[
    seed("logWood", "minecraft:log", ANY),
    seed("logWood", "minecraft:log2", ANY),
    seed("plankWood", "minecraft:planks", ANY),
    seed("slabWood", "minecraft:wooden_slab", ANY),
    seed("stairWood", "minecraft:oak_stairs", 0),
    seed("stairWood", "minecraft:spruce_stairs", 0),
    seed("stairWood", "minecraft:birch_stairs", 0),
    seed("stairWood", "minecraft:jungle_stairs", 0),
    seed("stairWood", "minecraft:acacia_stairs", 0),
    seed("stairWood", "minecraft:dark_oak_stairs", 0),
    seed("stickWood", "minecraft:stick", 0),
    seed("treeSapling", "minecraft:sapling", ANY),
    seed("treeLeaves", "minecraft:leaves", ANY),
    seed("treeLeaves", "minecraft:leaves2", ANY),
    seed("oreGold", "minecraft:gold_ore", 0),
    seed("oreIron", "minecraft:iron_ore", 0),
    seed("oreLapis", "minecraft:lapis_ore", 0),
    seed("oreDiamond", "minecraft:diamond_ore", 0),
    seed("oreRedstone", "minecraft:redstone_ore", 0),
    seed("oreEmerald", "minecraft:emerald_ore", 0),
    seed("oreQuartz", "minecraft:quartz_ore", 0),
    seed("oreCoal", "minecraft:coal_ore", 0),
    seed("blockGold", "minecraft:gold_block", 0),
    seed("blockIron", "minecraft:iron_block", 0),
    seed("blockLapis", "minecraft:lapis_block", 0),
    seed("blockDiamond", "minecraft:diamond_block", 0),
    seed("blockRedstone", "minecraft:redstone_block", 0),
    seed("blockEmerald", "minecraft:emerald_block", 0),
    seed("blockQuartz", "minecraft:quartz_block", 0),
    seed("blockCoal", "minecraft:coal_block", 0),
    seed("blockGlassColorless", "minecraft:glass", 0),
    seed("blockGlass", "minecraft:glass", 0),
    seed("blockGlass", "minecraft:stained_glass", ANY),
    seed("paneGlassColorless", "minecraft:glass_pane", 0),
    seed("paneGlass", "minecraft:glass_pane", 0),
    seed("paneGlass", "minecraft:stained_glass_pane", ANY),
    seed("ingotIron", "minecraft:iron_ingot", 0),
    seed("ingotGold", "minecraft:gold_ingot", 0),
    seed("ingotBrick", "minecraft:brick", 0),
    seed("ingotBrickNether", "minecraft:netherbrick", 0),
    seed("nuggetGold", "minecraft:gold_nugget", 0),
    seed("gemDiamond", "minecraft:diamond", 0),
    seed("gemEmerald", "minecraft:emerald", 0),
    seed("gemQuartz", "minecraft:quartz", 0),
    seed("dustRedstone", "minecraft:redstone", 0),
    seed("dustGlowstone", "minecraft:glowstone_dust", 0),
    seed("gemLapis", "minecraft:dye", 4),
    seed("slimeball", "minecraft:slime_ball", 0),
    seed("glowstone", "minecraft:glowstone", 0),
    seed("cropWheat", "minecraft:wheat", 0),
    seed("cropPotato", "minecraft:potato", 0),
    seed("cropCarrot", "minecraft:carrot", 0),
    seed("stone", "minecraft:stone", 0),
    seed("cobblestone", "minecraft:cobblestone", 0),
    seed("sandstone", "minecraft:sandstone", ANY),
    seed("sand", "minecraft:sand", ANY),
    seed("dye", "minecraft:dye", ANY),
    seed("record", "minecraft:record_13", 0),
    seed("record", "minecraft:record_cat", 0),
    seed("record", "minecraft:record_blocks", 0),
    seed("record", "minecraft:record_chirp", 0),
    seed("record", "minecraft:record_far", 0),
    seed("record", "minecraft:record_mall", 0),
    seed("record", "minecraft:record_mellohi", 0),
    seed("record", "minecraft:record_stal", 0),
    seed("record", "minecraft:record_strad", 0),
    seed("record", "minecraft:record_ward", 0),
    seed("record", "minecraft:record_11", 0),
    seed("record", "minecraft:record_wait", 0),
];

/// Dye colours in dye-variant order. Stained glass uses the inverse (15 - i).
pub const DYES: [&str; 16] = [
    "Black", "Red", "Green", "Brown", "Blue", "Purple", "Cyan", "LightGray", "Gray", "Pink",
    "Lime", "Yellow", "LightBlue", "Magenta", "Orange", "White",
];

/// The complete seed list in registration order.
pub fn seeds() -> Vec<(String, ResourceDescriptor)> {
    let mut out: Vec<(String, ResourceDescriptor)> = BASE
        .iter()
        .map(|s| (s.tag.to_string(), ResourceDescriptor::new(s.type_key, s.variant)))
        .collect();

    for (i, colour) in DYES.iter().enumerate() {
        let dye = i as u16;
        let glass = 15 - dye;
        out.push((format!("dye{colour}"), ResourceDescriptor::new("minecraft:dye", dye)));
        out.push((
            format!("blockGlass{colour}"),
            ResourceDescriptor::new("minecraft:stained_glass", glass),
        ));
        out.push((
            format!("paneGlass{colour}"),
            ResourceDescriptor::new("minecraft:stained_glass_pane", glass),
        ));
    }
    out
}

/// Every type key the seed list refers to, sorted and deduplicated.
pub fn vanilla_type_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = BASE.iter().map(|s| s.type_key).collect();
    keys.extend(["minecraft:dye", "minecraft:stained_glass", "minecraft:stained_glass_pane"]);
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Register the seed list into `dict`. Returns how many descriptors were new.
pub fn seed_dictionary(dict: &OreDictionary) -> usize {
    let added = seeds()
        .iter()
        .filter(|(tag, descriptor)| matches!(dict.register_tag(tag, descriptor), Ok(true)))
        .count();
    info!(version = SEED_VERSION, added, tags = dict.len(), "seed tags registered");
    added
}

/// Run [`seed_dictionary`] once on the worker runtime.
pub fn spawn_seed(dict: OreDictionary) -> JoinHandle<usize> {
    RUNTIME.spawn_blocking(move || seed_dictionary(&dict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeTable;
    use std::sync::Arc;

    #[test]
    fn dye_and_glass_variants_are_inverse() {
        let all = seeds();
        let find = |tag: &str| {
            all.iter()
                .find(|(t, _)| t == tag)
                .map(|(_, d)| d.clone())
                .unwrap()
        };
        assert_eq!(find("dyeBlack"), ResourceDescriptor::new("minecraft:dye", 0));
        assert_eq!(find("blockGlassBlack"), ResourceDescriptor::new("minecraft:stained_glass", 15));
        assert_eq!(find("paneGlassWhite"), ResourceDescriptor::new("minecraft:stained_glass_pane", 0));
    }

    #[test]
    fn every_seed_type_is_listed() {
        let keys = vanilla_type_keys();
        for (_, d) in seeds() {
            assert!(
                keys.iter().any(|k| *k == d.type_key().as_str()),
                "missing {}",
                d.type_key()
            );
        }
    }

    #[test]
    fn seeding_twice_adds_nothing() {
        let types = Arc::new(TypeTable::with_keys(vanilla_type_keys()));
        let dict = OreDictionary::new(types);
        let first = seed_dictionary(&dict);
        assert_eq!(first, seeds().len());
        assert_eq!(seed_dictionary(&dict), 0);
        assert_eq!(dict.descriptors_of("logWood").len(), 2);
        dict.check_consistency().unwrap();
    }
}
