use oredict::bootstrap::{seeds, vanilla_type_keys, SEED_VERSION};
use oredict::{OreDictionary, RegistryConfig, ResourceDescriptor, TypeTable};
use std::sync::Arc;

fn vanilla_types() -> Arc<TypeTable> {
    Arc::new(TypeTable::with_keys(vanilla_type_keys()))
}

#[tokio::test]
async fn seeding_runs_off_the_constructing_thread() {
    let _ = tracing_subscriber::fmt::try_init();
    let dict = OreDictionary::with_config(vanilla_types(), RegistryConfig::default().seed_vanilla(true));

    let added = dict.seeded().await;
    assert_eq!(added, Some(seeds().len()));
    // the handle is consumed once awaited
    assert_eq!(dict.seeded().await, None);

    assert!(dict.descriptors_of("ingotIron").contains(&ResourceDescriptor::new("minecraft:iron_ingot", 0)));
    assert_eq!(dict.descriptors_of("record").len(), 12);
    assert!(dict
        .descriptors_of("dyeBlue")
        .contains(&ResourceDescriptor::new("minecraft:dye", 4)));
    dict.check_consistency().unwrap();
}

#[test]
fn seeded_dictionary_bakes_stable_ids() {
    let bake = || {
        let dict = OreDictionary::with_config(vanilla_types(), RegistryConfig::default().seed_vanilla(true));
        dict.wait_seeded().unwrap();
        dict.solidify(false).unwrap();
        dict.all_tag_names()
            .into_iter()
            .map(|n| (dict.id_of(&n).unwrap(), n))
            .collect::<Vec<_>>()
    };
    let first = bake();
    assert_eq!(first, bake());
    assert_eq!(first[0], (1, "blockCoal".to_string()));
}

#[test]
fn wildcard_seeds_cover_every_variant() {
    let dict = OreDictionary::new(vanilla_types());
    oredict::bootstrap::seed_dictionary(&dict);
    dict.solidify(false).unwrap();

    let log = ResourceDescriptor::new("minecraft:log", 2);
    assert_eq!(dict.tags_of(&log), vec!["logWood".to_string()]);
    assert_eq!(dict.id_of_descriptor(&log), dict.id_of("logWood").ok());

    let glass = ResourceDescriptor::new("minecraft:stained_glass", 14);
    assert_eq!(
        dict.tags_of(&glass),
        vec!["blockGlass".to_string(), "blockGlassRed".to_string()]
    );
    assert_eq!(dict.id_of_descriptor(&glass), dict.id_of("blockGlassRed").ok());
}

#[test]
fn no_seeding_unless_asked() {
    let dict = OreDictionary::new(vanilla_types());
    assert_eq!(dict.wait_seeded(), None);
    assert!(dict.is_empty());
    assert!(SEED_VERSION >= 1);
}
