use oredict::{global, global_types, ResourceDescriptor, TypeRegistry, TypeKey};

#[test]
fn global_dictionary_is_seeded_once() {
    let dict = global();
    assert!(std::ptr::eq(dict, global()));
    assert!(global_types().type_id(&TypeKey::new("minecraft:iron_ingot")).is_some());

    dict.wait_seeded();
    let iron = ResourceDescriptor::new("minecraft:iron_ingot", 0);
    assert_eq!(dict.tags_of(&iron), vec!["ingotIron".to_string()]);

    // a second call does not schedule another seeding pass
    global();
    assert_eq!(dict.wait_seeded(), None);
    dict.check_consistency().unwrap();
}
