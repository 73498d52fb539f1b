//! Persistence form tests: snapshot, rebuild, JSON round-trip, bad data.

use duotree::testing::{init_test_setup, sample_tree, sanity_check};
use duotree::{ChildrenData, Tree, TreeError};

#[test]
fn given_sample_tree_when_snapshotting_then_indices_are_recorded() {
    init_test_setup();
    let t = sample_tree(".");
    let data = t.to_data();
    assert_eq!(data.root.as_deref(), Some("root"));
    assert_eq!(data.path_separator, ".");
    assert_eq!(data.nodes.len(), 9);
    assert_eq!(data.parent_of["aa0"].as_deref(), Some("aa"));
    assert_eq!(data.parent_of["root"], None);
    match &data.children_of["c"] {
        ChildrenData::Ordered(children) => assert_eq!(children, &["c0", "c1"]),
        other => panic!("list node recorded as {:?}", other),
    }
    match &data.children_of["a"] {
        ChildrenData::Keyed(children) => {
            assert_eq!(children["a"], "aa");
            assert_eq!(children["b"], "ab");
        }
        other => panic!("keyed node recorded as {:?}", other),
    }
}

#[test]
fn given_snapshot_when_rebuilding_then_structure_is_identical() {
    let t = sample_tree("|");
    let rebuilt = Tree::<()>::from_data(&t.to_data()).unwrap();
    sanity_check(&rebuilt);
    assert_eq!(rebuilt.len(), t.len());
    assert_eq!(rebuilt.root_id(), t.root_id());
    assert_eq!(rebuilt.children_ids("c").unwrap(), vec!["c0", "c1"]);
    assert_eq!(rebuilt.get_path("aa1").unwrap(), "a|a|1");
    assert_eq!(rebuilt.show(), t.show());
}

#[test]
fn given_snapshot_when_serialized_to_json_then_round_trips() {
    let t = sample_tree(".");
    let data = t.to_data();
    let json = serde_json::to_string(&data).unwrap();
    let back: duotree::TreeData<()> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);
    let rebuilt = Tree::from_data(&back).unwrap();
    assert_eq!(rebuilt.show(), t.show());
}

#[test]
fn given_empty_tree_when_round_tripping_then_stays_empty() {
    let t: Tree = Tree::new();
    let rebuilt = Tree::<()>::from_data(&t.to_data()).unwrap();
    assert!(rebuilt.is_empty());
}

#[test]
fn given_unknown_child_reference_when_rebuilding_then_rejected() {
    let t = sample_tree(".");
    let mut data = t.to_data();
    if let Some(ChildrenData::Ordered(children)) = data.children_of.get_mut("c") {
        children.push("ghost".to_string());
    }
    let err = Tree::<()>::from_data(&data).unwrap_err();
    assert!(matches!(err, TreeError::InvalidArgument(_)));
}

#[test]
fn given_unreachable_nodes_when_rebuilding_then_rejected() {
    let t = sample_tree(".");
    let mut data = t.to_data();
    // detach "c" from the root's child index, leaving its records orphaned
    if let Some(ChildrenData::Keyed(children)) = data.children_of.get_mut("root") {
        children.remove("c");
    }
    let err = Tree::<()>::from_data(&data).unwrap_err();
    assert!(matches!(err, TreeError::InvalidArgument(_)));
}

#[test]
fn given_wrong_discipline_children_when_rebuilding_then_rejected() {
    let t = sample_tree(".");
    let mut data = t.to_data();
    // record the keyed node "a" with an ordered child index
    data.children_of.insert(
        "a".to_string(),
        ChildrenData::Ordered(vec!["aa".to_string(), "ab".to_string()]),
    );
    let err = Tree::<()>::from_data(&data).unwrap_err();
    assert!(matches!(err, TreeError::InvalidArgument(_)));
}

#[test]
fn given_rootless_nodes_when_rebuilding_then_rejected() {
    let t = sample_tree(".");
    let mut data = t.to_data();
    data.root = None;
    let err = Tree::<()>::from_data(&data).unwrap_err();
    assert!(matches!(err, TreeError::InvalidArgument(_)));
}
