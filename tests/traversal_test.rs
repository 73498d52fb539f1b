//! Lazy traversal tests: ordering, modes, filters.

use std::cmp::Ordering;

use duotree::testing::{init_test_setup, sample_tree};
use duotree::{Key, Mode, Node, Tree, TreeError};

fn to_key_id(visited: Vec<(Option<Key>, &Node)>) -> Vec<(Option<Key>, String)> {
    visited
        .into_iter()
        .map(|(k, n)| (k, n.id().to_string()))
        .collect()
}

fn map(k: &str) -> Option<Key> {
    Some(Key::from(k))
}

fn seq(i: usize) -> Option<Key> {
    Some(Key::Seq(i))
}

#[test]
fn given_sample_tree_when_expanding_depth_first_then_preorder_by_key() {
    init_test_setup();
    let t = sample_tree(".");
    let visited = to_key_id(t.expand(None).unwrap().collect());
    assert_eq!(
        visited,
        vec![
            (None, "root".to_string()),
            (map("a"), "a".to_string()),
            (map("a"), "aa".to_string()),
            (seq(0), "aa0".to_string()),
            (seq(1), "aa1".to_string()),
            (map("b"), "ab".to_string()),
            (map("c"), "c".to_string()),
            (seq(0), "c0".to_string()),
            (seq(1), "c1".to_string()),
        ]
    );
}

#[test]
fn given_sample_tree_when_expanding_reversed_then_sibling_order_flips() {
    let t = sample_tree(".");
    let visited = to_key_id(t.expand(None).unwrap().reverse(true).collect());
    assert_eq!(
        visited,
        vec![
            (None, "root".to_string()),
            (map("c"), "c".to_string()),
            (seq(1), "c1".to_string()),
            (seq(0), "c0".to_string()),
            (map("a"), "a".to_string()),
            (map("b"), "ab".to_string()),
            (map("a"), "aa".to_string()),
            (seq(1), "aa1".to_string()),
            (seq(0), "aa0".to_string()),
        ]
    );
}

#[test]
fn given_start_node_when_expanding_then_only_subtree_is_visited() {
    let t = sample_tree(".");
    let visited = to_key_id(t.expand(Some("a")).unwrap().collect());
    assert_eq!(
        visited,
        vec![
            (map("a"), "a".to_string()),
            (map("a"), "aa".to_string()),
            (seq(0), "aa0".to_string()),
            (seq(1), "aa1".to_string()),
            (map("b"), "ab".to_string()),
        ]
    );

    let visited = to_key_id(t.expand(Some("a")).unwrap().mode(Mode::Width).collect());
    assert_eq!(
        visited,
        vec![
            (map("a"), "a".to_string()),
            (map("a"), "aa".to_string()),
            (map("b"), "ab".to_string()),
            (seq(0), "aa0".to_string()),
            (seq(1), "aa1".to_string()),
        ]
    );
}

#[test]
fn given_sample_tree_when_expanding_breadth_first_then_level_order() {
    let t = sample_tree(".");
    let visited = to_key_id(t.expand(None).unwrap().mode(Mode::Width).collect());
    assert_eq!(
        visited,
        vec![
            (None, "root".to_string()),
            (map("a"), "a".to_string()),
            (map("c"), "c".to_string()),
            (map("a"), "aa".to_string()),
            (map("b"), "ab".to_string()),
            (seq(0), "c0".to_string()),
            (seq(1), "c1".to_string()),
            (seq(0), "aa0".to_string()),
            (seq(1), "aa1".to_string()),
        ]
    );

    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .mode(Mode::Width)
            .reverse(true)
            .collect(),
    );
    assert_eq!(
        visited,
        vec![
            (None, "root".to_string()),
            (map("c"), "c".to_string()),
            (map("a"), "a".to_string()),
            (seq(1), "c1".to_string()),
            (seq(0), "c0".to_string()),
            (map("b"), "ab".to_string()),
            (map("a"), "aa".to_string()),
            (seq(1), "aa1".to_string()),
            (seq(0), "aa0".to_string()),
        ]
    );
}

#[test]
fn given_filter_when_expanding_then_excluded_subtrees_are_pruned() {
    let t = sample_tree(".");
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .filter(|_, n| n.id() == "root" || n.id() == "c")
            .collect(),
    );
    assert_eq!(
        visited,
        vec![(None, "root".to_string()), (map("c"), "c".to_string())]
    );

    // the root fails the filter, nothing at all comes out
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .filter(|_, n| n.id().contains('1'))
            .collect(),
    );
    assert!(visited.is_empty());
}

#[test]
fn given_filter_through_when_expanding_then_descends_past_excluded_nodes() {
    let t = sample_tree(".");
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .filter(|_, n| n.id().contains('1'))
            .filter_through(true)
            .collect(),
    );
    assert_eq!(
        visited,
        vec![(seq(1), "aa1".to_string()), (seq(1), "c1".to_string())]
    );
}

#[test]
fn given_key_aware_filter_when_expanding_then_keys_are_passed() {
    let t = sample_tree(".");
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .filter(|k, _| !matches!(k, Some(Key::Map(key)) if key == "b"))
            .collect(),
    );
    assert!(!visited.iter().any(|(_, id)| id == "ab"));
    assert_eq!(visited.len(), 8);
}

#[test]
fn given_custom_sort_when_expanding_then_overrides_key_order() {
    let t = sample_tree(".");
    // sort keyed children by descending key, list children untouched
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .sort_by(|(ka, _), (kb, _)| match (ka, kb) {
                (Key::Map(a), Key::Map(b)) => b.cmp(a),
                (a, b) => a.cmp(b),
            })
            .collect(),
    );
    assert_eq!(
        visited,
        vec![
            (None, "root".to_string()),
            (map("c"), "c".to_string()),
            (seq(0), "c0".to_string()),
            (seq(1), "c1".to_string()),
            (map("a"), "a".to_string()),
            (map("b"), "ab".to_string()),
            (map("a"), "aa".to_string()),
            (seq(0), "aa0".to_string()),
            (seq(1), "aa1".to_string()),
        ]
    );
}

#[test]
fn given_empty_tree_when_expanding_then_yields_nothing() {
    let t: Tree = Tree::new();
    assert_eq!(t.expand(None).unwrap().count(), 0);
}

#[test]
fn given_unknown_start_when_expanding_then_not_found() {
    let t = sample_tree(".");
    assert!(matches!(
        t.expand(Some("missing")),
        Err(TreeError::NotFound(_))
    ));
}

#[test]
fn given_iterator_when_partially_consumed_then_lazy_and_restartable() {
    let t = sample_tree(".");
    let mut it = t.expand(None).unwrap();
    assert_eq!(it.next().map(|(_, n)| n.id().to_string()), Some("root".into()));
    assert_eq!(it.next().map(|(_, n)| n.id().to_string()), Some("a".into()));
    drop(it);
    // a fresh expansion starts over
    let mut it2 = t.expand(None).unwrap();
    assert_eq!(it2.next().map(|(_, n)| n.id().to_string()), Some("root".into()));
}

#[test]
fn given_sort_tie_when_expanding_then_all_nodes_still_visited() {
    let t = sample_tree(".");
    let visited = to_key_id(
        t.expand(None)
            .unwrap()
            .sort_by(|_, _| Ordering::Equal)
            .collect(),
    );
    assert_eq!(visited.len(), 9);
    assert_eq!(visited[0], (None, "root".to_string()));
}
