//! Test support: logging bootstrap, structural sanity check, sample trees.

use std::env;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::node::{Key, Node};
use crate::tree::{Anchor, Tree};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // Filter for noisy modules
    let noisy_modules = [""];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Assert that both adjacency indices of a tree agree with each other.
///
/// Panics on the first inconsistency found. Intended for use after every
/// mutating step in tests.
pub fn sanity_check<P>(tree: &Tree<P>) {
    for nid in tree.nodes.keys() {
        match tree.parent_of.get(nid) {
            None => {
                assert_eq!(
                    tree.root.as_ref(),
                    Some(nid),
                    "node <{}> has no parent but is not the root",
                    nid
                );
            }
            Some(pid) => {
                let parent = tree
                    .nodes
                    .get(pid)
                    .unwrap_or_else(|| panic!("parent <{}> of <{}> is not a node", pid, nid));
                assert!(parent.accepts_children, "parent <{}> refuses children", pid);
                if parent.keyed {
                    assert!(
                        tree.children_map
                            .get(pid)
                            .is_some_and(|m| m.contains_key(nid)),
                        "node <{}> missing from keyed index of <{}>",
                        nid,
                        pid
                    );
                } else {
                    assert!(
                        tree.children_list
                            .get(pid)
                            .is_some_and(|l| l.contains(nid)),
                        "node <{}> missing from list index of <{}>",
                        nid,
                        pid
                    );
                }
            }
        }
    }
    for (pid, children) in &tree.children_map {
        assert!(tree.nodes.contains_key(pid), "stale keyed index <{}>", pid);
        let mut seen_keys = std::collections::HashSet::new();
        for (cid, key) in children {
            assert_eq!(tree.parent_of.get(cid), Some(pid), "parent drift for <{}>", cid);
            assert!(seen_keys.insert(key), "duplicate key <{}> under <{}>", key, pid);
        }
    }
    for (pid, children) in &tree.children_list {
        assert!(tree.nodes.contains_key(pid), "stale list index <{}>", pid);
        for cid in children {
            assert_eq!(tree.parent_of.get(cid), Some(pid), "parent drift for <{}>", cid);
        }
    }
    if let Some(root) = &tree.root {
        assert!(tree.nodes.contains_key(root), "root <{}> is not a node", root);
        assert!(!tree.parent_of.contains_key(root), "root <{}> has a parent", root);
    } else {
        assert!(tree.nodes.is_empty(), "nodes recorded on a rootless tree");
    }
}

/// Mixed-discipline sample tree:
///
/// ```text
/// {}
/// ├── a: {}
/// │   ├── a: []
/// │   │   ├── AA0
/// │   │   └── AA1
/// │   └── b: {}
/// └── c: []
///     ├── C0
///     └── C1
/// ```
pub fn sample_tree(path_separator: &str) -> Tree {
    let mut t = Tree::with_separator(path_separator);
    let steps: &[(Node, Option<&str>, Option<Key>)] = &[
        (Node::map("root"), None, None),
        (Node::map("a"), Some("root"), Some(Key::from("a"))),
        (Node::seq("aa"), Some("a"), Some(Key::from("a"))),
        (Node::map("aa0").with_display("AA0"), Some("aa"), None),
        (Node::map("aa1").with_display("AA1"), Some("aa"), None),
        (Node::map("ab"), Some("a"), Some(Key::from("b"))),
        (Node::seq("c"), Some("root"), Some(Key::from("c"))),
        (Node::map("c0").with_display("C0"), Some("c"), None),
        (Node::map("c1").with_display("C1"), Some("c"), None),
    ];
    for (node, parent, key) in steps {
        let anchor = match parent {
            None => Anchor::Root,
            Some(pid) => Anchor::Below { parent_id: pid },
        };
        t.insert_node(node.clone(), anchor, key.clone())
            .unwrap_or_else(|e| panic!("sample tree construction failed: {}", e));
    }
    sanity_check(&t);
    t
}

/// Second sample, list-rooted:
///
/// ```text
/// []
/// ├── {}
/// │   └── a: {}
/// └── {}
/// ```
pub fn sample_tree_2() -> Tree {
    let mut t = Tree::new();
    let steps: &[(Node, Option<&str>, Option<Key>)] = &[
        (Node::seq("broot"), None, None),
        (Node::map("b1"), Some("broot"), None),
        (Node::map("b1a"), Some("b1"), Some(Key::from("a"))),
        (Node::map("b2"), Some("broot"), None),
    ];
    for (node, parent, key) in steps {
        let anchor = match parent {
            None => Anchor::Root,
            Some(pid) => Anchor::Below { parent_id: pid },
        };
        t.insert_node(node.clone(), anchor, key.clone())
            .unwrap_or_else(|e| panic!("sample tree construction failed: {}", e));
    }
    sanity_check(&t);
    t
}
