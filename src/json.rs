//! JSON bridge: build a tree from a JSON value and back.
//!
//! JSON objects become keyed nodes, arrays become list nodes, scalars and
//! null become leaves carrying the scalar as payload. Node identifiers are
//! auto-generated.

use serde_json::Value;
use tracing::instrument;

use crate::errors::{TreeError, TreeResult};
use crate::node::{Key, Node};
use crate::tree::{Anchor, Tree};

/// Convert a JSON value into a tree.
#[instrument(level = "debug", skip(value))]
pub fn from_value(value: &Value) -> TreeResult<Tree<Value>> {
    let mut tree = Tree::new();
    fill(&mut tree, value, None, None)?;
    Ok(tree)
}

fn fill(
    tree: &mut Tree<Value>,
    value: &Value,
    parent_id: Option<&str>,
    key: Option<Key>,
) -> TreeResult<()> {
    let anchor = match parent_id {
        None => Anchor::Root,
        Some(parent_id) => Anchor::Below { parent_id },
    };
    match value {
        Value::Object(entries) => {
            let nid = Node::<Value>::auto_id();
            tree.insert_node(Node::map(nid.clone()), anchor, key)?;
            for (entry_key, entry) in entries {
                fill(tree, entry, Some(&nid), Some(Key::Map(entry_key.clone())))?;
            }
        }
        Value::Array(items) => {
            let nid = Node::<Value>::auto_id();
            tree.insert_node(Node::seq(nid.clone()), anchor, key)?;
            for item in items {
                fill(tree, item, Some(&nid), None)?;
            }
        }
        Value::Null => {
            let node = Node::leaf(Node::<Value>::auto_id()).with_payload(Value::Null);
            tree.insert_node(node, anchor, key)?;
        }
        scalar => {
            let display = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let node = Node::leaf(Node::<Value>::auto_id())
                .with_display(display)
                .with_payload(scalar.clone());
            tree.insert_node(node, anchor, key)?;
        }
    }
    Ok(())
}

/// Convert a tree built by [`from_value`] back into a JSON value.
///
/// An empty tree maps to `null`; a leaf without payload also maps to `null`.
#[instrument(level = "debug", skip(tree))]
pub fn to_value(tree: &Tree<Value>) -> TreeResult<Value> {
    match tree.root_id() {
        None => Ok(Value::Null),
        Some(root) => value_of(tree, root),
    }
}

fn value_of(tree: &Tree<Value>, nid: &str) -> TreeResult<Value> {
    let (_, node) = tree.get(nid)?;
    if !node.accepts_children {
        return Ok(node.payload.clone().unwrap_or(Value::Null));
    }
    if node.keyed {
        let mut entries = serde_json::Map::new();
        for (key, child) in tree.children(nid)? {
            let Key::Map(k) = key else {
                return Err(TreeError::InvalidOperation(format!(
                    "keyed node <{}> has a positional child",
                    nid
                )));
            };
            entries.insert(k, value_of(tree, child.id())?);
        }
        Ok(Value::Object(entries))
    } else {
        let mut items = Vec::new();
        for (_, child) in tree.children(nid)? {
            items.push(value_of(tree, child.id())?);
        }
        Ok(Value::Array(items))
    }
}
