//! Minimal persistence form.
//!
//! [`TreeData`] is a plain serde-friendly mapping (`nodes`, `parent_of`,
//! `children_of`) sufficient to reconstruct a tree exactly, including the
//! keyed/unkeyed discipline per node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{TreeError, TreeResult};
use crate::node::{Key, Node, NodeId};
use crate::tree::{Anchor, Tree};

/// Per-node fields of the persistence form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct NodeData<P> {
    pub keyed: bool,
    pub accepts_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

/// Child index of one node in the persistence form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildrenData {
    /// key -> child id, for keyed nodes
    Keyed(BTreeMap<String, NodeId>),
    /// ordered child ids, for list nodes
    Ordered(Vec<NodeId>),
}

/// Serializable snapshot of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<NodeId>,
    pub path_separator: String,
    pub nodes: BTreeMap<NodeId, NodeData<P>>,
    pub parent_of: BTreeMap<NodeId, Option<NodeId>>,
    pub children_of: BTreeMap<NodeId, ChildrenData>,
}

impl<P: Clone> Tree<P> {
    /// Snapshot the tree into its persistence form. Node payloads are cloned.
    pub fn to_data(&self) -> TreeData<P> {
        let mut nodes = BTreeMap::new();
        let mut parent_of = BTreeMap::new();
        let mut children_of = BTreeMap::new();
        for (nid, node) in &self.nodes {
            nodes.insert(
                nid.clone(),
                NodeData {
                    keyed: node.keyed,
                    accepts_children: node.accepts_children,
                    display: node.display.clone(),
                    payload: node.payload.clone(),
                },
            );
            parent_of.insert(nid.clone(), self.parent_of.get(nid).cloned());
            if !node.accepts_children {
                continue;
            }
            let children = if node.keyed {
                ChildrenData::Keyed(
                    self.children_map
                        .get(nid)
                        .map(|m| m.iter().map(|(cid, k)| (k.clone(), cid.clone())).collect())
                        .unwrap_or_default(),
                )
            } else {
                ChildrenData::Ordered(self.children_list.get(nid).cloned().unwrap_or_default())
            };
            children_of.insert(nid.clone(), children);
        }
        TreeData {
            root: self.root.clone(),
            path_separator: self.path_separator.clone(),
            nodes,
            parent_of,
            children_of,
        }
    }

    /// Rebuild a tree from its persistence form.
    ///
    /// Fails with `InvalidArgument` on inconsistent data (unknown root or
    /// child ids, children recorded under the wrong discipline) — everything
    /// else surfaces through the regular insertion errors.
    pub fn from_data(data: &TreeData<P>) -> TreeResult<Tree<P>> {
        let mut tree = Tree::with_separator(data.path_separator.clone());
        let Some(root) = &data.root else {
            if !data.nodes.is_empty() {
                return Err(TreeError::InvalidArgument(
                    "nodes recorded without a root".to_string(),
                ));
            }
            return Ok(tree);
        };
        let mut pending: Vec<(NodeId, Option<(NodeId, Option<Key>)>)> = vec![(root.clone(), None)];
        let mut inserted = 0usize;
        while let Some((nid, slot)) = pending.pop() {
            let record = data.nodes.get(&nid).ok_or_else(|| {
                TreeError::InvalidArgument(format!("unknown node id <{}> referenced", nid))
            })?;
            let mut node = if record.keyed {
                Node::map(nid.clone())
            } else {
                Node::seq(nid.clone())
            };
            node.accepts_children = record.accepts_children;
            node.display = record.display.clone();
            node.payload = record.payload.clone();
            match slot {
                None => {
                    tree.insert_node(node, Anchor::Root, None)?;
                }
                Some((parent_id, key)) => {
                    tree.insert_node(
                        node,
                        Anchor::Below {
                            parent_id: &parent_id,
                        },
                        key,
                    )?;
                }
            }
            inserted += 1;
            match data.children_of.get(&nid) {
                Some(ChildrenData::Keyed(children)) if record.keyed => {
                    for (key, cid) in children.iter().rev() {
                        pending.push((cid.clone(), Some((nid.clone(), Some(Key::Map(key.clone()))))));
                    }
                }
                Some(ChildrenData::Ordered(children)) if !record.keyed => {
                    // reversed so that pop order appends in the recorded order
                    for cid in children.iter().rev() {
                        pending.push((cid.clone(), Some((nid.clone(), None))));
                    }
                }
                None => {}
                Some(_) => {
                    return Err(TreeError::InvalidArgument(format!(
                        "children of <{}> recorded under the wrong discipline",
                        nid
                    )));
                }
            }
        }
        if inserted != data.nodes.len() {
            return Err(TreeError::InvalidArgument(
                "nodes unreachable from root".to_string(),
            ));
        }
        Ok(tree)
    }
}
