//! Tree core: dual-indexed parent/child bookkeeping and structural editing.
//!
//! Principles:
//! - each node is identified by a string id, unique within a tree
//! - keyed ("map") nodes reference children by string key, unkeyed ("list")
//!   nodes by dense 0-based position
//! - child id <-> parent id is stored both ways for O(1) navigation:
//!   parent id -> children ids, child id -> parent id
//!
//! Both indices are mutated exclusively through two primitives ([`Tree::attach`]
//! and [`Tree::detach_leaf`]) so they cannot drift apart. Every composite
//! operation (insert above, drop with rebase, splice, merge) is expressed in
//! terms of those primitives.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use tracing::instrument;

use crate::errors::{TreeError, TreeResult};
use crate::node::{Key, Node, NodeId};

/// Locator for an insertion: at the (empty) root, below a parent, or above an
/// existing node. `AboveLeaf` disambiguates tree insertion above a node when
/// the incoming tree has several leaves.
#[derive(Debug, Clone, Copy)]
pub enum Anchor<'a> {
    Root,
    Below { parent_id: &'a str },
    Above { child_id: &'a str },
    AboveLeaf { child_id: &'a str, leaf_id: &'a str },
}

/// In-memory mutable tree with two child-addressing disciplines.
///
/// Node values are stored behind `Rc`: shallow copies produced by
/// [`Tree::subtree`], [`Tree::insert_tree`], [`Tree::merge`] and `Clone` share
/// node values with the source tree. Shared nodes should be treated as
/// read-mostly; use [`Tree::clone_tree`] with `deep = true` when isolation is
/// required. Node values are never handed out mutably by the tree itself.
#[derive(Debug, Clone)]
pub struct Tree<P = ()> {
    pub(crate) root: Option<NodeId>,
    /// node identifier -> node
    pub(crate) nodes: HashMap<NodeId, Rc<Node<P>>>,
    /// node identifier -> parent node identifier (absent for root)
    pub(crate) parent_of: HashMap<NodeId, NodeId>,
    /// keyed parent identifier -> child identifier -> string key
    pub(crate) children_map: HashMap<NodeId, BTreeMap<NodeId, String>>,
    /// list parent identifier -> ordered child identifiers
    pub(crate) children_list: HashMap<NodeId, Vec<NodeId>>,
    pub(crate) path_separator: String,
}

impl<P> Default for Tree<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Tree<P> {
    pub fn new() -> Self {
        Self::with_separator(".")
    }

    /// Create an empty tree with a custom path separator (see
    /// [`Tree::get_node_id_by_path`]).
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            root: None,
            nodes: HashMap::new(),
            parent_of: HashMap::new(),
            children_map: HashMap::new(),
            children_list: HashMap::new(),
            path_separator: separator.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn contains(&self, nid: &str) -> bool {
        self.nodes.contains_key(nid)
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, nid: &str) -> TreeResult<&Rc<Node<P>>> {
        self.nodes
            .get(nid)
            .ok_or_else(|| TreeError::NotFound(nid.to_string()))
    }

    fn ensure_present(&self, nid: &str) -> TreeResult<()> {
        if !self.contains(nid) {
            return Err(TreeError::NotFound(nid.to_string()));
        }
        Ok(())
    }

    /// Resolve an optional starting node: `None` defaults to the root (or to
    /// nothing on an empty tree), an explicit id must exist.
    pub(crate) fn resolve_start(&self, nid: Option<&str>) -> TreeResult<Option<&str>> {
        match nid {
            Some(id) => {
                self.ensure_present(id)?;
                Ok(self.nodes.get_key_value(id).map(|(k, _)| k.as_str()))
            }
            None => Ok(self.root.as_deref()),
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Get a node and its key under its parent (`None` for root).
    pub fn get(&self, nid: &str) -> TreeResult<(Option<Key>, &Node<P>)> {
        let node = self.node(nid)?;
        Ok((self.get_key(nid)?, node))
    }

    /// Derived key of a node: `None` for root, string key under a keyed
    /// parent, position under a list parent.
    pub fn get_key(&self, nid: &str) -> TreeResult<Option<Key>> {
        self.ensure_present(nid)?;
        if self.root.as_deref() == Some(nid) {
            return Ok(None);
        }
        let pid = &self.parent_of[nid];
        if self.nodes[pid].keyed {
            let key = self.children_map[pid][nid].clone();
            Ok(Some(Key::Map(key)))
        } else {
            let pos = self.children_list[pid]
                .iter()
                .position(|cid| cid == nid)
                .ok_or_else(|| TreeError::NotFound(nid.to_string()))?;
            Ok(Some(Key::Seq(pos)))
        }
    }

    /// Parent node id. Calling this on the root is an error: the root has no
    /// parent.
    pub fn parent_id(&self, nid: &str) -> TreeResult<&str> {
        self.ensure_present(nid)?;
        self.parent_of
            .get(nid)
            .map(|pid| pid.as_str())
            .ok_or_else(|| TreeError::NotFound(nid.to_string()))
    }

    pub fn parent(&self, nid: &str) -> TreeResult<(Option<Key>, &Node<P>)> {
        let pid = self.parent_id(nid)?.to_string();
        self.get(&pid)
    }

    /// Child ids of a node. List order is authoritative for list nodes; for
    /// keyed nodes ids come back in internal index order, not key order.
    pub fn children_ids(&self, nid: &str) -> TreeResult<Vec<&str>> {
        let node = self.node(nid)?;
        if node.keyed {
            Ok(self
                .children_map
                .get(nid)
                .map(|m| m.keys().map(String::as_str).collect())
                .unwrap_or_default())
        } else {
            Ok(self
                .children_list
                .get(nid)
                .map(|l| l.iter().map(String::as_str).collect())
                .unwrap_or_default())
        }
    }

    /// Children of a node with their keys.
    pub fn children(&self, nid: &str) -> TreeResult<Vec<(Key, &Node<P>)>> {
        let mut out = Vec::new();
        for cid in self.children_ids(nid)? {
            let key = self.get_key(cid)?.ok_or_else(|| {
                // a child always has a parent, hence a key
                TreeError::NotFound(cid.to_string())
            })?;
            out.push((key, self.nodes[cid].as_ref()));
        }
        Ok(out)
    }

    /// Ids of nodes sharing this node's parent. Empty for root.
    pub fn siblings_ids(&self, nid: &str) -> TreeResult<Vec<&str>> {
        self.ensure_present(nid)?;
        match self.parent_of.get(nid) {
            None => Ok(Vec::new()),
            Some(pid) => Ok(self
                .children_ids(pid)?
                .into_iter()
                .filter(|cid| *cid != nid)
                .collect()),
        }
    }

    pub fn siblings(&self, nid: &str) -> TreeResult<Vec<(Key, &Node<P>)>> {
        let mut out = Vec::new();
        for sid in self.siblings_ids(nid)? {
            if let Some(key) = self.get_key(sid)? {
                out.push((key, self.nodes[sid].as_ref()));
            }
        }
        Ok(out)
    }

    /// Ancestor ids walking up to the root.
    ///
    /// `from_root` reverses the result order, `include_current` prepends the
    /// node itself.
    pub fn ancestors_ids<'a>(
        &'a self,
        nid: &'a str,
        from_root: bool,
        include_current: bool,
    ) -> TreeResult<Vec<&'a str>> {
        self.ensure_present(nid)?;
        let mut out: Vec<&str> = Vec::new();
        if include_current {
            out.push(self.node_key_str(nid));
        }
        let mut current = nid;
        while let Some(pid) = self.parent_of.get(current) {
            out.push(pid.as_str());
            current = pid;
        }
        if from_root {
            out.reverse();
        }
        Ok(out)
    }

    pub fn ancestors(
        &self,
        nid: &str,
        from_root: bool,
        include_current: bool,
    ) -> TreeResult<Vec<(Option<Key>, &Node<P>)>> {
        let mut out = Vec::new();
        for id in self.ancestors_ids(nid, from_root, include_current)? {
            out.push((self.get_key(id)?, self.nodes[id].as_ref()));
        }
        Ok(out)
    }

    // borrow the id string owned by the node index so lifetimes line up
    fn node_key_str<'a>(&'a self, nid: &'a str) -> &'a str {
        self.nodes
            .get_key_value(nid)
            .map(|(k, _)| k.as_str())
            .unwrap_or(nid)
    }

    /// Node depth, 0 for root.
    pub fn depth(&self, nid: &str) -> TreeResult<usize> {
        Ok(self.ancestors_ids(nid, false, false)?.len())
    }

    pub fn is_leaf(&self, nid: &str) -> TreeResult<bool> {
        Ok(self.children_ids(nid)?.is_empty())
    }

    /// Ids of leaves under a node (or under the whole tree).
    pub fn leaves_ids(&self, nid: Option<&str>) -> TreeResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let Some(start) = self.resolve_start(nid)? else {
            return Ok(out);
        };
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let children = self.children_ids(current)?;
            if children.is_empty() {
                out.push(current.to_string());
            } else {
                for cid in children.into_iter().rev() {
                    stack.push(cid);
                }
            }
        }
        Ok(out)
    }

    pub fn leaves(&self, nid: Option<&str>) -> TreeResult<Vec<(Option<Key>, &Node<P>)>> {
        let mut out = Vec::new();
        for lid in self.leaves_ids(nid)? {
            out.push((self.get_key(&lid)?, self.nodes[&lid].as_ref()));
        }
        Ok(out)
    }

    /// All `(key, node)` pairs, in unspecified order.
    pub fn list(&self) -> Vec<(Option<Key>, &Node<P>)> {
        self.nodes
            .keys()
            .filter_map(|nid| {
                self.get_key(nid)
                    .ok()
                    .map(|key| (key, self.nodes[nid].as_ref()))
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Mutation primitives
    // ---------------------------------------------------------------

    /// Validate that `key` fits the slot under `parent_id` without mutating:
    /// key kind must match the parent discipline, string keys must be free.
    ///
    /// Bulk operations run this over the whole incoming data before touching
    /// the receiver, which is what makes them all-or-nothing.
    fn check_slot(&self, parent_id: Option<&str>, key: Option<&Key>) -> TreeResult<()> {
        let Some(pid) = parent_id else {
            if !self.is_empty() {
                return Err(TreeError::MultipleRoot(
                    "tree already has a root".to_string(),
                ));
            }
            if key.is_some() {
                return Err(TreeError::InvalidArgument(
                    "no key allowed on root node".to_string(),
                ));
            }
            return Ok(());
        };
        let parent = self.node(pid)?;
        if !parent.accepts_children {
            return Err(TreeError::InvalidOperation(format!(
                "node <{}> does not accept children",
                pid
            )));
        }
        if parent.keyed {
            match key {
                Some(Key::Map(k)) => {
                    let taken = self
                        .children_map
                        .get(pid)
                        .map(|m| m.values().any(|existing| existing == k))
                        .unwrap_or(false);
                    if taken {
                        return Err(TreeError::DuplicateKey {
                            parent_id: pid.to_string(),
                            key: k.clone(),
                        });
                    }
                }
                Some(Key::Seq(_)) | None => {
                    return Err(TreeError::InvalidOperation(format!(
                        "a string key is compulsory under keyed node <{}>",
                        pid
                    )));
                }
            }
        } else if let Some(Key::Map(_)) = key {
            return Err(TreeError::InvalidOperation(format!(
                "key under list node <{}> must be a position",
                pid
            )));
        }
        Ok(())
    }

    /// Register a node under a parent slot, updating both adjacency indices.
    /// The only primitive that grows the tree.
    #[instrument(level = "trace", skip(self, node), fields(nid = node.id()))]
    fn attach(
        &mut self,
        node: Rc<Node<P>>,
        parent_id: Option<&str>,
        key: Option<Key>,
    ) -> TreeResult<()> {
        if self.contains(node.id()) {
            return Err(TreeError::DuplicateId(node.id().to_string()));
        }
        self.check_slot(parent_id, key.as_ref())?;
        let nid = node.id().to_string();
        match parent_id {
            None => {
                self.root = Some(nid.clone());
            }
            Some(pid) => {
                if self.nodes[pid].keyed {
                    let Some(Key::Map(k)) = key else {
                        unreachable!("check_slot enforces key kind");
                    };
                    self.children_map
                        .entry(pid.to_string())
                        .or_default()
                        .insert(nid.clone(), k);
                } else {
                    let list = self.children_list.entry(pid.to_string()).or_default();
                    match key {
                        Some(Key::Seq(pos)) => {
                            let pos = pos.min(list.len());
                            list.insert(pos, nid.clone());
                        }
                        None => list.push(nid.clone()),
                        Some(Key::Map(_)) => unreachable!("check_slot enforces key kind"),
                    }
                }
                self.parent_of.insert(nid.clone(), pid.to_string());
            }
        }
        self.nodes.insert(nid, node);
        Ok(())
    }

    /// Remove a childless node from all indices, returning its shared value.
    /// The only primitive that shrinks the tree.
    #[instrument(level = "trace", skip(self))]
    fn detach_leaf(&mut self, nid: &str) -> TreeResult<Rc<Node<P>>> {
        self.ensure_present(nid)?;
        if !self.children_ids(nid)?.is_empty() {
            return Err(TreeError::InvalidOperation(format!(
                "cannot detach node <{}> having children",
                nid
            )));
        }
        if let Some(pid) = self.parent_of.remove(nid) {
            if self.nodes[&pid].keyed {
                if let Some(m) = self.children_map.get_mut(&pid) {
                    m.remove(nid);
                }
            } else if let Some(l) = self.children_list.get_mut(&pid) {
                l.retain(|cid| cid != nid);
            }
        } else {
            self.root = None;
        }
        self.children_map.remove(nid);
        self.children_list.remove(nid);
        self.nodes
            .remove(nid)
            .ok_or_else(|| TreeError::NotFound(nid.to_string()))
    }

    // ---------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------

    /// Insert a single node, dispatching on the anchor.
    ///
    /// Returns the derived key of the inserted node (`None` at root).
    ///
    /// - `Anchor::Root`: only on an empty tree, no key allowed.
    /// - `Anchor::Below`: a string key is compulsory under a keyed parent and
    ///   must be free; under a list parent an omitted key appends and a
    ///   positional key inserts, shifting subsequent positions.
    /// - `Anchor::Above`: the subtree rooted at `child_id` is detached, the
    ///   new node takes over the vacated slot (same parent, same key), and the
    ///   detached subtree is re-attached below the new node under `key`.
    #[instrument(level = "debug", skip(self, node), fields(nid = node.id()))]
    pub fn insert_node(
        &mut self,
        node: Node<P>,
        anchor: Anchor<'_>,
        key: Option<Key>,
    ) -> TreeResult<Option<Key>> {
        if self.contains(node.id()) {
            return Err(TreeError::DuplicateId(node.id().to_string()));
        }
        let nid = node.id().to_string();
        match anchor {
            Anchor::Root => self.attach(Rc::new(node), None, key)?,
            Anchor::Below { parent_id } => {
                self.ensure_present(parent_id)?;
                self.attach(Rc::new(node), Some(parent_id), key)?;
            }
            Anchor::Above { child_id } => self.insert_node_above(node, child_id, key)?,
            Anchor::AboveLeaf { .. } => {
                return Err(TreeError::InvalidArgument(
                    "Anchor::AboveLeaf is reserved for tree insertion".to_string(),
                ));
            }
        }
        self.get_key(&nid)
    }

    /// Three-step composite: detach child subtree, fill the vacated slot with
    /// the new node, re-attach the subtree below it. All preconditions are
    /// checked upfront so no intermediate state can leak on failure.
    fn insert_node_above(
        &mut self,
        node: Node<P>,
        child_id: &str,
        key: Option<Key>,
    ) -> TreeResult<()> {
        self.ensure_present(child_id)?;
        if !node.accepts_children {
            return Err(TreeError::InvalidOperation(format!(
                "node <{}> does not accept children",
                node.id()
            )));
        }
        // the re-attachment slot lives under the new node, validate key kind
        // against its discipline before mutating anything
        match (&node.keyed, &key) {
            (true, Some(Key::Map(_))) => {}
            (true, _) => {
                return Err(TreeError::InvalidOperation(format!(
                    "a string key is compulsory under keyed node <{}>",
                    node.id()
                )));
            }
            (false, Some(Key::Map(_))) => {
                return Err(TreeError::InvalidOperation(format!(
                    "key under list node <{}> must be a position",
                    node.id()
                )));
            }
            (false, _) => {}
        }
        let slot_key = self.get_key(child_id)?;
        let parent_id = self.parent_of.get(child_id).cloned();
        let nid = node.id().to_string();
        let (_, detached) = self.drop_subtree(child_id)?;
        self.attach(Rc::new(node), parent_id.as_deref(), slot_key)?;
        self.splice_from(&detached, Some(&nid), key)
    }

    /// Insert a whole tree as a subtree, dispatching on the anchor.
    ///
    /// Node values are shared with `other` (shallow). Identifier collisions
    /// across the entire incoming tree are rejected upfront (`DuplicateId`)
    /// before any mutation. Above-insertion requires the incoming tree to
    /// have exactly one leaf, or an explicit `Anchor::AboveLeaf`; otherwise
    /// it fails with `AmbiguousInsertion`.
    #[instrument(level = "debug", skip(self, other))]
    pub fn insert_tree(
        &mut self,
        other: &Tree<P>,
        anchor: Anchor<'_>,
        key: Option<Key>,
    ) -> TreeResult<Option<Key>> {
        let Some(other_root) = other.root.clone() else {
            return Ok(None);
        };
        self.validate_tree_insertion(other, None)?;
        match anchor {
            Anchor::Root => {
                self.check_slot(None, key.as_ref())?;
                self.splice_from(other, None, None)?;
            }
            Anchor::Below { parent_id } => {
                self.ensure_present(parent_id)?;
                self.check_slot(Some(parent_id), key.as_ref())?;
                self.splice_from(other, Some(parent_id), key)?;
            }
            Anchor::Above { child_id } => {
                let leaves = other.leaves_ids(None)?;
                if leaves.len() > 1 {
                    return Err(TreeError::AmbiguousInsertion(
                        "incoming tree has several leaves, use Anchor::AboveLeaf to pick \
                         the one existing nodes go below"
                            .to_string(),
                    ));
                }
                // a non-empty tree has at least one leaf
                let leaf_id = leaves.into_iter().next().unwrap_or_default();
                self.insert_tree_above(other, child_id, &leaf_id, key)?;
            }
            Anchor::AboveLeaf { child_id, leaf_id } => {
                other.ensure_present(leaf_id)?;
                self.insert_tree_above(other, child_id, leaf_id, key)?;
            }
        }
        self.get_key(&other_root)
    }

    fn insert_tree_above(
        &mut self,
        other: &Tree<P>,
        child_id: &str,
        leaf_id: &str,
        key: Option<Key>,
    ) -> TreeResult<()> {
        self.ensure_present(child_id)?;
        // validate the re-attachment slot on the incoming tree before mutating
        let leaf = other.node(leaf_id)?;
        if !leaf.accepts_children {
            return Err(TreeError::InvalidOperation(format!(
                "node <{}> does not accept children",
                leaf_id
            )));
        }
        match (leaf.keyed, &key) {
            (true, Some(Key::Map(_))) => {}
            (true, _) => {
                return Err(TreeError::InvalidOperation(format!(
                    "a string key is compulsory under keyed node <{}>",
                    leaf_id
                )));
            }
            (false, Some(Key::Map(_))) => {
                return Err(TreeError::InvalidOperation(format!(
                    "key under list node <{}> must be a position",
                    leaf_id
                )));
            }
            (false, _) => {}
        }
        let slot_key = self.get_key(child_id)?;
        let parent_id = self.parent_of.get(child_id).cloned();
        let (_, detached) = self.drop_subtree(child_id)?;
        self.splice_from(other, parent_id.as_deref(), slot_key)?;
        self.splice_from(&detached, Some(leaf_id), key)
    }

    /// Reject insertion of `other` when any of its identifiers (minus
    /// `exclude`) is already present — checked for the whole incoming node
    /// set before any mutation.
    fn validate_tree_insertion(&self, other: &Tree<P>, exclude: Option<&str>) -> TreeResult<()> {
        for nid in other.nodes.keys() {
            if Some(nid.as_str()) == exclude {
                continue;
            }
            if self.contains(nid) {
                return Err(TreeError::DuplicateId(nid.clone()));
            }
        }
        Ok(())
    }

    /// Copy the structure rooted at `src`'s root into `self` below
    /// `parent_id`, sharing node values. Callers are responsible for upfront
    /// identifier validation.
    fn splice_from(
        &mut self,
        src: &Tree<P>,
        parent_id: Option<&str>,
        key: Option<Key>,
    ) -> TreeResult<()> {
        let Some(src_root) = src.root.as_deref() else {
            return Ok(());
        };
        self.attach(Rc::clone(src.node(src_root)?), parent_id, key)?;
        self.splice_children_from(src, src_root)
    }

    fn splice_children_from(&mut self, src: &Tree<P>, src_nid: &str) -> TreeResult<()> {
        let child_ids: Vec<String> = src
            .children_ids(src_nid)?
            .into_iter()
            .map(String::from)
            .collect();
        for cid in child_ids {
            let child_key = src.get_key(&cid)?;
            self.attach(Rc::clone(src.node(&cid)?), Some(src_nid), child_key)?;
            self.splice_children_from(src, &cid)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Detach / drop
    // ---------------------------------------------------------------

    /// Remove the subtree rooted at `nid`, returning its former key and the
    /// removed portion as an independent tree sharing node values.
    #[instrument(level = "debug", skip(self))]
    pub fn drop_subtree(&mut self, nid: &str) -> TreeResult<(Option<Key>, Tree<P>)> {
        self.ensure_present(nid)?;
        let key = self.get_key(nid)?;
        let mut removed = Tree::with_separator(self.path_separator.clone());
        removed.attach(Rc::clone(self.node(nid)?), None, None)?;
        removed.splice_children_from(self, nid)?;
        // physical removal is leaf-up: a node only leaves the indices once
        // all of its children have
        for id in self.postorder_ids(nid)? {
            self.detach_leaf(&id)?;
        }
        Ok((key, removed))
    }

    /// Remove a node.
    ///
    /// `with_children = true` destroys the whole subtree and returns only the
    /// node. `with_children = false` rebases the node's children onto its
    /// former parent, preserving their keys; this requires the node and its
    /// parent to share the same keyed-ness, and a root may only be dropped
    /// this way with at most one child.
    #[instrument(level = "debug", skip(self))]
    pub fn drop_node(
        &mut self,
        nid: &str,
        with_children: bool,
    ) -> TreeResult<(Option<Key>, Rc<Node<P>>)> {
        self.ensure_present(nid)?;

        if with_children {
            let (key, removed) = self.drop_subtree(nid)?;
            let node = Rc::clone(removed.node(nid)?);
            return Ok((key, node));
        }

        let child_ids: Vec<String> = self
            .children_ids(nid)?
            .into_iter()
            .map(String::from)
            .collect();

        if self.root.as_deref() == Some(nid) {
            if child_ids.len() > 1 {
                return Err(TreeError::MultipleRoot(format!(
                    "cannot drop root <{}> without its children, tree would have \
                     multiple roots",
                    nid
                )));
            }
            let node = match child_ids.first() {
                None => self.detach_leaf(nid)?,
                Some(cid) => {
                    let (_, promoted) = self.drop_subtree(cid)?;
                    let node = self.detach_leaf(nid)?;
                    self.splice_from(&promoted, None, None)?;
                    node
                }
            };
            return Ok((None, node));
        }

        let pid = self.parent_of[nid].clone();
        if self.nodes[&pid].keyed != self.nodes[nid].keyed {
            return Err(TreeError::InvalidOperation(format!(
                "cannot rebase children of <{}>: keyed-ness differs from parent <{}>",
                nid, pid
            )));
        }
        // keyed rebase: every child key must stay unique under the parent
        if self.nodes[nid].keyed {
            if let Some(children) = self.children_map.get(nid) {
                let parent_keys = &self.children_map[&pid];
                for key in children.values() {
                    let collision = parent_keys
                        .iter()
                        .any(|(cid, k)| cid != nid && k == key);
                    if collision {
                        return Err(TreeError::DuplicateKey {
                            parent_id: pid.clone(),
                            key: key.clone(),
                        });
                    }
                }
            }
        }

        let (key, removed) = self.drop_subtree(nid)?;
        for cid in child_ids {
            let (child_key, child_subtree) = removed.subtree(&cid)?;
            self.splice_from(&child_subtree, Some(&pid), child_key)?;
        }
        let node = Rc::clone(removed.node(nid)?);
        Ok((key, node))
    }

    /// Descendant ids of `nid` (inclusive), children before parents.
    fn postorder_ids(&self, nid: &str) -> TreeResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![(nid.to_string(), false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                out.push(current);
                continue;
            }
            let children = self.children_ids(&current)?;
            let child_ids: Vec<String> = children.into_iter().map(String::from).collect();
            stack.push((current, true));
            for cid in child_ids.into_iter().rev() {
                stack.push((cid, false));
            }
        }
        Ok(out)
    }

    // ---------------------------------------------------------------
    // Subtree / clone / merge
    // ---------------------------------------------------------------

    /// The subtree rooted at `nid` as an independent tree sharing node
    /// values, together with `nid`'s key in its former parent.
    pub fn subtree(&self, nid: &str) -> TreeResult<(Option<Key>, Tree<P>)> {
        self.ensure_present(nid)?;
        let key = self.get_key(nid)?;
        let mut out = Tree::with_separator(self.path_separator.clone());
        out.attach(Rc::clone(self.node(nid)?), None, None)?;
        out.splice_children_from(self, nid)?;
        Ok((key, out))
    }

    /// Graft every child of `other`'s root onto `nid` (default: the root),
    /// preserving keys; the incoming root itself is discarded. On an empty
    /// receiver with no target the whole of `other` is adopted. Identifier
    /// collisions are rejected before any mutation.
    #[instrument(level = "debug", skip(self, other))]
    pub fn merge(&mut self, other: &Tree<P>, nid: Option<&str>) -> TreeResult<()> {
        let Some(other_root) = other.root.as_deref() else {
            return Ok(());
        };
        if self.is_empty() {
            if let Some(target) = nid {
                return Err(TreeError::NotFound(target.to_string()));
            }
            return self.splice_from(other, None, None);
        }
        let target = match self.resolve_start(nid)? {
            Some(t) => t.to_string(),
            None => unreachable!("non-empty tree has a root"),
        };
        // all-or-nothing: check ids and every landing slot before mutating
        self.validate_tree_insertion(other, Some(other_root))?;
        for (child_key, _) in other.children(other_root)? {
            self.check_slot(Some(&target), Some(&child_key))?;
        }
        let child_ids: Vec<String> = other
            .children_ids(other_root)?
            .into_iter()
            .map(String::from)
            .collect();
        for cid in child_ids {
            let (child_key, child_subtree) = other.subtree(&cid)?;
            self.splice_from(&child_subtree, Some(&target), child_key)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Paths
    // ---------------------------------------------------------------

    /// Resolve a separator-joined path of keys to a node id.
    ///
    /// String segments address keyed children, integer segments list
    /// positions; the empty path resolves to the root.
    pub fn get_node_id_by_path(&self, path: &str) -> TreeResult<NodeId> {
        let mut current = self
            .root
            .clone()
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        if path.is_empty() {
            return Ok(current);
        }
        for segment in path.split(self.path_separator.as_str()) {
            let node = self.node(&current)?;
            if node.keyed {
                let child = self.children_map.get(&current).and_then(|m| {
                    m.iter()
                        .find(|(_, key)| key.as_str() == segment)
                        .map(|(cid, _)| cid.clone())
                });
                current = child.ok_or_else(|| TreeError::NotFound(path.to_string()))?;
            } else {
                let pos: usize = segment.parse().map_err(|_| {
                    TreeError::InvalidArgument(format!(
                        "path segment <{}> is not a position",
                        segment
                    ))
                })?;
                let child = self
                    .children_list
                    .get(&current)
                    .and_then(|l| l.get(pos).cloned());
                current = child.ok_or_else(|| TreeError::NotFound(path.to_string()))?;
            }
        }
        Ok(current)
    }

    /// Separator-joined path of keys from the root to `nid` (empty for root).
    pub fn get_path(&self, nid: &str) -> TreeResult<String> {
        let ancestors = self.ancestors_ids(nid, true, true)?;
        let mut segments = Vec::new();
        for id in ancestors.into_iter().skip(1) {
            if let Some(key) = self.get_key(id)? {
                segments.push(key.to_string());
            }
        }
        Ok(segments.into_iter().join(&self.path_separator))
    }
}

impl<P: Clone> Tree<P> {
    /// Clone the tree, or the subtree rooted at `new_root`.
    ///
    /// With `deep = false` node values are shared with the source (the
    /// documented aliasing allowance); `deep = true` duplicates them so the
    /// clone is fully isolated. `with_nodes = false` yields an empty tree
    /// with the same configuration.
    pub fn clone_tree(
        &self,
        with_nodes: bool,
        deep: bool,
        new_root: Option<&str>,
    ) -> TreeResult<Tree<P>> {
        let mut out = Tree::with_separator(self.path_separator.clone());
        if !with_nodes {
            return Ok(out);
        }
        if let Some(start) = self.resolve_start(new_root)? {
            let start = start.to_string();
            out.attach(Rc::clone(self.node(&start)?), None, None)?;
            out.splice_children_from(self, &start)?;
        }
        if deep {
            for value in out.nodes.values_mut() {
                *value = Rc::new((**value).clone());
            }
        }
        Ok(out)
    }
}

impl<P> fmt::Display for Tree<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show())
    }
}
