//! Work-list driven tree traversal.
//!
//! [`Expand`] is a lazy iterator over `(key, node)` pairs. Children of a
//! visited node are sorted, then spliced to the front (depth-first pre-order)
//! or back (breadth-first) of the work queue. Each call to [`Tree::expand`]
//! produces a fresh, independent sequence; the iterator borrows the tree, so
//! mutating while a traversal is live is rejected at compile time.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::errors::TreeResult;
use crate::node::{Key, Node, NodeId};
use crate::tree::Tree;

/// Traversal ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Depth-first pre-order
    #[default]
    Depth,
    /// Breadth-first
    Width,
}

type FilterFn<'t, P> = Box<dyn Fn(Option<&Key>, &Node<P>) -> bool + 't>;
type SortFn<'t, P> = Box<dyn Fn((&Key, &Node<P>), (&Key, &Node<P>)) -> Ordering + 't>;

/// Lazy traversal over a tree or subtree, created by [`Tree::expand`].
///
/// Options are set builder-style before iteration starts:
///
/// ```
/// use duotree::{Mode, Node, Tree, Anchor};
///
/// let mut tree: Tree = Tree::new();
/// tree.insert_node(Node::map("root"), Anchor::Root, None).unwrap();
/// let visited: Vec<_> = tree
///     .expand(None)
///     .unwrap()
///     .mode(Mode::Width)
///     .collect();
/// assert_eq!(visited.len(), 1);
/// ```
pub struct Expand<'t, P> {
    tree: &'t Tree<P>,
    start: Option<NodeId>,
    queue: VecDeque<NodeId>,
    started: bool,
    mode: Mode,
    reverse: bool,
    filter: Option<FilterFn<'t, P>>,
    filter_through: bool,
    sort_by: Option<SortFn<'t, P>>,
}

impl<'t, P> Expand<'t, P> {
    pub(crate) fn new(tree: &'t Tree<P>, start: Option<&str>) -> Self {
        Self {
            tree,
            start: start.map(String::from),
            queue: VecDeque::new(),
            started: false,
            mode: Mode::Depth,
            reverse: false,
            filter: None,
            filter_through: false,
            sort_by: None,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Reverse the per-parent child ordering.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Exclude nodes failing the predicate from the output. Unless
    /// [`Expand::filter_through`] is set, an excluded node's descendants are
    /// not visited at all.
    pub fn filter(mut self, filter: impl Fn(Option<&Key>, &Node<P>) -> bool + 't) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Keep descending into children of excluded nodes.
    pub fn filter_through(mut self, filter_through: bool) -> Self {
        self.filter_through = filter_through;
        self
    }

    /// Custom ordering of same-parent children. Defaults to the derived key.
    /// Tie order is unspecified.
    pub fn sort_by(
        mut self,
        cmp: impl Fn((&Key, &Node<P>), (&Key, &Node<P>)) -> Ordering + 't,
    ) -> Self {
        self.sort_by = Some(Box::new(cmp));
        self
    }

    fn sorted_children(&self, nid: &str) -> TreeResult<Vec<NodeId>> {
        let mut children: Vec<(Key, NodeId)> = Vec::new();
        for cid in self.tree.children_ids(nid)? {
            if let Some(key) = self.tree.get_key(cid)? {
                children.push((key, cid.to_string()));
            }
        }
        children.sort_by(|(ka, ia), (kb, ib)| {
            let ordering = match &self.sort_by {
                Some(cmp) => cmp(
                    (ka, self.tree.nodes[ia].as_ref()),
                    (kb, self.tree.nodes[ib].as_ref()),
                ),
                None => ka.cmp(kb),
            };
            if self.reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(children.into_iter().map(|(_, cid)| cid).collect())
    }
}

impl<'t, P> Iterator for Expand<'t, P> {
    type Item = (Option<Key>, &'t Node<P>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let start = match &self.start {
                Some(id) => Some(id.clone()),
                None => self.tree.root.clone(),
            };
            if let Some(id) = start {
                self.queue.push_back(id);
            }
        }
        while let Some(nid) = self.queue.pop_front() {
            let key = self.tree.get_key(&nid).ok()?;
            let node = self.tree.nodes[&nid].as_ref();
            let pass = match &self.filter {
                Some(filter) => filter(key.as_ref(), node),
                None => true,
            };
            if pass || self.filter_through {
                let children = self.sorted_children(&nid).ok()?;
                match self.mode {
                    Mode::Depth => {
                        for cid in children.into_iter().rev() {
                            self.queue.push_front(cid);
                        }
                    }
                    Mode::Width => {
                        for cid in children {
                            self.queue.push_back(cid);
                        }
                    }
                }
            }
            if pass {
                return Some((key, node));
            }
        }
        None
    }
}

impl<P> Tree<P> {
    /// Lazily traverse the tree (or the subtree below `nid`) yielding
    /// `(key, node)` pairs.
    ///
    /// Defaults: whole tree from root, depth-first pre-order, children
    /// ordered by derived key. An empty tree with no explicit start yields an
    /// empty sequence; an unknown explicit start is an error.
    pub fn expand(&self, nid: Option<&str>) -> TreeResult<Expand<'_, P>> {
        let start = self.resolve_start(nid)?;
        Ok(Expand::new(self, start))
    }
}
