//! Node model: identifier, child-addressing discipline, display parts.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node identifier, unique within a tree.
pub type NodeId = String;

/// Address of a child under its parent.
///
/// Children of a keyed ("map") node are addressed by unique string keys,
/// children of an unkeyed ("list") node by dense 0-based positions. The root
/// has no key, which is why derived keys surface as `Option<Key>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// String key under a keyed parent
    Map(String),
    /// Position under an ordered parent
    Seq(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Map(k) => write!(f, "{}", k),
            Key::Seq(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Key {
    fn from(k: &str) -> Self {
        Key::Map(k.to_string())
    }
}

impl From<String> for Key {
    fn from(k: String) -> Self {
        Key::Map(k)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Seq(i)
    }
}

/// Tree node: a value object tagged with its child-addressing discipline.
///
/// The identifier is assigned at construction and never mutated. A node with
/// `accepts_children = false` is a leaf and never appears as a parent.
/// `P` is an arbitrary payload type the tree engine does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<P = ()> {
    identifier: NodeId,
    /// Children referenced by string key (map) when true, by position (list) otherwise
    pub keyed: bool,
    /// Whether this node may carry children
    pub accepts_children: bool,
    /// Display string used by tree rendering
    pub display: Option<String>,
    /// Caller-defined payload, typically set on leaves
    pub payload: Option<P>,
}

impl<P> Node<P> {
    /// Create a keyed ("map") node accepting children.
    pub fn map(identifier: impl Into<NodeId>) -> Self {
        Self {
            identifier: identifier.into(),
            keyed: true,
            accepts_children: true,
            display: None,
            payload: None,
        }
    }

    /// Create an unkeyed ("list") node accepting children.
    pub fn seq(identifier: impl Into<NodeId>) -> Self {
        Self {
            keyed: false,
            ..Self::map(identifier)
        }
    }

    /// Create a leaf node.
    pub fn leaf(identifier: impl Into<NodeId>) -> Self {
        Self {
            accepts_children: false,
            ..Self::map(identifier)
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn id(&self) -> &str {
        &self.identifier
    }

    /// Generate a process-unique node identifier.
    pub fn auto_id() -> NodeId {
        Uuid::new_v4().to_string()
    }

    /// Two-part line representation: left-aligned start, right-aligned end.
    ///
    /// Defaults to the display string if set, else `{}` for keyed containers,
    /// `[]` for list containers, and nothing for leaves.
    pub fn line_repr(&self) -> (String, String) {
        if let Some(display) = &self.display {
            return (display.clone(), String::new());
        }
        if !self.accepts_children {
            return (String::new(), String::new());
        }
        if self.keyed {
            ("{}".to_string(), String::new())
        } else {
            ("[]".to_string(), String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_container_nodes_when_line_repr_then_shows_discipline() {
        let map: Node = Node::map("m");
        let seq: Node = Node::seq("s");
        assert_eq!(map.line_repr().0, "{}");
        assert_eq!(seq.line_repr().0, "[]");
    }

    #[test]
    fn given_leaf_with_display_when_line_repr_then_shows_display() {
        let leaf: Node = Node::leaf("l").with_display("AA0");
        assert_eq!(leaf.line_repr(), ("AA0".to_string(), String::new()));
        let bare: Node = Node::leaf("l2");
        assert_eq!(bare.line_repr().0, "");
    }

    #[test]
    fn given_keys_when_ordering_then_sorts_within_discipline() {
        assert!(Key::Map("a".into()) < Key::Map("b".into()));
        assert!(Key::Seq(0) < Key::Seq(10));
        assert_eq!(Key::from("a").to_string(), "a");
        assert_eq!(Key::from(3usize).to_string(), "3");
    }
}
