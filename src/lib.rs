//! duotree: an in-memory mutable tree with two child-addressing disciplines.
//!
//! Every node is either keyed ("map": children addressed by unique string
//! keys) or unkeyed ("list": children addressed by dense 0-based positions).
//! On top of that the crate offers structural editing (insert below/above,
//! drop with or without children, subtree extraction, splice, merge), lazy
//! depth- and breadth-first traversal, path addressing, deterministic
//! ASCII-art rendering, a serde persistence form, and a JSON bridge.
//!
//! ```
//! use duotree::{Anchor, Key, Node, Tree};
//!
//! let mut tree: Tree = Tree::new();
//! tree.insert_node(Node::map("root"), Anchor::Root, None)?;
//! tree.insert_node(
//!     Node::seq("items"),
//!     Anchor::Below { parent_id: "root" },
//!     Some(Key::from("items")),
//! )?;
//! tree.insert_node(
//!     Node::leaf("first").with_display("first item"),
//!     Anchor::Below { parent_id: "items" },
//!     None,
//! )?;
//! assert_eq!(tree.get_node_id_by_path("items.0")?, "first");
//! # Ok::<(), duotree::TreeError>(())
//! ```

pub mod display;
pub mod errors;
pub mod json;
pub mod node;
pub mod serial;
pub mod testing;
pub mod traversal;
pub mod tree;

pub use display::{LineStyle, ShowOptions};
pub use errors::{TreeError, TreeResult};
pub use node::{Key, Node, NodeId};
pub use serial::{ChildrenData, NodeData, TreeData};
pub use traversal::{Expand, Mode};
pub use tree::{Anchor, Tree};
