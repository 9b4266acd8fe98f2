//! The peer's UI element tree with absolute screen coordinates.
//!
//! # Why an arena? (for beginners)
//!
//! Every UI node needs to know both its children *and* its parent: children
//! for rendering the tree, the parent for walking up from a picked element.
//! Expressing that with owned pointers in Rust needs `Rc<RefCell<…>>` and
//! `Weak` back-references.  Instead, [`UiTree`] stores every node in one
//! `Vec` and links them with [`NodeId`] indices:
//!
//! ```text
//! nodes: [ root(0) ─┬─ child(1) ── grandchild(2)
//!                   └─ child(3) ]
//!
//! nodes[1].parent   == Some(NodeId(0))
//! nodes[0].children == [NodeId(1), NodeId(3)]
//! ```
//!
//! Nodes are stored in preorder, so a parent always has a smaller index than
//! its children.
//!
//! # Coordinates
//!
//! The peer reports `x`/`y` relative to the parent item.  While building the
//! arena each node's absolute position is computed once:
//! `total = x + parent.total`, and a root's total equals its own `x`/`y`.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::messages::PeerMessage;

/// Keys under which a node's children may appear.
const CHILD_KEYS: [&str; 2] = ["subItems", "children"];

/// Errors produced while building a [`UiTree`] from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiTreeError {
    #[error("snapshot has no \"tree\" field")]
    MissingTree,

    #[error("tree must be an object or an array of objects")]
    NotATree,

    #[error("node at depth {depth} is not a JSON object")]
    InvalidNode { depth: usize },
}

/// Index of a node inside a [`UiTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in preorder.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One UI element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiNode {
    /// Position relative to the parent.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Absolute position, computed when the snapshot was built.
    pub total_x: f64,
    pub total_y: f64,
    /// Back-reference for navigation; `None` for roots.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Distance from the root (roots are depth 0).
    pub depth: usize,
    /// View state for tree renderers; always `false` in a fresh snapshot.
    pub collapsed: bool,
    /// Every other property the peer reported (`__class__`, `objectName`,
    /// `visible`, ...).  The child list is not repeated here.
    pub attributes: Map<String, Value>,
}

impl UiNode {
    /// The peer-side class name (`__class__`), if reported.
    pub fn class_name(&self) -> Option<&str> {
        self.attributes.get("__class__").and_then(Value::as_str)
    }

    /// The `objectName` property, if non-empty.
    pub fn object_name(&self) -> Option<&str> {
        self.attributes
            .get("objectName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// `false` only when the peer explicitly reported `visible: false`.
    pub fn is_visible(&self) -> bool {
        self.attributes
            .get("visible")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Returns `true` if the absolute point lies inside this node's rectangle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.total_x
            && y >= self.total_y
            && x < self.total_x + self.width
            && y < self.total_y + self.height
    }
}

/// A complete UI snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiTree {
    nodes: Vec<UiNode>,
    roots: Vec<NodeId>,
}

impl UiTree {
    /// Builds a tree from a `qml_tree` / `view_tree` message.
    ///
    /// # Errors
    ///
    /// [`UiTreeError::MissingTree`] when the message has no `tree` field, or
    /// any error from [`UiTree::from_value`].
    pub fn from_message(message: &PeerMessage) -> Result<Self, UiTreeError> {
        let tree = message.get("tree").ok_or(UiTreeError::MissingTree)?;
        Self::from_value(tree)
    }

    /// Builds a tree from either an array of root objects or a single root.
    ///
    /// # Errors
    ///
    /// Returns a [`UiTreeError`] if the value (or any nested child) is not a
    /// JSON object.
    ///
    /// # Example
    ///
    /// ```rust
    /// use inspector_core::UiTree;
    /// use serde_json::json;
    ///
    /// let tree = UiTree::from_value(&json!({"x": 10, "y": 10, "subItems": [{"x": 5, "y": 5}]})).unwrap();
    /// let child = tree.get(tree.roots()[0]).unwrap().children[0];
    /// assert_eq!(tree.get(child).unwrap().total_x, 15.0);
    /// ```
    pub fn from_value(value: &Value) -> Result<Self, UiTreeError> {
        let roots: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![value],
            _ => return Err(UiTreeError::NotATree),
        };

        let mut tree = Self::default();

        // Explicit stack instead of recursion: deeply nested QML scenes must
        // not overflow the thread stack.  Children are pushed in reverse so
        // they pop in document order, which keeps the arena in preorder.
        let mut stack: Vec<(&Value, Option<NodeId>)> =
            roots.into_iter().rev().map(|root| (root, None)).collect();

        while let Some((value, parent)) = stack.pop() {
            let id = tree.insert(value, parent)?;
            if let Some(children) = child_list(value) {
                for child in children.iter().rev() {
                    stack.push((child, Some(id)));
                }
            }
        }

        Ok(tree)
    }

    /// Applies the coordinate fixup for one node and links it into the arena.
    fn insert(&mut self, value: &Value, parent: Option<NodeId>) -> Result<NodeId, UiTreeError> {
        let depth = parent.map_or(0, |p| self.nodes[p.0].depth + 1);
        let Value::Object(object) = value else {
            return Err(UiTreeError::InvalidNode { depth });
        };

        let number = |key: &str| object.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let (x, y) = (number("x"), number("y"));
        let (total_x, total_y) = match parent {
            Some(p) => (x + self.nodes[p.0].total_x, y + self.nodes[p.0].total_y),
            None => (x, y),
        };

        let attributes: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !CHILD_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let id = NodeId(self.nodes.len());
        self.nodes.push(UiNode {
            x,
            y,
            width: number("width"),
            height: number("height"),
            total_x,
            total_y,
            parent,
            children: Vec::new(),
            depth,
            collapsed: false,
            attributes,
        });

        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Root nodes in snapshot order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Looks up a node.
    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes across all roots.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates every node in preorder.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &UiNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Walks from `id` up to its root, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|n| n.parent), |p| {
            self.get(*p).and_then(|n| n.parent)
        })
    }

    /// Sets a node's collapsed flag.  Returns `false` for an unknown id.
    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.collapsed = collapsed;
                true
            }
            None => false,
        }
    }

    /// Finds the deepest visible node whose absolute rectangle contains the
    /// point.  Among equally deep matches the later one in preorder wins,
    /// since it is painted on top.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, usize)> = None;
        for (id, node) in self.iter() {
            if !node.contains(x, y) || !self.is_effectively_visible(id) {
                continue;
            }
            if best.map_or(true, |(_, depth)| node.depth >= depth) {
                best = Some((id, node.depth));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Returns the first node (in preorder) with the given `objectName`.
    pub fn find_by_object_name(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.object_name() == Some(name))
            .map(|(id, _)| id)
    }

    fn is_effectively_visible(&self, id: NodeId) -> bool {
        let visible = |id: NodeId| self.get(id).map_or(false, UiNode::is_visible);
        visible(id) && self.ancestors(id).all(visible)
    }
}

fn child_list(value: &Value) -> Option<&Vec<Value>> {
    CHILD_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
