//! Arena-backed tree over an exported Org document.
//!
//! The exporter writes every element as `[kind, properties, ...children]`.
//! Children are either nested elements or opaque values (usually raw text),
//! and their order is preserved.
//!
//! Nodes live in a flat `Vec` owned by [`Tree`]. Parent links are plain
//! indices into that arena, so walking upward never holds ownership.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while building a [`Tree`] from JSON.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root was not a `[kind, properties, ...]` array.
    #[error("malformed node at {path}: {reason}")]
    MalformedNode { path: String, reason: &'static str },
}

/// Index of a node within its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A child slot: either a nested node or an opaque leaf value.
#[derive(Debug, Clone, PartialEq)]
enum Child {
    Node(NodeId),
    Leaf(Value),
}

#[derive(Debug)]
struct NodeData {
    kind: String,
    properties: Map<String, Value>,
    children: Vec<Child>,
    parent: Option<NodeId>,
}

/// An immutable document tree. The first node is always the root.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Builds a tree from an already-parsed nested structure.
    ///
    /// Only the root is checked: it must be an array. Nested arrays always
    /// become nodes, whatever they contain.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let items = value.as_array().ok_or(ParseError::MalformedNode {
            path: "/".to_string(),
            reason: "expected an array",
        })?;
        let mut tree = Self { nodes: Vec::new() };
        tree.insert(items, None);
        Ok(tree)
    }

    /// Parses JSON text and builds a tree from it.
    pub fn from_json_str(json: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Returns the root node.
    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Returns the node with the given id.
    ///
    /// Ids are only handed out by the tree that owns them, so lookups never miss.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Wraps `items` as a node. A non-string kind becomes `""` and
    /// non-object properties become empty, so bad entries only fail once a
    /// rule reads them.
    fn insert(&mut self, items: &[Value], parent: Option<NodeId>) -> NodeId {
        let kind = items.first().and_then(Value::as_str).unwrap_or_default();
        let properties = match items.get(1) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind: kind.to_string(),
            properties,
            children: Vec::new(),
            parent,
        });

        let children = items
            .iter()
            .skip(2)
            .map(|child| match child {
                Value::Array(nested) => Child::Node(self.insert(nested, Some(id))),
                leaf => Child::Leaf(leaf.clone()),
            })
            .collect();
        self.nodes[id.0].children = children;

        id
    }
}

/// A borrowed view of one node in a [`Tree`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    tree: &'a Tree,
    id: NodeId,
}

/// A child as seen through a [`Node`] view.
#[derive(Debug, Clone, Copy)]
pub enum ChildRef<'a> {
    Node(Node<'a>),
    Leaf(&'a Value),
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The element type, e.g. `headline` or `clock`.
    pub fn kind(&self) -> &'a str {
        &self.data().kind
    }

    pub fn properties(&self) -> &'a Map<String, Value> {
        &self.data().properties
    }

    pub fn property(&self, key: &str) -> Option<&'a Value> {
        self.data().properties.get(key)
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    /// Children in document order.
    pub fn children(&self) -> impl Iterator<Item = ChildRef<'a>> + use<'a> {
        let tree = self.tree;
        self.data().children.iter().map(move |child| match child {
            Child::Node(id) => ChildRef::Node(tree.node(*id)),
            Child::Leaf(value) => ChildRef::Leaf(value),
        })
    }

    /// Only the children that are nodes, skipping opaque leaves.
    pub fn child_nodes(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        self.children().filter_map(|child| match child {
            ChildRef::Node(node) => Some(node),
            ChildRef::Leaf(_) => None,
        })
    }

    pub fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    /// Walks from the parent up to the root, nearest first.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }
}

/// Iterator over a node's ancestors, see [`Node::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    next: Option<Node<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            "org-data",
            null,
            [
                "headline",
                {"raw-value": "Work"},
                "some text",
                ["headline", {"raw-value": "Deep Focus"}, ["clock", {"status": "closed"}]]
            ],
            42
        ])
    }

    #[test]
    fn builds_nodes_and_keeps_leaves_in_order() {
        let tree = Tree::from_value(&sample()).unwrap();
        let root = tree.root();

        assert_eq!(root.kind(), "org-data");
        assert!(root.properties().is_empty());
        assert_eq!(tree.len(), 4);

        let children: Vec<_> = root.children().collect();
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], ChildRef::Node(n) if n.kind() == "headline"));
        assert!(matches!(children[1], ChildRef::Leaf(v) if v == &json!(42)));

        let work = root.child_nodes().next().unwrap();
        let work_children: Vec<_> = work.children().collect();
        assert!(matches!(work_children[0], ChildRef::Leaf(v) if v == "some text"));
        assert_eq!(work.child_nodes().count(), 1);
    }

    #[test]
    fn ancestors_walk_nearest_first_to_root() {
        let tree = Tree::from_value(&sample()).unwrap();
        let clock = tree
            .root()
            .child_nodes()
            .next()
            .and_then(|work| work.child_nodes().next())
            .and_then(|focus| focus.child_nodes().next())
            .unwrap();

        assert_eq!(clock.kind(), "clock");
        let kinds: Vec<_> = clock.ancestors().map(|n| n.kind()).collect();
        assert_eq!(kinds, ["headline", "headline", "org-data"]);

        let titles: Vec<_> = clock
            .ancestors()
            .filter_map(|n| n.property("raw-value").and_then(Value::as_str))
            .collect();
        assert_eq!(titles, ["Deep Focus", "Work"]);
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn kind_and_properties_are_not_validated() {
        let tree = Tree::from_value(&json!(["whatever", {"x": [1, 2]}])).unwrap();
        assert_eq!(tree.root().kind(), "whatever");
        assert_eq!(tree.root().property("x"), Some(&json!([1, 2])));
        assert!(!tree.root().has_children());
    }

    #[test]
    fn rejects_non_array_root() {
        let err = Tree::from_value(&json!({"kind": "headline"})).unwrap_err();
        assert!(matches!(err, ParseError::MalformedNode { ref path, .. } if path == "/"));
    }

    #[test]
    fn odd_nested_arrays_still_become_nodes() {
        let tree = Tree::from_value(&json!(["root", "not-props", [1, {}], [], ["x", [2]]])).unwrap();
        let root = tree.root();
        assert!(root.properties().is_empty());

        let kinds: Vec<_> = root.child_nodes().map(|n| n.kind()).collect();
        assert_eq!(kinds, ["", "", "x"]);

        let numeric = root.child_nodes().next().unwrap();
        assert!(numeric.properties().is_empty());
        assert_eq!(numeric.parent().map(|p| p.id()), Some(root.id()));

        let x = root.child_nodes().nth(2).unwrap();
        assert!(x.properties().is_empty());
        assert!(!x.has_children());
    }

    #[test]
    fn from_json_str_reports_invalid_json() {
        assert!(matches!(
            Tree::from_json_str("[\"root\", "),
            Err(ParseError::Json(_))
        ));
    }
}
