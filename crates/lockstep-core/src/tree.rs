//! Call tree extracted from the reference graph.
//!
//! Every [`Node`] stands for one call (or its reply) and records the lifeline
//! the call lands on. Nodes live in a [`NodeTree`] arena and refer to each
//! other through [`NodeId`] indices, so parent and sibling links never own
//! anything.
//!
//! ```text
//!   main ──▶ B.load()          (call, lands on B)
//!              ├─▶ C.query()   (nested call made by B)
//!              │     └─◀ B     (reply of query, lands back on B)
//!              └─◀ main        (reply of load)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a [`Node`] inside its [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw index into the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of the edge that created a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// A call between two different lifelines.
    #[default]
    #[serde(rename = "NORMAL")]
    Normal,
    /// A call a lifeline makes to itself.
    #[serde(rename = "SELF")]
    SelfCall,
    /// The reply that completes a call.
    #[serde(rename = "RETURN")]
    Return,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Normal => "NORMAL",
            Self::SelfCall => "SELF",
            Self::Return => "RETURN",
        };
        f.write_str(code)
    }
}

/// The message that created a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    name: String,
    kind: EdgeKind,
}

impl Edge {
    pub fn new(name: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Message name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Returns `true` for self calls.
    pub fn is_self(&self) -> bool {
        self.kind == EdgeKind::SelfCall
    }

    /// Returns `true` for reply edges.
    pub fn is_return(&self) -> bool {
        self.kind == EdgeKind::Return
    }
}

/// Interaction operator of a combined fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentOperator {
    Alt,
    Opt,
    Loop,
    Par,
    Break,
}

/// A combined fragment enclosing a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentDescriptor {
    name: String,
    operator: FragmentOperator,
}

impl FragmentDescriptor {
    pub fn new(name: impl Into<String>, operator: FragmentOperator) -> Self {
        Self {
            name: name.into(),
            operator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> FragmentOperator {
        self.operator
    }
}

/// One call or reply of the reference graph.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    edge: Edge,
    is_reply: bool,
    fragments: Vec<FragmentDescriptor>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Name of the lifeline this node lands on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The edge that created this node.
    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn is_reply(&self) -> bool {
        self.is_reply
    }

    /// Combined fragments enclosing this call, innermost first.
    pub fn fragments(&self) -> &[FragmentDescriptor] {
        &self.fragments
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena holding every node of one graph.
///
/// # Examples
///
/// ```
/// # use lockstep_core::tree::{EdgeKind, NodeTree};
/// let mut tree = NodeTree::new("main", "main");
/// let root = tree.root();
/// let load = tree.add_call(root, "B", "load", EdgeKind::Normal);
/// let reply = tree.add_reply(load, "loadReturn");
///
/// assert_eq!(tree.reply_of(load), Some(reply));
/// assert_eq!(tree.node(reply).name(), "main");
/// assert_eq!(tree.parent(load), Some(root));
/// ```
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    /// Creates a tree with a single root node on `root_lifeline`.
    pub fn new(root_lifeline: impl Into<String>, root_message: impl Into<String>) -> Self {
        let root = Node {
            name: root_lifeline.into(),
            edge: Edge::new(root_message, EdgeKind::Normal),
            is_reply: false,
            fragments: Vec::new(),
            parent: None,
            children: Vec::new(),
        };
        Self { nodes: vec![root] }
    }

    /// Builds a tree from its nested serialized form.
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let mut tree = Self::new(&spec.lifeline, &spec.message);
        let root = tree.root();
        for call in &spec.calls {
            tree.push_spec(root, call);
        }
        tree
    }

    fn push_spec(&mut self, parent: NodeId, spec: &NodeSpec) {
        let id = self.add_call(parent, &spec.lifeline, &spec.message, spec.kind);
        self.nodes[id.0].fragments = spec.fragments.clone();
        for call in &spec.calls {
            self.push_spec(id, call);
        }
        if let Some(reply) = &spec.reply {
            self.add_reply(id, reply);
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a call made from `parent` to `lifeline`.
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this tree.
    pub fn add_call(
        &mut self,
        parent: NodeId,
        lifeline: impl Into<String>,
        message: impl Into<String>,
        kind: EdgeKind,
    ) -> NodeId {
        self.push(parent, lifeline.into(), Edge::new(message, kind), false)
    }

    /// Appends the reply of `call`. The reply lands on the caller's lifeline.
    ///
    /// # Panics
    /// Panics if `call` does not belong to this tree.
    pub fn add_reply(&mut self, call: NodeId, message: impl Into<String>) -> NodeId {
        let caller = self.nodes[call.0]
            .parent
            .map_or_else(|| self.nodes[call.0].name.clone(), |p| self.nodes[p.0].name.clone());
        self.push(call, caller, Edge::new(message, EdgeKind::Return), true)
    }

    /// Attaches a combined fragment to `call`. Call innermost first.
    pub fn add_fragment(&mut self, call: NodeId, fragment: FragmentDescriptor) {
        self.nodes[call.0].fragments.push(fragment);
    }

    fn push(&mut self, parent: NodeId, name: String, edge: Edge, is_reply: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            edge,
            is_reply,
            fragments: Vec::new(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the node for `id`, if it belongs to this tree.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// The previous entry among the parent's children.
    pub fn left_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&child| child == id)?;
        position.checked_sub(1).map(|prev| siblings[prev])
    }

    /// The next entry among the parent's children.
    pub fn right_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&child| child == id)?;
        siblings.get(position + 1).copied()
    }

    /// The reply child of `call`. With several, the last one wins.
    pub fn reply_of(&self, call: NodeId) -> Option<NodeId> {
        self.children(call)
            .iter()
            .rev()
            .copied()
            .find(|&child| self.node(child).is_reply())
    }

    /// Walks the parent chain, nearest ancestor first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&current| self.parent(current))
    }

    /// Iterates over all node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Distinct lifeline names, in order of first appearance.
    pub fn lifeline_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if !names.contains(&node.name()) {
                names.push(node.name());
            }
        }
        names
    }

    /// Number of calls other than the root.
    pub fn call_count(&self) -> usize {
        self.ids()
            .filter(|&id| id != self.root() && !self.node(id).is_reply())
            .count()
    }

    /// First call (not reply) created by a message named `message`.
    pub fn find_call(&self, message: &str) -> Option<NodeId> {
        self.ids().find(|&id| {
            let node = self.node(id);
            !node.is_reply() && node.edge().name() == message
        })
    }

    /// First node landing on the lifeline `name`.
    pub fn find_lifeline(&self, name: &str) -> Option<NodeId> {
        self.ids().find(|&id| self.node(id).name() == name)
    }
}

/// Nested, serializable form of a call tree.
///
/// A `reply` is appended after all nested calls, which keeps it the last
/// child of its call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub lifeline: String,
    pub message: String,
    #[serde(default)]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<FragmentDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<NodeSpec>,
}
