use crate::GraphError;
use lprec_core::model::{Node, NodeId, NodeKind};
use std::collections::HashMap;

/// Dense id assignment for users and products. Labels are scoped by kind,
/// so a user and a product may share a label and still be distinct nodes.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    by_label: HashMap<(NodeKind, String), NodeId>,
    nodes: Vec<Node>,
    users: usize,
    products: usize,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing id for `(kind, label)` or allocates the next one.
    pub fn assign(&mut self, label: &str, kind: NodeKind) -> NodeId {
        if let Some(id) = self.by_label.get(&(kind, label.to_string())) {
            return *id;
        }

        let id = self.nodes.len();
        self.nodes.push(Node::new(id, kind, label));
        self.by_label.insert((kind, label.to_string()), id);
        match kind {
            NodeKind::User => self.users += 1,
            NodeKind::Product => self.products += 1,
        }
        id
    }

    pub fn lookup(&self, label: &str, kind: NodeKind) -> Result<NodeId, GraphError> {
        self.by_label
            .get(&(kind, label.to_string()))
            .copied()
            .ok_or_else(|| GraphError::UnknownLabel {
                kind,
                label: label.to_string(),
            })
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id).ok_or(GraphError::UnknownId(id))
    }

    pub fn kind_of(&self, id: NodeId) -> Result<NodeKind, GraphError> {
        self.node(id).map(|node| node.kind)
    }

    pub fn label_of(&self, id: NodeId) -> Result<&str, GraphError> {
        self.node(id).map(|node| node.label.as_str())
    }

    pub fn count_of(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::User => self.users,
            NodeKind::Product => self.products,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in id (discovery) order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
