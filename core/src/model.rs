use std::fmt;

/// Dense, zero-based node identifier assigned in discovery order.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    User,
    Product,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::User => write!(f, "user"),
            NodeKind::Product => write!(f, "product"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
        }
    }
}

/// Aggregated user-product edge. Keyed by labels; dense ids are resolved
/// only when the matrix is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub user: String,
    pub product: String,
    pub weight: u64,
}

impl Interaction {
    pub fn new(user: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            product: product.into(),
            weight: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProduct {
    pub label: String,
    pub position: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub user: String,
    /// Descending by score, ties by ascending product position.
    pub products: Vec<ScoredProduct>,
}

impl Recommendation {
    pub fn empty(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            products: Vec::new(),
        }
    }
}
