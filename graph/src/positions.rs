use std::collections::HashMap;

/// Column ordering of the solver's per-node score rows: product label to
/// position in `[0, D)`, assigned in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ProductPositionIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ProductPositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, label: &str) -> usize {
        if let Some(position) = self.positions.get(label) {
            return *position;
        }
        let position = self.labels.len();
        self.labels.push(label.to_string());
        self.positions.insert(label.to_string(), position);
        position
    }

    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn label_at(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    /// `D`, the number of distinct products.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProductPositionIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for label in iter {
            index.insert(label.as_ref());
        }
        index
    }
}
