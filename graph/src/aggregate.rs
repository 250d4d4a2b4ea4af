use crate::positions::ProductPositionIndex;
use crate::registry::IdentityRegistry;
use lprec_core::model::{Interaction, NodeKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub user_field: usize,
    pub product_field: usize,
    pub sentinel: char,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            user_field: 1,
            product_field: 4,
            sentinel: '\\',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingField,
    EmptyField,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipStats {
    pub missing_field: u64,
    pub empty_field: u64,
    pub sentinel: u64,
}

impl SkipStats {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingField => self.missing_field += 1,
            SkipReason::EmptyField => self.empty_field += 1,
            SkipReason::Sentinel => self.sentinel += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing_field + self.empty_field + self.sentinel
    }
}

/// Everything the serializer and decoder need once aggregation is done.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub registry: IdentityRegistry,
    /// Distinct pairs in first-seen order.
    pub interactions: Vec<Interaction>,
    pub positions: ProductPositionIndex,
    pub accepted: u64,
    pub skipped: SkipStats,
}

impl GraphSnapshot {
    pub fn node_count(&self) -> usize {
        self.registry.node_count()
    }

    pub fn product_count(&self) -> usize {
        self.positions.len()
    }

    pub fn user_count(&self) -> usize {
        self.registry.count_of(NodeKind::User)
    }
}

#[derive(Debug, Default)]
pub struct InteractionAggregator {
    layout: FieldLayout,
    registry: IdentityRegistry,
    positions: ProductPositionIndex,
    interactions: Vec<Interaction>,
    pair_index: HashMap<(String, String), usize>,
    accepted: u64,
    skipped: SkipStats,
}

impl InteractionAggregator {
    pub fn new(layout: FieldLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn accept(&mut self, fields: &[&str]) -> RecordOutcome {
        match self.extract(fields) {
            Ok((user, product)) => {
                self.record_pair(user, product);
                RecordOutcome::Accepted
            }
            Err(reason) => {
                self.skipped.record(reason);
                RecordOutcome::Skipped(reason)
            }
        }
    }

    fn extract<'a>(&self, fields: &[&'a str]) -> Result<(&'a str, &'a str), SkipReason> {
        let user: &'a str = fields
            .get(self.layout.user_field)
            .copied()
            .ok_or(SkipReason::MissingField)?;
        let product: &'a str = fields
            .get(self.layout.product_field)
            .copied()
            .ok_or(SkipReason::MissingField)?;

        if user.contains(self.layout.sentinel) || product.contains(self.layout.sentinel) {
            return Err(SkipReason::Sentinel);
        }

        let (user, product) = (user.trim(), product.trim());
        if user.is_empty() || product.is_empty() {
            return Err(SkipReason::EmptyField);
        }
        Ok((user, product))
    }

    fn record_pair(&mut self, user: &str, product: &str) {
        self.accepted += 1;
        self.registry.assign(user, NodeKind::User);
        self.registry.assign(product, NodeKind::Product);
        self.positions.insert(product);

        let key = (user.to_string(), product.to_string());
        match self.pair_index.get(&key) {
            Some(idx) => self.interactions[*idx].weight += 1,
            None => {
                self.pair_index.insert(key, self.interactions.len());
                self.interactions.push(Interaction::new(user, product));
            }
        }
    }

    pub fn skipped(&self) -> SkipStats {
        self.skipped
    }

    pub fn finalize(self) -> GraphSnapshot {
        GraphSnapshot {
            registry: self.registry,
            interactions: self.interactions,
            positions: self.positions,
            accepted: self.accepted,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, product: &str) -> Vec<String> {
        vec![
            "client".to_string(),
            user.to_string(),
            "brand".to_string(),
            "category".to_string(),
            product.to_string(),
        ]
    }

    fn accept(agg: &mut InteractionAggregator, fields: &[String]) -> RecordOutcome {
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        agg.accept(&refs)
    }

    #[test]
    fn test_repeated_pair_accumulates_weight() {
        let mut agg = InteractionAggregator::new(FieldLayout::default());
        for _ in 0..3 {
            accept(&mut agg, &record("alice", "lamp"));
        }
        accept(&mut agg, &record("alice", "desk"));

        let snapshot = agg.finalize();
        assert_eq!(snapshot.interactions.len(), 2);
        assert_eq!(snapshot.interactions[0].weight, 3);
        assert_eq!(snapshot.interactions[1].weight, 1);
        assert_eq!(snapshot.accepted, 4);
    }

    #[test]
    fn test_sentinel_and_short_records_are_skipped_and_counted() {
        let mut agg = InteractionAggregator::new(FieldLayout::default());
        assert_eq!(
            accept(&mut agg, &record("al\\ice", "lamp")),
            RecordOutcome::Skipped(SkipReason::Sentinel)
        );
        assert_eq!(
            agg.accept(&["client", "bob"]),
            RecordOutcome::Skipped(SkipReason::MissingField)
        );
        assert_eq!(
            accept(&mut agg, &record("  ", "lamp")),
            RecordOutcome::Skipped(SkipReason::EmptyField)
        );

        let skipped = agg.skipped();
        assert_eq!(skipped.total(), 3);
        assert_eq!(skipped.sentinel, 1);

        let snapshot = agg.finalize();
        assert_eq!(snapshot.node_count(), 0);
        assert!(snapshot.interactions.is_empty());
    }

    #[test]
    fn test_fields_are_trimmed_before_registration() {
        let mut agg = InteractionAggregator::new(FieldLayout::default());
        accept(&mut agg, &record(" alice ", " lamp"));
        accept(&mut agg, &record("alice", "lamp "));

        let snapshot = agg.finalize();
        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(snapshot.interactions[0].weight, 2);
        assert_eq!(snapshot.positions.position_of("lamp"), Some(0));
    }

    #[test]
    fn test_product_positions_follow_product_discovery_only() {
        let mut agg = InteractionAggregator::new(FieldLayout::default());
        accept(&mut agg, &record("alice", "lamp"));
        accept(&mut agg, &record("bob", "desk"));
        accept(&mut agg, &record("bob", "lamp"));

        let snapshot = agg.finalize();
        assert_eq!(snapshot.registry.lookup("desk", NodeKind::Product).unwrap(), 3);
        assert_eq!(snapshot.positions.position_of("desk"), Some(1));
        assert_eq!(snapshot.user_count(), 2);
        assert_eq!(snapshot.product_count(), 2);
    }
}
