use crate::DecodeError;
use graph::ProductPositionIndex;
use lprec_core::model::{Recommendation, ScoredProduct};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered so that the *weakest* kept candidate sits at the top:
/// lower score is greater, and on equal scores the higher position is greater.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f64,
    position: usize,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// The `k` largest scores as `(position, score)`, descending, ties broken by
/// ascending position. Bounded heap of size `k`: `O(D log k)`.
pub fn select_top_k(scores: &[f64], k: usize) -> Vec<(usize, f64)> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Ranked> = BinaryHeap::with_capacity(k.min(scores.len()) + 1);
    for (position, &score) in scores.iter().enumerate() {
        // -0.0 and 0.0 are the same score; total_cmp would order them.
        let score = if score == 0.0 { 0.0 } else { score };
        let candidate = Ranked { score, position };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|weakest| candidate < *weakest) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|r| (r.position, r.score))
        .collect()
}

pub fn recommend(
    user: &str,
    scores: &[f64],
    k: usize,
    positions: &ProductPositionIndex,
) -> Result<Recommendation, DecodeError> {
    let products = select_top_k(scores, k)
        .into_iter()
        .map(|(position, score)| {
            let label = positions
                .label_at(position)
                .ok_or(DecodeError::UnknownPosition(position))?;
            Ok(ScoredProduct {
                label: label.to_string(),
                position,
                score,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(Recommendation {
        user: user.to_string(),
        products,
    })
}
