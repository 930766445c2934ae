//! Neighbor Aggregator - turns similar users into ranked candidate books.
//!
//! ## Algorithm
//! 1. Gather every rating made by the neighbors
//! 2. Drop books the guest already rated
//! 3. Count endorsements and average the ratings per book
//! 4. Score = count_weight * count / max(count) + mean_weight * mean / max_rating
//!
//! Both normalizations are relative to the current candidate pool, so the
//! same book can score differently for different guests.

use crate::config::EngineConfig;
use crate::store::RatingStore;
use crate::types::{CandidateStats, GuestRatings, Neighbor, ScoredCandidate};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// (endorsement count, rating total) per book
type Tally<'a> = HashMap<&'a str, (u32, u32)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborAggregator {
    max_rating: f32,
    count_weight: f32,
    mean_weight: f32,
}

impl NeighborAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_rating: config.max_rating,
            count_weight: config.count_weight,
            mean_weight: config.mean_weight,
        }
    }

    /// Score every book the neighbors rated that the guest hasn't, best first
    pub fn aggregate(
        &self,
        store: &RatingStore,
        neighbors: &[Neighbor],
        exclude: &GuestRatings,
    ) -> Vec<ScoredCandidate> {
        let tally: Tally<'_> = neighbors
            .par_iter()
            .fold(
                || HashMap::new(),
                |mut local, neighbor| {
                    for rating in store.user_ratings(neighbor.user_id) {
                        if exclude.contains_key(&rating.isbn) {
                            continue;
                        }
                        let entry = local.entry(rating.isbn.as_str()).or_insert((0, 0));
                        entry.0 += 1;
                        entry.1 += rating.score as u32;
                    }
                    local
                },
            )
            .reduce(
                || HashMap::new(),
                |mut acc, local| {
                    for (isbn, (count, total)) in local {
                        let entry = acc.entry(isbn).or_insert((0, 0));
                        entry.0 += count;
                        entry.1 += total;
                    }
                    acc
                },
            );

        // Every surviving candidate has count >= 1, so an empty tally is the
        // only way to get max_count == 0
        let Some(max_count) = tally.values().map(|&(count, _)| count).max() else {
            debug!("Candidate pool empty after excluding guest-rated books");
            return Vec::new();
        };

        let mut candidates: Vec<ScoredCandidate> = tally
            .into_iter()
            .map(|(isbn, (count, total))| {
                let mean_rating = total as f32 / count as f32;
                ScoredCandidate {
                    isbn: isbn.to_string(),
                    score: self.score(count, max_count, mean_rating),
                    stats: CandidateStats { count, mean_rating },
                }
            })
            .collect();

        sort_candidates(&mut candidates);
        debug!(
            "Aggregated {} candidates from {} neighbors",
            candidates.len(),
            neighbors.len()
        );
        candidates
    }

    /// Blend of neighbor consensus and average rating
    pub fn score(&self, count: u32, max_count: u32, mean_rating: f32) -> f32 {
        let count_norm = count as f32 / max_count as f32;
        let mean_norm = mean_rating / self.max_rating;
        self.count_weight * count_norm + self.mean_weight * mean_norm
    }

    /// Globally most-rated books the guest hasn't rated, most rated first.
    ///
    /// Scored by rating count relative to the most-rated book overall.
    pub fn popular_fallback<'a>(
        &self,
        store: &'a RatingStore,
        exclude: &'a GuestRatings,
    ) -> impl Iterator<Item = ScoredCandidate> + use<'a> {
        let max_count = store.most_rated().first().map(|p| p.count).unwrap_or(1).max(1);
        store
            .most_rated()
            .iter()
            .filter(move |p| !exclude.contains_key(&p.isbn))
            .map(move |p| ScoredCandidate {
                isbn: p.isbn.clone(),
                score: p.count as f32 / max_count as f32,
                stats: CandidateStats {
                    count: p.count,
                    mean_rating: p.mean_rating,
                },
            })
    }
}

/// Score descending, then more endorsements, then ISBN
fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.stats.count.cmp(&a.stats.count))
            .then_with(|| a.isbn.cmp(&b.isbn))
    });
}
