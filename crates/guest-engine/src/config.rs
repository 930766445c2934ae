//! Engine configuration.
//!
//! The neighbor pool size, the similarity cut-off and the score blend are
//! heuristics, so they are plain fields with sensible defaults. The config
//! deserializes from JSON with every field optional.

use crate::error::{EngineError, Result};
use data_loader::MAX_RATING;
use serde::{Deserialize, Serialize};

/// Number of recommendations returned when the caller doesn't say
pub const DEFAULT_RECOMMENDATIONS: usize = 10;

/// Which similarity backing the engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// Walk only the matrix columns the guest rated
    #[default]
    Sparse,
    /// Score every user row in parallel
    RowScan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many similar users feed the aggregation (k)
    pub neighbor_pool: usize,
    /// Users at or below this similarity are never neighbors
    pub min_similarity: f32,
    /// Ceiling of the rating scale, used to normalize mean ratings
    pub max_rating: f32,
    /// Weight of the normalized endorsement count in the final score
    pub count_weight: f32,
    /// Weight of the normalized mean rating in the final score
    pub mean_weight: f32,
    pub kernel: KernelKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            neighbor_pool: 20,
            min_similarity: 0.0,
            max_rating: MAX_RATING as f32,
            count_weight: 0.6,
            mean_weight: 0.4,
            kernel: KernelKind::Sparse,
        }
    }
}

impl EngineConfig {
    /// Configure the neighbor pool size (default: 20)
    pub fn with_neighbor_pool(mut self, k: usize) -> Self {
        self.neighbor_pool = k;
        self
    }

    /// Configure the similarity cut-off (default: 0.0, exclusive)
    pub fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = threshold;
        self
    }

    /// Configure the rating scale ceiling (default: 10)
    pub fn with_max_rating(mut self, max_rating: f32) -> Self {
        self.max_rating = max_rating;
        self
    }

    /// Configure the count/mean score blend (default: 0.6 / 0.4)
    pub fn with_weights(mut self, count_weight: f32, mean_weight: f32) -> Self {
        self.count_weight = count_weight;
        self.mean_weight = mean_weight;
        self
    }

    /// Configure the similarity backing (default: sparse)
    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.kernel = kernel;
        self
    }

    /// Check that every field is usable
    pub fn validate(&self) -> Result<()> {
        if self.neighbor_pool == 0 {
            return Err(invalid("neighbor_pool", self.neighbor_pool, "must be at least 1"));
        }
        if !(-1.0..1.0).contains(&self.min_similarity) {
            return Err(invalid("min_similarity", self.min_similarity, "must be in [-1, 1)"));
        }
        if !self.max_rating.is_finite() || self.max_rating <= 0.0 {
            return Err(invalid("max_rating", self.max_rating, "must be positive"));
        }
        for (field, weight) in [("count_weight", self.count_weight), ("mean_weight", self.mean_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(field, weight, "must be non-negative"));
            }
        }
        if self.count_weight + self.mean_weight == 0.0 {
            return Err(invalid("count_weight", self.count_weight, "weights cannot both be zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, value: impl ToString, reason: &'static str) -> EngineError {
    EngineError::InvalidConfig {
        field,
        value: value.to_string(),
        reason,
    }
}
