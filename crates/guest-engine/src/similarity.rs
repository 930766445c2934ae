//! Similarity Search - ranks known users against an ad-hoc guest vector.
//!
//! ## Algorithm
//! 1. Project the guest's ratings onto the matrix columns (unknown ISBNs drop out)
//! 2. Compute cosine similarity against every user row
//! 3. Keep users above the similarity cut-off, best first, at most k
//!
//! The similarity pass itself sits behind [`SimilarityKernel`] so the
//! backing strategy can change without touching aggregation.

use crate::config::KernelKind;
use crate::matrix::InteractionMatrix;
use crate::types::{GuestRatings, Neighbor};
use rayon::prelude::*;
use sprs::CsVec;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// A guest's ratings embedded in the matrix's item space
#[derive(Debug, Clone)]
pub struct GuestVector {
    vector: CsVec<f32>,
    norm: f32,
}

impl GuestVector {
    /// Project guest ratings onto the matrix columns.
    ///
    /// ISBNs the matrix has never seen and zero scores carry no signal and
    /// are dropped.
    pub fn project(guest_ratings: &GuestRatings, matrix: &InteractionMatrix) -> Self {
        let mut entries: Vec<(usize, f32)> = guest_ratings
            .iter()
            .filter(|&(_, &score)| score > 0)
            .filter_map(|(isbn, &score)| Some((matrix.column_of(isbn)?, score as f32)))
            .collect();
        entries.sort_unstable_by_key(|&(col, _)| col);

        let norm = entries.iter().map(|&(_, v)| v * v).sum::<f32>().sqrt();
        let (indices, data): (Vec<usize>, Vec<f32>) = entries.into_iter().unzip();

        Self {
            vector: CsVec::new(matrix.item_count(), indices, data),
            norm,
        }
    }

    /// True when none of the guest's items are known
    pub fn is_empty(&self) -> bool {
        self.vector.nnz() == 0
    }

    pub fn nnz(&self) -> usize {
        self.vector.nnz()
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Non-zero entries as (column, rating), ascending by column
    pub fn entries(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.vector.iter().map(|(col, &v)| (col, v))
    }
}

/// Cosine from a dot product and two norms, 0 when either vector is all-zero
#[inline]
pub fn cosine(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Computes the similarity of a guest vector to every matrix row.
///
/// The returned Vec has one score per row, indexed by row.
pub trait SimilarityKernel: Send + Sync {
    /// Returns the name of this kernel (for logging)
    fn name(&self) -> &str;

    fn similarities(&self, guest: &GuestVector, matrix: &InteractionMatrix) -> Vec<f32>;
}

/// Column-driven sparse kernel.
///
/// Accumulates dot products by walking only the columns the guest rated,
/// then divides by the precomputed row norms. Users who share no item with
/// the guest are never touched beyond the final division.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseCosine;

impl SimilarityKernel for SparseCosine {
    fn name(&self) -> &str {
        "SparseCosine"
    }

    fn similarities(&self, guest: &GuestVector, matrix: &InteractionMatrix) -> Vec<f32> {
        let mut dots = vec![0.0f32; matrix.user_count()];
        for (col, g) in guest.entries() {
            if let Some(column) = matrix.column(col) {
                for (row, &r) in column.iter() {
                    dots[row] += g * r;
                }
            }
        }

        dots.iter()
            .enumerate()
            .map(|(row, &dot)| cosine(dot, guest.norm(), matrix.row_norm(row)))
            .collect()
    }
}

/// Row-scan kernel.
///
/// Scores every user row independently with a sorted-merge dot product,
/// spread over the rayon pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowScanCosine;

impl SimilarityKernel for RowScanCosine {
    fn name(&self) -> &str {
        "RowScanCosine"
    }

    fn similarities(&self, guest: &GuestVector, matrix: &InteractionMatrix) -> Vec<f32> {
        let guest_entries: Vec<(usize, f32)> = guest.entries().collect();

        (0..matrix.user_count())
            .into_par_iter()
            .map(|row| {
                let dot = matrix
                    .row(row)
                    .map(|view| merge_dot(view.iter().map(|(c, &v)| (c, v)), &guest_entries))
                    .unwrap_or(0.0);
                cosine(dot, guest.norm(), matrix.row_norm(row))
            })
            .collect()
    }
}

/// Dot product of two index-sorted sparse vectors
fn merge_dot(row: impl Iterator<Item = (usize, f32)>, guest: &[(usize, f32)]) -> f32 {
    let mut dot = 0.0;
    let mut guest = guest.iter().peekable();
    for (col, v) in row {
        while guest.next_if(|&&(g_col, _)| g_col < col).is_some() {}
        match guest.peek() {
            Some(&&(g_col, g)) if g_col == col => dot += v * g,
            Some(_) => {}
            None => break,
        }
    }
    dot
}

/// Build the kernel selected by the configuration
pub fn kernel_for(kind: KernelKind) -> Box<dyn SimilarityKernel> {
    match kind {
        KernelKind::Sparse => Box::new(SparseCosine),
        KernelKind::RowScan => Box::new(RowScanCosine),
    }
}

/// Nearest-neighbor search over the interaction matrix
pub struct SimilaritySearch {
    kernel: Box<dyn SimilarityKernel>,
    /// Users at or below this similarity are excluded
    min_similarity: f32,
}

impl SimilaritySearch {
    pub fn new(kernel: Box<dyn SimilarityKernel>, min_similarity: f32) -> Self {
        Self {
            kernel,
            min_similarity,
        }
    }

    pub fn kernel_name(&self) -> &str {
        self.kernel.name()
    }

    /// The k users most similar to the guest, best first.
    ///
    /// Ties are broken by ascending row index. An empty result means there
    /// is no similarity signal, which callers handle with a fallback.
    #[instrument(skip(self, guest_ratings, matrix), fields(kernel = self.kernel.name(), guest_items = guest_ratings.len()))]
    pub fn find_neighbors(
        &self,
        guest_ratings: &GuestRatings,
        matrix: &InteractionMatrix,
        k: usize,
    ) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let guest = GuestVector::project(guest_ratings, matrix);
        if guest.is_empty() {
            debug!("No known items in guest ratings");
            return Vec::new();
        }

        let scores = self.kernel.similarities(&guest, matrix);
        let mut scored: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(_, similarity)| similarity > self.min_similarity)
            .collect();

        let by_similarity = |a: &(usize, f32), b: &(usize, f32)| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        };
        if scored.len() > k {
            scored.select_nth_unstable_by(k - 1, by_similarity);
            scored.truncate(k);
        }
        scored.sort_by(by_similarity);

        let neighbors: Vec<Neighbor> = scored
            .into_iter()
            .filter_map(|(row, similarity)| {
                Some(Neighbor {
                    user_id: matrix.user_at(row)?,
                    row,
                    similarity,
                })
            })
            .collect();

        debug!(
            "Found {} neighbors from {} known guest items",
            neighbors.len(),
            guest.nnz()
        );
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RatingStore;
    use data_loader::{Rating, UserId};

    fn rating(user_id: UserId, isbn: &str, score: u8) -> Rating {
        Rating {
            user_id,
            isbn: isbn.to_string(),
            score,
        }
    }

    /// u1 {A:9, B:8}, u2 {A:8, C:7}, u3 {B:2, C:2}
    fn create_test_matrix() -> InteractionMatrix {
        let store = RatingStore::new(vec![
            rating(1, "A", 9),
            rating(1, "B", 8),
            rating(2, "A", 8),
            rating(2, "C", 7),
            rating(3, "B", 2),
            rating(3, "C", 2),
        ]);
        InteractionMatrix::build(&store)
    }

    fn guest(pairs: &[(&str, u8)]) -> GuestRatings {
        pairs.iter().map(|&(isbn, score)| (isbn.to_string(), score)).collect()
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine(5.0, 0.0, 3.0), 0.0);
        assert_eq!(cosine(5.0, 3.0, 0.0), 0.0);
        assert!((cosine(6.0, 2.0, 3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_drops_unknown_items() {
        let matrix = create_test_matrix();
        let vector = GuestVector::project(&guest(&[("A", 10), ("unknown", 7), ("B", 0)]), &matrix);

        assert_eq!(vector.nnz(), 1);
        assert_eq!(vector.norm(), 10.0);
        let entries: Vec<(usize, f32)> = vector.entries().collect();
        assert_eq!(entries, vec![(matrix.column_of("A").unwrap(), 10.0)]);
    }

    #[test]
    fn test_kernels_agree() {
        let matrix = create_test_matrix();
        let vector = GuestVector::project(&guest(&[("A", 10), ("C", 3)]), &matrix);

        let sparse = SparseCosine.similarities(&vector, &matrix);
        let row_scan = RowScanCosine.similarities(&vector, &matrix);
        assert_eq!(sparse.len(), 3);
        for (a, b) in sparse.iter().zip(&row_scan) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scenario_ordering() {
        let matrix = create_test_matrix();
        let search = SimilaritySearch::new(Box::new(SparseCosine), 0.0);

        let neighbors = search.find_neighbors(&guest(&[("A", 10)]), &matrix, 10);
        let users: Vec<UserId> = neighbors.iter().map(|n| n.user_id).collect();

        // u1 = 9/sqrt(145) ~ 0.7474, u2 = 8/sqrt(113) ~ 0.7526, u3 shares nothing
        assert_eq!(users, vec![2, 1]);
        assert!((neighbors[0].similarity - 8.0 / 113f32.sqrt()).abs() < 1e-5);
        assert!((neighbors[1].similarity - 9.0 / 145f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_top_k_truncation() {
        let matrix = create_test_matrix();
        let search = SimilaritySearch::new(Box::new(RowScanCosine), 0.0);

        let neighbors = search.find_neighbors(&guest(&[("A", 10)]), &matrix, 1);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].user_id, 2);
        assert!(search.find_neighbors(&guest(&[("A", 10)]), &matrix, 0).is_empty());
    }

    #[test]
    fn test_ties_broken_by_row() {
        let store = RatingStore::new(vec![rating(7, "A", 5), rating(3, "A", 5), rating(5, "A", 5)]);
        let matrix = InteractionMatrix::build(&store);
        let search = SimilaritySearch::new(Box::new(SparseCosine), 0.0);

        let users: Vec<UserId> = search
            .find_neighbors(&guest(&[("A", 1)]), &matrix, 2)
            .iter()
            .map(|n| n.user_id)
            .collect();
        assert_eq!(users, vec![3, 5]);
    }

    #[test]
    fn test_unknown_items_give_no_neighbors() {
        let matrix = create_test_matrix();
        let search = SimilaritySearch::new(Box::new(SparseCosine), 0.0);

        assert!(search.find_neighbors(&guest(&[("X", 10), ("Y", 4)]), &matrix, 10).is_empty());
        assert!(search.find_neighbors(&GuestRatings::new(), &matrix, 10).is_empty());
    }

    #[test]
    fn test_threshold_filters_neighbors() {
        let matrix = create_test_matrix();
        let search = SimilaritySearch::new(Box::new(SparseCosine), 0.75);

        let neighbors = search.find_neighbors(&guest(&[("A", 10)]), &matrix, 10);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].user_id, 2);
    }

    #[test]
    fn test_zero_similarity_excluded() {
        // u3 shares no item with a guest who rated only A
        let matrix = create_test_matrix();
        let search = SimilaritySearch::new(Box::new(SparseCosine), 0.0);

        let neighbors = search.find_neighbors(&guest(&[("A", 10)]), &matrix, 10);
        assert!(neighbors.iter().all(|n| n.similarity > 0.0));
        assert!(neighbors.iter().all(|n| n.user_id != 3));
    }

    #[test]
    fn test_merge_dot() {
        let row = vec![(0, 1.0), (2, 2.0), (5, 3.0)];
        let guest = vec![(1, 4.0), (2, 5.0), (5, 6.0), (7, 1.0)];
        assert_eq!(merge_dot(row.into_iter(), &guest), 10.0 + 18.0);
    }
}
