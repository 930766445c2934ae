//! Sparse user×item interaction matrix and its index maps.
//!
//! Rows are users and columns are items, both sorted by identifier so a
//! build is reproducible. Cells hold the raw rating; absent cells mean "no
//! signal". The matrix is stored twice, row-major for per-user scans and
//! column-major for per-item scans, and both copies only ever hold the
//! non-zero entries.

use crate::store::RatingStore;
use data_loader::{Isbn, UserId};
use sprs::{CsMat, CsVecView, TriMat};
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct InteractionMatrix {
    by_row: CsMat<f32>,
    by_col: CsMat<f32>,
    /// row index -> user id
    row_users: Vec<UserId>,
    /// column index -> ISBN
    col_items: Vec<Isbn>,
    /// ISBN -> column index
    item_cols: HashMap<Isbn, usize>,
    /// Euclidean norm of every row
    row_norms: Vec<f32>,
}

impl InteractionMatrix {
    /// Build the matrix from every rating in the store
    ///
    /// An empty store gives a 0×0 matrix.
    #[instrument(skip(store), fields(ratings = store.len()))]
    pub fn build(store: &RatingStore) -> Self {
        let mut row_users: Vec<UserId> = store.users().collect();
        row_users.sort_unstable();
        let mut col_items: Vec<Isbn> = store.items().map(str::to_string).collect();
        col_items.sort_unstable();

        let user_rows: HashMap<UserId, usize> = row_users
            .iter()
            .enumerate()
            .map(|(row, &user)| (user, row))
            .collect();
        let item_cols: HashMap<Isbn, usize> = col_items
            .iter()
            .enumerate()
            .map(|(col, isbn)| (isbn.clone(), col))
            .collect();

        let mut triplets = TriMat::with_capacity((row_users.len(), col_items.len()), store.len());
        for rating in store.iter() {
            triplets.add_triplet(
                user_rows[&rating.user_id],
                item_cols[&rating.isbn],
                rating.score as f32,
            );
        }
        let by_row: CsMat<f32> = triplets.to_csr();
        let by_col: CsMat<f32> = triplets.to_csc();

        let row_norms: Vec<f32> = by_row
            .outer_iterator()
            .map(|row| row.iter().map(|(_, &v)| v * v).sum::<f32>().sqrt())
            .collect();

        debug!(
            "Built {}x{} interaction matrix with {} non-zeros",
            row_users.len(),
            col_items.len(),
            by_row.nnz()
        );

        Self {
            by_row,
            by_col,
            row_users,
            col_items,
            item_cols,
            row_norms,
        }
    }

    /// (users, items)
    pub fn shape(&self) -> (usize, usize) {
        (self.row_users.len(), self.col_items.len())
    }

    pub fn user_count(&self) -> usize {
        self.row_users.len()
    }

    pub fn item_count(&self) -> usize {
        self.col_items.len()
    }

    /// Number of stored ratings
    pub fn nnz(&self) -> usize {
        self.by_row.nnz()
    }

    pub fn user_at(&self, row: usize) -> Option<UserId> {
        self.row_users.get(row).copied()
    }

    /// Row of a user; rows are sorted by user id
    #[cfg(test)]
    pub(crate) fn row_of(&self, user_id: UserId) -> Option<usize> {
        self.row_users.binary_search(&user_id).ok()
    }

    pub fn item_at(&self, col: usize) -> Option<&str> {
        self.col_items.get(col).map(String::as_str)
    }

    pub fn column_of(&self, isbn: &str) -> Option<usize> {
        self.item_cols.get(isbn).copied()
    }

    /// Non-zero entries of a user's row as (column, rating)
    pub fn row(&self, row: usize) -> Option<CsVecView<'_, f32>> {
        self.by_row.outer_view(row)
    }

    /// Non-zero entries of an item's column as (row, rating)
    pub fn column(&self, col: usize) -> Option<CsVecView<'_, f32>> {
        self.by_col.outer_view(col)
    }

    /// Norm of a user's rating vector, 0 for an unknown row
    pub fn row_norm(&self, row: usize) -> f32 {
        self.row_norms.get(row).copied().unwrap_or(0.0)
    }

    /// Rating stored at (row, col), 0 when absent
    #[cfg(test)]
    pub(crate) fn get(&self, row: usize, col: usize) -> f32 {
        self.by_row.get(row, col).copied().unwrap_or(0.0)
    }
}
