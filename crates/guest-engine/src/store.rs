//! Rating Store - the immutable rating table the engine is built from.
//!
//! Ratings are indexed by user and by item. Duplicate (user, item) pairs are
//! resolved first-write-wins at ingestion: the first rating seen is kept and
//! later ones are dropped.

use data_loader::{DataIndex, Isbn, Rating, UserId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Global rating statistics for one item, used by the popularity fallback
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPopularity {
    pub isbn: Isbn,
    pub count: u32,
    pub mean_rating: f32,
}

/// Indexes over a shared rating table.
///
/// The table itself stays in the `DataIndex`; the store only keeps positions
/// into it, so building one never copies the ratings.
#[derive(Debug, Default)]
pub struct RatingStore {
    table: Arc<DataIndex>,
    /// Positions that survived deduplication, in ingestion order
    kept: Vec<usize>,
    by_user: HashMap<UserId, Vec<usize>>,
    by_item: HashMap<Isbn, Vec<usize>>,
    /// Items by raw rating count, descending, ties by ISBN
    most_rated: Vec<ItemPopularity>,
}

impl RatingStore {
    /// Build a store that owns a rating table
    pub fn new(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let table = DataIndex::from_parts(Vec::new(), Vec::new(), ratings.into_iter().collect());
        Self::from_index(Arc::new(table))
    }

    /// Build a store over the cleaned ratings of a shared `DataIndex`
    pub fn from_index(table: Arc<DataIndex>) -> Self {
        let mut kept = Vec::new();
        let mut by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut by_item: HashMap<Isbn, Vec<usize>> = HashMap::new();
        let mut duplicates = 0usize;

        {
            let mut seen: HashSet<(UserId, &str)> = HashSet::new();
            for (position, rating) in table.ratings().iter().enumerate() {
                if !seen.insert((rating.user_id, rating.isbn.as_str())) {
                    duplicates += 1;
                    continue;
                }
                kept.push(position);
                by_user.entry(rating.user_id).or_default().push(position);
                match by_item.get_mut(&rating.isbn) {
                    Some(positions) => positions.push(position),
                    None => {
                        by_item.insert(rating.isbn.clone(), vec![position]);
                    }
                }
            }
        }

        if duplicates > 0 {
            debug!("Dropped {} duplicate (user, item) ratings", duplicates);
        }

        let mut store = Self {
            table,
            kept,
            by_user,
            by_item,
            most_rated: Vec::new(),
        };
        store.most_rated = store.rank_by_count();
        store
    }

    /// The `DataIndex` this store reads its ratings from
    pub fn table(&self) -> &Arc<DataIndex> {
        &self.table
    }

    fn rating_at(&self, position: usize) -> &Rating {
        &self.table.ratings()[position]
    }

    fn rank_by_count(&self) -> Vec<ItemPopularity> {
        let mut ranked: Vec<ItemPopularity> = self
            .by_item
            .iter()
            .map(|(isbn, positions)| {
                let total: u32 = positions.iter().map(|&p| self.rating_at(p).score as u32).sum();
                ItemPopularity {
                    isbn: isbn.clone(),
                    count: positions.len() as u32,
                    mean_rating: total as f32 / positions.len() as f32,
                }
            })
            .collect();

        ranked.sort_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => a.isbn.cmp(&b.isbn),
            other => other,
        });
        ranked
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Every stored rating, in ingestion order
    pub fn iter(&self) -> impl Iterator<Item = &Rating> {
        self.kept.iter().map(|&p| self.rating_at(p))
    }

    /// Distinct users with at least one rating
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.by_user.keys().copied()
    }

    /// Distinct items with at least one rating
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.by_item.keys().map(String::as_str)
    }

    /// All ratings made by a user
    pub fn user_ratings(&self, user_id: UserId) -> impl Iterator<Item = &Rating> {
        self.by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .map(|&p| self.rating_at(p))
    }

    /// All ratings received by an item
    #[cfg(test)]
    pub(crate) fn item_ratings(&self, isbn: &str) -> impl Iterator<Item = &Rating> {
        self.by_item
            .get(isbn)
            .into_iter()
            .flatten()
            .map(|&p| self.rating_at(p))
    }

    /// Items ranked by raw rating count, most rated first
    pub fn most_rated(&self) -> &[ItemPopularity] {
        &self.most_rated
    }
}
