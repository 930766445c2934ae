//! Request and response shapes of the service boundary.

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use data_loader::{Book, Isbn, MAX_RATING, RankedBook};
use guest_engine::{DEFAULT_RECOMMENDATIONS, GuestRatings, Recommendation};
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    DEFAULT_RECOMMENDATIONS
}

/// A guest's ratings plus how many recommendations they want
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRequest {
    pub ratings: GuestRatings,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl GuestRequest {
    pub fn new(ratings: GuestRatings, limit: usize) -> Self {
        Self { ratings, limit }
    }

    /// Check the request against the service contract
    pub fn validate(&self, config: &ServiceConfig) -> Result<()> {
        if self.ratings.len() < config.min_guest_ratings {
            return Err(ServiceError::InvalidRequest(format!(
                "Please rate at least {} books (got {})",
                config.min_guest_ratings,
                self.ratings.len()
            )));
        }

        let mut out_of_range: Vec<(&Isbn, &u8)> = self
            .ratings
            .iter()
            .filter(|&(_, &score)| !(1..=MAX_RATING).contains(&score))
            .collect();
        out_of_range.sort();
        if let Some((isbn, score)) = out_of_range.first() {
            return Err(ServiceError::InvalidRequest(format!(
                "Rating for {} must be between 1 and {}, got {}",
                isbn, MAX_RATING, score
            )));
        }

        if self.limit == 0 || self.limit > config.max_limit {
            return Err(ServiceError::InvalidRequest(format!(
                "Limit must be between 1 and {}, got {}",
                config.max_limit, self.limit
            )));
        }
        Ok(())
    }
}

/// One book as the outside world sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookResponse {
    #[serde(rename = "ISBN")]
    pub isbn: Isbn,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Year")]
    pub year: Option<u16>,
    #[serde(rename = "Publisher")]
    pub publisher: String,
    #[serde(rename = "ImageURL")]
    pub image_url: String,
    #[serde(rename = "Rating")]
    pub rating: Option<f32>,
}

impl BookResponse {
    pub fn from_book(book: &Book, rating: Option<f32>) -> Self {
        Self {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.known_year(),
            publisher: book.publisher.clone(),
            image_url: book.image_url_large.clone(),
            rating,
        }
    }
}

impl From<&Recommendation> for BookResponse {
    fn from(rec: &Recommendation) -> Self {
        Self::from_book(&rec.book, Some(rec.display_rating()))
    }
}

impl From<RankedBook<'_>> for BookResponse {
    fn from(ranked: RankedBook<'_>) -> Self {
        Self::from_book(ranked.book, Some(ranked.stats.avg_rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pairs: &[(&str, u8)], limit: usize) -> GuestRequest {
        let ratings = pairs
            .iter()
            .map(|&(isbn, score)| (isbn.to_string(), score))
            .collect();
        GuestRequest::new(ratings, limit)
    }

    #[test]
    fn test_valid_request() {
        let config = ServiceConfig::default();
        assert!(request(&[("a", 1), ("b", 5), ("c", 10)], 10).validate(&config).is_ok());
    }

    #[test]
    fn test_too_few_ratings() {
        let config = ServiceConfig::default();
        let err = request(&[("a", 8), ("b", 9)], 10).validate(&config).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn test_score_out_of_range() {
        let config = ServiceConfig::default();
        let zero = request(&[("a", 0), ("b", 5), ("c", 10)], 10);
        let eleven = request(&[("a", 4), ("b", 11), ("c", 10)], 10);

        assert!(matches!(zero.validate(&config), Err(ServiceError::InvalidRequest(_))));
        assert!(matches!(eleven.validate(&config), Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_limit_bounds() {
        let config = ServiceConfig::default();
        let ratings = [("a", 4), ("b", 6), ("c", 8)];

        assert!(request(&ratings, 0).validate(&config).is_err());
        assert!(request(&ratings, 50).validate(&config).is_ok());
        assert!(request(&ratings, 51).validate(&config).is_err());
    }

    #[test]
    fn test_request_json_default_limit() {
        let req: GuestRequest =
            serde_json::from_str(r#"{ "ratings": { "0439136350": 9 } }"#).unwrap();
        assert_eq!(req.limit, DEFAULT_RECOMMENDATIONS);
        assert_eq!(req.ratings.get("0439136350"), Some(&9));
    }

    #[test]
    fn test_book_response_field_names() {
        let book = Book {
            isbn: "0439136350".to_string(),
            title: "Harry Potter and the Prisoner of Azkaban".to_string(),
            author: "J. K. Rowling".to_string(),
            year: 0,
            publisher: "Scholastic".to_string(),
            image_url_small: "s.jpg".to_string(),
            image_url_medium: "m.jpg".to_string(),
            image_url_large: "l.jpg".to_string(),
        };

        let json = serde_json::to_value(BookResponse::from_book(&book, Some(8.5))).unwrap();
        assert_eq!(json["ISBN"], "0439136350");
        assert_eq!(json["Author"], "J. K. Rowling");
        assert_eq!(json["Year"], serde_json::Value::Null);
        assert_eq!(json["ImageURL"], "l.jpg");
        assert_eq!(json["Rating"], 8.5);
    }
}
