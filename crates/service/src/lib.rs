//! Service crate for the BookBud recommendation engine.
//!
//! This crate wraps the guest engine and the catalog queries behind the
//! request contract callers rely on: validated guest requests in, response
//! records out.

pub mod config;
pub mod error;
pub mod request;
pub mod service;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use request::{BookResponse, GuestRequest};
pub use service::{RecommendationService, ServiceStatus};
