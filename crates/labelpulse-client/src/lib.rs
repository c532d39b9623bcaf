//! LabelPulse Client
//!
//! HTTP implementation of [`NotificationRepository`] against the annotation
//! platform's REST API:
//! - `GET   /notifications/unread-count`
//! - `GET   /notifications?limit=N`
//! - `PATCH /notifications/{id}/read`
//! - `PATCH /notifications/mark-all-read`
//!
//! [`NotificationRepository`]: labelpulse_core::NotificationRepository

mod api_client;
mod config;
mod error;

pub use api_client::NotificationApiClient;
pub use config::{ApiConfig, DEFAULT_API_URL};
pub use error::ApiError;
