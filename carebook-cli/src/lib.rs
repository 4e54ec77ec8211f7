//! CareBook - client for the vehicle-care booking API
//!
//! Typed models of the backend's records, an async API client with a
//! background worker, a snapshot store, and the appointment progress timeline.

pub mod api;
pub mod app;
pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod timeline;
pub mod worker;

pub use api::ApiClient;
pub use error::ApiError;
pub use timeline::{project, Checkpoint, Timeline};
