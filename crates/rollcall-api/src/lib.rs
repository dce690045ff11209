//! rollcall-api: HTTP client for the face-recognition attendance server.

mod attendance;
pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
