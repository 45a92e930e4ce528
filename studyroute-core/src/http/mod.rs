//! HTTP layer shared by the provider transport clients
//!
//! Handles connection pooling, per-call timeouts, status classification and
//! error detail extraction. Provider wire shapes live in `providers`.

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::{extract_error_detail, map_http_error};
