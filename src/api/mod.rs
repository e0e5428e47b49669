//! HTTP surface of the token-issuing backend.
//!
//! `transport` defines the request/response values and the backend seam,
//! `client` layers bearer attachment, single-retry refresh and CSRF handling
//! on top, and `error` is the taxonomy surfaced to callers.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, RefreshError};
