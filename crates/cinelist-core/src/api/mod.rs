//! REST API client module for the movie catalogue backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend to browse movies and manage personal lists.
//!
//! The API uses JWT bearer token authentication. An expired access token is
//! refreshed once and the rejected request replayed; if that fails the
//! session is cleared and a `SessionEvent::Expired` is published.

pub mod account;
pub mod client;
pub mod error;
pub mod lists;
pub mod movies;

pub use client::{ApiClient, ApiClientBuilder, ApiResponse, RefreshPolicy, RequestOptions};
pub use error::{ApiError, FieldErrors};
