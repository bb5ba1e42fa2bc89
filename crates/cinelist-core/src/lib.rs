//! Core library for cinelist.
//!
//! Provides the authenticated REST client for the movie catalogue backend,
//! the credential stores that hold the access/refresh token pair, and the
//! data models exchanged with the API.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiResponse, RefreshPolicy, RequestOptions};
pub use auth::{
    AuthFailure, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, SessionEvent, TokenPair,
};
pub use config::{Config, TokenStoreKind};
