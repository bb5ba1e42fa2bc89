//! Authentication module for managing the credential pair and session state.
//!
//! This module provides:
//! - `CredentialStore`: the trait the API client reads and writes tokens through
//! - `MemoryCredentialStore`, `FileCredentialStore`, `KeyringCredentialStore`:
//!   its backends (process memory, a JSON file, the OS keychain)
//! - `SessionEvent` / `AuthFailure`: what the client reports when a session
//!   starts, refreshes, ends or expires
//!
//! Every backend replaces the access/refresh pair as a unit, so a request
//! never observes a half-written pair.

pub mod credentials;
pub mod file_store;
pub mod session;

pub use credentials::{
    CredentialStore, KeyringCredentialStore, MemoryCredentialStore, TokenPair, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
pub use file_store::FileCredentialStore;
pub use session::{AuthFailure, SessionEvent};
