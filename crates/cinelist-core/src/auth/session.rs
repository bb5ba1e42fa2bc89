use thiserror::Error;

/// Why an authenticated call could not be completed.
///
/// `Clone` because a single refresh outcome is handed to every request
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Token refresh rejected with status {status}")]
    RefreshRejected { status: u16 },

    #[error("Token refresh failed: {0}")]
    RefreshUnavailable(String),

    #[error("Request rejected again after refreshing the access token")]
    ReplayRejected,
}

impl AuthFailure {
    /// Whether this failure ended the stored session.
    pub fn ends_session(&self) -> bool {
        !matches!(self, AuthFailure::InvalidCredentials(_))
    }
}

/// Session lifecycle notifications published by the API client.
///
/// `Expired` replaces a forced redirect: the presentation layer subscribes
/// and sends the user back to login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    TokenRefreshed,
    LoggedOut,
    Expired { reason: AuthFailure },
}

impl SessionEvent {
    pub fn is_expired(&self) -> bool {
        matches!(self, SessionEvent::Expired { .. })
    }
}
