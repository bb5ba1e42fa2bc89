//! Account endpoints: login, registration, profile and logout.

use reqwest::Method;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{SessionEvent, TokenPair};
use crate::models::{LoginResponse, RegisterResponse, UserProfile};

use super::client::{ApiClient, RequestOptions, LOGIN_PATH};
use super::ApiError;

const REGISTER_PATH: &str = "/users/register/";
const ME_PATH: &str = "/users/me/";
const LOGOUT_PATH: &str = "/users/logout/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Authenticate and store the returned token pair.
    ///
    /// `username` may also be the account's email address. The request is sent
    /// without any stale bearer token, and a 401 is reported as
    /// `AuthFailure::InvalidCredentials` without touching the stored session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        let login: LoginResponse = self
            .request(Method::POST, LOGIN_PATH, Some(body), RequestOptions::anonymous())
            .await?
            .json()?;

        self.credentials()
            .store(&TokenPair::new(&login.access_token, &login.refresh_token))
            .map_err(ApiError::storage)?;

        info!(username = %login.user.username, "Logged in");
        self.emit(SessionEvent::LoggedIn {
            username: login.user.username.clone(),
        });
        Ok(login)
    }

    /// Create an account. Field problems (taken email, missing username)
    /// come back as `ApiError::Validation`.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ApiError> {
        let body = serde_json::to_value(RegisterRequest {
            username,
            email,
            password,
        })?;
        self.request(Method::POST, REGISTER_PATH, Some(body), RequestOptions::anonymous())
            .await?
            .json()
    }

    /// Profile of the user the stored credentials belong to.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get(ME_PATH).await
    }

    /// End the session on the server and locally.
    ///
    /// Both stored tokens are removed whatever the server says; the server's
    /// outcome is still returned so the caller can report it.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let outcome = self
            .request(Method::POST, LOGOUT_PATH, None, RequestOptions::default())
            .await;

        let cleared = self.credentials().clear();
        self.emit(SessionEvent::LoggedOut);

        if let Err(ref e) = outcome {
            warn!(error = %e, "Server logout failed, local session cleared");
        } else {
            info!("Logged out");
        }

        cleared.map_err(ApiError::storage)?;
        outcome.map(|_| ())
    }

    /// Whether both tokens are stored. Says nothing about their validity.
    pub fn is_authenticated(&self) -> bool {
        match self.credentials().tokens() {
            Ok(tokens) => tokens.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                false
            }
        }
    }
}
