use serde::{Deserialize, Serialize};

/// Public account details embedded in movies, lists and login responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Profile of the authenticated user (`/users/me/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"message": "Login successful", "access_token": "acc", "refresh_token": "ref", "user": {"id": 7, "username": "ana", "email": "ana@example.com"}}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login JSON");
        assert_eq!(resp.access_token, "acc");
        assert_eq!(resp.refresh_token, "ref");
        assert_eq!(resp.user.username, "ana");
        assert_eq!(resp.user.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_profile_with_username_only() {
        let profile: UserProfile = serde_json::from_str(r#"{"username": "ana"}"#).unwrap();
        assert_eq!(profile.username, "ana");
        assert!(profile.id.is_none());
        assert!(!profile.is_staff);
    }
}
