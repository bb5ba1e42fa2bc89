use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Movie, User};

/// A user's movie list as returned by the list index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieList {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<User>,
    #[serde(default)]
    pub is_public: bool,
    /// Lists the server maintains itself (favourites, watched)
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub movies_count: u32,
}

/// A list with its entries (`/lists/{id}/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDetail {
    #[serde(flatten)]
    pub list: MovieList,
    #[serde(default)]
    pub movies: Vec<ListEntry>,
}

/// A movie inside a list, with the note attached when it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: i64,
    pub movie: Movie,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: String,
}

/// Body for creating or renaming a list.
#[derive(Debug, Clone, Serialize)]
pub struct ListInput {
    pub name: String,
    pub description: String,
}
