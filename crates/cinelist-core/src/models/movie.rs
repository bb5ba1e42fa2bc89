use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Default page size used by the movie list endpoint (4 rows x 6 columns)
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// Largest page size the server accepts
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<User>,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_viewed: bool,
}

impl Movie {
    /// "Title (Year)" when the year is known.
    pub fn display_title(&self) -> String {
        match self.release_year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// Payload for adding a movie to the catalogue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

/// Search and pagination parameters for the movie list.
#[derive(Debug, Clone, Default)]
pub struct MovieQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

impl MovieQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Query-string pairs; the page size is clamped to what the server accepts
    /// and a blank search term is left out.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.max(1).to_string()));
        }
        if let Some(size) = self.page_size {
            query.push(("page_size".to_string(), size.clamp(1, MAX_PAGE_SIZE).to_string()));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query.push(("search".to_string(), term.to_string()));
        }
        query
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .map(|size| size.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeStatus {
    Liked,
    Unliked,
}

/// Result of toggling a like; the server also files the movie into the
/// user's favourites list.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    pub status: LikeStatus,
    pub movie: Movie,
}

/// Result of marking a movie as watched.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewResponse {
    pub status: String,
    pub movie: Movie,
}
