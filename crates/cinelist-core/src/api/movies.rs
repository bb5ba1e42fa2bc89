//! Movie catalogue endpoints.

use tracing::debug;

use crate::models::{LikeResponse, Movie, MovieQuery, NewMovie, Page, ViewResponse};

use super::client::ApiClient;
use super::ApiError;

const MOVIES_PATH: &str = "/movies/";

fn movie_path(movie_id: i64) -> String {
    format!("{}{}/", MOVIES_PATH, movie_id)
}

impl ApiClient {
    /// Fetch one page of the catalogue, newest first, optionally filtered by title.
    pub async fn list_movies(&self, query: &MovieQuery) -> Result<Page<Movie>, ApiError> {
        let page: Page<Movie> = self.get_with_query(MOVIES_PATH, query.to_query()).await?;
        debug!(count = page.count, returned = page.results.len(), "Movies page received");
        Ok(page)
    }

    pub async fn get_movie(&self, movie_id: i64) -> Result<Movie, ApiError> {
        self.get(&movie_path(movie_id)).await
    }

    pub async fn create_movie(&self, movie: &NewMovie) -> Result<Movie, ApiError> {
        self.post(MOVIES_PATH, movie).await
    }

    /// Like a movie, or remove the like if it was already liked.
    pub async fn toggle_like(&self, movie_id: i64) -> Result<LikeResponse, ApiError> {
        self.post_empty(&format!("{}like/", movie_path(movie_id))).await
    }

    pub async fn mark_viewed(&self, movie_id: i64) -> Result<ViewResponse, ApiError> {
        self.post_empty(&format!("{}view/", movie_path(movie_id))).await
    }
}
