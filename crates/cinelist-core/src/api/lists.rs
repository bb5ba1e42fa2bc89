//! Personal movie list endpoints.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{ListDetail, ListEntry, ListInput, MovieList};

use super::client::ApiClient;
use super::ApiError;

const LISTS_PATH: &str = "/lists/";

fn list_path(list_id: i64) -> String {
    format!("{}{}/", LISTS_PATH, list_id)
}

#[derive(Serialize)]
struct AddMovieRequest<'a> {
    movie_id: i64,
    note: &'a str,
}

#[derive(Serialize)]
struct RemoveMovieRequest {
    movie_id: i64,
}

impl ApiClient {
    pub async fn get_lists(&self) -> Result<Vec<MovieList>, ApiError> {
        let lists: Vec<MovieList> = self.get(LISTS_PATH).await?;
        debug!(count = lists.len(), "Lists received");
        Ok(lists)
    }

    /// A list together with its movies.
    pub async fn get_list(&self, list_id: i64) -> Result<ListDetail, ApiError> {
        self.get(&list_path(list_id)).await
    }

    /// Names must be unique per user; a duplicate comes back as a validation error on `name`.
    pub async fn create_list(&self, name: &str, description: &str) -> Result<MovieList, ApiError> {
        let input = ListInput {
            name: name.to_string(),
            description: description.to_string(),
        };
        self.post(LISTS_PATH, &input).await
    }

    pub async fn update_list(
        &self,
        list_id: i64,
        name: &str,
        description: &str,
    ) -> Result<MovieList, ApiError> {
        let input = ListInput {
            name: name.to_string(),
            description: description.to_string(),
        };
        self.put(&list_path(list_id), &input).await
    }

    pub async fn delete_list(&self, list_id: i64) -> Result<(), ApiError> {
        self.delete(&list_path(list_id)).await
    }

    /// Add a movie, or update its note if it is already in the list.
    pub async fn add_movie_to_list(
        &self,
        list_id: i64,
        movie_id: i64,
        note: &str,
    ) -> Result<ListEntry, ApiError> {
        let path = format!("{}add_movie/", list_path(list_id));
        self.post(&path, &AddMovieRequest { movie_id, note }).await
    }

    pub async fn remove_movie_from_list(&self, list_id: i64, movie_id: i64) -> Result<(), ApiError> {
        let path = format!("{}remove_movie/", list_path(list_id));
        let response: Value = self.post(&path, &RemoveMovieRequest { movie_id }).await?;
        debug!(status = ?response.get("status"), list_id, movie_id, "Movie removed from list");
        Ok(())
    }
}
