//! Data models for the movie catalogue API.
//!
//! This module contains the structures exchanged with the backend:
//!
//! - `User`, `UserProfile`, `LoginResponse`: accounts and authentication payloads
//! - `Movie`, `NewMovie`, `MovieQuery`: catalogue entries and search parameters
//! - `MovieList`, `ListDetail`, `ListEntry`: personal movie lists
//! - `Page<T>`: the paginated envelope returned by list endpoints

pub mod list;
pub mod movie;
pub mod page;
pub mod user;

pub use list::{ListDetail, ListEntry, ListInput, MovieList};
pub use movie::{LikeResponse, LikeStatus, Movie, MovieQuery, NewMovie, ViewResponse};
pub use page::Page;
pub use user::{LoginResponse, RegisterResponse, User, UserProfile};
