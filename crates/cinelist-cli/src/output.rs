//! Rendering of API results for the terminal.

use anyhow::Result;
use cinelist_core::models::{ListDetail, Movie, MovieList, Page};
use serde::Serialize;

/// Writes results either as aligned text or as pretty JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Status line for commands that have nothing else to show
    pub fn message(&self, text: &str) {
        if !self.json {
            println!("{}", text);
        }
    }

    pub fn movies(&self, page: &Page<Movie>, page_number: u32, page_size: u32) -> Result<()> {
        if self.json {
            return self.print_json(page);
        }
        if page.results.is_empty() {
            println!("No movies found.");
            return Ok(());
        }
        for movie in &page.results {
            println!("{}", movie_line(movie));
        }
        println!(
            "-- page {} of {} ({} movies)",
            page_number,
            page.total_pages(page_size).max(1),
            page.count
        );
        Ok(())
    }

    pub fn movie(&self, movie: &Movie) -> Result<()> {
        if self.json {
            return self.print_json(movie);
        }
        println!("{}", movie_line(movie));
        if let Some(genre) = movie.genre.as_deref().filter(|g| !g.is_empty()) {
            println!("  genre: {}", genre);
        }
        if let Some(description) = movie.description.as_deref().filter(|d| !d.is_empty()) {
            println!("  {}", description);
        }
        if let Some(author) = &movie.created_by {
            println!("  added by {}", author.username);
        }
        Ok(())
    }

    pub fn lists(&self, lists: &[MovieList]) -> Result<()> {
        if self.json {
            return self.print_json(lists);
        }
        if lists.is_empty() {
            println!("You have no lists yet.");
        }
        for list in lists {
            println!("{}", list_line(list));
        }
        Ok(())
    }

    pub fn list(&self, detail: &ListDetail) -> Result<()> {
        if self.json {
            return self.print_json(detail);
        }
        println!("{}", list_line(&detail.list));
        if let Some(description) = detail.list.description.as_deref().filter(|d| !d.is_empty()) {
            println!("  {}", description);
        }
        for entry in &detail.movies {
            if entry.note.is_empty() {
                println!("  {}", movie_line(&entry.movie));
            } else {
                println!("  {}  - {}", movie_line(&entry.movie), entry.note);
            }
        }
        Ok(())
    }
}

fn movie_line(movie: &Movie) -> String {
    let mut marks = String::new();
    if movie.is_liked {
        marks.push_str(" [liked]");
    }
    if movie.is_viewed {
        marks.push_str(" [seen]");
    }
    format!("{:>6}  {}{}", movie.id, movie.display_title(), marks)
}

fn list_line(list: &MovieList) -> String {
    let kind = if list.is_system { " (system)" } else { "" };
    format!("{:>6}  {}{}  {} movies", list.id, list.name, kind, list.movies_count)
}
