//! Subcommand handlers.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use cinelist_core::models::{LikeStatus, MovieQuery};
use cinelist_core::{ApiClient, ApiError, Config};
use tracing::warn;

use crate::output::Output;
use crate::Command;

pub async fn run(client: &ApiClient, config: &mut Config, out: &Output, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => login(client, config, out, username).await,
        Command::Register { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            let registered = client
                .register(&username, &email, &password)
                .await
                .map_err(describe)?;
            out.message(&format!(
                "Account {} created, run `cinelist login` to sign in",
                registered.user.username
            ));
            Ok(())
        }
        Command::Logout => {
            if !client.is_authenticated() {
                out.message("Not logged in");
                return Ok(());
            }
            // The local session is gone either way
            if let Err(e) = client.logout().await {
                warn!(error = %e, "Server did not confirm logout");
            }
            out.message("Logged out");
            Ok(())
        }
        Command::Whoami => {
            if !client.is_authenticated() {
                out.message("Not logged in");
                return Ok(());
            }
            let me = client.me().await.map_err(describe)?;
            out.message(&me.username);
            Ok(())
        }
        Command::Movies {
            page,
            page_size,
            search,
        } => {
            let mut query = MovieQuery::page(page.unwrap_or(1));
            query.page_size = page_size;
            query.search = search;
            let movies = client.list_movies(&query).await.map_err(describe)?;
            out.movies(&movies, query.page.unwrap_or(1), query.effective_page_size())
        }
        Command::Movie { id } => {
            let movie = client.get_movie(id).await.map_err(describe)?;
            out.movie(&movie)
        }
        Command::Like { id } => {
            let like = client.toggle_like(id).await.map_err(describe)?;
            let verb = match like.status {
                LikeStatus::Liked => "Liked",
                LikeStatus::Unliked => "Unliked",
            };
            out.message(&format!("{} {}", verb, like.movie.display_title()));
            Ok(())
        }
        Command::Viewed { id } => {
            let view = client.mark_viewed(id).await.map_err(describe)?;
            out.message(&format!("Marked {} as watched", view.movie.display_title()));
            Ok(())
        }
        Command::Lists => {
            let lists = client.get_lists().await.map_err(describe)?;
            out.lists(&lists)
        }
        Command::List { id } => {
            let detail = client.get_list(id).await.map_err(describe)?;
            out.list(&detail)
        }
        Command::ListCreate { name, description } => {
            let list = client
                .create_list(&name, &description)
                .await
                .map_err(describe)?;
            out.message(&format!("Created list {} ({})", list.name, list.id));
            Ok(())
        }
        Command::ListDelete { id } => {
            client.delete_list(id).await.map_err(describe)?;
            out.message(&format!("Deleted list {}", id));
            Ok(())
        }
        Command::ListAdd { list, movie, note } => {
            let entry = client
                .add_movie_to_list(list, movie, &note)
                .await
                .map_err(describe)?;
            out.message(&format!("Added {} to list {}", entry.movie.display_title(), list));
            Ok(())
        }
        Command::ListRemove { list, movie } => {
            client
                .remove_movie_from_list(list, movie)
                .await
                .map_err(describe)?;
            out.message(&format!("Removed movie {} from list {}", movie, list));
            Ok(())
        }
    }
}

async fn login(
    client: &ApiClient,
    config: &mut Config,
    out: &Output,
    username: Option<String>,
) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(name) => name,
        None => prompt("Username or email: ")?,
    };
    if username.is_empty() {
        bail!("A username is required");
    }
    let password = rpassword::prompt_password(format!("Password for {}: ", username))?;

    let login = client.login(&username, &password).await.map_err(describe)?;

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to remember username");
    }
    out.message(&format!("Logged in as {}", login.user.username));
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Turn an API error into a message worth showing on the terminal.
fn describe(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Network(e) => anyhow::anyhow!("Could not reach the server: {}", e),
        ApiError::Validation { errors, .. } => anyhow::anyhow!("{}", errors),
        other => other.into(),
    }
}
