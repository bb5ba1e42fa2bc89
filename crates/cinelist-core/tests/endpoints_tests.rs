//! Integration tests for the account, movie and list endpoints.

use std::sync::Arc;

use cinelist_core::auth::{CredentialStore, MemoryCredentialStore, SessionEvent, TokenPair};
use cinelist_core::models::{LikeStatus, MovieQuery, NewMovie};
use cinelist_core::{ApiClient, ApiError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with(server: &MockServer, store: Arc<MemoryCredentialStore>) -> ApiClient {
    ApiClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .credential_store(store)
        .build()
        .unwrap()
}

fn logged_in_store() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_tokens(TokenPair::new("tok1", "ref1")))
}

fn movie_json(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": null,
        "release_year": 1986,
        "genre": "Sci-Fi",
        "poster_url": null,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z",
        "created_by": null,
        "is_liked": false,
        "is_viewed": false
    })
}

// ===== Account =====

#[tokio::test]
async fn test_login_stores_tokens_and_announces_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .and(body_json(json!({"username": "ana", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "access_token": "acc",
            "refresh_token": "ref",
            "user": {"id": 1, "username": "ana", "email": "ana@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ana"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_with(&server, store.clone());
    let mut events = client.subscribe();
    assert!(!client.is_authenticated());

    let login = client.login("ana", "secret").await.unwrap();
    assert_eq!(login.user.id, 1);
    assert!(client.is_authenticated());
    assert_eq!(store.tokens().unwrap(), Some(TokenPair::new("acc", "ref")));
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedIn {
            username: "ana".to_string()
        }
    );

    let me = client.me().await.unwrap();
    assert_eq!(me.username, "ana");
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/register/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"email": ["Cet email est déjà utilisé."]})),
        )
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(MemoryCredentialStore::new()));
    let err = client
        .register("ana", "ana@example.com", "secret")
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { status, errors } => {
            assert_eq!(status, 400);
            assert_eq!(errors.field("email"), vec!["Cet email est déjà utilisé."]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_logout_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Déconnexion réussie"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = logged_in_store();
    let client = client_with(&server, store.clone());
    let mut events = client.subscribe();

    client.logout().await.unwrap();
    assert!(store.tokens().unwrap().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn test_logout_clears_tokens_when_server_unreachable() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let store = logged_in_store();
    let client = ApiClient::builder()
        .base_url(format!("http://{}/api", address))
        .credential_store(store.clone())
        .build()
        .unwrap();

    let result = client.logout().await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert!(store.tokens().unwrap().is_none());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_tokens_when_server_rejects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Erreur lors de la déconnexion"})))
        .mount(&server)
        .await;

    let store = logged_in_store();
    let client = client_with(&server, store.clone());

    let err = client.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(store.tokens().unwrap().is_none());
}

// ===== Movies =====

#[tokio::test]
async fn test_list_movies_sends_pagination_and_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/movies/"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "100"))
        .and(query_param("search", "alien"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 130,
            "next": "http://localhost:8000/api/movies/?page=2&page_size=100&search=alien",
            "previous": "http://localhost:8000/api/movies/?page_size=100&search=alien",
            "results": [movie_json(1, "Aliens")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());
    let query = MovieQuery::page(2).page_size(250).search("alien");
    let page = client.list_movies(&query).await.unwrap();

    assert_eq!(page.count, 130);
    assert_eq!(page.results[0].display_title(), "Aliens (1986)");
    assert_eq!(page.total_pages(query.effective_page_size()), 2);
    assert!(page.has_next());
}

#[tokio::test]
async fn test_toggle_like_and_mark_viewed() {
    let server = MockServer::start().await;
    let mut liked = movie_json(5, "Aliens");
    liked["is_liked"] = json!(true);
    Mock::given(method("POST"))
        .and(path("/api/movies/5/like/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "liked", "movie": liked})))
        .expect(1)
        .mount(&server)
        .await;
    let mut viewed = movie_json(5, "Aliens");
    viewed["is_viewed"] = json!(true);
    Mock::given(method("POST"))
        .and(path("/api/movies/5/view/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "viewed", "movie": viewed})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());

    let like = client.toggle_like(5).await.unwrap();
    assert_eq!(like.status, LikeStatus::Liked);
    assert!(like.movie.is_liked);

    let view = client.mark_viewed(5).await.unwrap();
    assert_eq!(view.status, "viewed");
    assert!(view.movie.is_viewed);
}

#[tokio::test]
async fn test_get_missing_movie_is_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/movies/999/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let store = logged_in_store();
    let client = client_with(&server, store.clone());
    let err = client.get_movie(999).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Request rejected (status 404): Not found.");
    // A non-auth failure leaves the session alone
    assert!(store.tokens().unwrap().is_some());
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/movies/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "Erreur interne du serveur."})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());
    let err = client.list_movies(&MovieQuery::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, .. }));
}

#[tokio::test]
async fn test_create_movie_omits_unset_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/movies/"))
        .and(body_json(json!({"title": "Aliens", "release_year": 1986})))
        .respond_with(ResponseTemplate::new(201).set_body_json(movie_json(7, "Aliens")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());
    let movie = client
        .create_movie(&NewMovie {
            title: "Aliens".to_string(),
            release_year: Some(1986),
            ..NewMovie::default()
        })
        .await
        .unwrap();
    assert_eq!(movie.id, 7);
}

// ===== Lists =====

#[tokio::test]
async fn test_list_crud() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/lists/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Favoris", "is_system": true, "movies_count": 2},
            {"id": 2, "name": "Weekend", "is_system": false, "movies_count": 0}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/lists/2/"))
        .and(body_json(json!({"name": "Sunday", "description": "Slow films"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "name": "Sunday", "description": "Slow films"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/lists/2/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());

    let lists = client.get_lists().await.unwrap();
    assert_eq!(lists.len(), 2);
    assert!(lists[0].is_system);

    let renamed = client.update_list(2, "Sunday", "Slow films").await.unwrap();
    assert_eq!(renamed.name, "Sunday");
    assert_eq!(renamed.description.as_deref(), Some("Slow films"));

    client.delete_list(2).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_list_name_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/lists/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"name": ["Une liste avec ce nom existe déjà."]})),
        )
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());
    match client.create_list("Favoris", "").await {
        Err(ApiError::Validation { errors, .. }) => {
            assert_eq!(errors.field("name"), vec!["Une liste avec ce nom existe déjà."]);
        }
        other => panic!("expected validation error, got {:?}", other.map(|l| l.id)),
    }
}

#[tokio::test]
async fn test_list_detail_and_membership() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/lists/4/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "Weekend",
            "description": "",
            "is_public": false,
            "is_system": false,
            "movies_count": 1,
            "movies": [{"id": 10, "movie": movie_json(5, "Aliens"), "added_at": "2024-05-02T10:00:00Z", "note": "with popcorn"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/lists/4/add_movie/"))
        .and(body_json(json!({"movie_id": 5, "note": "with popcorn"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10,
            "movie": movie_json(5, "Aliens"),
            "added_at": "2024-05-02T10:00:00Z",
            "note": "with popcorn"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/lists/4/remove_movie/"))
        .and(body_json(json!({"movie_id": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, logged_in_store());

    let entry = client.add_movie_to_list(4, 5, "with popcorn").await.unwrap();
    assert_eq!(entry.movie.id, 5);
    assert_eq!(entry.note, "with popcorn");

    let detail = client.get_list(4).await.unwrap();
    assert_eq!(detail.list.movies_count, 1);
    assert_eq!(detail.movies[0].movie.title, "Aliens");

    client.remove_movie_from_list(4, 5).await.unwrap();
}
