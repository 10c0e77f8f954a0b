use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use movie_search::app::{build_router, AppState};
use movie_search::catalog::CatalogApi;
use movie_search::error::{CatalogError, CatalogResult};
use movie_search::models::{GenreSummary, Movie, MovieList, MovieQuery};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

struct FakeCatalog {
    fail_with: Option<String>,
    queries: Mutex<Vec<MovieQuery>>,
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn search(&self, query: &MovieQuery) -> CatalogResult<MovieList> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(msg) = &self.fail_with {
            return Err(CatalogError::Transport(msg.clone()));
        }
        Ok(MovieList {
            page: query.page,
            total_pages: 3,
            total_movies: 28,
            data: vec![movie("m1", "Alien")],
        })
    }

    async fn list_genres(&self) -> CatalogResult<Vec<GenreSummary>> {
        if let Some(msg) = &self.fail_with {
            return Err(CatalogError::Auth(msg.clone()));
        }
        Ok(vec![GenreSummary {
            id: "g1".to_string(),
            title: "Sci-Fi".to_string(),
            movie_count: 2,
        }])
    }
}

fn movie(id: &str, title: &str) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        year: Some(1979),
        runtime: Some(117),
        genres: vec!["Sci-Fi".to_string()],
        director: Some("Ridley Scott".to_string()),
        actors: None,
        plot: None,
        poster_url: None,
        rating: Some(8.5),
        vote_count: None,
    }
}

fn app_with_fake(fail_with: Option<&str>) -> (Router, Arc<FakeCatalog>) {
    let catalog = Arc::new(FakeCatalog {
        fail_with: fail_with.map(str::to_string),
        queries: Mutex::new(Vec::new()),
    });
    let state = AppState {
        catalog: catalog.clone(),
    };
    (build_router(state), catalog)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri)
        .body(Body::empty())
        .expect("failed to build request");
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_movies_with_defaults() {
    let (app, catalog) = app_with_fake(None);

    let (status, body) = get_json(app, "/api/movies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["totalMovies"], 28);
    assert_eq!(body["data"][0]["title"], "Alien");
    assert_eq!(body["data"][0]["runtime"], 117);
    assert!(body["data"][0].get("actors").is_none());

    let queries = catalog.queries.lock().unwrap();
    assert_eq!(queries.as_slice(), &[MovieQuery::default()]);
}

#[tokio::test]
async fn passes_filters_through() {
    let (app, catalog) = app_with_fake(None);

    let (status, body) =
        get_json(app, "/api/movies?page=2&limit=20&search=alien&genre=Sci-Fi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);

    let queries = catalog.queries.lock().unwrap();
    assert_eq!(
        queries.as_slice(),
        &[MovieQuery::new(2, 20, Some("alien"), Some("Sci-Fi"))]
    );
}

#[tokio::test]
async fn empty_filters_are_dropped() {
    let (app, catalog) = app_with_fake(None);

    let (status, _) = get_json(app, "/api/movies?page=abc&search=&genre=").await;
    assert_eq!(status, StatusCode::OK);

    let queries = catalog.queries.lock().unwrap();
    assert_eq!(queries.as_slice(), &[MovieQuery::default()]);
}

#[tokio::test]
async fn backend_failure_is_500_with_message() {
    let (app, _) = app_with_fake(Some("Failed to fetch movies: 502 Bad Gateway"));

    let (status, body) = get_json(app, "/api/movies?page=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Failed to fetch movies: 502 Bad Gateway" })
    );
}

#[tokio::test]
async fn lists_genres() {
    let (app, _) = app_with_fake(None);

    let (status, body) = get_json(app, "/api/genres").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "id": "g1", "title": "Sci-Fi", "movieCount": 2 }])
    );
}

#[tokio::test]
async fn genre_failure_is_500() {
    let (app, _) = app_with_fake(Some("token endpoint down"));

    let (status, body) = get_json(app, "/api/genres").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Authentication failed: token endpoint down"
    );
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app_with_fake(None);
    let res = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
