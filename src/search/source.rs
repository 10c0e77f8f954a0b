use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::state::UrlParams;
use crate::error::{CatalogError, CatalogResult};
use crate::models::MovieList;

#[async_trait]
pub trait MovieSource: Send + Sync {
    async fn fetch_movies(
        &self,
        page: u32,
        search: &str,
        genre: Option<&str>,
    ) -> CatalogResult<MovieList>;
}

#[derive(Debug, Clone)]
pub struct HttpMovieSource {
    client: Client,
    endpoint: String,
}

impl HttpMovieSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build list endpoint HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/movies", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl MovieSource for HttpMovieSource {
    async fn fetch_movies(
        &self,
        page: u32,
        search: &str,
        genre: Option<&str>,
    ) -> CatalogResult<MovieList> {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }

        let qs = UrlParams {
            search: Some(search.to_string()),
            genre: genre.map(str::to_string),
            page: Some(page),
        }
        .to_query_string();
        let url = format!("{}?{}", self.endpoint, qs);
        debug!(url = %url, "Fetching movies");

        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .ok()
                .or_else(|| Some(text.trim().to_string()))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Failed to fetch movies".to_string());
            return Err(CatalogError::Transport(message));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_trimmed_filters_and_parses_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies"))
            .and(query_param("search", "alien"))
            .and(query_param("genre", "Sci-Fi"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2,
                "totalPages": 3,
                "totalMovies": 28,
                "data": [{ "id": "m1", "title": "Alien", "genres": ["Sci-Fi"] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpMovieSource::new(&server.uri()).unwrap();
        let list = source.fetch_movies(2, " alien ", Some("Sci-Fi")).await.unwrap();
        assert_eq!(list.page, 2);
        assert_eq!(list.total_movies, 28);
        assert_eq!(list.data[0].title, "Alien");
    }

    #[tokio::test]
    async fn surfaces_endpoint_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "catalog unavailable" })),
            )
            .mount(&server)
            .await;

        let source = HttpMovieSource::new(&server.uri()).unwrap();
        let err = source.fetch_movies(1, "", None).await.unwrap_err();
        assert_eq!(err.to_string(), "catalog unavailable");
    }

    #[tokio::test]
    async fn empty_error_body_gets_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/movies"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let source = HttpMovieSource::new(&server.uri()).unwrap();
        let err = source.fetch_movies(1, "", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch movies");
    }
}
