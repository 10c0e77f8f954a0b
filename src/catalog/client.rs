use anyhow::Context;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::map::{map_genre_index, map_genres, map_movie};
use super::query::{
    build_genre_variables, build_movie_variables, rest_movies_query, GENRES_QUERY, MOVIES_QUERY,
};
use super::total::{count_from_page, total_from_last_page, TotalCount};
use crate::auth::TokenCache;
use crate::config::{CatalogConfig, Transport};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{GenreSummary, MovieList, MovieQuery};

const GENRE_PAGE_SIZE: u32 = 100;
const MAX_GENRE_PAGES: u32 = 50;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    config: CatalogConfig,
    tokens: Arc<TokenCache>,
}

#[derive(Debug)]
struct RawPage {
    page: u32,
    per_page: u32,
    total_pages: u32,
    movies: Vec<RawMovie>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> anyhow::Result<Self> {
        let user_agent = format!("movie-search/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build catalog HTTP client")?;
        let tokens = Arc::new(TokenCache::new(
            client.clone(),
            config.token_url(),
            config.token_ttl,
        ));
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    pub fn transport(&self) -> Transport {
        self.config.transport
    }

    pub async fn search_movies(&self, query: &MovieQuery) -> CatalogResult<MovieList> {
        self.search_inner(query)
            .await
            .inspect_err(|e| error!("Search movies error: {}", e))
    }

    pub async fn fetch_genre_summaries(&self) -> CatalogResult<Vec<GenreSummary>> {
        self.genres_inner()
            .await
            .inspect_err(|e| error!("Genre listing error: {}", e))
    }

    async fn search_inner(&self, query: &MovieQuery) -> CatalogResult<MovieList> {
        let first = self.fetch_movies_page(query).await?;
        let items = first.movies.len();

        let total_movies =
            match count_from_page(first.page, first.total_pages, first.per_page, items) {
                TotalCount::Known(total) => total,
                TotalCount::NeedsLastPage(last_page) => {
                    debug!(
                        "Fetching last page {} to derive total count (perPage {})",
                        last_page, first.per_page
                    );
                    let last = self.fetch_movies_page(&query.for_page(last_page)).await?;
                    total_from_last_page(first.total_pages, first.per_page, last.movies.len())
                }
            };

        Ok(MovieList {
            page: first.page,
            total_pages: first.total_pages,
            total_movies,
            data: first.movies.into_iter().map(map_movie).collect(),
        })
    }

    async fn fetch_movies_page(&self, query: &MovieQuery) -> CatalogResult<RawPage> {
        match self.config.transport {
            Transport::GraphQl => {
                #[derive(Deserialize)]
                struct Data {
                    movies: Option<Connection<RawMovie>>,
                }

                let variables = build_movie_variables(
                    Some(query.page),
                    Some(query.limit),
                    query.search.as_deref(),
                    query.genre.as_deref(),
                );
                let data: Data = self.graphql("movies", MOVIES_QUERY, variables).await?;
                let conn = data.movies.ok_or_else(|| {
                    CatalogError::Transport("GraphQL response has no movies field".to_string())
                })?;
                Ok(conn.into_page(query.page, query.limit))
            }
            Transport::Rest => {
                let qs = rest_movies_query(
                    query.page,
                    query.limit,
                    query.search.as_deref(),
                    query.genre.as_deref(),
                );
                let body: RestList<RawMovie> = self.rest_get("movies", "/movies", &qs).await?;
                Ok(RawPage {
                    page: query.page,
                    per_page: query.limit,
                    total_pages: body.total_pages,
                    movies: body.data,
                })
            }
        }
    }

    async fn genres_inner(&self) -> CatalogResult<Vec<GenreSummary>> {
        let genres = match self.config.transport {
            Transport::GraphQl => map_genres(self.graphql_genres().await?),
            Transport::Rest => {
                let index: BTreeMap<String, Value> =
                    self.rest_get("genres", "/genres/movies", "").await?;
                map_genre_index(index)
            }
        };
        info!("Loaded {} genres", genres.len());
        Ok(genres)
    }

    async fn graphql_genres(&self) -> CatalogResult<Vec<RawGenre>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let (nodes, total_pages) = self.fetch_genres_page(page).await?;
            all.extend(nodes);
            if page >= total_pages {
                break;
            }
            if page >= MAX_GENRE_PAGES {
                warn!(
                    "Stopping genre listing after {} pages ({} reported)",
                    MAX_GENRE_PAGES, total_pages
                );
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn fetch_genres_page(&self, page: u32) -> CatalogResult<(Vec<RawGenre>, u32)> {
        #[derive(Deserialize)]
        struct Data {
            genres: Option<Connection<RawGenre>>,
        }

        let variables = build_genre_variables(page, GENRE_PAGE_SIZE);
        let data: Data = self.graphql("genres", GENRES_QUERY, variables).await?;
        let conn = data.genres.ok_or_else(|| {
            CatalogError::Transport("GraphQL response has no genres field".to_string())
        })?;
        let total_pages = conn
            .pagination
            .as_ref()
            .and_then(|p| p.total_pages)
            .unwrap_or(1);
        Ok((conn.nodes.unwrap_or_default(), total_pages))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> CatalogResult<T> {
        #[derive(Deserialize)]
        struct GraphQlResponse<T> {
            data: Option<T>,
            errors: Option<Vec<GraphQlError>>,
        }

        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
        }

        debug!(operation, variables = %variables, "Catalog GraphQL request");
        let url = self.config.graphql_url();
        let body = json!({ "query": query, "variables": variables });
        let text = self
            .send_authorized(operation, || self.client.post(&url).json(&body))
            .await?;

        let parsed: GraphQlResponse<T> = serde_json::from_str(&text).map_err(|e| {
            CatalogError::Transport(format!("Failed to parse {} response: {}", operation, e))
        })?;
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let msg = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CatalogError::Transport(format!(
                "GraphQL error in {}: {}",
                operation, msg
            )));
        }
        parsed.data.ok_or_else(|| {
            CatalogError::Transport(format!("GraphQL {} response has no data", operation))
        })
    }

    async fn rest_get<T: DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        query_string: &str,
    ) -> CatalogResult<T> {
        let url = if query_string.is_empty() {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}{}?{}", self.config.base_url, path, query_string)
        };
        debug!(url = %url, "Catalog REST request");
        let text = self
            .send_authorized(what, || self.client.get(&url))
            .await?;
        serde_json::from_str(&text).map_err(|e| {
            CatalogError::Transport(format!("Failed to parse {} response: {}", what, e))
        })
    }

    /// Sends a request with the current bearer token. A 401 invalidates the
    /// token and retries exactly once with a fresh one; a second 401 is fatal.
    async fn send_authorized<F>(&self, what: &str, build: F) -> CatalogResult<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut refreshed = false;
        loop {
            let token = self.tokens.get_token().await?;
            let res = build().bearer_auth(&token).send().await?;
            let status = res.status();

            if status == StatusCode::UNAUTHORIZED {
                if refreshed {
                    return Err(CatalogError::Auth(format!(
                        "{} rejected a freshly issued token",
                        what
                    )));
                }
                warn!("{} returned 401; refreshing token and retrying once", what);
                self.tokens.invalidate(&token).await;
                refreshed = true;
                continue;
            }

            let text = res.text().await?;
            if !status.is_success() {
                return Err(CatalogError::Transport(format!(
                    "Failed to fetch {}: {} {}",
                    what, status, text
                )));
            }
            return Ok(text);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: Option<u32>,
    per_page: Option<u32>,
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    pagination: Option<Pagination>,
    nodes: Option<Vec<T>>,
}

impl Connection<RawMovie> {
    fn into_page(self, requested_page: u32, requested_per_page: u32) -> RawPage {
        let pagination = self.pagination;
        RawPage {
            page: pagination
                .as_ref()
                .and_then(|p| p.page)
                .unwrap_or(requested_page),
            per_page: pagination
                .as_ref()
                .and_then(|p| p.per_page)
                .unwrap_or(requested_per_page),
            total_pages: pagination.as_ref().and_then(|p| p.total_pages).unwrap_or(1),
            movies: self.nodes.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestList<T> {
    data: Vec<T>,
    #[serde(alias = "total_pages")]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMovie {
    pub(crate) id: String,
    pub(crate) title: Option<String>,
    pub(crate) poster_url: Option<String>,
    pub(crate) summary: Option<String>,
    pub(crate) duration: Option<String>,
    pub(crate) directors: Option<Vec<String>>,
    pub(crate) main_actors: Option<Vec<String>>,
    pub(crate) date_published: Option<String>,
    #[serde(alias = "rating")]
    pub(crate) rating_value: Option<f64>,
    #[serde(alias = "voteCount")]
    pub(crate) rating_count: Option<u64>,
    pub(crate) genres: Option<Vec<GenreRef>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenreRef {
    pub(crate) title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGenre {
    pub(crate) id: String,
    pub(crate) title: Option<String>,
    pub(crate) movies: Option<Vec<IgnoredAny>>,
}
