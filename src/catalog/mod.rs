use async_trait::async_trait;

mod client;
mod map;
mod query;
mod total;

pub use client::CatalogClient;
pub use query::build_movie_variables;

use crate::error::CatalogResult;
use crate::models::{GenreSummary, MovieList, MovieQuery};

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search(&self, query: &MovieQuery) -> CatalogResult<MovieList>;
    async fn list_genres(&self) -> CatalogResult<Vec<GenreSummary>>;
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn search(&self, query: &MovieQuery) -> CatalogResult<MovieList> {
        self.search_movies(query).await
    }

    async fn list_genres(&self) -> CatalogResult<Vec<GenreSummary>> {
        self.fetch_genre_summaries().await
    }
}
