use crate::catalog::CatalogApi;
use crate::error::CatalogResult;
use crate::models::{non_blank, GenreSummary, Movie, MovieList, MovieQuery, DEFAULT_LIMIT};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub genre: Option<String>,
    /// 1-indexed.
    pub page: u32,
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
}

impl UrlParams {
    pub fn parse(query_string: &str) -> Self {
        let mut params = UrlParams::default();
        for pair in query_string.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            match key {
                "search" => params.search = non_blank(Some(value.as_str())),
                "genre" => params.genre = Some(value).filter(|g| !g.is_empty()),
                "page" => {
                    params.page = value.trim().parse::<u32>().ok().filter(|p| *p >= 1);
                }
                _ => {}
            }
        }
        params
    }

    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(search) = non_blank(self.search.as_deref()) {
            parts.push(format!("search={}", urlencoding::encode(&search)));
        }
        if let Some(genre) = self.genre.as_deref().filter(|g| !g.is_empty()) {
            parts.push(format!("genre={}", urlencoding::encode(genre)));
        }
        if let Some(page) = self.page {
            parts.push(format!("page={}", page));
        }
        parts.join("&")
    }
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[derive(Debug, Clone)]
pub struct InitialState {
    pub location: String,
    pub list: MovieList,
    pub genres: Vec<GenreSummary>,
}

impl InitialState {
    pub async fn load(catalog: &dyn CatalogApi, location: &str) -> CatalogResult<Self> {
        let params = UrlParams::parse(location);
        let query = MovieQuery::new(
            params.page.unwrap_or(1),
            DEFAULT_LIMIT,
            params.search.as_deref(),
            params.genre.as_deref(),
        );
        let (list, genres) = tokio::try_join!(catalog.search(&query), catalog.list_genres())?;
        Ok(Self {
            location: location.trim_start_matches('?').to_string(),
            list,
            genres,
        })
    }
}
