use serde_json::{Map, Value};

// Keep these documents stable and explicit; they show up in debug logs.
pub(crate) const MOVIES_QUERY: &str = r#"
query Movies($pagination: PaginationInput, $where: MovieFilterInput) {
  movies(pagination: $pagination, where: $where) {
    pagination { page perPage totalPages }
    nodes {
      id
      title
      posterUrl
      summary
      duration
      directors
      mainActors
      datePublished
      ratingValue
      genres { id title }
    }
  }
}
"#;

pub(crate) const GENRES_QUERY: &str = r#"
query Genres($pagination: PaginationInput) {
  genres(pagination: $pagination) {
    pagination { page perPage totalPages }
    nodes {
      id
      title
      movies { id }
    }
  }
}
"#;

pub fn build_movie_variables(
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<&str>,
    genre: Option<&str>,
) -> Value {
    let mut pagination = Map::new();
    if let Some(page) = page.filter(|p| *p > 0) {
        pagination.insert("page".to_string(), Value::from(page));
    }
    if let Some(limit) = limit.filter(|l| *l > 0) {
        pagination.insert("perPage".to_string(), Value::from(limit));
    }

    let mut filter = Map::new();
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        filter.insert("search".to_string(), Value::from(search));
    }
    if let Some(genre) = genre.filter(|g| !g.is_empty()) {
        filter.insert("genre".to_string(), Value::from(genre));
    }

    let mut vars = Map::new();
    if !pagination.is_empty() {
        vars.insert("pagination".to_string(), Value::Object(pagination));
    }
    if !filter.is_empty() {
        vars.insert("where".to_string(), Value::Object(filter));
    }
    Value::Object(vars)
}

pub(crate) fn build_genre_variables(page: u32, per_page: u32) -> Value {
    build_movie_variables(Some(page), Some(per_page), None, None)
}

pub(crate) fn rest_movies_query(
    page: u32,
    limit: u32,
    search: Option<&str>,
    genre: Option<&str>,
) -> String {
    let mut parts = vec![format!("page={}", page), format!("limit={}", limit)];
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        parts.push(format!("search={}", urlencoding::encode(search)));
    }
    if let Some(genre) = genre.filter(|g| !g.is_empty()) {
        parts.push(format!("genre={}", urlencoding::encode(genre)));
    }
    parts.join("&")
}
