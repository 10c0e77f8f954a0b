//! Drive a search orchestrator from stdin against a running list endpoint.
//! Usage:
//!   cargo run --bin search_repl -- [base_url] [initial_query_string]
//! base_url defaults to SEARCH_BASE_URL or http://127.0.0.1:3000 (.env supported).
//! Lines:
//!   <text>           keystroke: replaces the search box contents
//!   /submit          search page 1 now
//!   /genre <name>    select a genre (bare /genre clears it)
//!   /page <n>        go to page n
//!   /back <qs>       simulate back/forward to a query string
//!   /quit

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movie_search::models::GenreSummary;
use movie_search::search::{
    HttpMovieSource, InitialState, MovieSource, Navigator, OrchestratorConfig,
    SearchOrchestrator, SearchState, UrlParams,
};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE: &str = "http://127.0.0.1:3000";

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn replace_query(&self, query_string: &str) {
        println!("  url  -> ?{}", query_string);
    }

    fn scroll_to_top(&self) {
        println!("  (scroll to top)");
    }
}

fn print_state(state: &SearchState) {
    if state.loading {
        println!("  ... loading page {}", state.page);
        return;
    }
    if let Some(err) = &state.error {
        println!("  error: {}", err);
    }
    println!(
        "  query='{}' genre={} page {}/{} ({} results)",
        state.query,
        state.genre.as_deref().unwrap_or("-"),
        state.page,
        state.total_pages,
        state.total_results
    );
    for movie in &state.movies {
        match movie.year {
            Some(year) => println!("    {} ({})", movie.title, year),
            None => println!("    {}", movie.title),
        }
    }
}

async fn fetch_genres(base: &str) -> Result<Vec<GenreSummary>> {
    let url = format!("{}/api/genres", base.trim_end_matches('/'));
    let res = reqwest::get(&url)
        .await
        .with_context(|| format!("GET {}", url))?;
    let status = res.status();
    if !status.is_success() {
        anyhow::bail!("GET {} failed: {}", url, status);
    }
    res.json().await.context("Failed to parse genre list")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    let base = args
        .next()
        .or_else(|| env::var("SEARCH_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE.to_string());
    let location = args.next().unwrap_or_default();

    let source = Arc::new(HttpMovieSource::new(&base)?);
    let params = UrlParams::parse(&location);
    let list = source
        .fetch_movies(
            params.page.unwrap_or(1),
            params.search.as_deref().unwrap_or(""),
            params.genre.as_deref(),
        )
        .await
        .context("Failed to load initial page")?;
    let genres = fetch_genres(&base).await?;

    let orch = SearchOrchestrator::new(
        InitialState {
            location,
            list,
            genres,
        },
        source,
        Arc::new(PrintNavigator),
        OrchestratorConfig::default(),
    );

    let names: Vec<String> = orch
        .genres()
        .iter()
        .map(|g| format!("{} ({})", g.title, g.movie_count))
        .collect();
    println!("Genres: {}", names.join(", "));
    print_state(&orch.state());

    let mut updates = orch.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            print_state(&state);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (cmd, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line.as_str(), ""),
        };
        match cmd {
            "/quit" => break,
            "/submit" => orch.submit(),
            "/genre" => orch.select_genre((!rest.is_empty()).then(|| rest.to_string())),
            "/page" => match rest.parse::<u32>() {
                Ok(page) => orch.change_page(page),
                Err(_) => eprintln!("usage: /page <n>"),
            },
            "/back" => orch.location_changed(rest),
            _ if cmd.starts_with('/') => eprintln!("unknown command {}", cmd),
            _ => orch.input_changed(line.as_str()),
        }
    }

    orch.shutdown();
    Ok(())
}
