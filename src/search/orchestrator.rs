use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::navigator::Navigator;
use super::source::MovieSource;
use super::state::{InitialState, SearchState, UrlParams};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{non_blank, GenreSummary, MovieList};

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
const URL_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub search_debounce: Duration,
    pub url_debounce: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            search_debounce: SEARCH_DEBOUNCE,
            url_debounce: URL_DEBOUNCE,
        }
    }
}

#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn MovieSource>,
    navigator: Arc<dyn Navigator>,
    config: OrchestratorConfig,
    genres: Vec<GenreSummary>,
    defaults: Defaults,
    state: watch::Sender<SearchState>,
    control: Mutex<Control>,
}

struct Defaults {
    search: String,
    genre: Option<String>,
    page: u32,
}

/// Timers, the live request and the URL marker. Lock order is always
/// `control` before `state`.
#[derive(Default)]
struct Control {
    generation: u64,
    in_flight: Option<ActiveRequest>,
    timer_seq: u64,
    search_timer: Option<Timer>,
    url_timer: Option<Timer>,
    last_applied: String,
}

struct ActiveRequest {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Timer {
    id: u64,
    handle: JoinHandle<()>,
}

impl Control {
    fn next_timer_id(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    fn cancel_search_timer(&mut self) {
        if let Some(timer) = self.search_timer.take() {
            timer.handle.abort();
        }
    }

    fn cancel_url_timer(&mut self) {
        if let Some(timer) = self.url_timer.take() {
            timer.handle.abort();
        }
    }
}

impl SearchOrchestrator {
    pub fn new(
        initial: InitialState,
        source: Arc<dyn MovieSource>,
        navigator: Arc<dyn Navigator>,
        config: OrchestratorConfig,
    ) -> Self {
        let defaults = Defaults {
            search: String::new(),
            genre: None,
            page: initial.list.page.max(1),
        };
        let location = initial.location.trim_start_matches('?').to_string();
        let params = UrlParams::parse(&location);

        let state = SearchState {
            query: params.search.unwrap_or_else(|| defaults.search.clone()),
            genre: params.genre.or_else(|| defaults.genre.clone()),
            page: params.page.unwrap_or(defaults.page),
            movies: initial.list.data,
            total_pages: initial.list.total_pages,
            total_results: initial.list.total_movies,
            loading: false,
            error: None,
        };
        let (state, _) = watch::channel(state);

        Self {
            inner: Arc::new(Inner {
                source,
                navigator,
                config,
                genres: initial.genres,
                defaults,
                state,
                control: Mutex::new(Control {
                    last_applied: location,
                    ..Control::default()
                }),
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn genres(&self) -> &[GenreSummary] {
        &self.inner.genres
    }

    pub fn input_changed(&self, value: impl Into<String>) {
        let value = value.into();
        self.inner.state.send_modify(|s| s.query = value);

        let mut control = self.control();
        control.cancel_search_timer();
        let id = control.next_timer_id();
        let delay = self.inner.config.search_debounce;
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_search_timer(id);
        });
        control.search_timer = Some(Timer { id, handle });
    }

    pub fn submit(&self) {
        let (query, genre) = self.current_filters();
        self.trigger_search(1, query, genre);
    }

    pub fn select_genre(&self, genre: Option<String>) {
        let genre = genre.filter(|g| !g.is_empty());
        let selected = genre.clone();
        self.inner.state.send_modify(|s| s.genre = selected);
        // trigger_search drops any pending keystroke search.
        let (query, _) = self.current_filters();
        self.trigger_search(1, query, genre);
    }

    pub fn change_page(&self, page: u32) {
        let (query, genre) = self.current_filters();
        self.trigger_search(page.max(1), query, genre);
        self.inner.navigator.scroll_to_top();
    }

    pub fn location_changed(&self, query_string: &str) {
        let query_string = query_string.trim_start_matches('?');
        {
            let mut control = self.control();
            if control.last_applied == query_string {
                return;
            }
            debug!("Location changed externally to '{}'", query_string);
            control.last_applied = query_string.to_string();
            control.cancel_search_timer();
            control.cancel_url_timer();
        }

        let params = UrlParams::parse(query_string);
        let defaults = &self.inner.defaults;
        let search = params.search.unwrap_or_else(|| defaults.search.clone());
        let genre = params.genre.or_else(|| defaults.genre.clone());
        let page = params.page.unwrap_or(defaults.page);

        let (q, g) = (search.clone(), genre.clone());
        self.inner.state.send_modify(|s| {
            s.query = q;
            s.genre = g;
            s.page = page;
        });
        self.fetch(page, search, genre);
    }

    pub fn shutdown(&self) {
        let mut control = self.control();
        control.cancel_search_timer();
        control.cancel_url_timer();
        if let Some(active) = control.in_flight.take() {
            active.handle.abort();
        }
        // Anything still running must not apply.
        control.generation += 1;
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.inner
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current_filters(&self) -> (String, Option<String>) {
        let state = self.inner.state.borrow();
        (state.query.clone(), state.genre.clone())
    }

    fn fire_search_timer(&self, id: u64) {
        let (query, genre) = {
            let mut control = self.control();
            match control.search_timer.as_ref() {
                Some(timer) if timer.id == id => control.search_timer = None,
                _ => return,
            }
            self.current_filters()
        };
        // A keystroke after this point schedules its own timer; leave it be.
        self.run_search(1, query, genre);
    }

    fn trigger_search(&self, page: u32, query: String, genre: Option<String>) {
        self.control().cancel_search_timer();
        self.run_search(page, query, genre);
    }

    fn run_search(&self, page: u32, query: String, genre: Option<String>) {
        self.sync_url(page, &query, genre.as_deref());
        self.inner.state.send_modify(|s| s.page = page);
        self.fetch(page, query, genre);
    }

    fn sync_url(&self, page: u32, query: &str, genre: Option<&str>) {
        let next = UrlParams {
            search: non_blank(Some(query)),
            genre: genre.map(str::to_string),
            page: Some(page),
        }
        .to_query_string();

        let mut control = self.control();
        if control.last_applied == next {
            return;
        }
        control.last_applied = next.clone();
        control.cancel_url_timer();

        let id = control.next_timer_id();
        let delay = self.inner.config.url_debounce;
        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_url_timer(id, &next);
        });
        control.url_timer = Some(Timer { id, handle });
    }

    fn fire_url_timer(&self, id: u64, query_string: &str) {
        {
            let mut control = self.control();
            match control.url_timer.as_ref() {
                Some(timer) if timer.id == id => control.url_timer = None,
                _ => return,
            }
        }
        debug!("Writing location '{}'", query_string);
        self.inner.navigator.replace_query(query_string);
    }

    fn fetch(&self, page: u32, query: String, genre: Option<String>) {
        let mut control = self.control();
        control.generation += 1;
        let generation = control.generation;
        if let Some(active) = control.in_flight.take() {
            debug!("Aborting request generation {}", active.generation);
            active.handle.abort();
        }
        self.inner.state.send_modify(|s| s.loading = true);

        let this = self.clone();
        let handle = tokio::spawn(async move {
            let result = this
                .inner
                .source
                .fetch_movies(page, query.trim(), genre.as_deref())
                .await;
            this.apply_result(generation, result);
        });
        control.in_flight = Some(ActiveRequest { generation, handle });
    }

    fn apply_result(&self, generation: u64, result: CatalogResult<MovieList>) -> bool {
        let mut control = self.control();
        if control.generation != generation {
            debug!(
                "Discarding result of generation {} (current {})",
                generation, control.generation
            );
            return false;
        }
        control.in_flight = None;

        match result {
            Ok(list) => {
                self.inner.state.send_modify(|s| {
                    s.movies = list.data;
                    s.page = list.page;
                    s.total_pages = list.total_pages;
                    s.total_results = list.total_movies;
                    s.error = None;
                    s.loading = false;
                });
            }
            Err(CatalogError::Cancelled) => {
                self.inner.state.send_modify(|s| s.loading = false);
            }
            Err(e) => {
                error!("Error fetching movies: {}", e);
                let message = e.to_string();
                // Earlier results stay on screen.
                self.inner.state.send_modify(|s| {
                    s.error = Some(message);
                    s.loading = false;
                });
            }
        }
        true
    }
}
