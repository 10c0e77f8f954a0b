mod navigator;
mod orchestrator;
mod source;
mod state;

pub use navigator::{MemoryNavigator, Navigator};
pub use orchestrator::{OrchestratorConfig, SearchOrchestrator};
pub use source::{HttpMovieSource, MovieSource};
pub use state::{InitialState, SearchState, UrlParams};
