//! Error type for page rendering.

use std::path::PathBuf;

/// Everything that can stop a page from being produced.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The client stats have no entry point with the requested name.
    #[error("entry point '{0}' not found in client stats")]
    MissingEntrypoint(String),

    /// The markup renderer failed for a route. Passed through untouched.
    #[error("failed to render markup for route '{route}'")]
    Markup {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read client stats from {}", path.display())]
    StatsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid client stats JSON")]
    StatsParse(#[from] serde_json::Error),
}
