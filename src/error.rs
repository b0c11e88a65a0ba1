// src/error.rs

use thiserror::Error;

/// Everything that can abort a single pipeline run.
///
/// Per-cell parse failures never show up here: the cleaners absorb them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no table with columns {required:?} among {seen} table(s)")]
    NoMatchingTable {
        required: Vec<String>,
        seen: usize,
    },

    #[error("no rows left after cleaning; nothing to analyze")]
    EmptyDataset,

    #[error("rendering chart failed: {0}")]
    Render(String),

    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// True when the upstream document could not be retrieved.
    pub fn is_upstream(&self) -> bool {
        matches!(self, PipelineError::Fetch { .. })
    }
}
