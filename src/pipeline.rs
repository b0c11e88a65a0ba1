// src/pipeline.rs

use tokio::task;
use tracing::{info, instrument};

use crate::analysis::{compute_answers, AnswerSet};
use crate::clean::{clean_table, CleanedRecord};
use crate::error::PipelineError;
use crate::fetch::DocumentSource;
use crate::table::{extract_tables, select_table, REQUIRED_COLUMNS};

/// Locate the film table in `html` and return its cleaned rows.
pub fn load_records(html: &str) -> Result<Vec<CleanedRecord>, PipelineError> {
    let table = select_table(extract_tables(html), &REQUIRED_COLUMNS)?;
    Ok(clean_table(&table))
}

/// Everything after the fetch, with no I/O.
#[instrument(level = "info", skip(html), fields(html_len = html.len()))]
pub fn analyze_document(html: &str) -> Result<AnswerSet, PipelineError> {
    let records = load_records(html)?;
    info!(records = records.len(), "cleaned film table");
    compute_answers(&records)
}

/// Fetch a fresh document and answer from it.
///
/// Parsing and rendering run on the blocking pool.
#[instrument(level = "info", skip(source), fields(source = %source.describe()))]
pub async fn run(source: &dyn DocumentSource) -> Result<AnswerSet, PipelineError> {
    let html = source.fetch_document().await?;
    let answers = task::spawn_blocking(move || analyze_document(&html)).await??;
    info!(count = answers.count, title = %answers.earliest_title, "pipeline finished");
    Ok(answers)
}
