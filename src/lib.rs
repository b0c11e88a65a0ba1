//! Scrape the highest-grossing films table, clean it, and answer four
//! fixed questions about it over HTTP.

pub mod analysis;
pub mod chart;
pub mod clean;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod table;

pub use analysis::AnswerSet;
pub use config::Config;
pub use error::PipelineError;
