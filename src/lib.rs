//! Downloads the RBI bank branch spreadsheets listed on a single directory
//! page, converts them to CSV, cleans the fields and merges everything into one
//! master file.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod merger;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod resolver;
pub mod storage;
pub mod tabular;
pub mod utils;

pub use config::{Config, ShortRecordPolicy};
pub use error::{PipelineError, Result};
