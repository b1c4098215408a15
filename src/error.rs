//! Load-time failures
//!
//! Only reference-data loading can fail. Parsing degrades to sentinels and
//! lookups return `Option`s.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("reference file '{file}' not found under {dir}")]
    SourceNotFound { file: String, dir: PathBuf },

    #[error("table '{table}' is missing required column '{column}' (found: {found})")]
    MissingColumn {
        table: &'static str,
        column: String,
        found: String,
    },

    #[error("table '{0}' has no data rows")]
    EmptyTable(&'static str),

    #[error("reference data store is empty; run 'import' or 'load-sample' first")]
    EmptyStore,

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;
