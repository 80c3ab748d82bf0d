//! Error taxonomy for the query and substitution engines
//!
//! Only `ParseError` aborts a whole invocation; every other condition is
//! degraded inside the engine to "skip this item, continue the batch" and
//! surfaces here only where a caller asked for strict behaviour.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A malformed query, rejected before any filesystem access.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty query: no stages found")]
    EmptyQuery,

    #[error("stage {stage}: pattern must be a non-empty string enclosed in single quotes")]
    MissingPattern { stage: usize },

    #[error("stage {stage}: unbalanced single quotes around pattern")]
    UnbalancedQuotes { stage: usize },

    #[error("stage {stage}: option character '{ch}' is not in [a-z0-9]")]
    BadOptionChar { stage: usize, ch: char },

    #[error("stage {stage}: unknown option letter '{ch}'")]
    UnknownOption { stage: usize, ch: char },

    #[error("stage {stage}: only the first stage may name a /target path")]
    TargetInLaterStage { stage: usize },

    #[error("stage {stage}: unexpected input after pattern: {rest:?}")]
    TrailingInput { stage: usize, rest: String },

    #[error("stage {stage}: invalid pattern: {source}")]
    InvalidPattern {
        stage: usize,
        #[source]
        source: regex::Error,
    },
}

/// Engine-level failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No configured encoding decodes the file's bytes.
    #[error("no configured encoding decodes {}", path.display())]
    Decode { path: PathBuf },

    /// The target of a stage could not be read or listed.
    #[error("cannot access {}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A substitution output file could not be created.
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The interactive decision prompt failed (stdin closed, etc.).
    #[error("failed to obtain a substitution decision")]
    Prompt(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
