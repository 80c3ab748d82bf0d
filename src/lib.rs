//! grepx: chainable regex search over a filesystem subtree
//!
//! The core is a small query engine: a query string parses into stages,
//! each stage's flags and pattern become line/name predicates, and the
//! traversal engine evaluates them against a directory or a single file.
//! Chained stages refine the previous stage's file set; the substitution
//! engine rewrites matches with interactive or silent confirmation.
//! The binary at src/main.rs is a thin wrapper around these modules.

pub mod chain;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod logger;
pub mod matcher;
pub mod output_name;
pub mod query;
pub mod substitute;
pub mod traverse;

// Re-export commonly used types for convenience
pub use chain::{Session, run_query, run_stages};
pub use error::{Error, ParseError, Result};
pub use matcher::Matcher;
pub use query::{Flag, Stage, parse_query};
pub use substitute::{AlwaysApply, Decision, DecisionSource, FileSet, StdinPrompt, Substitutor};
pub use traverse::{QueryResult, run_stage};
