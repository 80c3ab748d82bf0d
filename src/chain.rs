//! Chain refinement coordinator
//!
//! A pipeline is "find files matching A, keep those also matching B, return
//! C's detail for each survivor". Stage 1 runs against its explicit target
//! (or the session default) and its result is flattened into the initial
//! candidate set. Every stage strictly between the first and last re-runs
//! once per candidate with the candidate as a single-file target; a file
//! survives only if that run is non-empty. The final stage runs once per
//! survivor and its per-candidate outputs are merged: list-shaped variants
//! concatenate, map-shaped variants union (one key per candidate, so no
//! overwrite occurs).
//!
//! Candidates are kept in the order the previous stage produced them and
//! are not de-duplicated; a file reached through two traversal branches is
//! refined twice.

use crate::error::Result;
use crate::query::{Stage, parse_query};
use crate::traverse::{QueryResult, Shape, empty_result, run_stage};
use std::path::{Path, PathBuf};

/// Per-run context threaded through successive calls within one
/// interactive session. Replaces any hidden mutable global: the
/// warned-once state for the missing-target fallback lives here.
#[derive(Debug, Clone)]
pub struct Session {
    default_target: PathBuf,
    warned_default_target: bool,
}

impl Session {
    /// A session whose stage-1 fallback target is `default_target`. The
    /// engine never assumes a fallback on its own; the caller chooses one
    /// (usually the current directory) when constructing the session.
    pub fn new(default_target: impl Into<PathBuf>) -> Self {
        Self {
            default_target: default_target.into(),
            warned_default_target: false,
        }
    }

    /// A session that falls back to the current directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn default_target(&self) -> &Path {
        &self.default_target
    }

    /// The fallback target, warning the first time it is used in this
    /// session.
    fn fallback_target(&mut self) -> PathBuf {
        if !self.warned_default_target {
            self.warned_default_target = true;
            tracing::warn!(
                "query names no /target path; defaulting to {}",
                self.default_target.display()
            );
        }
        self.default_target.clone()
    }
}

/// Parse and execute a query string, single-stage or chained.
pub fn run_query(input: &str, session: &mut Session) -> Result<QueryResult> {
    let stages = parse_query(input)?;
    Ok(run_stages(&stages, session))
}

/// Execute already-parsed stages. All patterns were compiled at parse
/// time, so no error can occur past this point; everything else degrades
/// to skips and empty results.
pub fn run_stages(stages: &[Stage], session: &mut Session) -> QueryResult {
    let Some((first, rest)) = stages.split_first() else {
        return empty_result(Shape::Content(crate::traverse::ContentShape::Lines));
    };

    let target = match &first.target {
        Some(target) => target.clone(),
        None => session.fallback_target(),
    };
    let first_result = run_stage(first, &target);

    let Some((last, middle)) = rest.split_last() else {
        return first_result;
    };

    let mut candidates = first_result.into_paths();
    for stage in middle {
        candidates.retain(|candidate| !run_stage(stage, candidate).is_empty());
    }

    let mut merged = empty_result(Shape::of(last));
    for candidate in &candidates {
        absorb(&mut merged, run_stage(last, candidate));
    }
    merged
}

/// Merge one candidate's final-stage output into the accumulator. The
/// shape is a pure function of the final stage's flags, so both sides
/// always carry the same variant.
fn absorb(acc: &mut QueryResult, next: QueryResult) {
    match (acc, next) {
        (QueryResult::Files(a), QueryResult::Files(b)) => a.extend(b),
        (QueryResult::Dirs(a), QueryResult::Dirs(b)) => a.extend(b),
        (QueryResult::Lines(a), QueryResult::Lines(b)) => a.extend(b),
        (QueryResult::NumberedLines(a), QueryResult::NumberedLines(b)) => a.extend(b),
        (QueryResult::Counts(a), QueryResult::Counts(b)) => a.extend(b),
        (QueryResult::FlatLines(a), QueryResult::FlatLines(b)) => a.extend(b),
        (QueryResult::FlatNumberedLines(a), QueryResult::FlatNumberedLines(b)) => a.extend(b),
        (acc, next) => {
            debug_assert!(false, "mismatched result variants in merge");
            tracing::error!("dropping mismatched result variant: {:?} into {:?}", next, acc);
        }
    }
}
