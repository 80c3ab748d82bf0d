//! Predicate construction
//!
//! A `Matcher` turns one stage's pattern and modifier flags into the two
//! predicates the traversal engine needs: one over a line of text, one over
//! a file or directory name. The case flag is already folded into the
//! stage's compiled regexes; whole-word and negate are applied here, negate
//! last.

use crate::query::{Flag, Stage};
use regex::Regex;

/// Line and name predicates for one stage.
///
/// Borrows the stage's compiled regexes, so building a matcher never
/// recompiles a pattern.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    regex: &'a Regex,
    exact: &'a Regex,
    whole_word: bool,
    negate: bool,
}

impl<'a> Matcher<'a> {
    pub fn for_stage(stage: &'a Stage) -> Self {
        Self {
            regex: &stage.regex,
            exact: &stage.exact,
            whole_word: stage.has(Flag::WholeWord),
            negate: stage.has(Flag::Negate),
        }
    }

    /// Content predicate over a single line of text.
    ///
    /// Plain: the pattern matches anywhere in the line. Whole-word: some
    /// whitespace-delimited token of the line fully matches the pattern.
    pub fn line_matches(&self, line: &str) -> bool {
        let hit = if self.whole_word {
            line.split_whitespace().any(|word| self.exact.is_match(word))
        } else {
            self.regex.is_match(line)
        };
        hit ^ self.negate
    }

    /// Name predicate over a filename or directory name.
    ///
    /// Plain: the pattern matches anywhere in the name. Whole-word: the
    /// entire name, not a substring, fully matches the pattern.
    pub fn name_matches(&self, name: &str) -> bool {
        let hit = if self.whole_word {
            self.exact.is_match(name)
        } else {
            self.regex.is_match(name)
        };
        hit ^ self.negate
    }
}
