//! Query parsing
//!
//! A query is a pipeline of one or more stages separated by the literal
//! ` -}} ` (exactly one space each side):
//!
//! ```text
//! [-<opts> ]* '<pattern>' [ /<path>] ( -}} [-<opts> ]* '<pattern>' )*
//! ```
//!
//! Each `-<opts>` token is a dash followed by one or more `[a-z0-9]`
//! characters. The pattern is a single-quoted regular expression with no
//! escape mechanism for internal quotes, so a pattern cannot contain a
//! single quote or the stage separator itself. Only the first stage may
//! carry a `/<path>` target; later stages act on single files supplied by
//! the chain coordinator.
//!
//! Parsing is pure: it touches no part of the filesystem. Every regex is
//! compiled here, once per stage, so all parse errors precede any I/O.

use crate::error::ParseError;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Literal separator between pipeline stages.
pub const STAGE_SEPARATOR: &str = " -}} ";

/// One engine option letter.
///
/// Orthogonal modifiers except that the mode letters (`d`, `f`, `c`, `h`,
/// `n`, `l`) resolve to a single result shape by fixed precedence (see
/// `traverse::Shape`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Flag {
    /// `a` — consider every filename, not just the text-type allow-list.
    AllFiletypes,
    /// `c` — count matching lines per file.
    Count,
    /// `d` — match directory names only; files are never inspected.
    DirsOnly,
    /// `f` — match filenames only; contents are never read.
    FilenamesOnly,
    /// `h` — emit matched lines without their filenames.
    HideNames,
    /// `i` — case-insensitive matching.
    CaseInsensitive,
    /// `l` — list the files that contain a match.
    ListNames,
    /// `n` — pair each matched line with its zero-based line index.
    NumberedLines,
    /// `o` — a whitespace-delimited token (or the entire name) must fully
    /// match the pattern.
    WholeWord,
    /// `v` — invert the predicate.
    Negate,
    /// `r` — recurse through the whole subtree instead of one level.
    Recursive,
}

impl Flag {
    /// Look up the engine flag for a single option letter.
    pub fn from_letter(ch: char) -> Option<Flag> {
        match ch {
            'a' => Some(Flag::AllFiletypes),
            'c' => Some(Flag::Count),
            'd' => Some(Flag::DirsOnly),
            'f' => Some(Flag::FilenamesOnly),
            'h' => Some(Flag::HideNames),
            'i' => Some(Flag::CaseInsensitive),
            'l' => Some(Flag::ListNames),
            'n' => Some(Flag::NumberedLines),
            'o' => Some(Flag::WholeWord),
            'v' => Some(Flag::Negate),
            'r' => Some(Flag::Recursive),
            _ => None,
        }
    }

    /// The option letter for this flag.
    pub fn letter(self) -> char {
        match self {
            Flag::AllFiletypes => 'a',
            Flag::Count => 'c',
            Flag::DirsOnly => 'd',
            Flag::FilenamesOnly => 'f',
            Flag::HideNames => 'h',
            Flag::CaseInsensitive => 'i',
            Flag::ListNames => 'l',
            Flag::NumberedLines => 'n',
            Flag::WholeWord => 'o',
            Flag::Negate => 'v',
            Flag::Recursive => 'r',
        }
    }
}

/// Letters understood only by the surrounding display/export layer.
///
/// The parser accepts and records them so a full query round-trips, but the
/// engine never acts on them.
const DISPLAY_LETTERS: &[char] = &['m', 'p', 's', 't', 'w'];

/// One `[options] 'pattern' [/path]` unit of a pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Engine flags for this stage.
    pub flags: BTreeSet<Flag>,
    /// Display-layer letters carried through unexamined.
    pub display: BTreeSet<char>,
    /// Display-layer truncation count (numeric option token), unused here.
    pub limit: Option<usize>,
    /// The raw pattern text as written between the quotes.
    pub pattern: String,
    /// The pattern compiled once, with the case flag folded in.
    pub regex: Regex,
    /// The pattern anchored to the full string (`^(?:pat)$`), for
    /// whole-word and whole-name tests. Compiled once alongside `regex`.
    pub exact: Regex,
    /// Search target; present on the first stage only.
    pub target: Option<PathBuf>,
}

impl Stage {
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Parse a full query string into its ordered list of stages.
pub fn parse_query(input: &str) -> Result<Vec<Stage>, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::EmptyQuery);
    }

    input
        .split(STAGE_SEPARATOR)
        .enumerate()
        .map(|(index, raw)| parse_stage(raw, index))
        .collect()
}

/// Parse one stage. `index` is the zero-based stage position, used both for
/// error reporting and to reject targets on later stages.
fn parse_stage(raw: &str, index: usize) -> Result<Stage, ParseError> {
    let stage_no = index + 1;
    let mut rest = raw.trim_start();

    let mut flags = BTreeSet::new();
    let mut display = BTreeSet::new();
    let mut limit = None;

    while let Some(token_body) = rest.strip_prefix('-') {
        let end = token_body
            .find(char::is_whitespace)
            .unwrap_or(token_body.len());
        let token = &token_body[..end];
        if token.is_empty() {
            return Err(ParseError::BadOptionChar {
                stage: stage_no,
                ch: '-',
            });
        }

        let mut digits = String::new();
        for ch in token.chars() {
            if let Some(flag) = Flag::from_letter(ch) {
                flags.insert(flag);
            } else if DISPLAY_LETTERS.contains(&ch) {
                display.insert(ch);
            } else if ch.is_ascii_digit() {
                digits.push(ch);
            } else if ch.is_ascii_lowercase() {
                return Err(ParseError::UnknownOption {
                    stage: stage_no,
                    ch,
                });
            } else {
                return Err(ParseError::BadOptionChar {
                    stage: stage_no,
                    ch,
                });
            }
        }
        if !digits.is_empty() {
            limit = digits.parse().ok();
        }

        rest = token_body[end..].trim_start();
    }

    // Pattern block: '<pattern>'
    let Some(after_open) = rest.strip_prefix('\'') else {
        return Err(ParseError::MissingPattern { stage: stage_no });
    };
    let Some(close) = after_open.find('\'') else {
        return Err(ParseError::UnbalancedQuotes { stage: stage_no });
    };
    if close == 0 {
        return Err(ParseError::MissingPattern { stage: stage_no });
    }
    let pattern = &after_open[..close];

    let tail = after_open[close + 1..].trim();
    if tail.contains('\'') {
        return Err(ParseError::UnbalancedQuotes { stage: stage_no });
    }

    // Optional /<path> target, first stage only.
    let target = if tail.is_empty() {
        None
    } else if let Some(path) = tail.strip_prefix('/') {
        if index != 0 {
            return Err(ParseError::TargetInLaterStage { stage: stage_no });
        }
        Some(decode_target(path))
    } else {
        return Err(ParseError::TrailingInput {
            stage: stage_no,
            rest: tail.to_string(),
        });
    };

    let case_insensitive = flags.contains(&Flag::CaseInsensitive);
    let regex = build_regex(pattern, case_insensitive, stage_no)?;
    let exact = build_regex(&format!("^(?:{pattern})$"), case_insensitive, stage_no)?;

    Ok(Stage {
        flags,
        display,
        limit,
        pattern: pattern.to_string(),
        regex,
        exact,
        target,
    })
}

fn build_regex(pattern: &str, case_insensitive: bool, stage: usize) -> Result<Regex, ParseError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| ParseError::InvalidPattern { stage, source })
}

/// Translate a query target into a host path.
///
/// The leading `/` of the target block is a sigil, not a filesystem root:
/// `/src` names the relative path `src`. A doubled slash keeps the path
/// absolute (`//etc/hosts` → `/etc/hosts`).
fn decode_target(path: &str) -> PathBuf {
    PathBuf::from(path.trim_end())
}
