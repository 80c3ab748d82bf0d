//! Substitution engine
//!
//! Span-tracked find/replace over a working file set, with an injectable
//! decision strategy. The working set comes from an explicit file, an
//! explicit list, or a query string resolved through the traversal engine.
//!
//! Per file, matches are located in document order and walked with a
//! cursor that tracks the end of the previously processed match, so text
//! between matches is always copied through unchanged. A file with zero
//! matches produces no output file at all. With a non-empty mangle suffix
//! the result is written to `<stem><suffix><ext>` (de-duplicated); an
//! empty suffix overwrites the original in place, which is destructive and
//! irreversible.

use crate::chain::{Session, run_query};
use crate::decode;
use crate::error::{Error, Result};
use crate::output_name;
use colored::Colorize;
use regex::Regex;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix inserted before the extension of rewritten files when the caller
/// does not choose one.
pub const DEFAULT_NAME_MANGLE: &str = "_sed";

/// Outcome of one interactive substitution prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Replace this match and move to the next one.
    Apply,
    /// Stop prompting for this file; the rest of it is copied unchanged,
    /// and whatever was accumulated is still written.
    SkipRestOfFile,
    /// Discard all accumulated edits for this file; nothing is written.
    AbortFile,
    /// Replace this match and every remaining match in this file and every
    /// later file in the batch, without further prompts. Sticky for the
    /// rest of the run.
    ApplyAllRemaining,
}

/// Strategy supplying decisions. The engine's sole suspension point is a
/// call to `decide`, so a non-interactive caller plugs in [`AlwaysApply`]
/// without touching the rewrite loop.
pub trait DecisionSource {
    fn decide(&mut self, file: &Path, matched: &str, replacement: &str) -> io::Result<Decision>;
}

/// Applies every match without asking.
pub struct AlwaysApply;

impl DecisionSource for AlwaysApply {
    fn decide(&mut self, _file: &Path, _matched: &str, _replacement: &str) -> io::Result<Decision> {
        Ok(Decision::Apply)
    }
}

/// Blocking stdin prompt, the interactive default.
pub struct StdinPrompt;

impl DecisionSource for StdinPrompt {
    fn decide(&mut self, file: &Path, matched: &str, replacement: &str) -> io::Result<Decision> {
        loop {
            println!(
                "\n{}: replace {} with {}?",
                file.display().to_string().bold().cyan(),
                format!("{:?}", matched).red(),
                format!("{:?}", replacement).green(),
            );
            print!("[y]es / [s]kip rest of file / [a]bort file / [!] apply all remaining: ");
            io::stdout().flush()?;

            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                // stdin closed mid-prompt: abandon this file's edits.
                return Ok(Decision::AbortFile);
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" | "1" => return Ok(Decision::Apply),
                "s" | "skip" => return Ok(Decision::SkipRestOfFile),
                "a" | "abort" | "q" => return Ok(Decision::AbortFile),
                "!" | "all" | "99" => return Ok(Decision::ApplyAllRemaining),
                other => println!("Unrecognized choice {:?}. Try again.", other),
            }
        }
    }
}

/// How the working file list is supplied.
#[derive(Debug, Clone)]
pub enum FileSet {
    Single(PathBuf),
    List(Vec<PathBuf>),
    /// A query string resolved through the traversal engine; the flat
    /// paths of its result become the working list.
    Query(String),
}

/// What one substitution run did.
#[derive(Debug, Default)]
pub struct SubstituteReport {
    pub files_seen: usize,
    pub written: Vec<PathBuf>,
    pub aborted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub replacements: usize,
}

/// Per-file rewrite outcome.
enum Rewrite {
    /// No matches; disk state untouched, no output file.
    Untouched,
    /// User abandoned this file's edits.
    Aborted,
    Replaced { text: String, replacements: usize },
}

/// States of the per-file rewrite pass. The decision transition out of
/// `AwaitingDecision` is the only suspension point.
enum PassState {
    Scanning,
    AwaitingDecision {
        start: usize,
        end: usize,
    },
    Applying {
        end: usize,
        proposed: String,
        rest_silently: bool,
    },
    Aborted,
    Done,
}

/// Compiled find/replace directive plus output naming policy.
pub struct Substitutor {
    pattern: Regex,
    replacement: String,
    name_mangle: String,
}

impl Substitutor {
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
            name_mangle: DEFAULT_NAME_MANGLE.to_string(),
        }
    }

    /// Set the suffix inserted before the extension of rewritten files.
    /// An empty suffix overwrites sources in place. Destructive: there is
    /// no backup and no undo.
    pub fn with_name_mangle(mut self, suffix: impl Into<String>) -> Self {
        self.name_mangle = suffix.into();
        self
    }

    /// Interactive run: every match is routed through `decisions`.
    pub fn run(
        &self,
        files: FileSet,
        session: &mut Session,
        decisions: &mut dyn DecisionSource,
    ) -> Result<SubstituteReport> {
        self.run_inner(files, session, decisions, false)
    }

    /// Silent run: every match in every file is replaced in one pass.
    pub fn run_silent(&self, files: FileSet, session: &mut Session) -> Result<SubstituteReport> {
        self.run_inner(files, session, &mut AlwaysApply, true)
    }

    fn run_inner(
        &self,
        files: FileSet,
        session: &mut Session,
        decisions: &mut dyn DecisionSource,
        mut silent_all: bool,
    ) -> Result<SubstituteReport> {
        let files = self.resolve_files(files, session)?;
        if files.is_empty() {
            tracing::warn!("no files found to rewrite");
        }

        let mut report = SubstituteReport::default();
        for file in files {
            report.files_seen += 1;
            let Some(text) = decode::read_tolerant(&file) else {
                report.skipped.push(file);
                continue;
            };
            match self.rewrite_text(&file, &text, &mut silent_all, decisions)? {
                Rewrite::Untouched => {}
                Rewrite::Aborted => report.aborted.push(file),
                Rewrite::Replaced { text, replacements } => {
                    report.replacements += replacements;
                    match self.write_output(&file, &text) {
                        Ok(path) => report.written.push(path),
                        Err(err) => {
                            // Report and keep going with the rest of the batch.
                            tracing::error!("{}", err);
                            report.skipped.push(file);
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    fn resolve_files(&self, files: FileSet, session: &mut Session) -> Result<Vec<PathBuf>> {
        Ok(match files {
            FileSet::Single(path) => vec![path],
            FileSet::List(paths) => paths,
            FileSet::Query(query) => run_query(&query, session)?.into_paths(),
        })
    }

    /// One pass over a decoded document, driven by the state machine.
    fn rewrite_text(
        &self,
        file: &Path,
        text: &str,
        silent_all: &mut bool,
        decisions: &mut dyn DecisionSource,
    ) -> Result<Rewrite> {
        let spans: Vec<(usize, usize)> = self
            .pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        if spans.is_empty() {
            return Ok(Rewrite::Untouched);
        }

        if *silent_all {
            let replaced = self
                .pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned();
            return Ok(Rewrite::Replaced {
                text: replaced,
                replacements: spans.len(),
            });
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut replacements = 0;
        let mut spans = spans.into_iter();
        let mut state = PassState::Scanning;

        loop {
            state = match state {
                PassState::Scanning => match spans.next() {
                    Some((start, end)) => {
                        out.push_str(&text[cursor..start]);
                        PassState::AwaitingDecision { start, end }
                    }
                    None => PassState::Done,
                },
                PassState::AwaitingDecision { start, end } => {
                    let matched = &text[start..end];
                    let proposed = self
                        .pattern
                        .replace(matched, self.replacement.as_str())
                        .into_owned();
                    match decisions
                        .decide(file, matched, &proposed)
                        .map_err(Error::Prompt)?
                    {
                        Decision::Apply => PassState::Applying {
                            end,
                            proposed,
                            rest_silently: false,
                        },
                        Decision::ApplyAllRemaining => {
                            *silent_all = true;
                            PassState::Applying {
                                end,
                                proposed,
                                rest_silently: true,
                            }
                        }
                        Decision::SkipRestOfFile => {
                            out.push_str(matched);
                            cursor = end;
                            PassState::Done
                        }
                        Decision::AbortFile => PassState::Aborted,
                    }
                }
                PassState::Applying {
                    end,
                    proposed,
                    rest_silently,
                } => {
                    out.push_str(&proposed);
                    replacements += 1;
                    cursor = end;
                    if rest_silently {
                        let tail = &text[cursor..];
                        replacements += self.pattern.find_iter(tail).count();
                        out.push_str(&self.pattern.replace_all(tail, self.replacement.as_str()));
                        cursor = text.len();
                        PassState::Done
                    } else {
                        PassState::Scanning
                    }
                }
                PassState::Done => {
                    out.push_str(&text[cursor..]);
                    return Ok(Rewrite::Replaced {
                        text: out,
                        replacements,
                    });
                }
                PassState::Aborted => return Ok(Rewrite::Aborted),
            };
        }
    }

    /// Write through a temp file in the destination directory, then rename,
    /// so a failed write never leaves a truncated output behind.
    fn write_output(&self, source: &Path, text: &str) -> Result<PathBuf> {
        let path = if self.name_mangle.is_empty() {
            source.to_path_buf()
        } else {
            output_name::dedup_path(output_name::mangle_path(source, &self.name_mangle))
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |err: io::Error| Error::Write {
            path: path.clone(),
            source: err,
        };
        let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
        temp.write_all(text.as_bytes()).map_err(write_err)?;
        temp.persist(&path).map_err(|err| write_err(err.error))?;
        Ok(path)
    }
}
