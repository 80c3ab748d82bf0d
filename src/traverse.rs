//! Traversal engine
//!
//! Evaluates one stage against a target that is either a directory or a
//! single file, and produces exactly one `QueryResult` variant. The variant
//! is a function of the stage's flags alone, with fixed precedence:
//! dirs-only > filenames-only > count > hide-names > numbered-lines >
//! list-names > default per-file line map. A single-file target returns the
//! same variant a directory target would, scoped to that one file — the
//! chain coordinator relies on this to reuse the engine as its per-candidate
//! refinement unit.
//!
//! One bad entry never aborts a scan: unlistable directories and
//! undecodable files are logged and skipped, and a missing target yields an
//! empty result of the stage's shape.

use crate::decode;
use crate::matcher::Matcher;
use crate::query::{Flag, Stage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as text files when scanning a directory. Filenames
/// outside this list are ignored unless the all-filetypes flag is set (and
/// contents are only ever read for allow-listed files). The comparison is
/// ASCII case-insensitive.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "py", "ipynb", "json", "js", "htm", "html", "css", "csv", "tsv", "r", "rmd", "sql",
    "fwf", "c", "cpp", "bat", "rs", "toml", "md", "yaml", "yml",
];

/// Whether a file's extension is on the text-type allow-list.
pub fn is_text_type(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            TEXT_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
}

/// The single result variant produced by one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryResult {
    /// Matching file paths (filenames-only or list-names).
    Files(Vec<PathBuf>),
    /// Matching directory paths (dirs-only).
    Dirs(Vec<PathBuf>),
    /// File → ordered matching lines (default).
    Lines(BTreeMap<PathBuf, Vec<String>>),
    /// File → ordered (zero-based line index, line) pairs.
    NumberedLines(BTreeMap<PathBuf, Vec<(usize, String)>>),
    /// File → number of matching lines.
    Counts(BTreeMap<PathBuf, usize>),
    /// Matching lines with their filenames hidden.
    FlatLines(Vec<String>),
    /// Matching (zero-based line index, line) pairs, filenames hidden.
    FlatNumberedLines(Vec<(usize, String)>),
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries (paths, map keys, or flat lines).
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Files(v) | QueryResult::Dirs(v) => v.len(),
            QueryResult::Lines(m) => m.len(),
            QueryResult::NumberedLines(m) => m.len(),
            QueryResult::Counts(m) => m.len(),
            QueryResult::FlatLines(v) => v.len(),
            QueryResult::FlatNumberedLines(v) => v.len(),
        }
    }

    /// The flat collection of file paths this variant contains: list items
    /// for path-shaped variants, map keys otherwise. The flat line variants
    /// carry no paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            QueryResult::Files(v) | QueryResult::Dirs(v) => v,
            QueryResult::Lines(m) => m.into_keys().collect(),
            QueryResult::NumberedLines(m) => m.into_keys().collect(),
            QueryResult::Counts(m) => m.into_keys().collect(),
            QueryResult::FlatLines(_) | QueryResult::FlatNumberedLines(_) => Vec::new(),
        }
    }
}

/// Result shape selected by a stage's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Dirs,
    Filenames,
    Content(ContentShape),
}

/// Shapes that require reading file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Counts,
    FlatLines,
    FlatNumberedLines,
    NumberedLines,
    MatchingFiles,
    Lines,
}

impl Shape {
    pub fn of(stage: &Stage) -> Shape {
        if stage.has(Flag::DirsOnly) {
            Shape::Dirs
        } else if stage.has(Flag::FilenamesOnly) {
            Shape::Filenames
        } else if stage.has(Flag::Count) {
            Shape::Content(ContentShape::Counts)
        } else if stage.has(Flag::HideNames) {
            if stage.has(Flag::NumberedLines) {
                Shape::Content(ContentShape::FlatNumberedLines)
            } else {
                Shape::Content(ContentShape::FlatLines)
            }
        } else if stage.has(Flag::NumberedLines) {
            Shape::Content(ContentShape::NumberedLines)
        } else if stage.has(Flag::ListNames) {
            Shape::Content(ContentShape::MatchingFiles)
        } else {
            Shape::Content(ContentShape::Lines)
        }
    }
}

/// The empty result of a given shape, used for missing targets and for
/// pipelines whose candidate set ran dry.
pub fn empty_result(shape: Shape) -> QueryResult {
    match shape {
        Shape::Dirs => QueryResult::Dirs(Vec::new()),
        Shape::Filenames => QueryResult::Files(Vec::new()),
        Shape::Content(ContentShape::Counts) => QueryResult::Counts(BTreeMap::new()),
        Shape::Content(ContentShape::FlatLines) => QueryResult::FlatLines(Vec::new()),
        Shape::Content(ContentShape::FlatNumberedLines) => {
            QueryResult::FlatNumberedLines(Vec::new())
        }
        Shape::Content(ContentShape::NumberedLines) => QueryResult::NumberedLines(BTreeMap::new()),
        Shape::Content(ContentShape::MatchingFiles) => QueryResult::Files(Vec::new()),
        Shape::Content(ContentShape::Lines) => QueryResult::Lines(BTreeMap::new()),
    }
}

/// Evaluate one stage against one target.
///
/// The stage's predicates are built once here and reused for every entry
/// the traversal visits.
pub fn run_stage(stage: &Stage, target: &Path) -> QueryResult {
    let matcher = Matcher::for_stage(stage);
    let shape = Shape::of(stage);

    if target.is_file() {
        scan_file_target(stage, &matcher, shape, target)
    } else if target.is_dir() {
        match shape {
            Shape::Dirs => QueryResult::Dirs(scan_dirs(stage, &matcher, target)),
            Shape::Filenames => QueryResult::Files(scan_filenames(stage, &matcher, target)),
            Shape::Content(content) => {
                let hits = scan_directory_contents(stage, &matcher, target);
                content_result(content, hits)
            }
        }
    } else {
        tracing::warn!("target {} is missing or not a readable path", target.display());
        empty_result(shape)
    }
}

/// Run the chosen mode directly against one explicitly named file. The
/// text-type allow-list does not apply here; an explicit file is always
/// considered.
fn scan_file_target(
    _stage: &Stage,
    matcher: &Matcher,
    shape: Shape,
    file: &Path,
) -> QueryResult {
    match shape {
        // A file is never a directory match.
        Shape::Dirs => QueryResult::Dirs(Vec::new()),
        Shape::Filenames => {
            if matcher.name_matches(&name_of(file)) {
                QueryResult::Files(vec![file.to_path_buf()])
            } else {
                QueryResult::Files(Vec::new())
            }
        }
        Shape::Content(content) => {
            let mut hits = BTreeMap::new();
            if let Some(text) = decode::read_tolerant(file) {
                let matched = scan_lines(&text, matcher);
                if !matched.is_empty() {
                    hits.insert(file.to_path_buf(), matched);
                }
            }
            content_result(content, hits)
        }
    }
}

/// Directory-only mode: the target itself and its child directories (all
/// descendants when recursive). File contents are never read.
fn scan_dirs(stage: &Stage, matcher: &Matcher, target: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if matcher.name_matches(&name_of(target)) {
        dirs.push(target.to_path_buf());
    }

    if stage.has(Flag::Recursive) {
        for entry in walk_entries(target) {
            if entry.file_type().is_dir()
                && matcher.name_matches(&entry.file_name().to_string_lossy())
            {
                dirs.push(entry.into_path());
            }
        }
    } else {
        for entry in list_dir(target) {
            let path = entry.path();
            if path.is_dir() && matcher.name_matches(&name_of(&path)) {
                dirs.push(path);
            }
        }
    }
    dirs
}

/// Filename mode: name predicate over filenames, allow-listed unless the
/// all-filetypes flag is set. Contents are never read.
fn scan_filenames(stage: &Stage, matcher: &Matcher, target: &Path) -> Vec<PathBuf> {
    let all = stage.has(Flag::AllFiletypes);
    list_files(target, stage.has(Flag::Recursive))
        .into_iter()
        .filter(|file| all || is_text_type(file))
        .filter(|file| matcher.name_matches(&name_of(file)))
        .collect()
}

/// Content mode over a directory: decode each allow-listed file and record
/// every line where the content predicate holds, with its zero-based index.
fn scan_directory_contents(
    stage: &Stage,
    matcher: &Matcher,
    target: &Path,
) -> BTreeMap<PathBuf, Vec<(usize, String)>> {
    let mut hits = BTreeMap::new();
    for file in list_files(target, stage.has(Flag::Recursive)) {
        if !is_text_type(&file) {
            continue;
        }
        let Some(text) = decode::read_tolerant(&file) else {
            continue;
        };
        let matched = scan_lines(&text, matcher);
        if !matched.is_empty() {
            hits.insert(file, matched);
        }
    }
    hits
}

fn scan_lines(text: &str, matcher: &Matcher) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| matcher.line_matches(line))
        .map(|(index, line)| (index, line.to_string()))
        .collect()
}

/// Reduce the canonical per-file hit map to the requested content shape.
fn content_result(
    shape: ContentShape,
    hits: BTreeMap<PathBuf, Vec<(usize, String)>>,
) -> QueryResult {
    match shape {
        ContentShape::Counts => {
            QueryResult::Counts(hits.into_iter().map(|(f, v)| (f, v.len())).collect())
        }
        ContentShape::FlatLines => QueryResult::FlatLines(
            hits.into_values()
                .flatten()
                .map(|(_, line)| line)
                .collect(),
        ),
        ContentShape::FlatNumberedLines => {
            QueryResult::FlatNumberedLines(hits.into_values().flatten().collect())
        }
        ContentShape::NumberedLines => QueryResult::NumberedLines(hits),
        ContentShape::MatchingFiles => QueryResult::Files(hits.into_keys().collect()),
        ContentShape::Lines => QueryResult::Lines(
            hits.into_iter()
                .map(|(f, v)| (f, v.into_iter().map(|(_, line)| line).collect()))
                .collect(),
        ),
    }
}

/// Final path component, falling back to the whole path for targets such
/// as `.` that have no file name.
fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Recursive walk below `target`, logging and skipping unreadable entries.
fn walk_entries(target: &Path) -> impl Iterator<Item = walkdir::DirEntry> + use<> {
    let root = target.to_path_buf();
    WalkDir::new(target)
        .min_depth(1)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry under {}: {}", root.display(), err);
                None
            }
        })
}

/// Single-level listing, logging and skipping unreadable entries. An
/// unlistable target produces an empty listing.
fn list_dir(target: &Path) -> Vec<fs::DirEntry> {
    match fs::read_dir(target) {
        Ok(entries) => entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("skipping entry in {}: {}", target.display(), err);
                    None
                }
            })
            .collect(),
        Err(err) => {
            tracing::warn!("cannot list {}: {}", target.display(), err);
            Vec::new()
        }
    }
}

fn list_files(target: &Path, recursive: bool) -> Vec<PathBuf> {
    if recursive {
        walk_entries(target)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    } else {
        list_dir(target)
            .into_iter()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .map(|entry| entry.path())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use std::fs;
    use tempfile::TempDir;

    fn stage(query: &str) -> Stage {
        parse_query(query).unwrap().remove(0)
    }

    /// delicious/
    ///   blue.txt     ("meat pie" / "tofu stew" / "more meat")
    ///   red.csv      ("meat,1")
    ///   notes.log    (not allow-listed)
    ///   cellar/
    ///     deep.txt   ("meat again")
    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("delicious");
        fs::create_dir_all(root.join("cellar")).unwrap();
        fs::write(root.join("blue.txt"), "meat pie\ntofu stew\nmore meat\n").unwrap();
        fs::write(root.join("red.csv"), "meat,1\n").unwrap();
        fs::write(root.join("notes.log"), "meat in a log file\n").unwrap();
        fs::write(root.join("cellar/deep.txt"), "meat again\n").unwrap();
        dir
    }

    #[test]
    fn test_is_text_type() {
        assert!(is_text_type(Path::new("a.txt")));
        assert!(is_text_type(Path::new("a.TXT")));
        assert!(is_text_type(Path::new("b.Rmd")));
        assert!(!is_text_type(Path::new("a.log")));
        assert!(!is_text_type(Path::new("Makefile")));
    }

    #[test]
    fn test_content_mode_default_line_map() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("'meat'"), &target);

        let QueryResult::Lines(map) = result else {
            panic!("expected Lines, got {:?}", result);
        };
        // notes.log is not allow-listed; cellar/ needs -r.
        assert_eq!(map.len(), 2);
        assert_eq!(
            map[&target.join("blue.txt")],
            vec!["meat pie".to_string(), "more meat".to_string()]
        );
        assert_eq!(map[&target.join("red.csv")], vec!["meat,1".to_string()]);
    }

    #[test]
    fn test_content_mode_recursive() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-r 'meat'"), &target);

        let QueryResult::Lines(map) = result else {
            panic!("expected Lines");
        };
        assert!(map.contains_key(&target.join("cellar/deep.txt")));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_numbered_lines_zero_based() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-n 'meat'"), &target);

        let QueryResult::NumberedLines(map) = result else {
            panic!("expected NumberedLines");
        };
        assert_eq!(
            map[&target.join("blue.txt")],
            vec![(0, "meat pie".to_string()), (2, "more meat".to_string())]
        );
    }

    #[test]
    fn test_count_mode() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-c 'meat'"), &target);

        let QueryResult::Counts(map) = result else {
            panic!("expected Counts");
        };
        assert_eq!(map[&target.join("blue.txt")], 2);
        assert_eq!(map[&target.join("red.csv")], 1);
    }

    #[test]
    fn test_hide_names_flattens() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-h 'meat'"), &target);

        let QueryResult::FlatLines(mut lines) = result else {
            panic!("expected FlatLines");
        };
        lines.sort();
        assert_eq!(lines, vec!["meat pie", "meat,1", "more meat"]);
    }

    #[test]
    fn test_hide_names_with_numbers() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-h -n 'tofu'"), &target);
        assert_eq!(
            result,
            QueryResult::FlatNumberedLines(vec![(1, "tofu stew".to_string())])
        );
    }

    #[test]
    fn test_list_names_mode() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-l 'tofu'"), &target);
        assert_eq!(result, QueryResult::Files(vec![target.join("blue.txt")]));
    }

    #[test]
    fn test_filename_mode_respects_allow_list() {
        let dir = fixture();
        let target = dir.path().join("delicious");

        let result = run_stage(&stage("-f 'notes'"), &target);
        assert_eq!(result, QueryResult::Files(Vec::new()));

        let result = run_stage(&stage("-f -a 'notes'"), &target);
        assert_eq!(result, QueryResult::Files(vec![target.join("notes.log")]));
    }

    #[test]
    fn test_filename_mode_never_reads_contents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().to_path_buf();
        // Undecodable bytes, but filename mode must not care.
        fs::write(target.join("garbled.txt"), [0x81u8, 0x98, 0x81]).unwrap();

        let result = run_stage(&stage("-f 'garbled'"), &target);
        assert_eq!(result, QueryResult::Files(vec![target.join("garbled.txt")]));
    }

    #[test]
    fn test_dirs_only_matches_target_and_children() {
        let dir = fixture();
        let target = dir.path().join("delicious");

        let result = run_stage(&stage("-d 'cellar'"), &target);
        assert_eq!(result, QueryResult::Dirs(vec![target.join("cellar")]));

        let result = run_stage(&stage("-d 'delicious'"), &target);
        assert_eq!(result, QueryResult::Dirs(vec![target.clone()]));
    }

    #[test]
    fn test_dirs_only_recursive() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        fs::create_dir_all(target.join("cellar/subcellar")).unwrap();

        let result = run_stage(&stage("-d -r 'cellar'"), &target);
        let QueryResult::Dirs(mut dirs) = result else {
            panic!("expected Dirs");
        };
        dirs.sort();
        assert_eq!(
            dirs,
            vec![target.join("cellar"), target.join("cellar/subcellar")]
        );
    }

    #[test]
    fn test_dirs_only_ignores_undecodable_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("vault");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("broken.txt"), [0x81u8, 0x98, 0x81]).unwrap();

        let result = run_stage(&stage("-d 'vault'"), &target);
        assert_eq!(result, QueryResult::Dirs(vec![target]));
    }

    #[test]
    fn test_single_file_target_content() {
        let dir = fixture();
        let file = dir.path().join("delicious/blue.txt");
        let result = run_stage(&stage("'tofu'"), &file);

        let QueryResult::Lines(map) = result else {
            panic!("expected Lines");
        };
        assert_eq!(map.len(), 1);
        assert_eq!(map[&file], vec!["tofu stew".to_string()]);
    }

    #[test]
    fn test_single_file_target_filename_mode_skips_allow_list() {
        let dir = fixture();
        let file = dir.path().join("delicious/notes.log");
        let result = run_stage(&stage("-f 'notes'"), &file);
        assert_eq!(result, QueryResult::Files(vec![file]));
    }

    #[test]
    fn test_missing_target_yields_empty_result() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("no_such_dir");
        let result = run_stage(&stage("'meat'"), &target);
        assert_eq!(result, QueryResult::Lines(BTreeMap::new()));

        let result = run_stage(&stage("-f 'meat'"), &target);
        assert_eq!(result, QueryResult::Files(Vec::new()));
    }

    #[test]
    fn test_undecodable_file_skipped_scan_continues() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().to_path_buf();
        fs::write(target.join("broken.txt"), [0x81u8, 0x98, 0x81]).unwrap();
        fs::write(target.join("fine.txt"), "meat\n").unwrap();

        let result = run_stage(&stage("'meat'"), &target);
        let QueryResult::Lines(map) = result else {
            panic!("expected Lines");
        };
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&target.join("fine.txt")));
    }

    #[test]
    fn test_negate_content_mode() {
        let dir = fixture();
        let target = dir.path().join("delicious");
        let result = run_stage(&stage("-v 'meat'"), &target);

        let QueryResult::Lines(map) = result else {
            panic!("expected Lines");
        };
        assert_eq!(map[&target.join("blue.txt")], vec!["tofu stew".to_string()]);
        // red.csv's only line matches 'meat', so it contributes nothing.
        assert!(!map.contains_key(&target.join("red.csv")));
    }
}
