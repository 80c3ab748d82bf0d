//! Property-based tests for grepx
//!
//! This module uses proptest to verify core invariants of the query and
//! substitution engines. Property-based testing generates hundreds of
//! random inputs to verify that certain properties always hold true.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use grepx::output_name::dedup_path;
use grepx::{QueryResult, Session, Substitutor, parse_query, run_stage};

// Import proptest macro
use proptest::prelude::*;

/// Matched zero-based line indexes of a single-file numbered query.
fn matched_indexes(query: &str, file: &Path) -> BTreeSet<usize> {
    let stage = parse_query(query).unwrap().remove(0);
    match run_stage(&stage, file) {
        QueryResult::NumberedLines(map) => map
            .get(file)
            .map(|lines| lines.iter().map(|(index, _)| *index).collect())
            .unwrap_or_default(),
        other => panic!("expected NumberedLines, got {:?}", other),
    }
}

// ============================================================================
// Property 1: Negate is an involution
// ============================================================================
// A query and its negated counterpart partition the file's lines: empty
// intersection, union equal to all lines.

proptest! {
    #[test]
    fn prop_negate_partitions_all_lines(
        lines in prop::collection::vec("[a-z ]{0,20}", 1..30),
        pattern in "[a-z]{1,3}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        let text = lines.join("\n");
        fs::write(&file_path, &text).unwrap();

        let plain = matched_indexes(&format!("-n '{}'", pattern), &file_path);
        let negated = matched_indexes(&format!("-n -v '{}'", pattern), &file_path);

        prop_assert!(plain.is_disjoint(&negated));
        let union: BTreeSet<usize> = plain.union(&negated).copied().collect();
        // Trailing empty strings vanish when joined, so count the document's
        // own lines rather than the generated vector.
        let all: BTreeSet<usize> = (0..text.lines().count()).collect();
        prop_assert_eq!(union, all);
    }

    // ========================================================================
    // Property 2: Case-insensitive matching is a superset of case-sensitive
    // ========================================================================

    #[test]
    fn prop_case_insensitive_is_superset(
        lines in prop::collection::vec("[a-zA-Z ]{0,20}", 1..30),
        pattern in "[a-z]{1,3}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, lines.join("\n")).unwrap();

        let sensitive = matched_indexes(&format!("-n '{}'", pattern), &file_path);
        let insensitive = matched_indexes(&format!("-n -i '{}'", pattern), &file_path);

        prop_assert!(sensitive.is_subset(&insensitive));
    }

    // ========================================================================
    // Property 3: Whole-word matching is a subset of substring matching
    // ========================================================================

    #[test]
    fn prop_whole_word_is_subset(
        lines in prop::collection::vec("[a-z ]{0,20}", 1..30),
        pattern in "[a-z]{1,4}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, lines.join("\n")).unwrap();

        let substring = matched_indexes(&format!("-n '{}'", pattern), &file_path);
        let whole_word = matched_indexes(&format!("-n -o '{}'", pattern), &file_path);

        prop_assert!(whole_word.is_subset(&substring));
    }

    // ========================================================================
    // Property 4: Silent substitution round-trip
    // ========================================================================
    // Replacing the single occurrence of a pattern leaves every other byte
    // of the document untouched.

    #[test]
    fn prop_substitution_touches_only_the_match(
        prefix in "[a-m \n]{0,40}",
        suffix in "[a-m \n]{0,40}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        let text = format!("{}NEEDLE{}", prefix, suffix);
        fs::write(&file_path, &text).unwrap();

        let substitutor = Substitutor::new(regex::Regex::new("NEEDLE").unwrap(), "THREAD");
        let report = substitutor
            .run_silent(
                grepx::FileSet::Single(file_path.clone()),
                &mut Session::current_dir(),
            )
            .unwrap();

        prop_assert_eq!(report.replacements, 1);
        prop_assert_eq!(report.written.len(), 1);
        let output = fs::read_to_string(&report.written[0]).unwrap();
        prop_assert_eq!(output, format!("{}THREAD{}", prefix, suffix));
        // The source file itself is untouched.
        prop_assert_eq!(fs::read_to_string(&file_path).unwrap(), text);
    }

    // ========================================================================
    // Property 5: Output name de-duplication never overwrites
    // ========================================================================

    #[test]
    fn prop_dedup_yields_distinct_paths(count in 1usize..6) {
        let temp_dir = TempDir::new().unwrap();
        let desired = temp_dir.path().join("out.txt");

        let mut written: Vec<PathBuf> = Vec::new();
        for round in 0..count {
            let path = dedup_path(desired.clone());
            fs::write(&path, format!("round {}", round)).unwrap();
            written.push(path);
        }

        let distinct: BTreeSet<&PathBuf> = written.iter().collect();
        prop_assert_eq!(distinct.len(), count);
        // Earlier outputs keep their contents.
        for (round, path) in written.iter().enumerate() {
            prop_assert_eq!(fs::read_to_string(path).unwrap(), format!("round {}", round));
        }
    }

    // ========================================================================
    // Property 6: Every returned line satisfies the content predicate
    // ========================================================================

    #[test]
    fn prop_returned_lines_contain_the_pattern(
        lines in prop::collection::vec("[a-z ]{0,20}", 1..30),
        pattern in "[a-z]{1,3}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, lines.join("\n")).unwrap();

        let stage = parse_query(&format!("'{}'", pattern)).unwrap().remove(0);
        if let QueryResult::Lines(map) = run_stage(&stage, &file_path) {
            for line in map.values().flatten() {
                prop_assert!(line.contains(&pattern));
            }
        } else {
            panic!("expected Lines");
        }
    }
}
