use anyhow::{Context, Result};
use grepx::chain::Session;
use grepx::cli::{self, Args};
use grepx::config::{self, Config};
use grepx::substitute::{FileSet, StdinPrompt, Substitutor};
use grepx::{chain, logger};
use regex::RegexBuilder;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    let config = config::load_config().unwrap_or_default();
    config::validate_config(&config)?;
    logger::init_debug_logging(config.debug())?;

    match args {
        Args::Search { query, directory } => run_search(&query, directory, &config),
        Args::Substitute {
            pattern,
            replacement,
            files,
            query,
            yes,
            suffix,
            ignore_case,
            directory,
        } => run_substitute(
            &pattern,
            &replacement,
            files,
            query,
            yes,
            suffix,
            ignore_case,
            directory,
            &config,
        ),
        Args::Config { log_path } => show_config(log_path),
    }
}

fn session_for(directory: Option<String>, config: &Config) -> Session {
    let default_target = directory
        .map(PathBuf::from)
        .unwrap_or_else(|| config.default_target());
    Session::new(default_target)
}

fn run_search(query: &str, directory: Option<String>, config: &Config) -> Result<()> {
    let mut session = session_for(directory, config);
    let result = chain::run_query(query, &mut session)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_substitute(
    pattern: &str,
    replacement: &str,
    files: Vec<String>,
    query: Option<String>,
    yes: bool,
    suffix: Option<String>,
    ignore_case: bool,
    directory: Option<String>,
    config: &Config,
) -> Result<()> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .with_context(|| format!("Invalid regex pattern: {}", pattern))?;

    let suffix = suffix.unwrap_or_else(|| config.name_mangle());
    if suffix.is_empty() {
        eprintln!("Warning: empty suffix rewrites files in place. This cannot be undone.");
    }

    let file_set = match query {
        Some(query) => FileSet::Query(query),
        None if files.is_empty() => {
            anyhow::bail!("no FILE arguments and no --query; nothing to rewrite")
        }
        None => FileSet::List(files.into_iter().map(PathBuf::from).collect()),
    };

    let substitutor = Substitutor::new(regex, replacement).with_name_mangle(suffix);
    let mut session = session_for(directory, config);

    let report = if yes {
        substitutor.run_silent(file_set, &mut session)?
    } else {
        substitutor.run(file_set, &mut session, &mut StdinPrompt)?
    };

    println!(
        "\n{} file(s) seen, {} replacement(s), {} file(s) written",
        report.files_seen,
        report.replacements,
        report.written.len()
    );
    for path in &report.written {
        println!("  wrote {}", path.display());
    }
    if !report.aborted.is_empty() {
        println!("{} file(s) aborted", report.aborted.len());
    }
    if !report.skipped.is_empty() {
        println!("{} file(s) skipped (unreadable or unwritable)", report.skipped.len());
    }
    Ok(())
}

fn show_config(log_path: bool) -> Result<()> {
    if log_path {
        println!("{}", logger::get_log_path()?.display());
    } else {
        // Creates the commented template on first use.
        config::load_config()?;
        println!("{}", config::config_file_path()?.display());
    }
    Ok(())
}
