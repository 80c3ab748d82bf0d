use anyhow::Result;
use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

Copyright (c) 2025 InkyQuill
License: MIT
Source: https://github.com/InkyQuill/grepx
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "grepx")]
#[command(about = "Chainable regex search over a filesystem subtree, with safe find-and-replace")]
#[command(long_about = "grepx runs small chainable queries over the files below a directory.

A query is zero or more dash-prefixed option letters, a single-quoted
regular expression, and an optional /target path. Stages chained with
' -}} ' refine the previous stage's file set: find files matching A,
keep those also matching B, return C's detail for each survivor.

OPTION LETTERS:
  -a  consider all filenames, not just text-type extensions
  -c  count matching lines per file
  -d  match directory names only
  -f  match filenames only (contents never read)
  -h  show matched lines without filenames
  -i  case-insensitive matching
  -l  list files containing a match
  -n  pair matched lines with their zero-based line numbers
  -o  whole word (or whole name) must match
  -r  recurse through the whole subtree
  -v  invert the match

The target path starts with a slash sigil: '/src' is the relative
directory src, '//etc' is the absolute /etc. When a query names no
target, the session default (-C, or default_target from the config
file) is used and a warning is logged once.

EXAMPLES:
  grepx \"-i -r 'zebra' /delicious\"                 Recursive content search
  grepx \"-f 'zebra' /zoo -}} 'meat' -}} -c 'meat'\"  Chained refinement
  grepx sub 'meat' 'tofu' menu.txt                  Interactive replace
  grepx sub -y 'meat' 'tofu' --query \"-f -r 'menu' /zoo\"")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    /// Query to run, e.g. "-i -r 'pattern' /dir"
    #[arg(value_name = "QUERY", allow_hyphen_values = true)]
    query: Option<String>,

    /// Directory used when the query names no /target path
    #[arg(short = 'C', long, value_name = "DIR")]
    directory: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find and replace across files
    #[command(long_about = "Search for a regex in files and replace it.

The working file set is either the FILE arguments or, with --query, the
flat file list a query resolves to. Each match is shown and confirmed on
stdin unless --yes replaces everything silently.

Rewritten files get SUFFIX inserted before their extension ('_sed' by
default), de-duplicated with _0, _1, ... so nothing is overwritten. An
empty suffix rewrites files IN PLACE; that is destructive and cannot be
undone.

EXAMPLES:
  grepx sub 'ludd' 'eehive' notes.txt               Ask per match
  grepx sub -y 'meat' 'tofu' a.txt b.txt            Replace silently
  grepx sub -y --suffix '' 'meat' 'tofu' menu.txt   Overwrite in place")]
    Sub {
        /// Regular expression to find
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Replacement text ($1 and ${name} expand capture groups)
        #[arg(value_name = "REPLACEMENT")]
        replacement: String,

        /// Files to rewrite
        #[arg(value_name = "FILE", conflicts_with = "query")]
        files: Vec<String>,

        /// Resolve the working file set from a query instead of FILE arguments
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,

        /// Apply every replacement without prompting
        #[arg(short = 'y', long)]
        yes: bool,

        /// Suffix inserted before the extension of rewritten files
        #[arg(long, value_name = "SUFFIX")]
        #[arg(help = "Suffix inserted before the extension of rewritten files\nAn empty suffix overwrites sources in place (cannot be undone!)")]
        suffix: Option<String>,

        /// Case-insensitive matching
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Directory used when --query names no /target path
        #[arg(short = 'C', long, value_name = "DIR")]
        directory: Option<String>,
    },

    /// Show the configuration file location, creating it if needed
    Config {
        /// Print the debug log file path instead
        #[arg(long)]
        log_path: bool,
    },
}

/// Parsed command line, decoupled from clap for the rest of the binary.
pub enum Args {
    Search {
        query: String,
        directory: Option<String>,
    },
    Substitute {
        pattern: String,
        replacement: String,
        files: Vec<String>,
        query: Option<String>,
        yes: bool,
        suffix: Option<String>,
        ignore_case: bool,
        directory: Option<String>,
    },
    Config {
        log_path: bool,
    },
}

pub fn parse_args() -> Result<Args> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sub {
            pattern,
            replacement,
            files,
            query,
            yes,
            suffix,
            ignore_case,
            directory,
        }) => Ok(Args::Substitute {
            pattern,
            replacement,
            files,
            query,
            yes,
            suffix,
            ignore_case,
            directory,
        }),
        Some(Commands::Config { log_path }) => Ok(Args::Config { log_path }),
        None => {
            let query = cli.query.ok_or_else(|| {
                anyhow::anyhow!("missing query; try: grepx \"-i 'pattern' /dir\" (see --help)")
            })?;
            Ok(Args::Search {
                query,
                directory: cli.directory,
            })
        }
    }
}
