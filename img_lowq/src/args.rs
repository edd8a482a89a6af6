//! Argument Resolver
//!
//! Turns the raw command-line tokens into a [`RunConfig`]. The accepted token
//! language is deliberately loose: an unflagged token becomes the directory if
//! none was given yet, unknown flags are dropped, and repeated flags resolve
//! last-wins. Tokens are normalised first and then handed to clap.

use crate::config::{RunConfig, DEFAULT_QUALITY};
use crate::gate::OutputPolicy;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
Usage:   img_lowq --dir <PATH> [--quality <1-100>] [--no-recursive] [--policy <same-format|webp>] [--size-guard]
Short:   img_lowq <PATH> [-q <QUALITY>] [-nr]";

/// Flags that consume the following token as their value.
const VALUE_FLAGS: &[&str] = &[
    "--dir",
    "-d",
    "--quality",
    "-q",
    "--policy",
    "-p",
    "--log-dir",
];

const SWITCH_FLAGS: &[&str] = &[
    "--no-recursive",
    "--size-guard",
    "--verbose",
    "-v",
    "--json",
    "--help",
    "-h",
    "--version",
    "-V",
];

#[derive(Parser, Debug)]
#[command(name = "img_lowq")]
#[command(version, about = "Write low-quality / WebP derivatives next to images in a directory tree", long_about = None)]
#[command(args_override_self = true)]
struct Cli {
    /// Image directory
    #[arg(short = 'd', long = "dir", value_name = "PATH", allow_hyphen_values = true)]
    dir: Option<PathBuf>,

    /// Output quality (1-100)
    #[arg(
        short = 'q',
        long,
        value_name = "QUALITY",
        default_value_t = DEFAULT_QUALITY,
        value_parser = parse_quality,
        allow_negative_numbers = true
    )]
    quality: i64,

    /// Only process the top-level directory (short form: -nr)
    #[arg(long)]
    no_recursive: bool,

    /// Naming/format of the derivatives
    #[arg(short = 'p', long, value_enum, default_value_t = OutputPolicy::Webp)]
    policy: OutputPolicy,

    /// Keep a derivative only if it is smaller than its source
    #[arg(long)]
    size_guard: bool,

    /// Debug-level output on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Directory for the rolling log file (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_dir: Option<PathBuf>,

    /// Image directory (when --dir is not given)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("no image directory given")]
    MissingDirectory,

    #[error(transparent)]
    Clap(#[from] clap::Error),
}

#[derive(Debug, Clone)]
pub struct ResolvedArgs {
    pub config: RunConfig,
    /// Tokens that were dropped during normalisation, for logging once
    /// the subscriber is up.
    pub ignored: Vec<String>,
}

/// Integer prefix parse: `"40"`, `" 40px"` and `"-5"` are accepted,
/// a token with no leading digits is not.
fn parse_quality(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return Err(format!("'{}' is not a number", raw));
    }
    digits[..end]
        .parse::<i64>()
        .map(|v| sign * v)
        .map_err(|e| format!("'{}': {}", raw, e))
}

/// Returns `(tokens for clap, dropped tokens)`. The first token is the
/// program name and is kept as is.
fn normalize_tokens(tokens: &[String]) -> (Vec<String>, Vec<String>) {
    let mut iter = tokens.iter();
    let mut normalized = Vec::with_capacity(tokens.len());
    let mut ignored = Vec::new();
    let mut positional_seen = false;

    normalized.push(
        iter.next()
            .cloned()
            .unwrap_or_else(|| "img_lowq".to_string()),
    );

    while let Some(token) = iter.next() {
        let token_str = token.as_str();
        let inline_value_flag = token_str
            .split_once('=')
            .map(|(name, _)| name.starts_with("--") && VALUE_FLAGS.contains(&name))
            .unwrap_or(false);

        if VALUE_FLAGS.contains(&token_str) {
            normalized.push(token.clone());
            if let Some(value) = iter.next() {
                normalized.push(value.clone());
            }
        } else if inline_value_flag || SWITCH_FLAGS.contains(&token_str) {
            normalized.push(token.clone());
        } else if token_str == "-nr" {
            normalized.push("--no-recursive".to_string());
        } else if token_str.starts_with('-') && token_str.len() > 1 {
            ignored.push(token.clone());
        } else if !positional_seen {
            positional_seen = true;
            normalized.push(token.clone());
        } else {
            ignored.push(token.clone());
        }
    }

    (normalized, ignored)
}

/// Resolve argv (program name first) into a run configuration.
pub fn resolve_args<I, T>(tokens: I) -> Result<ResolvedArgs, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
    let (normalized, ignored) = normalize_tokens(&tokens);
    let cli = Cli::try_parse_from(normalized)?;

    let directory = cli
        .dir
        .or(cli.path)
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ArgsError::MissingDirectory)?;

    Ok(ResolvedArgs {
        config: RunConfig {
            directory,
            quality: cli.quality,
            recursive: !cli.no_recursive,
            policy: cli.policy,
            size_guard: cli.size_guard,
            verbose: cli.verbose,
            json: cli.json,
            log_dir: cli.log_dir,
        },
        ignored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> Result<ResolvedArgs, ArgsError> {
        let mut tokens = vec!["img_lowq"];
        tokens.extend_from_slice(args);
        resolve_args(tokens)
    }

    #[test]
    fn test_defaults_with_dir_flag() {
        let config = resolve(&["--dir", "photos"]).unwrap().config;
        assert_eq!(config.directory, PathBuf::from("photos"));
        assert_eq!(config.quality, 40);
        assert!(config.recursive);
        assert_eq!(config.policy, OutputPolicy::Webp);
        assert!(!config.size_guard);
    }

    #[test]
    fn test_positional_directory_and_short_flags() {
        let config = resolve(&["photos", "-q", "25", "-nr"]).unwrap().config;
        assert_eq!(config.directory, PathBuf::from("photos"));
        assert_eq!(config.quality, 25);
        assert!(!config.recursive);
    }

    #[test]
    fn test_only_first_positional_becomes_directory() {
        let resolved = resolve(&["first", "second"]).unwrap();
        assert_eq!(resolved.config.directory, PathBuf::from("first"));
        assert_eq!(resolved.ignored, vec!["second".to_string()]);
    }

    #[test]
    fn test_dir_flag_wins_over_positional() {
        let config = resolve(&["first", "--dir", "second"]).unwrap().config;
        assert_eq!(config.directory, PathBuf::from("second"));

        let config = resolve(&["-d", "second", "first"]).unwrap().config;
        assert_eq!(config.directory, PathBuf::from("second"));
    }

    #[test]
    fn test_repeated_flags_last_wins() {
        let config = resolve(&["-q", "10", "--quality", "70", "-d", "a", "-d", "b"])
            .unwrap()
            .config;
        assert_eq!(config.quality, 70);
        assert_eq!(config.directory, PathBuf::from("b"));
    }

    #[test]
    fn test_unknown_flags_fall_through() {
        let resolved = resolve(&["--frobnicate", "photos", "-x"]).unwrap();
        assert_eq!(resolved.config.directory, PathBuf::from("photos"));
        assert_eq!(
            resolved.ignored,
            vec!["--frobnicate".to_string(), "-x".to_string()]
        );
    }

    #[test]
    fn test_quality_out_of_range_passes_through() {
        assert_eq!(resolve(&["p", "-q", "250"]).unwrap().config.quality, 250);
        assert_eq!(resolve(&["p", "-q", "-5"]).unwrap().config.quality, -5);
        assert_eq!(resolve(&["p", "-q", "0"]).unwrap().config.quality, 0);
    }

    #[test]
    fn test_missing_directory() {
        let err = resolve(&["-q", "30"]).unwrap_err();
        assert!(matches!(err, ArgsError::MissingDirectory));

        let err = resolve(&["--dir", ""]).unwrap_err();
        assert!(matches!(err, ArgsError::MissingDirectory));
    }

    #[test]
    fn test_policy_and_extras() {
        let config = resolve(&[
            "p",
            "--policy",
            "same-format",
            "--size-guard",
            "--json",
            "-v",
            "--log-dir=/tmp/logs",
        ])
        .unwrap()
        .config;
        assert_eq!(config.policy, OutputPolicy::SameFormat);
        assert!(config.size_guard);
        assert!(config.json);
        assert!(config.verbose);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        // main exits 0 through clap for these
        let err = resolve(&["--help"]).unwrap_err();
        assert!(matches!(err, ArgsError::Clap(ref e) if !e.use_stderr()));
    }

    #[test]
    fn test_non_numeric_quality_is_rejected() {
        let err = resolve(&["p", "-q", "high"]).unwrap_err();
        assert!(matches!(err, ArgsError::Clap(_)));
    }

    #[test]
    fn test_parse_quality_prefix() {
        assert_eq!(parse_quality("40"), Ok(40));
        assert_eq!(parse_quality(" 40px"), Ok(40));
        assert_eq!(parse_quality("+7"), Ok(7));
        assert_eq!(parse_quality("-12"), Ok(-12));
        assert!(parse_quality("abc").is_err());
        assert!(parse_quality("").is_err());
    }

    #[test]
    fn test_normalize_keeps_program_name() {
        let tokens: Vec<String> = vec!["/usr/bin/img_lowq".into(), "-nr".into()];
        let (normalized, ignored) = normalize_tokens(&tokens);
        assert_eq!(normalized, vec!["/usr/bin/img_lowq", "--no-recursive"]);
        assert!(ignored.is_empty());
    }
}
