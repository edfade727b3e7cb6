//! # CLI Module
//!
//! Command-line interface for perceptual image hashing.
//!
//! ## Usage
//! ```bash
//! # All three hashes for one image
//! pihash photo.jpg
//!
//! # Only the difference hash, compared against two other images
//! pihash -d photo.jpg edited.jpg thumbnail.png
//!
//! # JSON output, verifying cached entries by content
//! pihash --checksum --output json photo.jpg
//! ```

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use console::{style, Term};
use pihash::core::cache::HashTriple;
use pihash::core::context::{Context, ContextConfig, KeyStrategy};
use pihash::core::hasher::{HashAlgorithmKind, ImageHash};
use pihash::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Perceptual Image Hashing - fingerprint images and compare them
#[derive(Parser, Debug)]
#[command(name = "pihash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Image to hash
    path: PathBuf,

    /// Images to compare against PATH
    comparisons: Vec<PathBuf>,

    /// Include an average hash
    #[arg(short = 'a', long)]
    ahash: bool,

    /// Include a difference hash
    #[arg(short = 'd', long)]
    dhash: bool,

    /// Include a perceptual (DCT) hash
    #[arg(short = 'p', long)]
    phash: bool,

    /// Cache file path
    #[arg(long, conflicts_with = "no_cache")]
    cache: Option<PathBuf>,

    /// Don't read or write a cache file
    #[arg(long)]
    no_cache: bool,

    /// Verify cached entries by content digest on every request
    #[arg(long)]
    checksum: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Hashes computed for one file
#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    hashes: Vec<ImageHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    computed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Distance between the base image and one comparison, per algorithm
#[derive(Debug, Serialize)]
struct Distance {
    algorithm: HashAlgorithmKind,
    distance: u32,
    similarity: f64,
}

#[derive(Debug, Serialize)]
struct ComparisonReport {
    #[serde(flatten)]
    file: FileReport,
    distances: Vec<Distance>,
}

#[derive(Debug, Serialize)]
struct Report {
    base: FileReport,
    comparisons: Vec<ComparisonReport>,
}

impl Report {
    fn failures(&self) -> usize {
        std::iter::once(&self.base)
            .chain(self.comparisons.iter().map(|c| &c.file))
            .filter(|f| f.error.is_some())
            .count()
    }
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        pihash::init_tracing_with("pihash=debug");
    } else {
        pihash::init_tracing();
    }

    let kinds = selected_kinds(cli.ahash, cli.dhash, cli.phash);
    let config = ContextConfig::new().key_strategy(if cli.checksum {
        KeyStrategy::Checksum
    } else {
        KeyStrategy::Metadata
    });

    let mut context = if cli.no_cache {
        Context::in_memory(config)
    } else {
        let cache_path = cli.cache.clone().unwrap_or_else(default_cache_path);
        Context::open_with_config(&cache_path, config)?
    };

    let base = hash_file(&mut context, &cli.path, &kinds);
    let comparisons = cli
        .comparisons
        .iter()
        .map(|path| {
            let file = hash_file(&mut context, path, &kinds);
            let distances = distances(&base, &file);
            ComparisonReport { file, distances }
        })
        .collect();
    let report = Report { base, comparisons };

    if cli.verbose {
        let stats = context.stats();
        tracing::info!(
            hits = stats.hits,
            misses = stats.misses,
            revalidations = stats.revalidations,
            decodes = stats.decodes,
            "Request summary"
        );
    }
    let success = finish(context, &report, cli.output, &kinds);

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print the report, then persist the cache.
///
/// Returns false if any file failed or the cache could not be saved.
fn finish(
    context: Context,
    report: &Report,
    output: OutputFormat,
    kinds: &[HashAlgorithmKind],
) -> bool {
    match output {
        OutputFormat::Pretty => print_pretty_report(&Term::stdout(), report, kinds),
        OutputFormat::Json => print_json_report(report),
    }

    let saved = match context.close() {
        Ok(()) => true,
        Err(e) => {
            Term::stderr()
                .write_line(&format!(
                    "{} Failed to save hash cache: {}",
                    style("!").yellow().bold(),
                    e
                ))
                .ok();
            false
        }
    };

    saved && report.failures() == 0
}

/// Requested algorithms; none selected means all of them
fn selected_kinds(ahash: bool, dhash: bool, phash: bool) -> Vec<HashAlgorithmKind> {
    if !(ahash || dhash || phash) {
        return HashAlgorithmKind::ALL.to_vec();
    }
    HashAlgorithmKind::ALL
        .into_iter()
        .zip([ahash, dhash, phash])
        .filter_map(|(kind, wanted)| wanted.then_some(kind))
        .collect()
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pihash")
        .join("hashes.bin")
}

fn hash_file(context: &mut Context, path: &Path, kinds: &[HashAlgorithmKind]) -> FileReport {
    let outcome = if kinds.len() == HashAlgorithmKind::ALL.len() {
        context.get_hashes(path)
    } else {
        kinds
            .iter()
            .try_fold(HashTriple::default(), |mut triple, &kind| -> Result<HashTriple> {
                triple.set(kind, context.get_hash(path, kind)?);
                Ok(triple)
            })
    };

    match outcome {
        Ok(triple) => FileReport {
            path: path.to_path_buf(),
            hashes: kinds
                .iter()
                .filter_map(|&kind| triple.get(kind).map(|value| ImageHash::new(value, kind)))
                .collect(),
            computed_at: context
                .cached_hashes(path)
                .ok()
                .flatten()
                .and_then(|cached| DateTime::from_timestamp(cached.computed_at as i64, 0)),
            error: None,
        },
        Err(e) => FileReport {
            path: path.to_path_buf(),
            hashes: Vec::new(),
            computed_at: None,
            error: Some(e.to_string()),
        },
    }
}

fn distances(base: &FileReport, other: &FileReport) -> Vec<Distance> {
    base.hashes
        .iter()
        .filter_map(|a| {
            other
                .hashes
                .iter()
                .find(|b| b.algorithm() == a.algorithm())
                .map(|b| Distance {
                    algorithm: a.algorithm(),
                    distance: a.distance(b),
                    similarity: a.similarity(b),
                })
        })
        .collect()
}

fn print_pretty_report(term: &Term, report: &Report, kinds: &[HashAlgorithmKind]) {
    print_pretty_file(term, &report.base);

    for comparison in &report.comparisons {
        term.write_line("").ok();
        print_pretty_file(term, &comparison.file);
        for d in &comparison.distances {
            let distance = if d.distance <= 10 {
                style(d.distance).green()
            } else {
                style(d.distance).yellow()
            };
            term.write_line(&format!(
                "    {} distance {} ({:.1}% similar)",
                style(format!("{}:", d.algorithm)).dim(),
                distance,
                d.similarity
            ))
            .ok();
        }
    }

    term.write_line("").ok();
    for line in legend(kinds) {
        term.write_line(&format!("{}", style(line).dim())).ok();
    }
}

/// One line per algorithm explaining what it measures
fn legend(kinds: &[HashAlgorithmKind]) -> Vec<String> {
    kinds
        .iter()
        .map(|kind| format!("{}: {}", kind, kind.description()))
        .collect()
}

fn print_pretty_file(term: &Term, file: &FileReport) {
    term.write_line(&format!("{}", style(file.path.display()).bold()))
        .ok();

    if let Some(error) = &file.error {
        term.write_line(&format!("  {} {}", style("✗").red().bold(), error))
            .ok();
        return;
    }

    for hash in &file.hashes {
        term.write_line(&format!(
            "  {} {} {}",
            style(format!("{}:", hash.algorithm())).cyan(),
            hash.to_hex(),
            style(format!("({})", hash.value())).dim()
        ))
        .ok();
    }
}

fn print_json_report(report: &Report) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(kinds: &[(HashAlgorithmKind, u64)]) -> FileReport {
        FileReport {
            path: PathBuf::from("x.png"),
            hashes: kinds.iter().map(|&(k, v)| ImageHash::new(v, k)).collect(),
            computed_at: None,
            error: None,
        }
    }

    #[test]
    fn no_flags_selects_every_algorithm() {
        assert_eq!(selected_kinds(false, false, false), HashAlgorithmKind::ALL.to_vec());
    }

    #[test]
    fn flags_select_in_fixed_order() {
        assert_eq!(
            selected_kinds(false, true, true),
            vec![HashAlgorithmKind::Difference, HashAlgorithmKind::Perceptual]
        );
    }

    #[test]
    fn distances_pair_matching_algorithms() {
        let base = report(&[
            (HashAlgorithmKind::Average, 0b1111),
            (HashAlgorithmKind::Perceptual, 0),
        ]);
        let other = report(&[(HashAlgorithmKind::Average, 0b0001)]);

        let result = distances(&base, &other);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].algorithm, HashAlgorithmKind::Average);
        assert_eq!(result[0].distance, 3);
    }

    #[test]
    fn failed_comparison_has_no_distances() {
        let base = report(&[(HashAlgorithmKind::Average, 1)]);
        let failed = FileReport {
            error: Some("boom".to_string()),
            ..report(&[])
        };

        assert!(distances(&base, &failed).is_empty());
    }

    #[test]
    fn legend_describes_each_selected_algorithm() {
        let lines = legend(&[HashAlgorithmKind::Difference, HashAlgorithmKind::Perceptual]);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("dHash: Difference Hash"));
        assert!(lines[1].contains("DCT"));
    }

    #[test]
    fn report_is_kept_when_cache_save_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        let image = dir.path().join("a.png");
        image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 9) as u8, (y * 9) as u8, 0]))
            .save(&image)
            .unwrap();

        let mut context = Context::open(&cache_dir.join("hashes.bin")).unwrap();
        let kinds = vec![HashAlgorithmKind::Average];
        let report = Report {
            base: hash_file(&mut context, &image, &kinds),
            comparisons: Vec::new(),
        };
        assert!(report.base.error.is_none());
        assert_eq!(report.base.hashes.len(), 1);

        std::fs::remove_dir_all(&cache_dir).unwrap();

        assert!(!finish(context, &report, OutputFormat::Json, &kinds));
    }

    #[test]
    fn finish_succeeds_without_failures() {
        let context = Context::in_memory(ContextConfig::default());
        let report = Report {
            base: report(&[(HashAlgorithmKind::Average, 1)]),
            comparisons: Vec::new(),
        };

        assert!(finish(context, &report, OutputFormat::Json, &[HashAlgorithmKind::Average]));
    }

    #[test]
    fn cli_rejects_cache_with_no_cache() {
        let parsed = Cli::try_parse_from(["pihash", "--no-cache", "--cache", "c.bin", "a.png"]);
        assert!(parsed.is_err());
    }
}
