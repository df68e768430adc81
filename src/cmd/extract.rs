//! Extract command CLI handler.

use crate::extract::{self, ExtractConfig, ExtractStats};
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use super::glob_util::{expand_file_pattern, MultiFileResult};

/// Arguments of the `extract` subcommand
#[derive(Debug, Default)]
pub struct ExtractArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub clean: bool,
    pub verbose: bool,
    pub progress: bool,
    pub dry_run: bool,
    pub json: bool,
    pub fail_fast: bool,
}

/// JSON output for single file extraction
#[derive(Serialize, JsonSchema)]
pub(crate) struct ExtractJsonOutput {
    input_file: String,
    output_file: String,
    dry_run: bool,
    elapsed_secs: f64,
    statistics: ExtractStats,
}

/// JSON output for multi-file extraction
#[derive(Serialize, JsonSchema)]
pub(crate) struct MultiExtractJsonOutput {
    total_files: usize,
    succeeded: usize,
    failed: usize,
    elapsed_secs: f64,
    results: Vec<ExtractFileResult>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct ExtractFileResult {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<ExtractStats>,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let expanded = expand_file_pattern(&args.file)?;

    if expanded.pattern_was_glob {
        run_multi(expanded.files, &args)
    } else {
        let file = expanded.files.into_iter().next().unwrap_or_default();
        run_single(file, &args)
    }
}

fn run_single(file: PathBuf, args: &ExtractArgs) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let (stats, output) = extract::run(ExtractConfig {
        input: file.clone(),
        output: args.output.clone(),
        clean: args.clean,
        progress: args.progress && !args.json,
        dry_run: args.dry_run,
    })?;
    let elapsed = start_time.elapsed();

    if args.json {
        let output_json = ExtractJsonOutput {
            input_file: file.display().to_string(),
            output_file: output.display().to_string(),
            dry_run: args.dry_run,
            elapsed_secs: elapsed.as_secs_f64(),
            statistics: stats,
        };
        println!("{}", serde_json::to_string_pretty(&output_json)?);
        return Ok(());
    }

    if args.dry_run {
        eprintln!("Dry run: would write schema to {}", output.display());
    } else {
        eprintln!("✓ Schema written to {}", output.display());
    }
    print_stats(&stats, args.verbose);
    Ok(())
}

fn run_multi(files: Vec<PathBuf>, args: &ExtractArgs) -> anyhow::Result<()> {
    let total = files.len();
    let mut result = MultiFileResult::new(total);
    let mut json_results: Vec<ExtractFileResult> = Vec::new();
    let start_time = Instant::now();

    if !args.json {
        eprintln!("Extracting schema from {} files...\n", total);
    }

    for (idx, file) in files.iter().enumerate() {
        if !args.json {
            eprintln!("[{}/{}] Extracting: {}", idx + 1, total, file.display());
        }

        // Outputs go next to each input unless a directory is given.
        let output = args.output.as_ref().map(|dir| {
            let derived = extract::default_output_path(file);
            match derived.file_name() {
                Some(name) => dir.join(name),
                None => dir.join(format!("output_{}_schema_only.sql", idx)),
            }
        });

        let config = ExtractConfig {
            input: file.clone(),
            output,
            clean: args.clean,
            progress: false,
            dry_run: args.dry_run,
        };

        match extract::run(config) {
            Ok((stats, output)) => {
                if !args.json {
                    eprintln!(
                        "  {} statements kept, {:.1}% smaller",
                        stats.statements_kept, stats.size_reduction_percent
                    );
                    if !args.dry_run {
                        eprintln!("  → {}", output.display());
                    }
                    eprintln!();
                }
                json_results.push(ExtractFileResult {
                    file: file.display().to_string(),
                    output_file: Some(output.display().to_string()),
                    statistics: Some(stats),
                    status: "success".to_string(),
                    error: None,
                });
                result.record_success();
            }
            Err(e) => {
                if !args.json {
                    eprintln!("  Error: {}\n", e);
                }
                json_results.push(ExtractFileResult {
                    file: file.display().to_string(),
                    output_file: None,
                    statistics: None,
                    status: "failed".to_string(),
                    error: Some(e.to_string()),
                });
                result.record_failure(file.clone(), e.to_string());
                if args.fail_fast {
                    break;
                }
            }
        }
    }

    if args.json {
        let output_json = MultiExtractJsonOutput {
            total_files: total,
            succeeded: result.succeeded,
            failed: result.failed,
            elapsed_secs: start_time.elapsed().as_secs_f64(),
            results: json_results,
        };
        println!("{}", serde_json::to_string_pretty(&output_json)?);
    } else {
        result.print_summary("Extraction");
    }

    if result.has_failures() {
        anyhow::bail!("{} of {} files failed to extract", result.failed, total);
    }
    Ok(())
}

fn print_stats(stats: &ExtractStats, verbose: bool) {
    eprintln!(
        "  {} → {} bytes ({:.1}% smaller)",
        stats.input_bytes, stats.output_bytes, stats.size_reduction_percent
    );
    if !verbose {
        return;
    }
    eprintln!("  Encoding: {}", stats.encoding);
    eprintln!(
        "  Statements kept: {} ({} lines)",
        stats.statements_kept, stats.lines_kept
    );
    eprintln!(
        "  Statements skipped: {} ({} lines)",
        stats.statements_skipped, stats.lines_skipped
    );
}
