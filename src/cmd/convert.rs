//! Convert command CLI handler.

use crate::convert::{self, ConvertConfig, ConvertFileConfig, ConvertOptions, ConvertRun, ConvertStats};
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use super::glob_util::{batch_output_path, expand_file_pattern, MultiFileResult};

const REVIEW_WARNING: &str =
    "⚠ Review the generated DDL before importing it into PostgreSQL: types, defaults and constraint names were rewritten automatically.";

/// Arguments of the `convert` subcommand
#[derive(Debug, Default)]
pub struct ConvertArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub schema: Option<String>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub progress: bool,
    pub dry_run: bool,
    pub json: bool,
    pub no_header: bool,
    pub add_missing_fk_columns: bool,
    pub fail_fast: bool,
}

/// JSON output for single file conversion
#[derive(Serialize, JsonSchema)]
pub(crate) struct ConvertJsonOutput {
    input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    encoding: String,
    dry_run: bool,
    input_bytes: u64,
    output_bytes: u64,
    elapsed_secs: f64,
    statistics: ConvertStats,
    warnings: Vec<String>,
    warnings_truncated: usize,
}

/// JSON output for multi-file conversion
#[derive(Serialize, JsonSchema)]
pub(crate) struct MultiConvertJsonOutput {
    total_files: usize,
    succeeded: usize,
    failed: usize,
    elapsed_secs: f64,
    results: Vec<ConvertFileResult>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct ConvertFileResult {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<ConvertStats>,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let options = resolve_options(&args)?;
    let expanded = expand_file_pattern(&args.file)?;

    if !expanded.pattern_was_glob {
        let file = expanded.files.into_iter().next().unwrap_or_default();
        return run_single(file, &args, options);
    }

    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => {
            anyhow::bail!("Output directory required when using glob patterns. Use --output <dir>")
        }
    };
    run_multi(expanded.files, output_dir, &args, options)
}

/// Defaults, then the `--config` file, then explicit flags.
fn resolve_options(args: &ConvertArgs) -> anyhow::Result<ConvertOptions> {
    let mut options = ConvertOptions {
        schema: args.schema.clone(),
        ..Default::default()
    };

    if let Some(path) = &args.config {
        let file_config = ConvertFileConfig::load(path)
            .map_err(|e| anyhow::anyhow!("invalid config file {}: {}", path.display(), e))?;
        file_config.apply_to(&mut options);
    }

    if args.no_header {
        options.header = false;
    }
    if args.add_missing_fk_columns {
        options.add_missing_fk_columns = true;
    }
    Ok(options)
}

fn run_single(file: PathBuf, args: &ConvertArgs, options: ConvertOptions) -> anyhow::Result<()> {
    if args.json && args.output.is_none() && !args.dry_run {
        anyhow::bail!("--json writes statistics to stdout; use --output <file> for the SQL");
    }

    if args.verbose && !args.json {
        let size_mb = std::fs::metadata(&file)?.len() as f64 / (1024.0 * 1024.0);
        eprintln!("Converting: {} ({:.2} MB)", file.display(), size_mb);
        if let Some(schema) = &options.schema {
            eprintln!("Target schema: {}", schema);
        }
    }

    let schema = options.schema.clone();
    let start_time = Instant::now();
    let run = convert::run(ConvertConfig {
        input: file.clone(),
        output: args.output.clone(),
        options,
        dry_run: args.dry_run,
        progress: args.progress && !args.json,
    })?;
    let elapsed = start_time.elapsed();

    if args.json {
        let output_json = ConvertJsonOutput {
            input_file: file.display().to_string(),
            output_file: args.output.as_ref().map(|p| p.display().to_string()),
            schema,
            encoding: run.encoding.to_string(),
            dry_run: args.dry_run,
            input_bytes: run.input_bytes,
            output_bytes: run.output_bytes,
            elapsed_secs: elapsed.as_secs_f64(),
            statistics: run.output.stats.clone(),
            warnings: run.output.warnings.iter().map(|w| w.to_string()).collect(),
            warnings_truncated: run.output.warnings_truncated,
        };
        println!("{}", serde_json::to_string_pretty(&output_json)?);
    } else {
        print_stats(&run, args.verbose, args.dry_run, args.progress);
        print_warnings(&run);
    }

    eprintln!();
    eprintln!("{}", REVIEW_WARNING);
    Ok(())
}

fn run_multi(
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    args: &ConvertArgs,
    options: ConvertOptions,
) -> anyhow::Result<()> {
    let total = files.len();
    let mut result = MultiFileResult::new(total);
    let mut json_results: Vec<ConvertFileResult> = Vec::new();
    let start_time = Instant::now();

    if !args.json {
        eprintln!("Converting {} files...\n", total);
    }

    for (idx, file) in files.iter().enumerate() {
        let output_file = batch_output_path(&output_dir, file, idx);
        if !args.json {
            eprintln!("[{}/{}] Converting: {}", idx + 1, total, file.display());
        }

        let config = ConvertConfig {
            input: file.clone(),
            output: Some(output_file.clone()),
            options: options.clone(),
            dry_run: args.dry_run,
            progress: false,
        };

        match convert::run(config) {
            Ok(run) => {
                let stats = &run.output.stats;
                if !args.json {
                    let warning_str = if stats.warnings == 0 {
                        String::new()
                    } else {
                        format!(" ({} warnings)", stats.warnings)
                    };
                    eprintln!(
                        "  {:.2} MB → {} tables, {} indexes, {} foreign keys{}",
                        run.input_bytes as f64 / (1024.0 * 1024.0),
                        stats.tables,
                        stats.indexes,
                        stats.foreign_keys,
                        warning_str
                    );
                    if args.verbose {
                        for warning in &run.output.warnings {
                            eprintln!("    ⚠ {}", warning);
                        }
                    }
                    if !args.dry_run {
                        eprintln!("  → {}", output_file.display());
                    }
                    eprintln!();
                }
                json_results.push(ConvertFileResult {
                    file: file.display().to_string(),
                    output_file: (!args.dry_run).then(|| output_file.display().to_string()),
                    statistics: Some(run.output.stats.clone()),
                    status: "success".to_string(),
                    error: None,
                });
                result.record_success();
            }
            Err(e) => {
                if !args.json {
                    eprintln!("  Error: {}\n", e);
                }
                json_results.push(ConvertFileResult {
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
        let output_json = MultiConvertJsonOutput {
            total_files: total,
            succeeded: result.succeeded,
            failed: result.failed,
            elapsed_secs: start_time.elapsed().as_secs_f64(),
            results: json_results,
        };
        println!("{}", serde_json::to_string_pretty(&output_json)?);
    } else {
        result.print_summary("Conversion");
    }

    eprintln!();
    eprintln!("{}", REVIEW_WARNING);

    if result.has_failures() {
        anyhow::bail!("{} of {} files failed to convert", result.failed, total);
    }
    Ok(())
}

fn print_stats(run: &ConvertRun, verbose: bool, dry_run: bool, progress: bool) {
    if !verbose && !progress && !dry_run {
        return;
    }
    let stats = &run.output.stats;

    eprintln!();
    eprintln!("Conversion Statistics:");
    eprintln!("  Input encoding: {}", run.encoding);
    eprintln!("  Statements read: {}", stats.statements_read);
    eprintln!(
        "  Statements kept: {} ({} lines)",
        stats.statements_kept, stats.lines_kept
    );
    eprintln!(
        "  Statements skipped: {} ({} lines)",
        stats.statements_skipped, stats.lines_skipped
    );
    eprintln!("  Tables: {}", stats.tables);
    eprintln!("  Indexes: {}", stats.indexes);
    eprintln!("  Foreign keys: {}", stats.foreign_keys);
    if stats.passed_through > 0 {
        eprintln!("  Passed through unparsed: {}", stats.passed_through);
    }
    eprintln!(
        "  Size: {} → {} bytes",
        run.input_bytes, run.output_bytes
    );

    if dry_run {
        eprintln!();
        eprintln!("(Dry run - no output written)");
    }
}

fn print_warnings(run: &ConvertRun) {
    let warnings = &run.output.warnings;
    if warnings.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("Conversion warnings ({}):", warnings.len());
    for warning in warnings {
        eprintln!("  ⚠ {}", warning);
    }
    if run.output.warnings_truncated > 0 {
        eprintln!(
            "  ... ({} additional warnings truncated)",
            run.output.warnings_truncated
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("convert.yaml");
        fs::write(
            &config,
            "schema: from_file\nheader: true\nadd_missing_fk_columns: false\n",
        )
        .unwrap();

        let args = ConvertArgs {
            schema: Some("from_cli".into()),
            config: Some(config),
            no_header: true,
            add_missing_fk_columns: true,
            ..Default::default()
        };
        let options = resolve_options(&args).unwrap();
        assert_eq!(options.schema.as_deref(), Some("from_cli"));
        assert!(!options.header);
        assert!(options.add_missing_fk_columns);
    }

    #[test]
    fn test_config_file_fills_unset_options() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("convert.yaml");
        fs::write(&config, "schema: app\nif_not_exists: false\n").unwrap();

        let args = ConvertArgs {
            config: Some(config),
            ..Default::default()
        };
        let options = resolve_options(&args).unwrap();
        assert_eq!(options.schema.as_deref(), Some("app"));
        assert!(!options.if_not_exists);
        assert!(options.header);
    }

    #[test]
    fn test_bad_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("convert.yaml");
        fs::write(&config, "unknown_key: 1\n").unwrap();

        let args = ConvertArgs {
            config: Some(config),
            ..Default::default()
        };
        let err = resolve_options(&args).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }
}
