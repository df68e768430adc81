//! Schema-only extraction.
//!
//! Removes row data and session noise from a MySQL dump and keeps its
//! structure, still in MySQL syntax. The result is a much smaller file that
//! can be reviewed or fed to `convert`.

use crate::convert::{write_output, WarningCollector};
use crate::filter::NoiseFilter;
use crate::input::{read_dump, Compression, TextEncoding};
use crate::parser::Parser;
use crate::rewrite::strip_conditional_comments;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use std::path::{Path, PathBuf};

static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Session statements removed by `--clean` wherever they survive.
static CLEAN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)SET\s+@OLD[^;]*;",
        r"(?i)SET\s+CHARACTER_SET[^;]*;",
        r"(?i)SET\s+NAMES[^;]*;",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Statistics from one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct ExtractStats {
    pub statements_kept: usize,
    pub statements_skipped: usize,
    pub lines_kept: usize,
    pub lines_skipped: usize,
    /// Size of the input file on disk
    pub input_bytes: u64,
    /// Size of the extracted schema
    pub output_bytes: u64,
    /// Percentage saved relative to the input
    pub size_reduction_percent: f64,
    /// Encoding the input was decoded with
    pub encoding: String,
}

/// Keep the structural statements of `text`. Source paragraph breaks are
/// kept as single blank lines.
pub fn extract_schema(text: &str, clean: bool) -> (String, ExtractStats) {
    let mut filter = NoiseFilter::for_extraction();
    let mut out = String::with_capacity(text.len() / 4);
    let mut last_line: Option<usize> = None;

    for stmt in Parser::new(text) {
        if !filter.admit(&stmt) {
            continue;
        }

        let body = strip_conditional_comments(&stmt.text);
        let body = body.trim();
        if body.is_empty() || body == ";" {
            continue;
        }

        if let Some(last) = last_line {
            if stmt.line > last + 1 {
                out.push('\n');
            }
        }
        out.push_str(body);
        out.push('\n');
        last_line = Some(stmt.end_line());
    }

    let mut schema = RE_BLANK_RUNS.replace_all(&out, "\n\n").into_owned();
    if clean {
        for pattern in CLEAN_PATTERNS.iter() {
            schema = pattern.replace_all(&schema, "").into_owned();
        }
        schema = RE_BLANK_RUNS.replace_all(&schema, "\n\n").into_owned();
    }

    let filtered = filter.stats();
    let stats = ExtractStats {
        statements_kept: filtered.statements_kept,
        statements_skipped: filtered.statements_skipped,
        lines_kept: filtered.lines_kept,
        lines_skipped: filtered.lines_skipped,
        output_bytes: schema.len() as u64,
        ..Default::default()
    };
    (schema, stats)
}

/// `dump.sql` → `dump_schema_only.sql`, next to the input. Compression
/// suffixes are dropped; the output is always plain text.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if Compression::from_path(input) != Compression::None || name.ends_with(".zip") {
        if let Some((stem, _)) = name.rsplit_once('.') {
            name = stem.to_string();
        }
    }
    let file_name = match name.strip_suffix(".sql") {
        Some(stem) => format!("{}_schema_only.sql", stem),
        None => format!("{}_schema_only.sql", name),
    };
    input.with_file_name(file_name)
}

/// Configuration for the extract command
#[derive(Debug, Default)]
pub struct ExtractConfig {
    pub input: PathBuf,
    /// Output file (None: derived from the input name)
    pub output: Option<PathBuf>,
    pub clean: bool,
    pub progress: bool,
    pub dry_run: bool,
}

/// Run the extract command. Returns the stats and the path written.
pub fn run(config: ExtractConfig) -> anyhow::Result<(ExtractStats, PathBuf)> {
    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message("Reading...");
        Some(pb)
    } else {
        None
    };

    let dump = read_dump(&config.input, progress_bar.as_ref())?;
    if dump.encoding != TextEncoding::Utf8 {
        let mut warnings = WarningCollector::new();
        warnings.add(crate::convert::ConvertWarning::EncodingFallback {
            encoding: dump.encoding.to_string(),
        });
        warnings.print_summary();
    }

    if let Some(pb) = &progress_bar {
        pb.set_message("Extracting schema...");
    }
    let (schema, mut stats) = extract_schema(&dump.text, config.clean);
    stats.input_bytes = dump.file_bytes;
    stats.encoding = dump.encoding.to_string();
    stats.size_reduction_percent = if dump.file_bytes > 0 {
        (1.0 - stats.output_bytes as f64 / dump.file_bytes as f64) * 100.0
    } else {
        0.0
    };

    let output = config
        .output
        .unwrap_or_else(|| default_output_path(&config.input));
    if !config.dry_run {
        write_output(Some(&output), &schema)?;
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Kept {} statements", stats.statements_kept));
    }

    Ok((stats, output))
}
