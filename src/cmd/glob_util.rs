//! Glob expansion for commands that accept `*.sql` or `dumps/**/*.sql`.

use crate::input::Compression;
use std::path::{Path, PathBuf};

/// Files matched by a command's input argument.
#[derive(Debug)]
pub struct ExpandedFiles {
    pub files: Vec<PathBuf>,
    pub pattern_was_glob: bool,
}

pub fn is_glob_pattern(path: &str) -> bool {
    path.contains('*') || path.contains('?') || path.contains('[')
}

/// Expand a literal path or a glob pattern into the dump files it names.
///
/// A literal path must exist. A pattern must match at least one regular
/// file; matches are sorted so batch runs are repeatable.
pub fn expand_file_pattern(pattern: &Path) -> anyhow::Result<ExpandedFiles> {
    let pattern_str = pattern.to_string_lossy();

    if !is_glob_pattern(&pattern_str) {
        if !pattern.exists() {
            anyhow::bail!("input file does not exist: {}", pattern.display());
        }
        return Ok(ExpandedFiles {
            files: vec![pattern.to_path_buf()],
            pattern_was_glob: false,
        });
    }

    let paths = glob::glob(&pattern_str)
        .map_err(|e| anyhow::anyhow!("invalid glob pattern '{}': {}", pattern_str, e))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry
            .map_err(|e| anyhow::anyhow!("error reading path for pattern '{}': {}", pattern_str, e))?;
        if path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        anyhow::bail!("no files match pattern: {}", pattern_str);
    }
    files.sort();

    Ok(ExpandedFiles {
        files,
        pattern_was_glob: true,
    })
}

/// Output location for `input` inside a batch output directory. Outputs
/// are plain text, so a compression suffix is dropped.
pub fn batch_output_path(output_dir: &Path, input: &Path, index: usize) -> PathBuf {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("output_{}.sql", index));

    let name = match Compression::from_path(input) {
        Compression::None => name,
        _ => name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or(name),
    };
    output_dir.join(name)
}

/// Tally of a batch run over several input files.
#[derive(Debug, Default)]
pub struct MultiFileResult {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl MultiFileResult {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, path: PathBuf, error: String) {
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Print the closing summary of a batch to stderr.
    pub fn print_summary(&self, title: &str) {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("{} Summary:", title);
        eprintln!("  Total files: {}", self.total_files);
        eprintln!("  Succeeded: {}", self.succeeded);
        eprintln!("  Failed: {}", self.failed);

        if self.has_failures() {
            eprintln!();
            eprintln!("Failed files:");
            for (path, error) in &self.errors {
                eprintln!("  - {}: {}", path.display(), error);
            }
        }
    }
}
