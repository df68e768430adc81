//! Warning system for the convert command.
//!
//! Tracks and reports MySQL features without a PostgreSQL equivalent,
//! lossy conversions, fragments passed through unparsed and other issues
//! that need a human look before the output is imported.

/// Warning types that can occur during conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertWarning {
    /// Feature not supported in PostgreSQL
    UnsupportedFeature {
        feature: String,
        suggestion: Option<String>,
    },
    /// Conversion drops information
    LossyConversion {
        from_type: String,
        to_type: String,
        table: Option<String>,
        column: Option<String>,
    },
    /// Fragment could not be classified and was passed through unchanged
    StructuralAmbiguity {
        line: usize,
        reason: String,
        preview: String,
    },
    /// Input was not valid UTF-8 and was decoded with a fallback encoding
    EncodingFallback { encoding: String },
    /// Foreign key references a table not created in this batch
    UnresolvedReference {
        constraint: String,
        table: String,
        referenced_table: String,
    },
    /// Object renamed to avoid a name collision in the target schema
    RenamedObject {
        kind: String,
        from: String,
        to: String,
    },
    /// Missing foreign key column added to its table
    RepairedColumn { table: String, column: String },
}

impl ConvertWarning {
    /// Build a structural-ambiguity warning with a one-line preview of `fragment`.
    pub fn ambiguity(line: usize, reason: impl Into<String>, fragment: &str) -> Self {
        let flat = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
        let preview = if flat.chars().count() > 60 {
            format!("{}...", flat.chars().take(60).collect::<String>())
        } else {
            flat
        };
        ConvertWarning::StructuralAmbiguity {
            line,
            reason: reason.into(),
            preview,
        }
    }
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::UnsupportedFeature {
                feature,
                suggestion,
            } => {
                write!(f, "Unsupported feature: {}", feature)?;
                if let Some(s) = suggestion {
                    write!(f, " ({})", s)?;
                }
                Ok(())
            }
            ConvertWarning::LossyConversion {
                from_type,
                to_type,
                table,
                column,
            } => {
                write!(f, "Lossy conversion: {} → {}", from_type, to_type)?;
                if let Some(t) = table {
                    write!(f, " in table {}", t)?;
                    if let Some(c) = column {
                        write!(f, ".{}", c)?;
                    }
                }
                Ok(())
            }
            ConvertWarning::StructuralAmbiguity {
                line,
                reason,
                preview,
            } => {
                write!(f, "Line {}: {}, passed through unchanged ({})", line, reason, preview)
            }
            ConvertWarning::EncodingFallback { encoding } => {
                write!(f, "Input is not valid UTF-8; decoded as {}", encoding)
            }
            ConvertWarning::UnresolvedReference {
                constraint,
                table,
                referenced_table,
            } => {
                write!(
                    f,
                    "Foreign key {} on {} references {}, which is not created in this file",
                    constraint, table, referenced_table
                )
            }
            ConvertWarning::RenamedObject { kind, from, to } => {
                write!(f, "Renamed {} {} to {} (name already used)", kind, from, to)
            }
            ConvertWarning::RepairedColumn { table, column } => {
                write!(
                    f,
                    "Added missing foreign key column {}.{} as BIGINT",
                    table, column
                )
            }
        }
    }
}

/// Collects warnings during conversion
#[derive(Debug)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
    max_warnings: usize,
    truncated: usize,
}

impl Default for WarningCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: limit,
            truncated: 0,
        }
    }

    /// Add a warning
    pub fn add(&mut self, warning: ConvertWarning) {
        if self.warnings.iter().any(|w| Self::is_similar(w, &warning)) {
            return;
        }
        if self.warnings.len() < self.max_warnings {
            self.warnings.push(warning);
        } else {
            self.truncated += 1;
        }
    }

    /// Check if two warnings are similar enough to deduplicate
    fn is_similar(a: &ConvertWarning, b: &ConvertWarning) -> bool {
        match (a, b) {
            (
                ConvertWarning::UnsupportedFeature { feature: f1, .. },
                ConvertWarning::UnsupportedFeature { feature: f2, .. },
            ) => f1 == f2,
            (
                ConvertWarning::LossyConversion {
                    from_type: f1,
                    to_type: t1,
                    ..
                },
                ConvertWarning::LossyConversion {
                    from_type: f2,
                    to_type: t2,
                    ..
                },
            ) => f1 == f2 && t1 == t2,
            (
                ConvertWarning::EncodingFallback { .. },
                ConvertWarning::EncodingFallback { .. },
            ) => true,
            _ => a == b,
        }
    }

    /// Get all collected warnings
    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ConvertWarning> {
        self.warnings
    }

    /// Check if any warnings were collected
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get warning count
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Warnings dropped after the limit was reached
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Print summary of warnings
    pub fn print_summary(&self) {
        if self.warnings.is_empty() {
            return;
        }

        eprintln!("\nConversion warnings ({}):", self.warnings.len());
        for warning in &self.warnings {
            eprintln!("  ⚠ {}", warning);
        }

        if self.truncated > 0 {
            eprintln!("  ... ({} additional warnings truncated)", self.truncated);
        }
    }
}
