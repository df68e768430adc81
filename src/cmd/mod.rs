pub(crate) mod convert;
pub(crate) mod extract;
mod glob_util;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ddl-convert")]
#[command(version)]
#[command(about = "Convert MySQL schema dumps into PostgreSQL DDL", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a MySQL dump into a PostgreSQL DDL script
    Convert {
        /// Input SQL file or glob pattern (e.g., *.sql, dumps/**/*.sql)
        /// Supports .gz, .bz2, .xz, .zst compression
        file: PathBuf,

        /// Output SQL file (default: stdout), or output directory for glob patterns
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Create all tables in this PostgreSQL schema
        #[arg(short, long)]
        schema: Option<String>,

        /// YAML config file with conversion options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress during conversion
        #[arg(short, long)]
        progress: bool,

        /// Preview without writing files (dry run)
        #[arg(long)]
        dry_run: bool,

        /// Output statistics as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Skip the header comment
        #[arg(long)]
        no_header: bool,

        /// Add foreign key columns missing from their table as BIGINT
        #[arg(long)]
        add_missing_fk_columns: bool,

        /// Stop on first file that fails (for glob patterns)
        #[arg(long)]
        fail_fast: bool,
    },

    /// Strip data and session noise from a MySQL dump, keeping its schema
    Extract {
        /// Input SQL file or glob pattern (e.g., *.sql, dumps/**/*.sql)
        /// Supports .gz, .bz2, .xz, .zst compression
        file: PathBuf,

        /// Output SQL file (default: <input>_schema_only.sql), or output directory for glob patterns
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also remove session SET statements left in the schema
        #[arg(long)]
        clean: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress during extraction
        #[arg(short, long)]
        progress: bool,

        /// Preview without writing files (dry run)
        #[arg(long)]
        dry_run: bool,

        /// Output statistics as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Stop on first file that fails (for glob patterns)
        #[arg(long)]
        fail_fast: bool,
    },

    /// Print the JSON Schema of a command's --json output
    Schema {
        /// Command name (default: list available schemas)
        command: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            file,
            output,
            schema,
            config,
            verbose,
            progress,
            dry_run,
            json,
            no_header,
            add_missing_fk_columns,
            fail_fast,
        } => convert::run(convert::ConvertArgs {
            file,
            output,
            schema,
            config,
            verbose,
            progress,
            dry_run,
            json,
            no_header,
            add_missing_fk_columns,
            fail_fast,
        }),
        Commands::Extract {
            file,
            output,
            clean,
            verbose,
            progress,
            dry_run,
            json,
            fail_fast,
        } => extract::run(extract::ExtractArgs {
            file,
            output,
            clean,
            verbose,
            progress,
            dry_run,
            json,
            fail_fast,
        }),
        Commands::Schema { command } => run_schema(command),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "ddl-convert", &mut io::stdout());
            Ok(())
        }
    }
}

fn run_schema(command: Option<String>) -> anyhow::Result<()> {
    let Some(command) = command else {
        for name in crate::json_schema::schema_names() {
            println!("{}", name);
        }
        return Ok(());
    };

    match crate::json_schema::get_schema(&command) {
        Some(schema) => {
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        None => anyhow::bail!(
            "unknown schema '{}'. Available: {}",
            command,
            crate::json_schema::schema_names().join(", ")
        ),
    }
}
