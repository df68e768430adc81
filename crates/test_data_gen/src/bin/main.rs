//! CLI for generating test fixtures.
//!
//! Usage:
//!   gen-fixtures --scale small --seed 42 > fixtures/shop.sql
//!   gen-fixtures --tables 200 --rows 1000 -o large.sql

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use test_data_gen::{DumpConfig, DumpGenerator, Scale};

#[derive(Parser, Debug)]
#[command(name = "gen-fixtures")]
#[command(about = "Generate MySQL dump fixtures for ddl-convert", long_about = None)]
struct Args {
    /// Scale preset: small, medium, large
    /// Ignored if --tables is specified
    #[arg(short, long, default_value = "small")]
    scale: String,

    /// Random seed for reproducibility
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Number of random tables (overrides --scale)
    #[arg(long)]
    tables: Option<usize>,

    /// Rows per table (overrides --scale)
    #[arg(long)]
    rows: Option<usize>,

    /// Rows per INSERT statement
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Skip data, output schema only
    #[arg(long)]
    schema_only: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scale: Scale = args.scale.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let mut config = DumpConfig::for_scale(scale, args.seed);
    if let Some(tables) = args.tables {
        config.tables = tables;
    }
    if let Some(rows) = args.rows {
        config.rows_per_table = rows;
    }
    config.batch_size = args.batch_size;
    config.include_data = !args.schema_only;

    let mut gen = DumpGenerator::new(config);

    if let Some(ref path) = args.output {
        let mut writer = BufWriter::new(File::create(path)?);
        gen.generate(&mut writer)?;
        writer.flush()?;
        eprintln!(
            "Generated {} tables to {}",
            gen.schema().tables.len(),
            path
        );
    } else {
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        gen.generate(&mut writer)?;
        writer.flush()?;
    }

    Ok(())
}
