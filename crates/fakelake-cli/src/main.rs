mod logging;

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fakelake_core::{
    Compression, Error as CoreError, GenerationConfig, PartitionLayout, validate_config,
};
use fakelake_eval::{EvalError, EvaluateOptions, EvaluationEngine};
use fakelake_generate::{GenerationEngine, GenerationError, Stages};
use logging::{LogFormat, init_logging};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "fakelake", version, about = "Fake star-schema dataset generator")]
struct Cli {
    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    /// Also append JSON log lines to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the dimension tables, then the fact chunks.
    Generate(GenerateArgs),
    /// Generate only the dimension tables.
    Dimensions(GenerateArgs),
    /// Generate fact chunks against dimension tables already on disk.
    Facts(GenerateArgs),
    /// Read a dataset back and check it.
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for every table.
    #[arg(long)]
    base_dir: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Anchor for relative dimension dates (YYYY-MM-DD).
    #[arg(long)]
    reference_date: Option<NaiveDate>,
    #[arg(long)]
    customers: Option<u64>,
    #[arg(long)]
    products: Option<u64>,
    #[arg(long)]
    stores: Option<u64>,
    #[arg(long)]
    total_rows: Option<u64>,
    #[arg(long)]
    chunk_size: Option<u64>,
    /// First sale date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// Last sale date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<NaiveDate>,
    /// `columns` or `hive`.
    #[arg(long)]
    partition_layout: Option<PartitionLayout>,
    /// `snappy`, `zstd` or `none`.
    #[arg(long)]
    compression: Option<Compression>,
    #[arg(long)]
    max_row_group_size: Option<usize>,
    /// Skip fact chunks a previous run with the same parameters wrote.
    #[arg(long, default_value_t = false)]
    resume: bool,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Dataset directory to check.
    #[arg(long, default_value = "data_fake_bigdata")]
    base_dir: PathBuf,
    /// Fail when any violation is found.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Examples kept per violation code.
    #[arg(long, default_value_t = 20)]
    max_examples: usize,
    /// Write violations.json next to the report.
    #[arg(long, default_value_t = false)]
    write_violations: bool,
    /// Where to write the metrics and report; defaults to the dataset directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long)]
    end_date: Option<NaiveDate>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_file.as_deref())?;

    let result = match cli.command {
        Command::Generate(args) => run_generate(&args, Stages::ALL),
        Command::Dimensions(args) => run_generate(&args, Stages::DIMENSIONS),
        Command::Facts(args) => run_generate(&args, Stages::FACTS),
        Command::Verify(args) => run_verify(args),
    };
    if let Err(err) = &result {
        tracing::error!(event = "run_failed", error = %err);
    }
    result
}

fn run_generate(args: &GenerateArgs, stages: Stages) -> Result<(), CliError> {
    let config = build_config(args)?;
    let timer = Instant::now();
    tracing::info!(
        event = "run_started",
        base_dir = %config.base_dir.display(),
        seed = config.seed,
        dimensions = stages.dimensions,
        facts = stages.facts
    );

    let engine = GenerationEngine::new(config)?;
    let result = engine.run_with(stages)?;

    tracing::info!(
        event = "run_finished",
        status = "success",
        duration_ms = timer.elapsed().as_millis() as u64
    );
    println!("base_dir={}", result.base_dir.display());
    println!("report_path={}", engine.layout().report_path().display());
    if let Some(facts) = &result.report.facts {
        println!(
            "fact_rows={} chunks_written={} chunks_skipped={}",
            facts.rows_available(),
            facts.chunks_written,
            facts.chunks_skipped
        );
    }
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<(), CliError> {
    let options = EvaluateOptions {
        strict: args.strict,
        max_examples: args.max_examples,
        write_violations: args.write_violations,
        out_dir: args.out_dir,
        start_date: args.start_date,
        end_date: args.end_date,
    };
    let result = EvaluationEngine::new(options).run(&args.base_dir)?;

    println!("metrics_path={}", result.metrics_path.display());
    println!("report_path={}", result.report_path.display());
    if let Some(path) = result.violations_path {
        println!("violations_path={}", path.display());
    }
    println!("violations={}", result.metrics.violations_total);
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied, validated.
fn build_config(args: &GenerateArgs) -> Result<GenerationConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::load(path)?,
        None => GenerationConfig::default(),
    };

    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(date) = args.reference_date {
        config.reference_date = date;
    }
    if let Some(customers) = args.customers {
        config.dimensions.customers = customers;
    }
    if let Some(products) = args.products {
        config.dimensions.products = products;
    }
    if let Some(stores) = args.stores {
        config.dimensions.stores = stores;
    }
    if let Some(total_rows) = args.total_rows {
        config.facts.total_rows = total_rows;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.facts.chunk_size = chunk_size;
    }
    if let Some(date) = args.start_date {
        config.facts.start_date = date;
    }
    if let Some(date) = args.end_date {
        config.facts.end_date = date;
    }
    if let Some(layout) = args.partition_layout {
        config.facts.partition_layout = layout;
    }
    if let Some(compression) = args.compression {
        config.output.compression = compression;
    }
    if let Some(size) = args.max_row_group_size {
        config.output.max_row_group_size = size;
    }
    if args.resume {
        config.facts.resume = true;
    }

    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let cli = Cli::try_parse_from(argv).expect("parse");
        match cli.command {
            Command::Generate(args) | Command::Dimensions(args) | Command::Facts(args) => args,
            Command::Verify(_) => panic!("expected a generation command"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = generate_args(&[
            "fakelake",
            "generate",
            "--base-dir",
            "out",
            "--seed",
            "7",
            "--total-rows",
            "100",
            "--chunk-size",
            "40",
            "--start-date",
            "2024-01-01",
            "--partition-layout",
            "hive",
            "--compression",
            "zstd",
            "--resume",
        ]);
        let config = build_config(&args).expect("config");

        assert_eq!(config.base_dir, PathBuf::from("out"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.facts.total_rows, 100);
        assert_eq!(config.facts.chunk_size, 40);
        assert_eq!(
            config.facts.start_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
        );
        assert_eq!(config.facts.partition_layout, PartitionLayout::Hive);
        assert_eq!(config.output.compression, Compression::Zstd);
        assert!(config.facts.resume);
        assert_eq!(config.dimensions.customers, 1_000_000);
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = std::env::temp_dir().join(format!("fakelake_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join("fakelake.toml");
        std::fs::write(
            &path,
            "seed = 3\n\n[dimensions]\ncustomers = 10\nproducts = 5\nstores = 3\n",
        )
        .expect("write config");

        let path_arg = path.display().to_string();
        let args = generate_args(&["fakelake", "dimensions", "--config", &path_arg, "--stores", "9"]);
        let config = build_config(&args).expect("config");
        assert_eq!(config.seed, 3);
        assert_eq!(config.dimensions.customers, 10);
        assert_eq!(config.dimensions.stores, 9);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["fakelake", "generate", "--partition-layout", "daily"]).is_err());
        assert!(Cli::try_parse_from(["fakelake", "generate", "--start-date", "2024-13-01"]).is_err());

        let args = generate_args(&["fakelake", "facts", "--chunk-size", "0"]);
        assert!(matches!(build_config(&args), Err(CliError::Core(_))));
    }

    #[test]
    fn verify_takes_its_own_flags() {
        let cli = Cli::try_parse_from([
            "fakelake",
            "verify",
            "--base-dir",
            "out",
            "--strict",
            "--max-examples",
            "5",
            "--log-format",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Verify(args) => {
                assert!(args.strict);
                assert_eq!(args.max_examples, 5);
                assert_eq!(args.base_dir, PathBuf::from("out"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
