use anyhow::{Context, Result};
use bankscraper::{
    config::Settings,
    fetch::HttpSource,
    pipeline::Pipeline,
    progress::ProgressLog,
    query::{open_report_database, run_query},
    EtlError,
};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, process::ExitCode};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Largest-banks ETL: scrape, convert, load, report.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full extract → transform → load → query pass
    Run(RunArgs),
    /// Run queries against an already loaded database
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct ConfigFile {
    /// YAML file with any of the settings below; flags and env override it
    #[arg(long, env = "BANKSCRAPER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    /// SQLite database file
    #[arg(long, env = "BANKSCRAPER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Table replaced on every load
    #[arg(long, env = "BANKSCRAPER_TABLE_NAME")]
    table_name: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    file: ConfigFile,

    /// Page holding the ranked table (http, https or file)
    #[arg(long, env = "BANKSCRAPER_SOURCE_URL")]
    source_url: Option<String>,

    /// `Currency,Rate` CSV
    #[arg(long, env = "BANKSCRAPER_RATES_PATH")]
    rates_path: Option<PathBuf>,

    /// Output CSV, overwritten on every run
    #[arg(long, env = "BANKSCRAPER_CSV_PATH")]
    csv_path: Option<PathBuf>,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Append-only progress log
    #[arg(long, env = "BANKSCRAPER_LOG_PATH")]
    log_path: Option<PathBuf>,

    #[arg(long, env = "BANKSCRAPER_FETCH_TIMEOUT_SECS")]
    fetch_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    file: ConfigFile,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Statements to run; the default report queries when omitted
    statements: Vec<String>,
}

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // ─── 2) dispatch ─────────────────────────────────────────────────
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Query(args) => query(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e.downcast_ref::<EtlError>().map_or(1, EtlError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// File settings first, then whatever came in through flags or env.
fn layered(file: &ConfigFile, flags: Settings) -> Result<Settings> {
    let base = match &file.config {
        Some(path) => Settings::from_yaml_file(path)?,
        None => Settings::default(),
    };
    Ok(base.merge(flags))
}

fn run(args: RunArgs) -> Result<()> {
    let flags = Settings {
        source_url: args.source_url,
        rates_path: args.rates_path,
        csv_path: args.csv_path,
        db_path: args.database.db_path,
        table_name: args.database.table_name,
        log_path: args.log_path,
        fetch_timeout_secs: args.fetch_timeout_secs,
        ..Settings::default()
    };
    let config = layered(&args.file, flags)?.into_etl_config()?;
    info!(
        source = %config.source_url,
        csv = %config.csv_path.display(),
        db = %config.database.path.display(),
        table = %config.database.table_name,
        "configuration"
    );

    let log = ProgressLog::open(&config.log_path)?;
    let source = HttpSource::new(config.fetch_timeout)?;
    let mut pipeline = Pipeline::new(config, source, log);
    let summary = pipeline
        .run()
        .with_context(|| format!("ETL run aborted at state {}", pipeline.state()))?;

    info!(rows = summary.rows, queries = summary.queries.len(), "run complete");
    Ok(())
}

fn query(args: QueryArgs) -> Result<()> {
    let flags = Settings {
        db_path: args.database.db_path,
        table_name: args.database.table_name,
        queries: (!args.statements.is_empty()).then_some(args.statements),
        ..Settings::default()
    };
    let config = layered(&args.file, flags)?.into_query_config()?;

    let conn = open_report_database(&config.database.path)?;
    for statement in &config.queries {
        let result = run_query(statement, &conn)?;
        println!("\n{}", result);
    }
    Ok(())
}
