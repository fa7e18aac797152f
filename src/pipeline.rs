// src/pipeline.rs

use std::fmt;
use tracing::{error, info, info_span};

use crate::config::EtlConfig;
use crate::error::Result;
use crate::extract::extract;
use crate::fetch::DocumentSource;
use crate::load::{open_database, write_csv, write_table};
use crate::progress::ProgressLog;
use crate::query::{run_query, RenderedResult};
use crate::report;
use crate::transform::{load_rates, transform};

/// Where a run has got to. Strictly sequential; a failure leaves the run in
/// the last state it reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    Extracted,
    Transformed,
    CsvWritten,
    DbLoaded,
    Queried,
    Done,
}

impl State {
    pub fn as_str(&self) -> &str {
        match self {
            State::Init => "Init",
            State::Extracted => "Extracted",
            State::Transformed => "Transformed",
            State::CsvWritten => "CsvWritten",
            State::DbLoaded => "DbLoaded",
            State::Queried => "Queried",
            State::Done => "Done",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub rows: usize,
    pub queries: Vec<RenderedResult>,
}

/// One report cycle: extract → transform → CSV → database → queries.
pub struct Pipeline<S> {
    config: EtlConfig,
    source: S,
    log: ProgressLog,
    state: State,
}

impl<S: DocumentSource> Pipeline<S> {
    pub fn new(config: EtlConfig, source: S, log: ProgressLog) -> Self {
        Self {
            config,
            source,
            log,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Run every stage once. There is no resume: a failed run starts over
    /// from `Init` next time.
    pub fn run(&mut self) -> Result<RunSummary> {
        let span = info_span!("etl_run", source = %self.config.source_url);
        let _enter = span.enter();

        match self.run_stages() {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(state = %self.state, error = %e, "run aborted");
                self.log
                    .log(&format!("Run failed at state {}: {}", self.state, e));
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> Result<RunSummary> {
        self.log.log("Preliminaries complete. Initiating ETL process");

        // ─── extract ────────────────────────────────────────────────────
        let html = self.source.fetch(&self.config.source_url)?;
        let ranked = extract(&html, &self.config.extraction)?;
        println!("\n{}", report::ranked_table(&ranked));
        self.advance(State::Extracted);
        self.log
            .log("Data extraction complete. Initiating Transformation process");

        // ─── transform ──────────────────────────────────────────────────
        let rates = load_rates(&self.config.rates_path)?;
        let enriched = transform(&ranked, &rates)?;
        println!("\n{}", report::enriched_table(&enriched));
        self.advance(State::Transformed);
        self.log
            .log("Data transformation complete. Initiating Loading process");

        // ─── load ───────────────────────────────────────────────────────
        write_csv(&enriched, &self.config.csv_path)?;
        self.advance(State::CsvWritten);
        self.log.log("Data saved to CSV file");

        let db = &self.config.database;
        let mut conn = open_database(&db.path)?;
        self.log.log("SQL Connection initiated");
        write_table(&enriched, &mut conn, &db.table_name)?;
        self.advance(State::DbLoaded);
        self.log
            .log("Data loaded to Database as a table. Executing queries");

        // ─── query ──────────────────────────────────────────────────────
        let mut queries = Vec::with_capacity(self.config.queries.len());
        for statement in &self.config.queries {
            let result = run_query(statement, &conn)?;
            println!("\n\n{}", result);
            queries.push(result);
        }
        self.advance(State::Queried);
        self.log.log("Process Complete");

        drop(conn);
        self.log.log("Server Connection closed");
        self.advance(State::Done);

        Ok(RunSummary {
            rows: enriched.len(),
            queries,
        })
    }

    fn advance(&mut self, next: State) {
        info!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}
