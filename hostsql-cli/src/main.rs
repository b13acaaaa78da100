//! Developer CLI for running a single prepared statement.
//!
//! Parameters are given as JSON so every host value type can be exercised
//! from a shell, and query rows are printed as one JSON object per line.

mod args;
mod json;

use std::io::{self, Write};

use args::{Args, Command, StatementArgs};
use clap::Parser;
use eyre::{bail, Result, WrapErr};
use hostsql::{Connection, OpenMode, Row, Statement, Variant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    run(args, &mut io::stdout().lock())
}

fn run(args: Args, out: &mut impl Write) -> Result<()> {
    let mode = if args.read_only {
        OpenMode::ReadOnly
    } else {
        OpenMode::ReadWrite
    };
    let conn = Connection::open(&args.database, mode)
        .wrap_err_with(|| format!("could not open {}", args.database.display()))?;

    for batch in &args.init {
        conn.execute_batch(batch).wrap_err("init batch failed")?;
    }

    match args.command {
        Command::Exec(stmt_args) => {
            let mut stmt = prepare(&conn, &stmt_args)?;
            stmt.execute()?;
            writeln!(out, "{}", conn.changes())?;
        }
        Command::Query(stmt_args) => {
            let mut stmt = prepare(&conn, &stmt_args)?;
            let rows = stmt.fetch_all();
            for row in &rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
            let message = stmt.error_message();
            if !message.is_empty() {
                bail!("query stopped after {} row(s): {message}", rows.len());
            }
        }
    }
    Ok(())
}

fn prepare(conn: &Connection, stmt_args: &StatementArgs) -> Result<Statement> {
    let mut stmt = conn
        .prepare(&stmt_args.sql)
        .wrap_err("could not prepare statement")?;
    debug!(
        parameters = stmt.parameter_count(),
        columns = stmt.column_count(),
        "prepared statement"
    );

    if !stmt_args.params.is_empty() {
        let values: Vec<Variant> = stmt_args.params.iter().map(|raw| json::parse_value(raw)).collect();
        stmt.bind_all(&values)?;
    }
    if !stmt_args.named.is_empty() {
        let values: Row = stmt_args
            .named
            .iter()
            .map(|(name, raw)| (name.clone(), json::parse_value(raw)))
            .collect();
        stmt.bind_named(&values)?;
    }
    Ok(stmt)
}
