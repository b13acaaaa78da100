use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Command-line arguments for the `hostsql` binary.
#[derive(Debug, Parser)]
#[command(
    name = "hostsql",
    about = "Run a single prepared statement with JSON-typed parameters",
    version
)]
pub struct Args {
    /// Database file (`:memory:` for a throwaway in-memory database)
    #[arg(short = 'd', long, env = "HOSTSQL_DATABASE", default_value = ":memory:")]
    pub database: PathBuf,

    /// Open the database read-only
    #[arg(long, env = "HOSTSQL_READ_ONLY")]
    pub read_only: bool,

    /// SQL batch executed before the statement (repeatable)
    #[arg(long, value_name = "SQL")]
    pub init: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a statement to completion and print the number of changed rows
    Exec(StatementArgs),
    /// Run a query and print every row as a JSON object per line
    Query(StatementArgs),
}

#[derive(Debug, ClapArgs)]
pub struct StatementArgs {
    /// The SQL text of a single statement
    pub sql: String,

    /// Positional parameter value as JSON; plain text binds as a string
    #[arg(short = 'p', long = "param", value_name = "JSON")]
    pub params: Vec<String>,

    /// Named parameter (e.g. -n id=7), bound without the sigil
    #[arg(short = 'n', long = "named", value_name = "NAME=JSON", value_parser = parse_named)]
    pub named: Vec<(String, String)>,
}

fn parse_named(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=JSON, got `{raw}`"))?;
    let name = name.trim_start_matches([':', '@', '$']);
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}
