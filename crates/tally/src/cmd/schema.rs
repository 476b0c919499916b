//! Schema command - Create the ClickHouse database and tables
//!
//! # Usage
//!
//! ```bash
//! tally schema                     # apply to [datastore].url
//! tally schema --database shop     # override the database name
//! tally schema --table orders      # override the events table name
//! tally schema --print             # print the DDL only
//! ```

use anyhow::{Context, Result, bail};
use clap::Args;
use tally_config::Config;
use tally_pipeline::clickhouse_config;
use tally_sinks::ClickHouseStore;
use tally_sinks::datastore::schema::{create_database, ensure_schema, statements};

/// Schema command arguments
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Database to create (defaults to [datastore].database)
    #[arg(long)]
    database: Option<String>,

    /// Events table to create (defaults to [datastore].table)
    #[arg(long)]
    table: Option<String>,

    /// Print the statements instead of executing them
    #[arg(long)]
    print: bool,
}

/// Run the schema command
pub async fn run(args: SchemaArgs, config: &Config) -> Result<()> {
    let database = args
        .database
        .as_deref()
        .unwrap_or(&config.datastore.database);
    let table = args.table.as_deref().unwrap_or(&config.datastore.table);

    if args.print {
        print!("{}", render(database, table));
        return Ok(());
    }

    let store = ClickHouseStore::from_config(&clickhouse_config(&config.datastore));
    let report = ensure_schema(&store, database, table)
        .await
        .with_context(|| format!("failed to create database {database}"))?;

    for name in &report.applied {
        println!("  ok      {name}");
    }
    for (name, error) in &report.failed {
        println!("  failed  {name}: {error}");
    }

    if !report.is_complete() {
        bail!(
            "{} of {} schema statements failed",
            report.failed.len(),
            report.failed.len() + report.applied.len()
        );
    }

    Ok(())
}

/// All statements as one SQL script
fn render(database: &str, table: &str) -> String {
    let mut script = format!("{};\n", create_database(database));
    for statement in statements(database, table) {
        script.push('\n');
        script.push_str(statement.ddl.trim());
        script.push_str(";\n");
    }
    script
}
