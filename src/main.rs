//! Command-line entry points for the crew-roll extraction pipeline.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod classification;
mod cleaning;
mod error;
mod expand;
mod extractor;
mod join;
mod pipeline;
mod routes;
mod table;

use error::PipelineError;

#[derive(Parser)]
#[command(name = "crew_extract", version, about = "Extract structured crew movements from transcribed naval rolls")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full extraction pipeline on one roll CSV
    Process {
        /// Input roll CSV with a Remarks column
        input: PathBuf,
        /// Destination for the annotated per-leg CSV
        output: PathBuf,
    },
    /// Outer-join several source CSVs and tidy shared columns
    Prepare {
        /// Source CSVs, joined left to right
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Destination for the joined CSV
        #[arg(short, long)]
        output: PathBuf,
        /// Join key column
        #[arg(long, default_value = "voyage_id")]
        on: String,
        /// Split this column's slash-separated values into one row each
        #[arg(long)]
        explode_column: Option<String>,
        /// Normalize spellings in this place column
        #[arg(long)]
        place_column: Option<String>,
        /// Standardize separators in the join key column
        #[arg(long)]
        fix_voyage_ids: bool,
    },
    /// Summarize port-to-port routes from a processed roll
    Routes {
        /// Processed per-leg CSV
        input: PathBuf,
        /// Embarkation port column
        #[arg(long, default_value = "Emb_loc")]
        from: String,
        /// Disembarkation port column
        #[arg(long, default_value = "Disemb_loc")]
        to: String,
        /// Write the edge list as CSV instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    match cli.command {
        Command::Process { input, output } => {
            let summary = pipeline::run_process(&input, &output)?;
            eprintln!(
                "{} rows in, {} legs out ({} embark ports backfilled)",
                summary.rows_in, summary.rows_out, summary.backfilled
            );
        }
        Command::Prepare {
            inputs,
            output,
            on,
            explode_column,
            place_column,
            fix_voyage_ids,
        } => {
            let voyage_col = fix_voyage_ids.then_some(on.as_str());
            let rows = pipeline::run_prepare(
                &inputs,
                &output,
                &on,
                explode_column.as_deref(),
                place_column.as_deref(),
                voyage_col,
            )?;
            eprintln!("joined {} tables into {} rows", inputs.len(), rows);
        }
        Command::Routes {
            input,
            from,
            to,
            output,
        } => {
            let graph = pipeline::run_routes(&input, &from, &to)?;
            eprintln!(
                "{} ports, {} distinct routes",
                graph.port_count(),
                graph.edge_count()
            );
            match output {
                Some(path) => graph.to_table().to_csv_path(&path)?,
                None => {
                    for (from, to, legs) in graph.edges() {
                        println!("{from} -> {to}: {legs}");
                    }
                }
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}
