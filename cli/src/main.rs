#![allow(clippy::print_stderr)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueHint};
use rqengine::{QueryEvaluator, QueryResults};
use rqrdf::{Dataset, NQuadsParser, NQuadsWriter};
use rqresults::{QueryResultsFormat, QueryResultsSerializer};
use std::fs::{self, File};
use std::io::{stdout, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run a SPARQL query over RDF documents loaded in memory.
#[derive(Parser)]
#[command(about, version, name = "rquery")]
struct Args {
    /// Results serialization format.
    #[arg(long, default_value = "xml")]
    format: String,
    /// The query language. Only `sparql` is supported.
    #[arg(long, default_value = "sparql")]
    query_language: String,
    /// RDF documents (N-Triples or N-Quads) loaded into the dataset.
    #[arg(long, value_hint = ValueHint::FilePath)]
    data: Vec<PathBuf>,
    /// Base IRI used to resolve relative IRIs of the query.
    #[arg(long)]
    base: Option<String>,
    /// The file holding the query text.
    #[arg(value_hint = ValueHint::FilePath)]
    queryfile: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let prepared = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(error) => {
            eprintln!("{error:#}");
            return ExitCode::from(1);
        }
    };
    match run(&args, prepared) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::from(2)
        }
    }
}

fn prepare(args: &Args) -> Result<rqalgebra::PreparedQuery> {
    if !args.query_language.eq_ignore_ascii_case("sparql") {
        return Err(anyhow!("unknown query language '{}'", args.query_language));
    }
    let query = fs::read_to_string(&args.queryfile)
        .with_context(|| format!("failed to read {}", args.queryfile.display()))?;
    let prepared = QueryEvaluator::new()
        .prepare(&query, args.base.as_deref())
        .with_context(|| format!("failed to prepare {}", args.queryfile.display()))?;
    for warning in &prepared.warnings {
        tracing::warn!("{warning}");
    }
    Ok(prepared)
}

fn run(args: &Args, prepared: rqalgebra::PreparedQuery) -> Result<()> {
    let format = QueryResultsFormat::from_name(&args.format)
        .ok_or_else(|| anyhow!("unknown results format '{}'", args.format))?;
    let mut dataset = Dataset::new();
    for path in &args.data {
        let file = BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        );
        let quads = NQuadsParser::new()
            .parse_reader(file)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        dataset.extend(quads);
    }
    tracing::debug!(quads = dataset.len(), "dataset loaded");

    let results = QueryEvaluator::new().execute(dataset, &prepared.query)?;
    let output = BufWriter::new(stdout().lock());
    match results {
        QueryResults::Solutions(solutions) => {
            let mut serializer = QueryResultsSerializer::from_format(format)
                .serialize_solutions_to_writer(output, solutions.variables())?;
            for solution in solutions {
                serializer.serialize(&solution?)?;
            }
            serializer.finish()?.flush()?;
        }
        QueryResults::Boolean(value) => {
            QueryResultsSerializer::from_format(format)
                .serialize_boolean_to_writer(output, value)?
                .flush()?;
        }
        QueryResults::Graph(triples) => {
            let mut writer = NQuadsWriter::new(output);
            for triple in triples {
                writer.serialize_triple(&triple?)?;
            }
            writer.finish().flush()?;
        }
    }
    Ok(())
}
