//! pdfink bridge binary
//!
//! Consumes one flatten request (JSON payload from the capture surface) and
//! runs it to completion, printing the new artifact's path. Dispatching this
//! off the viewer's event loop is the caller's concern; the call itself is
//! synchronous and all-or-nothing.

use anyhow::{Context, Result};
use clap::Parser;
use pdfink_core::{flatten_to_file, FlattenReport, FlattenRequest};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pdfink")]
#[command(version, about = "Flatten captured annotations into a copy of a PDF")]
struct Args {
    /// Path to a flatten request JSON file, or '-' to read it from stdin
    request: PathBuf,

    /// Emit the outcome as a JSON report on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdfink_core=info".parse()?)
                .add_directive("pdfink_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw = if args.request == PathBuf::from("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.request)
            .with_context(|| format!("Failed to read request file {}", args.request.display()))?
    };

    let request: FlattenRequest =
        serde_json::from_str(&raw).context("Request payload is not valid JSON")?;
    let records = request.records();
    info!(
        source = %request.source.display(),
        records = records.len(),
        "starting flatten"
    );

    let result = flatten_to_file(&request.source, &records);

    if args.json {
        let report = FlattenReport::from_result(&result);
        println!("{}", serde_json::to_string(&report)?);
        if !report.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    let outcome = result?;
    for skipped in &outcome.skipped_pages {
        warn!(page = skipped.page, reason = %skipped.reason, "page annotations skipped");
    }
    println!("{}", outcome.output_path.display());
    Ok(())
}
