//! services/api/src/bin/openapi.rs
//!
//! Dumps the wizard API's OpenAPI document so the frontend can generate
//! its client. With `--check` the file is compared against the current
//! document and the process exits non-zero when it is stale.

use api_lib::web::ApiDoc;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi")]
#[command(about = "Write or verify the wizard API's OpenAPI document", long_about = None)]
#[command(version)]
struct Cli {
    /// Where the document is written or read from.
    #[arg(default_value = "openapi.json")]
    output: PathBuf,

    /// Fail if the file differs from the current document instead of writing it.
    #[arg(long)]
    check: bool,
}

fn render_document() -> Result<String, serde_json::Error> {
    let mut json = ApiDoc::openapi().to_pretty_json()?;
    json.push('\n');
    Ok(json)
}

fn is_stale(path: &Path, rendered: &str) -> bool {
    match std::fs::read_to_string(path) {
        Ok(existing) => existing != rendered,
        Err(_) => true,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rendered = match render_document() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("failed to render OpenAPI document: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        if is_stale(&cli.output, &rendered) {
            eprintln!("{} is out of date; rerun without --check", cli.output.display());
            return ExitCode::FAILURE;
        }
        println!("{} is up to date", cli.output.display());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = std::fs::write(&cli.output, rendered) {
        eprintln!("failed to write {}: {}", cli.output.display(), e);
        return ExitCode::FAILURE;
    }
    println!("OpenAPI document written to {}", cli.output.display());
    ExitCode::SUCCESS
}
