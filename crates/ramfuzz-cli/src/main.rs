//! `ramfuzz`: generates C++ fuzzing harnesses from declaration dumps.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ramfuzz_ast::{parse_tu, TranslationUnit};
use ramfuzz_codegen::{generate, GenConfig, GenerationStatus, RUNTIME_HEADER};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ramfuzz")]
#[command(about = "Generate fuzzing harnesses for the classes in C++ declaration dumps")]
#[command(version)]
struct Cli {
    /// Declaration dumps, one per translation unit
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving the generated files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Generated header name
    #[arg(long, default_value = "fuzz.hpp")]
    header: String,

    /// Generated source name
    #[arg(long, default_value = "fuzz.cpp")]
    source: String,

    /// Generator configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(status) => ExitCode::from(status.exit_code() as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(GenerationStatus::FrontEndError.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<GenerationStatus> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GenConfig::default(),
    };
    config.header_name = cli.header.clone();

    let units = cli
        .inputs
        .iter()
        .map(|path| load_unit(path))
        .collect::<Result<Vec<_>>>()?;

    let generated = generate(&units, &config)?;
    let report = &generated.report;
    for diag in &report.errors {
        match &diag.location {
            Some(loc) => eprintln!("{loc}: {}", diag.message),
            None => eprintln!("{}", diag.message),
        }
    }
    for (class, reason) in &report.skipped {
        debug!(%class, ?reason, "no harness");
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;
    write_output(&cli.out_dir.join(&cli.header), &generated.header)?;
    write_output(&cli.out_dir.join(&cli.source), &generated.source)?;
    let runtime = cli.out_dir.join(&config.runtime_header);
    if let Some(parent) = runtime.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    write_output(&runtime, RUNTIME_HEADER)?;
    info!(
        header = %cli.header,
        source = %cli.source,
        harnesses = report.processed.len(),
        "wrote harnesses"
    );

    if report.status == GenerationStatus::Incomplete {
        eprintln!("missing harnesses for:");
        for name in &report.missing {
            eprintln!("  {name}");
        }
    }
    Ok(report.status)
}

fn load_config(path: &Path) -> Result<GenConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Malformed config {}", path.display()))
}

fn load_unit(path: &Path) -> Result<TranslationUnit> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_tu(&text).with_context(|| format!("Malformed declaration dump {}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
