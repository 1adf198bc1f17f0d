//! sdb2xml - renders a shim database as an XML report.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use sdb_xml::config::PATCH_DIR_ENV;
use sdb_xml::{write_report, OpenProvider, OutputMode, ReportOptions, SdbError, SdbFile, ShimDatabase};

/// Extracts data as XML from a shim database used for application compatibility.
#[derive(Parser)]
#[command(name = "sdb2xml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the shim database to process
    sdb: PathBuf,

    /// Base-64 encode binary data in the XML report
    #[arg(long, conflicts_with = "extract")]
    base64: bool,

    /// Extract binary data to the current or report directory
    #[arg(long)]
    extract: bool,

    /// Path to the XML file to generate; otherwise, output to console
    #[arg(short, long, value_name = "REPORT")]
    out: Option<PathBuf>,

    /// Directory searched when the database path does not exist
    #[arg(long, env = PATCH_DIR_ENV, value_name = "DIR")]
    patch_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<SdbError>()
            .map(SdbError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let report = cli.out.as_ref().map(|path| cwd.join(path));
    let dir = report
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    let mode = OutputMode::from_flags(cli.base64, cli.extract, dir.clone())?;
    let options = ReportOptions::with_mode(mode);

    let patch_dir = cli.patch_dir.clone().or_else(SdbFile::patch_directory);
    let mut database = ShimDatabase::<SdbFile>::open_with_patch_dir(&cli.sdb, patch_dir.as_deref())?;

    match report {
        Some(path) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            if let Err(err) = write_report(&database, BufWriter::new(file), &options) {
                // Partial reports are not valid documents
                let _ = fs::remove_file(&path);
                return Err(err.into());
            }
        }
        None => {
            if options.mode.is_extract() {
                fs::create_dir_all(&dir)?;
            }
            let mut stdout = write_report(&database, io::stdout().lock(), &options)?;
            stdout.flush()?;
        }
    }

    database.close();
    Ok(())
}
