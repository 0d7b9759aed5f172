//! `burr-cli` — build and query a Bumped Ribbon Retrieval structure from
//! the command line. Interface only (§6); no long-running service.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;
use succinct_ds::{BumpedRibbon, BumpedRibbonError, Reader, RibbonConfig, Writer};
use thiserror::Error;

/// Driver-layer errors (§7): malformed input records and I/O failures are
/// surfaced here, not by the core containers.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed record on line {line}: {detail}")]
    Parse { line: usize, detail: String },
    #[error(transparent)]
    Burr(#[from] BumpedRibbonError),
}

#[derive(Parser)]
#[command(name = "burr-cli", about = "Build and query a Bumped Ribbon Retrieval structure")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a retrieval structure over `key,value` records in `--input`.
    Build {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short = 'w', long, default_value_t = 32)]
        width: u32,
        #[arg(short = 'd', long, default_value_t = 256)]
        dict: usize,
        #[arg(short, long)]
        benchmark: bool,
    },
    /// Look up keys against a previously built structure.
    Lookup {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        key: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Build {
            input,
            output,
            seed,
            width,
            dict,
            benchmark,
        } => {
            let (keys, values) = read_records(&input)?;
            log::info!("read {} records from {input}", keys.len());
            let config = RibbonConfig {
                band_width: width,
                bucket_size: dict,
                seed,
                ..Default::default()
            };
            let t0 = Instant::now();
            let burr = BumpedRibbon::build(&keys, &values, config)?;
            if benchmark {
                let elapsed = t0.elapsed().as_secs_f64();
                println!(
                    "build: {elapsed:.3}s ({:.1} M records/s)",
                    keys.len() as f64 / elapsed / 1e6
                );
            }
            let mut w = Writer::new();
            burr.write_to(&mut w);
            fs::write(&output, w.into_bytes())?;
            log::info!("wrote burr structure to {output}");
            Ok(())
        }
        Command::Lookup { input, key } => {
            let bytes = fs::read(&input)?;
            let mut r = Reader::new(&bytes);
            let burr = BumpedRibbon::read_from(&mut r)?;
            if let Some(k) = key {
                println!("{}", burr.get(k.as_bytes()));
            } else {
                let stdin = io::stdin();
                let stdout = io::stdout();
                let mut out = stdout.lock();
                for line in stdin.lock().lines() {
                    let line = line?;
                    let k = line.trim();
                    if !k.is_empty() {
                        writeln!(out, "{}", burr.get(k.as_bytes()))?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Records are `key,value` pairs, one per line. A missing or malformed value
/// field is a parse error (§7), not silently coerced to zero.
fn read_records(path: &str) -> Result<(Vec<Vec<u8>>, Vec<u64>), CliError> {
    let file = fs::File::open(path)?;
    let mut keys = Vec::new();
    let mut values = Vec::new();
    for (idx, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let mut parts = line.splitn(2, ',');
        let key = parts.next().ok_or_else(|| CliError::Parse {
            line: line_no,
            detail: "missing key field".to_string(),
        })?;
        let value = parts.next().ok_or_else(|| CliError::Parse {
            line: line_no,
            detail: "missing value field".to_string(),
        })?;
        let value = value.trim().parse::<u64>().map_err(|e| CliError::Parse {
            line: line_no,
            detail: format!("value field {value:?} is not a u64: {e}"),
        })?;
        keys.push(key.as_bytes().to_vec());
        values.push(value);
    }
    Ok((keys, values))
}
