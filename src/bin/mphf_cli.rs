//! `mphf-cli` — build and query a minimal perfect hash function from the
//! command line. Interface only (§6); no long-running service.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Instant;
use succinct_ds::{BuildConfig, Builder, Mphf, MphError, Reader, Writer};
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
    Mphf(#[from] MphError),
}

#[derive(Parser)]
#[command(name = "mphf-cli", about = "Build and query a minimal perfect hash function")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a function over the keys in `--input` and write it to `--output`.
    Build {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short = 'c', long, default_value_t = 6.0)]
        c: f64,
        #[arg(short = 'a', long, default_value_t = 0.94)]
        alpha: f64,
        #[arg(short, long)]
        benchmark: bool,
    },
    /// Look up keys against a previously built function.
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
            c,
            alpha,
            benchmark,
        } => {
            let keys = read_keys(&input)?;
            log::info!("read {} keys from {input}", keys.len());
            let config = BuildConfig {
                c,
                alpha,
                seed,
                ..Default::default()
            };
            let t0 = Instant::now();
            let mphf = Builder::new().with_config(config).build(&keys)?;
            if benchmark {
                let elapsed = t0.elapsed().as_secs_f64();
                println!(
                    "build: {elapsed:.3}s ({:.1} M keys/s)",
                    keys.len() as f64 / elapsed / 1e6
                );
            }
            let mut w = Writer::new();
            mphf.write_to(&mut w);
            fs::write(&output, w.into_bytes())?;
            log::info!("wrote mphf to {output}");
            Ok(())
        }
        Command::Lookup { input, key } => {
            let bytes = fs::read(&input)?;
            let mut r = Reader::new(&bytes);
            let mphf = Mphf::read_from(&mut r)?;
            if let Some(k) = key {
                println!("{}", mphf.get(k.as_bytes()));
            } else {
                let stdin = io::stdin();
                let stdout = io::stdout();
                let mut out = stdout.lock();
                for line in stdin.lock().lines() {
                    let line = line?;
                    let k = line.trim();
                    if !k.is_empty() {
                        writeln!(out, "{}", mphf.get(k.as_bytes()))?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Records are space-split: the first token is the key, an optional second
/// token is a value the MPHF tool ignores but still validates (§6).
fn read_keys(path: &str) -> Result<Vec<Vec<u8>>, CliError> {
    let file = fs::File::open(path)?;
    let mut keys = Vec::new();
    for (idx, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let mut fields = line.split(' ').filter(|s| !s.is_empty());
        let key = fields.next().ok_or_else(|| CliError::Parse {
            line: line_no,
            detail: "missing key field".to_string(),
        })?;
        if let Some(value) = fields.next() {
            value.parse::<u64>().map_err(|e| CliError::Parse {
                line: line_no,
                detail: format!("value field {value:?} is not a u64: {e}"),
            })?;
        }
        keys.push(key.as_bytes().to_vec());
    }
    Ok(keys)
}
