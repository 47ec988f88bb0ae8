//! brbuf: compress, decompress and verify files with brotli-buffer.

use anyhow::{bail, Context};
use brotli_buffer::{Bytes, CompressionOptions, Engine, EngineConfig, Mode};
use brotli_buffer_cli::output::{format_duration, format_transfer, Status};
use brotli_buffer_telemetry::{metrics, TelemetryConfig, Timer};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "brbuf")]
#[command(about = "Whole-buffer Brotli compression")]
#[command(version)]
struct Cli {
    /// Config file (defaults to brotli-buffer.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Run on a dedicated pool with this many workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Print collected metrics as JSON to stderr when done
    #[arg(long, global = true)]
    stats: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    Compress {
        /// File to compress
        input: PathBuf,
        /// Destination, `-` for stdout (defaults to <input>.br)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Quality, 0-11
        #[arg(short, long, allow_hyphen_values = true)]
        quality: Option<i64>,
        /// Content hint: generic, text or font
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
        /// Window size as a power of two, 10-24
        #[arg(long)]
        lgwin: Option<i64>,
    },
    /// Decompress a file
    Decompress {
        /// File to decompress
        input: PathBuf,
        /// Destination, `-` for stdout (defaults to <input> without .br)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a raw file compresses to exactly the given fixture and back
    Verify {
        /// Uncompressed fixture
        raw: PathBuf,
        /// Expected compressed bytes
        compressed: PathBuf,
        /// Quality the fixture was produced with
        #[arg(short, long, allow_hyphen_values = true)]
        quality: Option<i64>,
    },
}

/// Logging setup for the global flags, `None` for the defaults.
fn telemetry_config(verbose: bool, json: bool) -> Option<TelemetryConfig> {
    if !verbose && !json {
        return None;
    }
    let mut config = if verbose { TelemetryConfig::verbose() } else { TelemetryConfig::default() };
    config.json = json;
    config.show_target = verbose;
    Some(config)
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::from_name(s).ok_or_else(|| format!("unknown mode '{s}' (expected generic, text or font)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match telemetry_config(cli.verbose, cli.log_json) {
        Some(telemetry) => brotli_buffer_telemetry::init_with_config(telemetry)?,
        None => brotli_buffer_telemetry::init()?,
    }

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.worker_threads = Some(workers);
    }
    let engine = Engine::from_config(&config)?;
    if let Some(workers) = config.worker_threads {
        metrics().gauge("engine.worker_threads", workers as u64);
    }

    let result = run(&engine, cli.command).await;

    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&metrics().export_json())?);
    }

    if let Err(e) = result {
        Status::error(&format!("{e:#}"));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(engine: &Engine, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Compress { input, output, quality, mode, lgwin } => {
            let data = read(&input).await?;
            let options = CompressionOptions {
                quality,
                mode: mode.map(|m| m as i64),
                lgwin,
                lgblock: None,
            };

            let compressed = timed(engine, "compress", data, Some(options)).await?;
            let output = output.unwrap_or_else(|| append_extension(&input, "br"));
            write(&output, &compressed).await?;
        }

        Commands::Decompress { input, output } => {
            let data = read(&input).await?;
            let restored = timed(engine, "decompress", data, None).await?;
            let output = output.unwrap_or_else(|| {
                let derived = strip_br(&input);
                if !has_br_extension(&input) {
                    Status::warning(&format!(
                        "{} has no .br extension, writing {}",
                        input.display(),
                        derived.display()
                    ));
                }
                derived
            });
            write(&output, &restored).await?;
        }

        Commands::Verify { raw, compressed, quality } => {
            let raw_data = read(&raw).await?;
            let expected = read(&compressed).await?;
            let options = CompressionOptions { quality, ..CompressionOptions::default() };

            let produced = timed(engine, "compress", raw_data.clone(), Some(options)).await?;
            if produced != expected {
                bail!(
                    "{} does not match: produced {} bytes, fixture has {}",
                    compressed.display(),
                    produced.len(),
                    expected.len()
                );
            }

            let restored = timed(engine, "decompress", expected, None).await?;
            if restored != raw_data {
                bail!("{} does not decompress to {}", compressed.display(), raw.display());
            }

            Status::success(&format!("{} matches {}", compressed.display(), raw.display()));
        }
    }

    Ok(())
}

/// Run one operation through the engine and record it.
async fn timed(
    engine: &Engine,
    operation: &'static str,
    data: Vec<u8>,
    options: Option<CompressionOptions>,
) -> anyhow::Result<Bytes> {
    let input_len = data.len();
    let timer = Timer::start();

    let outcome = match options {
        Some(options) => engine.compress_async(data, options).await,
        None => engine.decompress_async(data).await,
    };

    let elapsed = timer.finish(operation, input_len, outcome.as_ref().ok().map(Bytes::len));
    let output = outcome.with_context(|| format!("{operation} failed"))?;

    Status::info(&format!(
        "{operation}: {} in {}",
        format_transfer(input_len as u64, output.len() as u64),
        format_duration(elapsed)
    ));
    Ok(output)
}

async fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn write(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if path == Path::new("-") {
        use tokio::io::AsyncWriteExt;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "wrote output");
    Ok(())
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn has_br_extension(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "br")
}

fn strip_br(path: &Path) -> PathBuf {
    if has_br_extension(path) {
        path.with_extension("")
    } else {
        append_extension(path, "out")
    }
}
