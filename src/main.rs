//! `tarpipe` command-line tool.
//!
//! `convert` turns a tar container into a TFRecord stream; `inspect` verifies
//! and summarizes an existing stream.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tarpipe::entities::{LogicalRecord, KEY_FIELD};
use tarpipe::transform::{Conversion, KeyMatch, Rename, SelectFields};
use tarpipe::value_objects::FeatureType;
use tarpipe::{
    ArchiveInput, ArchiveReader, Compression, Config, Pipeline, RecordReader, RecordWriter,
    StageChain, Strategy,
};

#[derive(Parser, Debug)]
#[command(name = "tarpipe")]
#[command(about = "Convert tar archives of multi-field samples into TFRecord streams", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a tar container into a record stream
    Convert(ConvertArgs),
    /// Verify a record stream and print a per-record summary
    Inspect {
        /// Record stream to read ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
        /// Print one JSON object per record
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Tar container to read ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,
    /// Record stream to write ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Treat the input as gzip-compressed
    #[arg(long)]
    gzip: bool,
    /// Record completion strategy (auto, greedy, seek)
    #[arg(long)]
    strategy: Option<Strategy>,
    /// Concurrent sink workers; 0 writes sequentially
    #[arg(short, long)]
    workers: Option<usize>,
    /// Capacity of the record queues
    #[arg(long)]
    queue_capacity: Option<usize>,
    /// Drop records that have no fields besides their key
    #[arg(long)]
    filter_empty: bool,
    /// Feature type for a field, as field=kind (repeatable)
    #[arg(long = "type", value_parser = parse_type)]
    types: Vec<(String, FeatureType)>,
    /// Copy a present source field to dest, as dest=src1,src2 (repeatable)
    #[arg(long, value_parser = parse_rename)]
    rename: Vec<Rename>,
    /// Keep only matching fields; `img*`, `*.txt` and `*meta*` match by prefix,
    /// suffix and substring (repeatable)
    #[arg(long, value_parser = parse_select)]
    select: Vec<KeyMatch>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

fn parse_type(s: &str) -> Result<(String, FeatureType), String> {
    let (field, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid type mapping (expected field=kind): {}", s))?;
    if field.is_empty() {
        return Err(format!("Invalid type mapping (empty field): {}", s));
    }
    Ok((field.to_string(), kind.parse()?))
}

fn parse_rename(s: &str) -> Result<Rename, String> {
    let (dest, sources) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid rename (expected dest=src1,src2): {}", s))?;
    let sources: Vec<&str> = sources.split(',').filter(|p| !p.is_empty()).collect();
    if dest.is_empty() || sources.is_empty() {
        return Err(format!("Invalid rename: {}", s));
    }
    Ok(Rename::new(dest, sources))
}

fn parse_select(pattern: &str) -> Result<KeyMatch, String> {
    let starts = pattern.starts_with('*');
    let ends = pattern.len() > 1 && pattern.ends_with('*');
    let (matcher, rest) = match (starts, ends) {
        (true, true) => {
            let rest = &pattern[1..pattern.len() - 1];
            (KeyMatch::substring(rest), rest)
        }
        (true, false) => (KeyMatch::suffix(&pattern[1..]), &pattern[1..]),
        (false, true) => {
            let rest = &pattern[..pattern.len() - 1];
            (KeyMatch::prefix(rest), rest)
        }
        (false, false) => (KeyMatch::exact(pattern), pattern),
    };
    // Wildcards alone would select nothing but the key.
    if rest.trim_matches('*').is_empty() {
        return Err(format!("Invalid select pattern (needs a field name part): {}", pattern));
    }
    Ok(matcher)
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(args: &ConvertArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::from_env(),
    };

    if args.gzip {
        config.compression = Compression::Gzip;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(queue_capacity) = args.queue_capacity {
        config.queue_capacity = queue_capacity;
    }
    if args.filter_empty {
        config.filter_empty = true;
    }
    config.types.extend(args.types.iter().cloned());

    if let Err(e) = config.validate() {
        bail!("invalid configuration: {e}");
    }
    Ok(config)
}

fn logical_stages(args: &ConvertArgs, config: &Config) -> StageChain<LogicalRecord> {
    let mut chain = StageChain::<LogicalRecord>::new();
    for rename in &args.rename {
        chain = chain.transform(rename.clone());
    }
    if !args.select.is_empty() {
        let selection = args.select.iter().fold(
            SelectFields::<LogicalRecord>::default().with(KeyMatch::exact(KEY_FIELD)),
            |s, m| s.with(m.clone()),
        );
        chain = chain.transform(selection);
    }
    if config.filter_empty {
        chain = chain.skip_empty();
    }
    chain
}

async fn open_output(path: &Path) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(tokio::io::stdout()));
    }
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(file))
}

async fn convert(args: ConvertArgs, config: Config) -> Result<()> {
    let input = if is_stdio(&args.input) {
        ArchiveInput::stream(std::io::stdin())
    } else {
        ArchiveInput::open(&args.input)
            .with_context(|| format!("failed to open {}", args.input.display()))?
    };
    let reader = ArchiveReader::new(input, config.archive_options())?;
    info!(input = %args.input.display(), strategy = %reader.strategy(), "Converting archive");

    let pipeline = Pipeline::from_archive(reader)
        .logical_stages(logical_stages(&args, &config))
        .conversion(Conversion::from_types(config.types.clone()))
        .sink_mode(config.sink_mode());

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping pipeline");
            cancel.cancel();
        }
    });

    let mut writer = RecordWriter::new(BufWriter::new(open_output(&args.output).await?));
    let written = pipeline
        .run(&mut writer)
        .await
        .context("conversion failed")?;
    info!(records = written, output = %args.output.display(), "Conversion complete");
    Ok(())
}

#[derive(Serialize)]
struct FieldSummary {
    kind: FeatureType,
    len: usize,
}

#[derive(Serialize)]
struct RecordSummary {
    index: u64,
    key: Option<String>,
    fields: BTreeMap<String, FieldSummary>,
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(file))
}

async fn inspect(input: &Path, json: bool) -> Result<()> {
    let reader = RecordReader::new(BufReader::new(open_input(input).await?));
    let mut index = 0u64;

    while let Some(record) = reader
        .read_record()
        .await
        .with_context(|| format!("record {index} is invalid"))?
    {
        let summary = RecordSummary {
            index,
            key: record.key().map(str::to_string),
            fields: record
                .features()
                .iter()
                .map(|(name, feature)| {
                    (
                        name.clone(),
                        FieldSummary {
                            kind: feature.kind(),
                            len: feature.len(),
                        },
                    )
                })
                .collect(),
        };

        if json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            let fields: Vec<String> = summary
                .fields
                .iter()
                .map(|(name, f)| format!("{name}:{}[{}]", f.kind, f.len))
                .collect();
            println!(
                "{index}\t{}\t{}",
                summary.key.as_deref().unwrap_or("-"),
                fields.join(" ")
            );
        }
        index += 1;
    }

    if json {
        println!("{}", serde_json::json!({ "records": index }));
    } else {
        println!("{index} records");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => {
            let config = load_config(&args)?;
            init_tracing(&config.log_level, cli.log_format);
            if let Err(e) = convert(args, config).await {
                error!("{:#}", e);
                return Err(e);
            }
        }
        Commands::Inspect { input, json } => {
            let level = std::env::var("TARPIPE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            init_tracing(&level, cli.log_format);
            if let Err(e) = inspect(&input, json).await {
                error!("{:#}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
