use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use rdbsnap::constants::defaults;
use rdbsnap::observer::Plain;
use rdbsnap::store::RedisStore;
use rdbsnap::{DumpSettings, RestoreSettings, SnapResult, ValueType};

#[derive(Parser, Debug)]
#[command(name = "rdbsnap", version, about = "Dump and restore Redis databases as JSON snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture databases into a snapshot file
    Dump(DumpArgs),
    /// Rebuild databases from a snapshot file
    Restore(RestoreArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Connection URL of the store
    #[arg(short, long, default_value = defaults::SERVER)]
    server: String,

    /// Database to include (repeatable); all databases when omitted
    #[arg(short = 'd', long = "db", allow_negative_numbers = true)]
    databases: Vec<i64>,

    /// Keys per batch
    #[arg(short, long, default_value_t = defaults::BATCH_SIZE)]
    batch_size: usize,

    /// Only keys matching this regular expression
    #[arg(short, long)]
    keys: Option<String>,

    /// Only keys of this type (repeatable)
    #[arg(short = 't', long = "type", value_enum)]
    types: Vec<TypeArg>,

    /// Log per-key and per-batch detail
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DumpArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Snapshot file to write
    #[arg(short, long, default_value = defaults::SNAPSHOT_FILE)]
    output: PathBuf,

    /// Read keys one by one instead of through a server-side script
    #[arg(long)]
    no_script: bool,
}

#[derive(Args, Debug)]
struct RestoreArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Snapshot file to read
    #[arg(short, long, default_value = defaults::SNAPSHOT_FILE)]
    input: PathBuf,

    /// Wipe each target database before writing (requires --force)
    #[arg(long)]
    flush: bool,

    /// Write into non-empty databases, overwriting conflicting keys
    #[arg(long)]
    force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    String,
    List,
    Set,
    #[value(alias = "sortedset")]
    Zset,
    Hash,
}

impl From<TypeArg> for ValueType {
    fn from(arg: TypeArg) -> ValueType {
        match arg {
            TypeArg::String => ValueType::String,
            TypeArg::List => ValueType::List,
            TypeArg::Set => ValueType::Set,
            TypeArg::Zset => ValueType::SortedSet,
            TypeArg::Hash => ValueType::Hash,
        }
    }
}

impl CommonArgs {
    fn types(&self) -> Vec<ValueType> {
        self.types.iter().copied().map(ValueType::from).collect()
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rdbsnap={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_dump(args: DumpArgs) -> SnapResult<()> {
    let common = &args.common;
    let mut settings = DumpSettings::new(&common.databases)?
        .with_batch_size(common.batch_size)?
        .with_scripting(!args.no_script)
        .with_types(&common.types());
    if let Some(pattern) = &common.keys {
        settings = settings.with_key_pattern(pattern)?;
    }

    let mut store = RedisStore::connect(&common.server).await?;
    let summary = rdbsnap::dump_to_file(&mut store, &settings, Plain::stderr(), &args.output).await?;
    println!(
        "dumped {} keys from {} databases to {} ({} skipped)",
        summary.keys,
        summary.databases,
        args.output.display(),
        summary.skipped
    );
    Ok(())
}

async fn run_restore(args: RestoreArgs) -> SnapResult<()> {
    let common = &args.common;
    let mut settings = RestoreSettings::new(&common.databases, args.flush, args.force)?
        .with_batch_size(common.batch_size)?
        .with_types(&common.types());
    if let Some(pattern) = &common.keys {
        settings = settings.with_key_pattern(pattern)?;
    }

    let mut store = RedisStore::connect(&common.server).await?;
    let summary =
        rdbsnap::restore_from_file(&mut store, &settings, Plain::stderr(), &args.input).await?;
    println!(
        "restored {} keys into {} databases from {} ({} skipped)",
        summary.restored,
        summary.databases,
        args.input.display(),
        summary.skipped
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Dump(args) => {
            init_logging(args.common.verbose);
            run_dump(args).await
        }
        Command::Restore(args) => {
            init_logging(args.common.verbose);
            run_restore(args).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
