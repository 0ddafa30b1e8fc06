//! heapdb - inspect and build heap files

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use heapdb::access::{FieldType, HeapFileEncoder, TupleDesc};
use heapdb::config::StorageConfig;
use heapdb::database::Database;
use heapdb::storage::HeapPage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// heapdb - page-oriented heap file tool
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// JSON storage config; flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Buffer pool capacity in pages
    #[arg(short = 'p', long, global = true)]
    pages: Option<usize>,

    /// Milliseconds a page request waits for a conflicting lock
    #[arg(long, global = true, conflicts_with = "no_lock_timeout")]
    lock_timeout_ms: Option<u64>,

    /// Wait for locks until granted or a deadlock is found
    #[arg(long, global = true)]
    no_lock_timeout: bool,
}

impl Args {
    fn storage_config(&self) -> Result<StorageConfig> {
        let mut config = match &self.config {
            Some(path) => StorageConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StorageConfig::default(),
        };
        if let Some(pages) = self.pages {
            config = config.with_buffer_pool_pages(pages);
        }
        if let Some(ms) = self.lock_timeout_ms {
            config = config.with_lock_timeout(Some(Duration::from_millis(ms)));
        }
        if self.no_lock_timeout {
            config = config.with_lock_timeout(None);
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a comma-separated text file as a heap file
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Column types, e.g. int,int,string
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<FieldType>,
    },
    /// Print every tuple of a heap file
    Print {
        file: PathBuf,
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<FieldType>,
    },
    /// Show table id, page count and slot capacity of a heap file
    Info {
        file: PathBuf,
        #[arg(short, long, value_delimiter = ',', required = true)]
        types: Vec<FieldType>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = args.storage_config()?;
    log::debug!("{:?}", config);
    match args.command {
        Command::Convert {
            input,
            output,
            types,
        } => convert(&input, &output, types),
        Command::Print { file, types } => print(&file, types, config),
        Command::Info { file, types } => info(&file, types),
    }
}

fn schema(types: Vec<FieldType>) -> Result<Arc<TupleDesc>> {
    Ok(Arc::new(
        TupleDesc::from_types(types).context("Invalid column types")?,
    ))
}

fn convert(input: &Path, output: &Path, types: Vec<FieldType>) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let file = HeapFileEncoder::convert_text(reader, output, schema(types)?)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    println!(
        "Wrote {} pages to {}",
        file.num_pages()?,
        file.path().display()
    );
    Ok(())
}

fn print(path: &Path, types: Vec<FieldType>, config: StorageConfig) -> Result<()> {
    let db = Database::new(config);
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table");
    let table = db
        .open_table(path, name, schema(types)?)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let file = db.catalog().file(table)?;

    let txn = db.begin();
    let mut count = 0usize;
    for tuple in file.scan(db.buffer_pool(), txn.id())? {
        println!("{}", tuple.context("Scan failed")?);
        count += 1;
    }
    txn.commit()?;
    log::info!("{} tuples", count);
    Ok(())
}

fn info(path: &Path, types: Vec<FieldType>) -> Result<()> {
    let desc = schema(types)?;
    let file = heapdb::access::HeapFile::new(path, desc.clone())
        .with_context(|| format!("Failed to open {}", path.display()))?;
    println!("path:           {}", file.path().display());
    println!("table id:       {}", file.id());
    println!("schema:         {}", desc);
    println!("tuple size:     {} bytes", desc.size());
    println!("pages:          {}", file.num_pages()?);
    println!("slots per page: {}", HeapPage::slots_per_page(&desc));
    Ok(())
}
