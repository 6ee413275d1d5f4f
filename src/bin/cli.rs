//! BlockDoc CLI
//!
//! Command-line interface for a BlockDoc data directory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process;

use blockdoc::{BlockDocError, Config, Database, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// BlockDoc CLI
#[derive(Parser, Debug)]
#[command(name = "blockdoc")]
#[command(about = "Document store over size-bounded block files")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./blockdoc_data", global = true)]
    data_dir: String,

    /// Block size cap in KB for newly created collections
    #[arg(short = 'b', long, default_value = "1.0", global = true)]
    max_block_kb: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a JSON document
    Put {
        /// Collection name (created if missing)
        collection: String,

        /// Document as a JSON object
        json: String,

        /// Explicit document id (UUID)
        #[arg(long, default_value = "")]
        id: String,
    },

    /// Get a document by id
    Get {
        /// Collection name
        collection: String,

        /// Document id (UUID)
        id: String,
    },

    /// List a collection's blocks
    Blocks {
        /// Collection name
        collection: String,

        /// Print each block's documents
        #[arg(long)]
        content: bool,
    },

    /// Rebuild a collection's index from its block files
    Rebuild {
        /// Collection name
        collection: String,
    },

    /// Insert every line of a JSON-lines file
    Import {
        /// Collection name (created if missing)
        collection: String,

        /// Path to a .jsonl file (one JSON object per line)
        file: String,

        /// Worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },

    /// List collections
    Collections,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockdoc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .max_block_kb(args.max_block_kb)
        .build();
    let db = Database::open(config)?;

    match args.command {
        Commands::Put { collection, json, id } => {
            let fields = parse_object(&json)?;
            let id = db.collection(&collection)?.put(fields, &id)?;
            println!("{}", id);
        }
        Commands::Get { collection, id } => {
            let document = db.open_collection(&collection)?.get_by_str(&id)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Blocks { collection, content } => {
            let collection = db.open_collection(&collection)?;
            for block in collection.list_blocks(content)? {
                println!(
                    "block {:>6}  {:>8} bytes  {}",
                    block.id(),
                    block.size_on_disk()?,
                    block.path().display()
                );
                for document in block.documents().unwrap_or_default() {
                    println!("    {}", serde_json::to_string(document)?);
                }
            }
        }
        Commands::Rebuild { collection } => {
            let collection = db.open_collection(&collection)?;
            let stats = collection.rebuild_index_from_disk()?;
            println!(
                "scanned {} blocks ({} missing, {} corrupt), indexed {} documents",
                stats.blocks_scanned,
                stats.blocks_missing,
                stats.blocks_corrupt,
                collection.len()
            );
        }
        Commands::Import { collection, file, workers } => {
            let reader = BufReader::new(File::open(&file)?);
            let mut batch = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                batch.push(parse_object(&line)?);
            }

            let ids = db.collection(&collection)?.put_many(batch, workers)?;
            tracing::info!(collection = %collection, documents = ids.len(), "import finished");
        }
        Commands::Collections => {
            for name in db.list_collections()? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn parse_object(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(BlockDocError::Serialization(
            "document must be a JSON object".to_string(),
        )),
    }
}
