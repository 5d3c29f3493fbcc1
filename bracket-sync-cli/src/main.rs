mod config;
mod logger;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use bracket_sync_core::linker::{BracketLinker, LinkReport};
use bracket_sync_core::provider::Payload;
use bracket_sync_core::slot::SlotId;
use bracket_sync_core::store::{MemoryStore, SlotStore};
use bracket_sync_core::sync::{Ingest, SyncReport};
use clap::Parser;
use thiserror::Error;

use config::{Config, ConfigError};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Path to the config file.
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Directory containing the bracket map files. Overrides the config.
    #[clap(short, long)]
    map_dir: Option<PathBuf>,
    /// Season year for template brackets without a year in their title.
    #[clap(short, long)]
    season_year: Option<u16>,
    /// Provider payloads (JSON).
    #[clap(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} of {1} tournaments failed")]
    Failed(usize, usize),
}

fn main() {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", Error::from(err));
            process::exit(1);
        }
    };

    if let Err(err) = logger::init(config.loglevel) {
        eprintln!("Failed to install logger: {}", err);
        process::exit(1);
    }

    if let Err(err) = run(args, config) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn run(args: Args, config: Config) -> Result<(), Error> {
    let total = args.files.len();

    let mut payloads = Vec::with_capacity(total);
    let mut failed = 0;
    for path in &args.files {
        match read_payload(path) {
            Ok(payload) => payloads.push(payload.with_season_year(args.season_year)),
            Err(err) => {
                log::error!("Skipping payload: {}", err);
                failed += 1;
            }
        }
    }

    let map_dir = args.map_dir.unwrap_or(config.map_dir);
    log::debug!("Using bracket maps in {}", map_dir.display());

    let mut ingest = Ingest::new(MemoryStore::new(), BracketLinker::new(map_dir));
    let summary = ingest.sync_all(payloads);
    let store = ingest.into_store();

    for report in &summary.synced {
        print_report(&store, report, 0);
    }

    failed += summary.failed.len();
    if failed > 0 {
        return Err(Error::Failed(failed, total));
    }

    Ok(())
}

fn read_payload(path: &Path) -> Result<Payload, Error> {
    let json = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;

    serde_json::from_str(&json).map_err(|source| Error::Payload {
        path: path.to_owned(),
        source,
    })
}

fn print_report(store: &MemoryStore, report: &SyncReport, depth: usize) {
    let indent = "  ".repeat(depth);

    let link = match &report.link {
        None => "not linked".to_owned(),
        Some(LinkReport::AlreadyLinked) => "already linked".to_owned(),
        Some(LinkReport::Linked { edges, shrinkage }) if shrinkage.is_empty() => {
            format!("{} edges", edges)
        }
        Some(LinkReport::Linked { edges, shrinkage }) => {
            format!("{} edges, {} rounds need a bracket map", edges, shrinkage.len())
        }
    };

    println!(
        "{}{} ({} slots, {})",
        indent, report.name, report.created, link
    );

    let slots = store.slots(report.tournament);
    if !slots.is_empty() {
        let key = |id: SlotId| store.get(id).map(|slot| slot.key());

        println!("{}ID | Slot | Side | Round | Match | Winner | Loser", indent);
        for slot in slots {
            println!(
                "{}{} | {} | {} | {} | {} | {} | {}",
                indent,
                slot.id,
                slot.key(),
                slot.side,
                slot.round_name,
                slot.match_id,
                slot.next_winner.and_then(key).unwrap_or_else(|| "-".to_owned()),
                slot.next_loser.and_then(key).unwrap_or_else(|| "-".to_owned()),
            );
        }
    }

    for group in &report.groups {
        print_report(store, group, depth + 1);
    }
}
