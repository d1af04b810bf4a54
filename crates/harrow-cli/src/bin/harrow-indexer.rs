//! harrow-indexer: build `._UG#_Store` sidecar indexes so searches can
//! skip files that cannot match.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use harrow_index::{INDEX_FILENAME, Record, Store, index_bytes};
use harrow_unpack::Container;

/// Index directories for accelerated searching.
#[derive(Debug, Parser)]
#[command(name = "harrow-indexer", version, about)]
struct Args {
    /// Directories to index.
    #[arg(default_value = ".")]
    dirs: Vec<PathBuf>,

    /// Indexing accuracy 0..=9; higher is more accurate but larger.
    #[arg(short = 'a', long, default_value_t = 4)]
    accuracy: u8,

    /// Recurse into subdirectories.
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Remove index files instead of creating them.
    #[arg(short = 'd', long)]
    delete: bool,

    /// Skip binary files.
    #[arg(short = 'I', long)]
    ignore_binary: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let mut failed = false;
    for dir in &args.dirs {
        if let Err(e) = index_dir(dir, &args) {
            eprintln!("harrow-indexer: {dir:?}: {e:#}");
            failed = true;
        }
    }
    if failed { ExitCode::from(1) } else { ExitCode::SUCCESS }
}

fn index_dir(dir: &Path, args: &Args) -> anyhow::Result<()> {
    let store_path = dir.join(INDEX_FILENAME);
    if args.delete {
        if store_path.exists() {
            std::fs::remove_file(&store_path).context("removing index")?;
        }
    } else {
        let mut store = Store::new();
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .context("reading directory")?
            .filter_map(Result::ok)
            .collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in &entries {
            let path = entry.path();
            let Ok(kind) = entry.file_type() else { continue };
            if !kind.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == INDEX_FILENAME || name.starts_with('.') {
                continue;
            }
            match index_file(&path, &name, args) {
                Ok(Some(record)) => store.upsert(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping {path:?}: {e:#}"),
            }
        }
        store.save(&store_path).context("writing index")?;
    }
    if args.recurse {
        for entry in std::fs::read_dir(dir).context("reading directory")? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if entry.file_type().is_ok_and(|t| t.is_dir())
                && !entry.file_name().to_string_lossy().starts_with('.')
            {
                index_dir(&path, args)?;
            }
        }
    }
    Ok(())
}

fn index_file(path: &Path, basename: &str, args: &Args) -> anyhow::Result<Option<Record>> {
    let data = std::fs::read(path).context("reading file")?;
    let container = harrow_unpack::detect(&data);
    let compressed = container != Container::Plain;
    let archive = container == Container::Zip || looks_like_archive(&data);
    let binary = is_binary(&data);
    if binary && args.ignore_binary {
        return Ok(None);
    }
    let index = index_bytes(&data, args.accuracy.min(9));
    Ok(Some(Record {
        accuracy: args.accuracy.min(9),
        binary,
        archive,
        compressed,
        basename: basename.to_string(),
        hashes: index.hashes,
    }))
}

fn looks_like_archive(data: &[u8]) -> bool {
    harrow_unpack::is_tar_block(data) || harrow_unpack::is_cpio_header(data)
}

/// A quick binary sniff: NUL bytes or invalid UTF-8 early in the file.
fn is_binary(data: &[u8]) -> bool {
    let head = &data[..data.len().min(4096)];
    head.contains(&0)
}
