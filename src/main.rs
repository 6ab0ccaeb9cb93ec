//! Binary entrypoint: thumbnails every image under the given paths.
//!
//! Drives the library the way a UI event loop would: submit, wait on the
//! loader's descriptor, acknowledge, drain.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use thumb_engine::scan::{ScanOptions, collect_images};
use thumb_engine::{AsyncLoader, Configuration, Image, LoadResult, ThumbnailCache};

#[derive(Debug, Parser)]
#[command(name = "thumb-engine", about = "Decode and thumbnail images off-thread")]
struct Cli {
    /// Image files or directories to scan
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write `<index>-<stem>.thumb.png` files into this directory
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Override the worker count
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("thumb_engine={}", level).parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(workers) = cli.workers {
        cfg.loader.workers = workers;
    }
    let cfg = cfg.validated().context("validating configuration")?;

    let scan = ScanOptions {
        recursive: !cli.no_recursive,
        ..ScanOptions::default()
    };
    let files = collect_images(&cli.paths, &scan)?;
    info!(count = files.len(), "collected images");

    if let Some(out) = &cli.out {
        std::fs::create_dir_all(out)
            .with_context(|| format!("creating output directory {}", out.display()))?;
    }

    let loader = AsyncLoader::new(cfg.loader_options()).context("starting loader")?;
    let mut cache = ThumbnailCache::new(cfg.cache_options());
    for (index, path) in files.iter().enumerate() {
        loader.submit(path.clone(), index as i32);
    }

    let started = Instant::now();
    let mut ok = 0usize;
    let mut failed = 0usize;
    loop {
        loader
            .notifier()
            .wait(Duration::from_millis(250))
            .context("polling loader")?;
        loader.acknowledge().context("acknowledging loader")?;
        let busy = loader.outstanding();
        let batch = loader.drain();
        let idle = batch.is_empty() && !busy;
        for result in batch {
            if handle_result(result, cli.out.as_deref(), &mut cache) {
                ok += 1;
            } else {
                failed += 1;
            }
        }
        if idle {
            break;
        }
    }

    info!(
        ok,
        failed,
        cached = cache.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "done"
    );
    loader.shutdown();
    Ok(())
}

fn handle_result(mut result: LoadResult, out: Option<&Path>, cache: &mut ThumbnailCache) -> bool {
    let Some((image, thumb)) = result.take_images() else {
        warn!(
            index = result.correlation_index,
            path = %result.path.display(),
            error = result.error.as_deref().unwrap_or("unknown"),
            "failed"
        );
        return false;
    };
    info!(
        index = result.correlation_index,
        path = %result.path.display(),
        size = %format!("{}x{}", image.width(), image.height()),
        thumb = %format!("{}x{}", thumb.width(), thumb.height()),
        "loaded"
    );
    if let Some(dir) = out
        && let Err(err) = write_thumbnail(dir, &result, &thumb)
    {
        warn!(path = %result.path.display(), error = %format!("{err:#}"), "could not write thumbnail");
    }
    cache.insert(&result.path.to_string_lossy(), image, thumb);
    true
}

fn write_thumbnail(dir: &Path, result: &LoadResult, thumb: &Image) -> Result<()> {
    let stem = result
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());
    let target = dir.join(format!("{:05}-{stem}.thumb.png", result.correlation_index));
    thumb
        .to_rgba8()
        .save(&target)
        .with_context(|| format!("saving {}", target.display()))
}
