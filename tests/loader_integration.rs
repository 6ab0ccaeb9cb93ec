use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use tempfile::tempdir;
use thumb_engine::{AsyncLoader, LoadResult, LoaderOptions};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    img.save(&path).unwrap();
    path
}

fn loader(workers: usize, bound: i32) -> AsyncLoader {
    AsyncLoader::new(LoaderOptions {
        workers,
        thumbnail_bound: bound,
        ..LoaderOptions::default()
    })
    .expect("loader should start")
}

/// Mimics a host poll loop: wait on the descriptor, acknowledge, drain to empty.
fn drain_until_idle(loader: &AsyncLoader) -> Vec<LoadResult> {
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut out = Vec::new();
    loop {
        loader.notifier().wait(Duration::from_millis(100)).unwrap();
        loader.acknowledge().unwrap();
        // Sample before draining: a zero count means every result is already queued.
        let busy = loader.outstanding();
        let batch = loader.drain();
        let idle = batch.is_empty() && !busy;
        out.extend(batch);
        if idle {
            return out;
        }
        assert!(Instant::now() < deadline, "timed out waiting for loader");
    }
}

#[test]
fn one_success_one_failure() {
    let tmp = tempdir().unwrap();
    let photo = write_png(tmp.path(), "photo1.png", 40, 30);
    let missing = tmp.path().join("missing.png");

    let loader = loader(2, 16);
    loader.submit(photo, 0);
    loader.submit(missing, 1);
    let results = drain_until_idle(&loader);

    assert_eq!(results.len(), 2);
    let ok = results.iter().find(|r| r.correlation_index == 0).unwrap();
    assert!(ok.success);
    let image = ok.image.as_ref().unwrap();
    assert!(image.is_valid());
    assert_eq!((image.width(), image.height()), (40, 30));
    let thumb = ok.thumbnail.as_ref().unwrap();
    assert_eq!((thumb.width(), thumb.height()), (16, 12));

    let bad = results.iter().find(|r| r.correlation_index == 1).unwrap();
    assert!(!bad.success);
    assert!(bad.image.is_none() && bad.thumbnail.is_none());
    loader.shutdown();
}

#[test]
fn every_request_is_delivered_exactly_once() {
    let tmp = tempdir().unwrap();
    let good: Vec<PathBuf> = (0..6)
        .map(|i| write_png(tmp.path(), &format!("img{i}.png"), 20 + i, 10 + i))
        .collect();
    let junk = tmp.path().join("junk.png");
    std::fs::write(&junk, b"definitely not a png").unwrap();

    let loader = loader(4, 8);
    let mut expected = HashMap::new();
    for i in 0..30 {
        let path = match i % 3 {
            0 => junk.clone(),
            _ => good[i as usize % good.len()].clone(),
        };
        expected.insert(i, i % 3 != 0);
        loader.submit(path, i);
    }

    let results = drain_until_idle(&loader);
    assert_eq!(results.len(), 30);
    let mut seen = HashMap::new();
    for r in &results {
        assert!(seen.insert(r.correlation_index, r.success).is_none(), "duplicate index");
        assert_eq!(r.success, r.image.is_some());
    }
    assert_eq!(seen, expected);
    assert_eq!(loader.outstanding_count(), 0);
}

#[test]
fn one_wake_can_cover_many_results() {
    let tmp = tempdir().unwrap();
    let path = write_png(tmp.path(), "a.png", 8, 8);
    let loader = loader(2, 4);
    for i in 0..5 {
        loader.submit(path.clone(), i);
    }
    let deadline = Instant::now() + Duration::from_secs(10);
    while loader.outstanding() {
        assert!(Instant::now() < deadline);
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(loader.notifier().is_ready().unwrap());
    assert_eq!(loader.acknowledge().unwrap(), 5);
    assert!(!loader.notifier().is_ready().unwrap());
    assert_eq!(loader.drain().len(), 5);
    assert!(loader.drain().is_empty());
}

#[test]
fn cancel_all_drops_old_work() {
    let tmp = tempdir().unwrap();
    let big = write_png(tmp.path(), "big.png", 600, 400);
    let small = write_png(tmp.path(), "small.png", 4, 4);

    let loader = loader(1, 32);
    for i in 0..40 {
        loader.submit(big.clone(), i);
    }
    loader.cancel_all();
    loader.submit(small, 999);

    let results = drain_until_idle(&loader);
    assert_eq!(results.len(), 1, "only the post-cancel request is delivered");
    assert_eq!(results[0].correlation_index, 999);
    assert!(results[0].success);
    assert_eq!(results[0].generation, 1);
}

#[test]
fn cancel_all_twice_leaves_queues_empty() {
    let tmp = tempdir().unwrap();
    let path = write_png(tmp.path(), "a.png", 8, 8);
    let loader = loader(2, 4);
    for i in 0..4 {
        loader.submit(path.clone(), i);
    }
    loader.cancel_all();
    loader.cancel_all();
    assert!(loader.drain().is_empty());
    let after = drain_until_idle(&loader);
    assert!(after.is_empty());
    assert!(!loader.outstanding());
}

#[test]
fn shutdown_with_queued_work_returns() {
    let tmp = tempdir().unwrap();
    let path = write_png(tmp.path(), "a.png", 300, 300);
    let loader = loader(2, 64);
    for i in 0..100 {
        loader.submit(path.clone(), i);
    }
    let started = Instant::now();
    loader.shutdown();
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn drop_stops_workers() {
    let loader = loader(3, 16);
    assert_eq!(loader.worker_count(), 3);
    drop(loader);
}
