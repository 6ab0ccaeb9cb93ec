//! Fixed-size worker pool that decodes and thumbnails images off the UI thread.
//!
//! Requests go through a shared `crossbeam-channel` queue. Each worker delivers
//! exactly one [`LoadResult`] per request into a mutex-guarded completed list and
//! bumps the eventfd [`Notifier`]. The consumer registers the loader's descriptor
//! in its poll loop and, on readiness, calls [`AsyncLoader::acknowledge`] then
//! [`AsyncLoader::drain`].

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use tracing::{debug, info, info_span, warn};

use crate::bitmap::Image;
use crate::config::{DecodeOptions, LoaderOptions};
use crate::error::{Error, Result};
use crate::events::{LoadRequest, LoadResult};
use crate::notify::Notifier;
use crate::processing::{decode, thumbnail};

/// Decode-then-thumbnail step run by workers for each request.
type LoadFn = fn(&Path, &DecodeOptions, i32) -> Result<(Image, Image)>;

/// State shared between the consumer handle and every worker.
struct Shared {
    completed: Mutex<Vec<LoadResult>>,
    /// Submitted requests that have not yet reached `completed`.
    outstanding: AtomicUsize,
    /// Advanced by `cancel_all`; results from older generations are dropped.
    generation: AtomicU64,
    active: AtomicBool,
    notifier: Notifier,
    decode: DecodeOptions,
    thumbnail_bound: i32,
    load: LoadFn,
}

impl Shared {
    fn completed(&self) -> MutexGuard<'_, Vec<LoadResult>> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn process(&self, req: LoadRequest) {
        if req.generation != self.current_generation() {
            debug!(path = %req.path.display(), "skipping request from cancelled generation");
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (self.load)(&req.path, &self.decode, self.thumbnail_bound)
        }));
        let result = match outcome {
            Ok(Ok((image, thumb))) => {
                debug!(
                    path = %req.path.display(),
                    index = req.correlation_index,
                    width = image.width(),
                    height = image.height(),
                    "loaded"
                );
                LoadResult::loaded(req, image, thumb)
            }
            Ok(Err(err)) => {
                debug!(path = %req.path.display(), index = req.correlation_index, error = %err, "load failed");
                LoadResult::failed(req, err.to_string())
            }
            Err(_) => {
                warn!(path = %req.path.display(), "decoder panicked; reporting as failed");
                LoadResult::failed(req, "decoder panicked")
            }
        };
        self.complete(result);
    }

    fn complete(&self, result: LoadResult) {
        if result.generation != self.current_generation() {
            debug!(path = %result.path.display(), "dropping result from cancelled generation");
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            return;
        }
        self.completed().push(result);
        if let Err(err) = self.notifier.signal() {
            warn!(error = %err, "failed to signal completion");
        }
        // Last, so `outstanding == 0` implies every result is pushed and signalled.
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Decode then thumbnail. On a thumbnail failure the decoded image is dropped here.
fn load_one(path: &Path, opts: &DecodeOptions, bound: i32) -> Result<(Image, Image)> {
    let image = decode::decode_with(path, opts)?;
    let thumb = thumbnail::thumbnail(&image, bound, bound)?;
    Ok((image, thumb))
}

fn run_worker(id: usize, shared: Arc<Shared>, jobs: Receiver<LoadRequest>, stop: Receiver<()>) {
    let _span = info_span!("loader_worker", id).entered();
    debug!("worker started");
    while shared.active.load(Ordering::Acquire) {
        select! {
            recv(jobs) -> msg => match msg {
                Ok(req) => shared.process(req),
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }
    debug!("worker exiting");
}

/// Asynchronous image loader with a fixed worker pool.
///
/// Dropping the loader (or calling [`AsyncLoader::shutdown`]) stops the pool:
/// each worker finishes the item it holds, then exits. There is no restart.
pub struct AsyncLoader {
    shared: Arc<Shared>,
    pending_tx: Sender<LoadRequest>,
    /// Kept so `cancel_all` can discard queued requests.
    pending_rx: Receiver<LoadRequest>,
    /// Dropping this wakes idle workers for shutdown.
    stop_tx: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl AsyncLoader {
    /// Creates the notification descriptor and spawns `opts.workers` threads.
    ///
    /// Fails if the options are invalid, the descriptor cannot be created, or
    /// any worker cannot be spawned; no threads are left running on failure.
    pub fn new(opts: LoaderOptions) -> Result<Self> {
        Self::with_load_fn(opts, load_one)
    }

    fn with_load_fn(opts: LoaderOptions, load: LoadFn) -> Result<Self> {
        opts.validate()?;
        let notifier = Notifier::new()?;
        let shared = Arc::new(Shared {
            completed: Mutex::new(Vec::new()),
            outstanding: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            active: AtomicBool::new(true),
            notifier,
            decode: opts.decode,
            thumbnail_bound: opts.thumbnail_bound,
            load,
        });
        let (pending_tx, pending_rx) = unbounded::<LoadRequest>();
        let (stop_tx, stop_rx) = unbounded::<()>();

        let mut loader = Self {
            shared,
            pending_tx,
            pending_rx,
            stop_tx: Some(stop_tx),
            workers: Vec::with_capacity(opts.workers),
        };
        for id in 0..opts.workers {
            let shared = Arc::clone(&loader.shared);
            let jobs = loader.pending_rx.clone();
            let stop = stop_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("thumb-worker-{id}"))
                .spawn(move || run_worker(id, shared, jobs, stop));
            match spawned {
                Ok(handle) => loader.workers.push(handle),
                Err(err) => {
                    loader.stop();
                    return Err(Error::SpawnWorker(err));
                }
            }
        }
        info!(
            workers = opts.workers,
            thumbnail_bound = opts.thumbnail_bound,
            "async loader started"
        );
        Ok(loader)
    }

    /// Queues `path` for decoding. Never blocks.
    pub fn submit(&self, path: impl Into<PathBuf>, correlation_index: i32) {
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        let req = LoadRequest {
            path: path.into(),
            correlation_index,
            generation: self.shared.current_generation(),
        };
        if let Err(err) = self.pending_tx.send(req) {
            // Unreachable while `pending_rx` is held, but keep the counter honest.
            self.shared.outstanding.fetch_sub(1, Ordering::AcqRel);
            warn!(path = %err.0.path.display(), "loader queue closed; request dropped");
        }
    }

    /// Takes every result delivered since the last drain. Results are unordered.
    pub fn drain(&self) -> Vec<LoadResult> {
        let mut results = std::mem::take(&mut *self.shared.completed());
        let generation = self.shared.current_generation();
        results.retain(|r| r.generation == generation);
        results
    }

    /// Clears the descriptor's readiness. Returns the number of completions it
    /// had accumulated; the caller must still drain to empty.
    pub fn acknowledge(&self) -> Result<u64> {
        self.shared.notifier.acknowledge()
    }

    /// Discards queued requests and undelivered results.
    ///
    /// Requests a worker already holds cannot be retracted; they belong to the
    /// previous generation, so their results are dropped instead of delivered.
    pub fn cancel_all(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let discarded = self.pending_rx.try_iter().count();
        if discarded > 0 {
            self.shared
                .outstanding
                .fetch_sub(discarded, Ordering::AcqRel);
        }
        let dropped = std::mem::take(&mut *self.shared.completed());
        if let Err(err) = self.shared.notifier.acknowledge() {
            warn!(error = %err, "failed to reset completion signal");
        }
        debug!(
            discarded,
            dropped = dropped.len(),
            "cancelled pending loads"
        );
    }

    /// `true` while any submitted request has not reached the completed list.
    pub fn outstanding(&self) -> bool {
        self.outstanding_count() > 0
    }

    pub fn outstanding_count(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn thumbnail_bound(&self) -> i32 {
        self.shared.thumbnail_bound
    }

    pub fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }

    /// Stops and joins every worker, then frees whatever is left in the queues.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };
        info!(workers = self.workers.len(), "async loader shutting down");
        self.shared.active.store(false, Ordering::Release);
        drop(stop_tx);
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("loader worker panicked during shutdown");
            }
        }
        let leftover = self.pending_rx.try_iter().count();
        let undelivered = std::mem::take(&mut *self.shared.completed()).len();
        info!(leftover, undelivered, "async loader stopped");
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

impl AsFd for AsyncLoader {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.shared.notifier.as_fd()
    }
}

impl AsRawFd for AsyncLoader {
    fn as_raw_fd(&self) -> RawFd {
        self.shared.notifier.as_raw_fd()
    }
}

impl std::fmt::Debug for AsyncLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLoader")
            .field("workers", &self.workers.len())
            .field("outstanding", &self.outstanding_count())
            .field("generation", &self.shared.current_generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn opts(workers: usize) -> LoaderOptions {
        LoaderOptions {
            workers,
            thumbnail_bound: 8,
            ..LoaderOptions::default()
        }
    }

    fn drain_until_idle(loader: &AsyncLoader) -> Vec<LoadResult> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = Vec::new();
        loop {
            let _ = loader.notifier().wait(Duration::from_millis(50));
            loader.acknowledge().unwrap();
            let busy = loader.outstanding();
            let batch = loader.drain();
            let idle = batch.is_empty() && !busy;
            out.extend(batch);
            if idle {
                return out;
            }
            assert!(Instant::now() < deadline, "loader did not go idle");
        }
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(AsyncLoader::new(opts(0)), Err(Error::Config(_))));
    }

    #[test]
    fn missing_files_fail_without_stalling_the_pool() {
        let loader = AsyncLoader::new(opts(2)).unwrap();
        for i in 0..5 {
            loader.submit(format!("/nope/{i}.png"), i);
        }
        let results = drain_until_idle(&loader);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| !r.success && r.image.is_none() && r.error.is_some()));
        loader.shutdown();
    }

    #[test]
    fn cancel_all_twice_is_harmless() {
        let loader = AsyncLoader::new(opts(1)).unwrap();
        loader.cancel_all();
        loader.cancel_all();
        assert!(loader.drain().is_empty());
        assert!(!loader.outstanding());
    }

    #[test]
    fn stale_generation_results_are_not_delivered() {
        let loader = AsyncLoader::new(opts(1)).unwrap();
        let req = LoadRequest {
            path: PathBuf::from("/nope.png"),
            correlation_index: 3,
            generation: loader.shared.current_generation(),
        };
        loader.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        loader.cancel_all();
        loader.shared.complete(LoadResult::failed(req, "late"));
        assert!(loader.drain().is_empty());
        assert!(!loader.outstanding());
    }

    fn panics_on_boom(path: &Path, _: &DecodeOptions, _: i32) -> Result<(Image, Image)> {
        if path.file_stem().is_some_and(|s| s == "boom") {
            panic!("corrupt header in {}", path.display());
        }
        let image = Image::from_argb(2, 2, vec![0xff00_00ff; 4]).unwrap();
        let thumb = Image::from_argb(1, 1, vec![0xff00_00ff]).unwrap();
        Ok((image, thumb))
    }

    #[test]
    fn decoder_panic_is_reported_and_worker_survives() {
        let loader = AsyncLoader::with_load_fn(opts(1), panics_on_boom).unwrap();
        loader.submit("/tmp/boom.png", 0);
        loader.submit("/tmp/fine.png", 1);
        let mut results = drain_until_idle(&loader);
        results.sort_by_key(|r| r.correlation_index);
        assert_eq!(results.len(), 2);

        assert!(!results[0].success);
        assert!(results[0].image.is_none() && results[0].thumbnail.is_none());
        assert_eq!(results[0].error.as_deref(), Some("decoder panicked"));

        assert!(results[1].success);
        assert_eq!(results[1].thumbnail.as_ref().map(Image::width), Some(1));
        assert_eq!(loader.worker_count(), 1);
        loader.shutdown();
    }

    #[test]
    fn descriptor_is_exposed() {
        let loader = AsyncLoader::new(opts(1)).unwrap();
        assert!(loader.as_raw_fd() >= 0);
        assert_eq!(loader.worker_count(), 1);
    }
}
