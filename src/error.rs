use std::path::PathBuf;

use thiserror::Error;

/// Library error type for decode, thumbnail and loader operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The raster decoder rejected the file (unsupported or corrupt).
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoder produced a zero-sized image.
    #[error("decoded image is empty: {}", .0.display())]
    EmptyImage(PathBuf),

    /// Thumbnail bounds must be strictly positive and the source valid.
    #[error("invalid thumbnail bounds {max_w}x{max_h}")]
    InvalidBounds { max_w: i32, max_h: i32 },

    /// The resampler reported a failure.
    #[error("resize failed: {0}")]
    Resize(String),

    /// The notification descriptor could not be created, read or written.
    #[error("notification signal error: {0}")]
    Notifier(#[from] nix::Error),

    /// A worker thread could not be spawned.
    #[error("failed to spawn loader worker: {0}")]
    SpawnWorker(#[source] std::io::Error),

    /// A configuration value violates an invariant.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// YAML configuration could not be parsed.
    #[error(transparent)]
    ConfigParse(#[from] serde_yaml::Error),

    /// One or more scan roots are missing or unreadable.
    #[error("invalid image path: {0}")]
    BadDir(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
