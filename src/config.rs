use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level engine configuration, usually read from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Worker pool and loader-side thumbnailing.
    pub loader: LoaderOptions,
    /// Synchronous LRU cache.
    pub cache: CacheOptions,
    /// Decoder behavior shared by the loader and the cache.
    pub decode: DecodeOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.loader.validate()?;
        self.cache.validate()?;
        Ok(self)
    }

    /// Loader options with the shared decode section applied.
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            decode: self.decode,
            ..self.loader.clone()
        }
    }

    /// Cache options with the shared decode section applied.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            decode: self.decode,
            ..self.cache.clone()
        }
    }
}

/// Options fixed when an [`AsyncLoader`](crate::AsyncLoader) is constructed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderOptions {
    /// Number of worker threads; not reconfigurable after start.
    pub workers: usize,
    /// Bounding box edge, in pixels, for thumbnails produced by workers.
    pub thumbnail_bound: i32,
    /// Decoder options used by every worker.
    #[serde(skip)]
    pub decode: DecodeOptions,
}

impl LoaderOptions {
    const fn default_workers() -> usize {
        8
    }

    const fn default_thumbnail_bound() -> i32 {
        256
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config(
                "loader.workers must be greater than zero".into(),
            ));
        }
        if self.thumbnail_bound <= 0 {
            return Err(Error::Config(
                "loader.thumbnail-bound must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            thumbnail_bound: Self::default_thumbnail_bound(),
            decode: DecodeOptions::default(),
        }
    }
}

/// Options for a [`ThumbnailCache`](crate::ThumbnailCache).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheOptions {
    /// Maximum number of entries held before the least recently used is evicted.
    pub max_entries: usize,
    /// Bounding box edge, in pixels, for thumbnails built on a cache miss.
    pub thumbnail_bound: i32,
    #[serde(skip)]
    pub decode: DecodeOptions,
}

impl CacheOptions {
    const fn default_max_entries() -> usize {
        100
    }

    const fn default_thumbnail_bound() -> i32 {
        256
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::Config(
                "cache.max-entries must be greater than zero".into(),
            ));
        }
        if self.thumbnail_bound <= 0 {
            return Err(Error::Config(
                "cache.thumbnail-bound must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_entries: Self::default_max_entries(),
            thumbnail_bound: Self::default_thumbnail_bound(),
            decode: DecodeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DecodeOptions {
    /// Rotate/flip according to the EXIF orientation tag when present.
    pub apply_exif_orientation: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            apply_exif_orientation: true,
        }
    }
}
