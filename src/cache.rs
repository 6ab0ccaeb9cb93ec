//! Synchronous, entry-bounded LRU cache of decoded images and thumbnails.
//!
//! The cache is independent of the [`AsyncLoader`](crate::AsyncLoader): callers
//! either go through it directly on their own thread (decode on miss), or feed
//! it finished loader results via [`ThumbnailCache::insert`].

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::bitmap::Image;
use crate::config::CacheOptions;
use crate::error::Result;
use crate::processing::{decode, thumbnail};

#[derive(Debug)]
struct CacheEntry {
    image: Image,
    thumbnail: Image,
    last_used: u64,
}

/// Borrowed view of a cached entry; valid until the cache is next mutated.
#[derive(Debug, Clone, Copy)]
pub struct Cached<'a> {
    pub image: &'a Image,
    pub thumbnail: &'a Image,
}

#[derive(Debug)]
pub struct ThumbnailCache {
    entries: HashMap<String, CacheEntry>,
    opts: CacheOptions,
    /// Logical clock; strictly increases on every touch.
    clock: u64,
}

impl ThumbnailCache {
    pub fn new(opts: CacheOptions) -> Self {
        Self {
            entries: HashMap::with_capacity(opts.max_entries.min(1024)),
            opts,
            clock: 0,
        }
    }

    pub fn with_limits(max_entries: usize, thumbnail_bound: i32) -> Self {
        Self::new(CacheOptions {
            max_entries,
            thumbnail_bound,
            ..CacheOptions::default()
        })
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Returns the cached images for `path`, decoding and inserting on a miss.
    ///
    /// A failed decode leaves the cache untouched and returns `None`, as does
    /// any lookup on a cache with `max_entries == 0`.
    pub fn load_or_get(&mut self, path: &str) -> Option<Cached<'_>> {
        if self.entries.contains_key(path) {
            return self.get(path);
        }
        if self.opts.max_entries == 0 {
            return None;
        }

        let (image, thumbnail) = match self.decode_pair(Path::new(path)) {
            Ok(pair) => pair,
            Err(err) => {
                debug!(path, error = %err, "cache miss could not be decoded");
                return None;
            }
        };
        self.insert(path, image, thumbnail);
        self.get(path)
    }

    fn decode_pair(&self, path: &Path) -> Result<(Image, Image)> {
        let image = decode::decode_with(path, &self.opts.decode)?;
        let thumb = thumbnail::thumbnail(
            &image,
            self.opts.thumbnail_bound,
            self.opts.thumbnail_bound,
        )?;
        Ok((image, thumb))
    }

    /// Lookup without decoding. A hit counts as a use.
    pub fn get(&mut self, path: &str) -> Option<Cached<'_>> {
        let now = self.tick();
        let entry = self.entries.get_mut(path)?;
        entry.last_used = now;
        Some(Cached {
            image: &entry.image,
            thumbnail: &entry.thumbnail,
        })
    }

    /// Lookup that does not refresh recency.
    pub fn peek(&self, path: &str) -> Option<Cached<'_>> {
        self.entries.get(path).map(|entry| Cached {
            image: &entry.image,
            thumbnail: &entry.thumbnail,
        })
    }

    /// Takes ownership of an already decoded pair, evicting if the cache is full.
    ///
    /// Replacing an existing key drops the previous images. A cache with
    /// `max_entries == 0` drops every pair it is given.
    pub fn insert(&mut self, path: &str, image: Image, thumbnail: Image) {
        if self.opts.max_entries == 0 {
            debug!(path, "cache has no capacity; dropping entry");
            return;
        }
        if !self.entries.contains_key(path) && self.entries.len() >= self.opts.max_entries {
            self.evict_oldest();
        }
        let last_used = self.tick();
        self.entries.insert(
            path.to_owned(),
            CacheEntry {
                image,
                thumbnail,
                last_used,
            },
        );
    }

    /// Linear scan for the smallest `last_used`.
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!(path = %key, "evicting least recently used entry");
            self.entries.remove(&key);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.opts.max_entries
    }

    pub fn thumbnail_bound(&self) -> i32 {
        self.opts.thumbnail_bound
    }
}
