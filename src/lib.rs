//! Asynchronous image loading, thumbnailing and caching for file-browsing UIs.
//!
//! [`AsyncLoader`] decodes on a fixed worker pool and wakes a single-threaded
//! poll loop through an eventfd; [`ThumbnailCache`] is a synchronous LRU
//! alternative for paths the caller revisits.

pub mod bitmap;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod notify;
pub mod scan;
pub mod processing {
    pub mod decode;
    pub mod pixels;
    pub mod thumbnail;
}
pub mod tasks {
    pub mod loader;
}

pub use bitmap::Image;
pub use cache::{Cached, ThumbnailCache};
pub use config::{CacheOptions, Configuration, DecodeOptions, LoaderOptions};
pub use error::{Error, Result};
pub use events::{LoadRequest, LoadResult};
pub use notify::Notifier;
pub use processing::decode::{decode, decode_with};
pub use processing::thumbnail::thumbnail;
pub use tasks::loader::AsyncLoader;
