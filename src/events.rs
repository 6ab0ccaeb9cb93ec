use std::path::PathBuf;

use crate::bitmap::Image;

/// A queued decode job.
#[derive(Debug)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// Caller-defined; never interpreted by the loader.
    pub correlation_index: i32,
    /// Loader generation at submit time; see [`AsyncLoader::cancel_all`](crate::AsyncLoader::cancel_all).
    pub generation: u64,
}

/// Terminal outcome of one [`LoadRequest`].
///
/// `success == false` implies both images are `None`.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub correlation_index: i32,
    pub generation: u64,
    pub image: Option<Image>,
    pub thumbnail: Option<Image>,
    pub success: bool,
    /// Why the request failed, for logging or a placeholder tooltip.
    pub error: Option<String>,
}

impl LoadResult {
    pub(crate) fn loaded(req: LoadRequest, image: Image, thumbnail: Image) -> Self {
        Self {
            path: req.path,
            correlation_index: req.correlation_index,
            generation: req.generation,
            image: Some(image),
            thumbnail: Some(thumbnail),
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(req: LoadRequest, error: impl Into<String>) -> Self {
        Self {
            path: req.path,
            correlation_index: req.correlation_index,
            generation: req.generation,
            image: None,
            thumbnail: None,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Moves both images out, if the load succeeded.
    pub fn take_images(&mut self) -> Option<(Image, Image)> {
        match (self.image.take(), self.thumbnail.take()) {
            (Some(image), Some(thumb)) => Some((image, thumb)),
            _ => None,
        }
    }
}
