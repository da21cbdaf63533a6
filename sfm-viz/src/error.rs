use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read or write image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown color mode {0:?}, expected one of visibility, track_length, depth")]
    UnknownColorBy(String),
    #[error("a plot needs at least one image")]
    NoImagesRequested,
    #[error("the model has no registered images to plot")]
    NoRegisteredImages,
}

pub type Result<T> = std::result::Result<T, Error>;
