use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode or decode store {path:?}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("image {name} has no entry in {path:?}")]
    MissingFeatures { name: String, path: PathBuf },
    #[error("line {line} of pair list {path:?} does not hold exactly two image names")]
    MalformedPair { path: PathBuf, line: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
