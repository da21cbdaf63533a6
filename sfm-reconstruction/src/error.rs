use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Features(#[from] sfm_features::Error),
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode or decode model {path:?}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("unknown camera mode {0:?}, expected auto, single, per_folder or per_image")]
    UnknownCameraMode(String),
    #[error("image {0:?} does not exist")]
    MissingImage(PathBuf),
    #[error("pair list {path:?} names image {name} which is not in the image list")]
    UnknownImage { name: String, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
