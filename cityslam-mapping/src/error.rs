use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown pairing method {0:?}, expected one of sequential, retrieval, sequential+retrieval")]
    UnknownPairing(String),
    #[error("failed to create directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read settings {path:?}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Features(#[from] sfm_features::Error),
    #[error(transparent)]
    Pairs(#[from] sfm_pairs::Error),
    #[error(transparent)]
    Reconstruction(#[from] sfm_reconstruction::Error),
    #[error(transparent)]
    Plot(#[from] sfm_viz::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
