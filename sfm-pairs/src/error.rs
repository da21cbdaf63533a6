use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Features(#[from] sfm_features::Error),
    #[error("failed to read image list {path:?}: {source}")]
    ImageList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image list {0:?} does not name any image")]
    EmptyImageList(PathBuf),
    #[error("the retrieval interval must be at least 1")]
    ZeroRetrievalInterval,
    #[error("image {name} has no global descriptor in {path:?}")]
    MissingDescriptor { name: String, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
