use crate::{Error, Result};
use log::*;
use std::path::{Path, PathBuf};

/// Reads the names of the images of a session, in order.
///
/// Surrounding whitespace is ignored, as are blank lines and lines starting with `#`.
/// Only the first token of a line is the name, the rest (such as camera intrinsics) is ignored.
pub fn parse_image_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ImageList {
        path: path.to_path_buf(),
        source,
    })?;
    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect();
    if names.is_empty() {
        return Err(Error::EmptyImageList(path.to_path_buf()));
    }
    debug!("read {} image names from {:?}", names.len(), path);
    Ok(names)
}

/// A directory of image lists holds one list per session, `<video_id>.txt`.
pub fn resolve_image_list(path: &Path, video_id: &str) -> PathBuf {
    if path.is_dir() {
        path.join(format!("{}.txt", video_id))
    } else {
        path.to_path_buf()
    }
}
