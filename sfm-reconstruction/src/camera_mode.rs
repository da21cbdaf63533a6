use crate::{Camera, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How images share camera intrinsics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// One camera when all images have the same size, one per image otherwise.
    Auto,
    Single,
    /// One camera per directory of images.
    PerFolder,
    PerImage,
}

impl Default for CameraMode {
    fn default() -> Self {
        CameraMode::Single
    }
}

impl FromStr for CameraMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(CameraMode::Auto),
            "single" => Ok(CameraMode::Single),
            "per_folder" => Ok(CameraMode::PerFolder),
            "per_image" => Ok(CameraMode::PerImage),
            _ => Err(Error::UnknownCameraMode(s.to_owned())),
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CameraMode::Auto => "auto",
            CameraMode::Single => "single",
            CameraMode::PerFolder => "per_folder",
            CameraMode::PerImage => "per_image",
        })
    }
}

/// Creates the cameras of a set of images of the given sizes.
///
/// Returns the cameras and the camera id of every image. A shared camera takes the size of the
/// first image that uses it.
pub fn assign_cameras(images: &[(String, [u32; 2])], mode: CameraMode) -> (Vec<Camera>, Vec<u32>) {
    let mode = match mode {
        CameraMode::Auto if images.windows(2).all(|pair| pair[0].1 == pair[1].1) => {
            CameraMode::Single
        }
        CameraMode::Auto => CameraMode::PerImage,
        mode => mode,
    };
    let mut cameras: Vec<Camera> = vec![];
    let mut shared: HashMap<&str, u32> = HashMap::new();
    let camera_ids = images
        .iter()
        .map(|(name, size)| {
            let key = match mode {
                CameraMode::Single => Some(""),
                CameraMode::PerFolder => Some(
                    Path::new(name)
                        .parent()
                        .and_then(Path::to_str)
                        .unwrap_or(""),
                ),
                _ => None,
            };
            if let Some(&id) = key.and_then(|key| shared.get(key)) {
                return id;
            }
            let id = cameras.len() as u32 + 1;
            cameras.push(Camera::from_image_size(id, *size));
            if let Some(key) = key {
                shared.insert(key, id);
            }
            id
        })
        .collect();
    (cameras, camera_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(specs: &[(&str, [u32; 2])]) -> Vec<(String, [u32; 2])> {
        specs
            .iter()
            .map(|&(name, size)| (name.to_owned(), size))
            .collect()
    }

    #[test]
    fn camera_modes_parse_and_print() {
        for mode in ["auto", "single", "per_folder", "per_image"] {
            assert_eq!(mode.parse::<CameraMode>().unwrap().to_string(), mode);
        }
        assert_eq!("SINGLE".parse::<CameraMode>().unwrap(), CameraMode::Single);
        assert!("per_sensor".parse::<CameraMode>().is_err());
    }

    #[test]
    fn cameras_are_shared_per_mode() {
        let list = images(&[
            ("left/0.jpg", [640, 480]),
            ("left/1.jpg", [640, 480]),
            ("right/0.jpg", [640, 480]),
        ]);

        let (cameras, ids) = assign_cameras(&list, CameraMode::Single);
        assert_eq!(cameras.len(), 1);
        assert_eq!(ids, vec![1, 1, 1]);

        let (cameras, ids) = assign_cameras(&list, CameraMode::PerFolder);
        assert_eq!(cameras.len(), 2);
        assert_eq!(ids, vec![1, 1, 2]);

        let (cameras, ids) = assign_cameras(&list, CameraMode::PerImage);
        assert_eq!(cameras.len(), 3);
        assert_eq!(ids, vec![1, 2, 3]);

        let (_, ids) = assign_cameras(&list, CameraMode::Auto);
        assert_eq!(ids, vec![1, 1, 1]);
    }

    #[test]
    fn auto_splits_cameras_of_different_sizes() {
        let list = images(&[("0.jpg", [640, 480]), ("1.jpg", [1280, 720])]);
        let (cameras, ids) = assign_cameras(&list, CameraMode::Auto);
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(cameras[1].width, 1280);
    }
}
