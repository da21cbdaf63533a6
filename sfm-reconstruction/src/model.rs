use crate::export::{export, ExportCamera};
use crate::{Error, Result};
use cv_core::nalgebra::{
    IsometryMatrix3, Point2, Point3, Quaternion, Translation3, UnitQuaternion, UnitVector3,
    Vector3,
};
use cv_core::WorldToCamera;
use cv_pinhole::CameraIntrinsics;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A pinhole camera without distortion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub focal: f64,
    pub principal_point: [f64; 2],
}

impl Camera {
    /// The prior used for uncalibrated images: a focal length of 1.2 times the longest side and a
    /// principal point in the center.
    pub fn from_image_size(id: u32, [width, height]: [u32; 2]) -> Self {
        Self {
            id,
            width,
            height,
            focal: 1.2 * width.max(height) as f64,
            principal_point: [width as f64 / 2.0, height as f64 / 2.0],
        }
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::identity()
            .focal(self.focal)
            .principal_point(Point2::new(self.principal_point[0], self.principal_point[1]))
    }

    /// The direction light came from to reach pixel `[x, y]`.
    pub fn bearing(&self, [x, y]: [f64; 2]) -> UnitVector3<f64> {
        let intrinsics = self.intrinsics();
        UnitVector3::new_normalize(Vector3::new(
            (x - intrinsics.principal_point.x) / intrinsics.focals.x,
            (y - intrinsics.principal_point.y) / intrinsics.focals.y,
            1.0,
        ))
    }

    /// The pixel a point in camera coordinates projects to, if it is in front of the camera.
    pub fn project(&self, point: Point3<f64>) -> Option<[f64; 2]> {
        if point.z <= 0.0 {
            return None;
        }
        let intrinsics = self.intrinsics();
        Some([
            intrinsics.focals.x * point.x / point.z + intrinsics.principal_point.x,
            intrinsics.focals.y * point.y / point.z + intrinsics.principal_point.y,
        ])
    }
}

/// A registered image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u32,
    pub name: String,
    pub camera_id: u32,
    /// Rotation from world to camera as a `[w, x, y, z]` quaternion.
    pub qvec: [f64; 4],
    /// Translation from world to camera.
    pub tvec: [f64; 3],
    /// Every keypoint of the image in pixels.
    pub keypoints: Vec<[f64; 2]>,
    /// The 3D point each keypoint observes.
    pub point3d_ids: Vec<Option<u64>>,
}

impl Image {
    pub fn pose(&self) -> WorldToCamera {
        let [w, x, y, z] = self.qvec;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        WorldToCamera(IsometryMatrix3::from_parts(
            Translation3::new(self.tvec[0], self.tvec[1], self.tvec[2]),
            rotation.to_rotation_matrix(),
        ))
    }

    pub fn set_pose(&mut self, WorldToCamera(isometry): WorldToCamera) {
        let rotation = UnitQuaternion::from_rotation_matrix(&isometry.rotation);
        self.qvec = [rotation.w, rotation.i, rotation.j, rotation.k];
        let translation = isometry.translation.vector;
        self.tvec = [translation.x, translation.y, translation.z];
    }

    /// The optical center in world coordinates.
    pub fn projection_center(&self) -> Point3<f64> {
        self.pose().0.inverse() * Point3::origin()
    }

    /// The depth of a world point along the optical axis of this image.
    pub fn depth(&self, xyz: [f64; 3]) -> f64 {
        (self.pose().0 * Point3::from(xyz)).z
    }

    pub fn num_points3d(&self) -> usize {
        self.point3d_ids.iter().flatten().count()
    }
}

/// One observation of a 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackElement {
    pub image_id: u32,
    pub point2d_idx: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub xyz: [f64; 3],
    pub color: [u8; 3],
    /// Mean reprojection error over the track in pixels.
    pub error: f64,
    pub track: Vec<TrackElement>,
}

/// A sparse model: cameras, registered images and the 3D points they observe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub cameras: BTreeMap<u32, Camera>,
    pub images: BTreeMap<u32, Image>,
    pub points3d: BTreeMap<u64, Point3D>,
}

impl Reconstruction {
    pub fn reg_image_ids(&self) -> Vec<u32> {
        self.images.keys().copied().collect()
    }

    pub fn num_reg_images(&self) -> usize {
        self.images.len()
    }

    pub fn num_points3d(&self) -> usize {
        self.points3d.len()
    }

    pub fn num_observations(&self) -> usize {
        self.points3d.values().map(|point| point.track.len()).sum()
    }

    pub fn mean_track_length(&self) -> f64 {
        if self.points3d.is_empty() {
            return 0.0;
        }
        self.num_observations() as f64 / self.points3d.len() as f64
    }

    pub fn mean_observations_per_reg_image(&self) -> f64 {
        if self.images.is_empty() {
            return 0.0;
        }
        self.num_observations() as f64 / self.images.len() as f64
    }

    pub fn mean_reprojection_error(&self) -> f64 {
        if self.points3d.is_empty() {
            return 0.0;
        }
        self.points3d.values().map(|point| point.error).sum::<f64>() / self.points3d.len() as f64
    }

    /// The pixel error of `point` seen by the keypoint `point2d_idx` of `image`.
    pub fn reprojection_error(&self, image: &Image, point2d_idx: usize, xyz: [f64; 3]) -> f64 {
        let observed = image.keypoints[point2d_idx];
        self.cameras
            .get(&image.camera_id)
            .and_then(|camera| camera.project(image.pose().0 * Point3::from(xyz)))
            .map(|[x, y]| ((x - observed[0]).powi(2) + (y - observed[1]).powi(2)).sqrt())
            .unwrap_or(f64::INFINITY)
    }

    pub fn summary(&self) -> String {
        let mut summary = String::from("Reconstruction:");
        for (name, value) in [
            ("num_reg_images", self.num_reg_images().to_string()),
            ("num_cameras", self.cameras.len().to_string()),
            ("num_points3D", self.num_points3d().to_string()),
            ("num_observations", self.num_observations().to_string()),
            ("mean_track_length", format!("{:.6}", self.mean_track_length())),
            (
                "mean_observations_per_image",
                format!("{:.6}", self.mean_observations_per_reg_image()),
            ),
            (
                "mean_reprojection_error",
                format!("{:.6}", self.mean_reprojection_error()),
            ),
        ] {
            summary.push_str(&format!("\n\t{} = {}", name, value));
        }
        summary
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|source| Error::Model {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|source| Error::Model {
            path: path.to_path_buf(),
            source,
        })?;
        info!("wrote model to {:?}", path);
        Ok(())
    }

    /// Writes the points and a frustum for every registered image as an ascii PLY file.
    pub fn export_ply(&self, path: &Path) -> Result<()> {
        let points_and_colors = self
            .points3d
            .values()
            .map(|point| (Point3::from(point.xyz), point.color))
            .collect();
        // Frusta are scaled to the spacing of the cameras.
        let centers: Vec<Point3<f64>> = self.images.values().map(Image::projection_center).collect();
        let spacing = centers
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).norm())
            .filter(|distance| *distance > 0.0)
            .fold(f64::INFINITY, f64::min);
        let focal_length = if spacing.is_finite() {
            0.25 * spacing
        } else {
            0.1
        };
        let cameras = self
            .images
            .values()
            .zip(centers)
            .map(|(image, optical_center)| {
                let camera_to_world = image.pose().0.inverse();
                ExportCamera {
                    optical_center,
                    up_direction: camera_to_world * -Vector3::y(),
                    forward_direction: camera_to_world * Vector3::z(),
                    focal_length,
                }
            })
            .collect();
        let file = File::create(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        export(BufWriter::new(file), points_and_colors, cameras, true).map_err(|source| {
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("exported point cloud to {:?}", path);
        Ok(())
    }
}
