use crate::{assign_cameras, Camera, CameraMode, Error, ReconstructionSettings, Result};
use arrsac::Arrsac;
use cv_core::nalgebra::UnitVector3;
use cv_core::sample_consensus::{Consensus, Estimator};
use cv_core::{CameraToCamera, FeatureMatch};
use eight_point::EightPoint;
use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use sfm_features::pair_list::Pair;
use sfm_features::{FeatureStore, MatchStore};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// An image with its features, ready for mapping.
#[derive(Debug, Clone)]
pub struct DbImage {
    pub name: String,
    pub camera_id: u32,
    pub keypoints: Vec<[f64; 2]>,
    pub colors: Vec<[u8; 3]>,
    /// The calibrated bearing of every keypoint.
    pub bearings: Vec<UnitVector3<f64>>,
}

/// The relative pose of a pair and the matches that agree with it.
#[derive(Debug, Clone)]
pub struct TwoViewGeometry {
    /// Transforms points from the first camera to the second.
    pub pose: CameraToCamera,
    pub inliers: Vec<[u32; 2]>,
}

/// Everything the mapper knows before it starts: images, cameras, raw and verified matches.
///
/// Pairs are keyed by image indices with the smaller index first.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub cameras: BTreeMap<u32, Camera>,
    pub images: Vec<DbImage>,
    pub matches: BTreeMap<(usize, usize), Vec<[u32; 2]>>,
    pub two_view_geometries: BTreeMap<(usize, usize), TwoViewGeometry>,
}

impl Database {
    /// Imports the images of `image_list` with their features and assigns cameras.
    pub fn import_images(
        image_dir: &Path,
        image_list: &[String],
        features: &FeatureStore,
        camera_mode: CameraMode,
    ) -> Result<Self> {
        info!("importing {} images into the database", image_list.len());
        let mut image_features = Vec::with_capacity(image_list.len());
        for name in image_list {
            let path = image_dir.join(name);
            if !path.is_file() {
                return Err(Error::MissingImage(path));
            }
            let local_features = features.get(name.as_str()).ok_or_else(|| {
                sfm_features::Error::MissingFeatures {
                    name: name.clone(),
                    path: features.path().to_path_buf(),
                }
            })?;
            image_features.push((name, local_features));
        }
        let sizes: Vec<(String, [u32; 2])> = image_features
            .iter()
            .map(|&(name, local_features)| (name.clone(), local_features.image_size))
            .collect();
        let (cameras, camera_ids) = assign_cameras(&sizes, camera_mode);
        let cameras: BTreeMap<u32, Camera> =
            cameras.into_iter().map(|camera| (camera.id, camera)).collect();
        info!("created {} cameras with mode {}", cameras.len(), camera_mode);

        let images = image_features
            .into_iter()
            .zip(camera_ids)
            .map(|((name, local_features), camera_id)| {
                let camera = &cameras[&camera_id];
                let keypoints: Vec<[f64; 2]> = local_features
                    .keypoints
                    .iter()
                    .map(|&[x, y]| [x as f64, y as f64])
                    .collect();
                let bearings = keypoints.iter().map(|&kp| camera.bearing(kp)).collect();
                DbImage {
                    name: name.clone(),
                    camera_id,
                    keypoints,
                    colors: local_features.colors.clone(),
                    bearings,
                }
            })
            .collect();
        Ok(Self {
            cameras,
            images,
            ..Default::default()
        })
    }

    /// Imports the matches of every listed pair.
    ///
    /// Pairs listed twice, in either order, are imported once. Pairs without stored matches are skipped.
    pub fn import_matches(
        &mut self,
        pairs: &[Pair],
        pairs_path: &Path,
        matches: &MatchStore,
    ) -> Result<()> {
        let index: HashMap<&str, usize> = self
            .images
            .iter()
            .enumerate()
            .map(|(ix, image)| (image.name.as_str(), ix))
            .collect();
        let lookup = |name: &str| {
            index.get(name).copied().ok_or_else(|| Error::UnknownImage {
                name: name.to_owned(),
                path: pairs_path.to_path_buf(),
            })
        };
        let mut imported = BTreeMap::new();
        for (a, b) in pairs {
            let (ia, ib) = (lookup(a.as_str())?, lookup(b.as_str())?);
            if ia == ib {
                continue;
            }
            let key = (ia.min(ib), ia.max(ib));
            if imported.contains_key(&key) {
                continue;
            }
            let (first, second) = (&self.images[key.0].name, &self.images[key.1].name);
            match matches.find_pair(first, second) {
                Some(pair_matches) => {
                    imported.insert(key, pair_matches.matches);
                }
                None => warn!("no matches stored for pair {} {}", first, second),
            }
        }
        info!("imported matches of {} pairs", imported.len());
        self.matches = imported;
        Ok(())
    }

    /// The calibrated bearings of the matches of a pair.
    pub fn feature_matches(&self, (a, b): (usize, usize), matches: &[[u32; 2]]) -> Vec<FeatureMatch> {
        matches
            .iter()
            .map(|&[fa, fb]| {
                FeatureMatch(
                    self.images[a].bearings[fa as usize],
                    self.images[b].bearings[fb as usize],
                )
            })
            .collect()
    }

    /// Estimates the relative pose of every matched pair and keeps the pairs with enough inliers.
    pub fn verify_matches(&mut self, settings: &ReconstructionSettings) {
        let mut consensus = Arrsac::new(
            settings.two_view_consensus_threshold,
            Pcg64::seed_from_u64(settings.seed),
        );
        let estimator = EightPoint::new();
        let minimum = settings
            .two_view_minimum_inliers
            .max(<EightPoint as Estimator<FeatureMatch>>::MIN_SAMPLES);

        let mut geometries = BTreeMap::new();
        for (&pair, matches) in &self.matches {
            if matches.len() < minimum {
                debug!(
                    "pair {:?} has only {} matches, need {}",
                    pair,
                    matches.len(),
                    minimum
                );
                continue;
            }
            let feature_matches = self.feature_matches(pair, matches);
            let (pose, inliers) =
                match consensus.model_inliers(&estimator, feature_matches.iter().copied()) {
                    Some(outcome) => outcome,
                    None => {
                        debug!("no relative pose found for pair {:?}", pair);
                        continue;
                    }
                };
            if inliers.len() < minimum {
                debug!(
                    "pair {:?} has only {} inliers of {} matches",
                    pair,
                    inliers.len(),
                    matches.len()
                );
                continue;
            }
            let inliers = inliers.into_iter().map(|ix| matches[ix]).collect();
            geometries.insert(pair, TwoViewGeometry { pose, inliers });
        }
        info!(
            "verified {} of {} pairs",
            geometries.len(),
            self.matches.len()
        );
        self.two_view_geometries = geometries;
    }
}
