use crate::{
    Database, Image, Point3D, Reconstruction, ReconstructionSettings, TrackElement, TwoViewGeometry,
};
use arrsac::Arrsac;
use cv_core::nalgebra::{Point3, UnitVector3};
use cv_core::sample_consensus::{Consensus, Estimator};
use cv_core::{
    FeatureWorldMatch, Pose, Projective, TriangulatorObservations, WorldPoint, WorldToCamera,
};
use cv_geom::triangulation::LinearEigenTriangulator;
use itertools::Itertools;
use lambda_twist::LambdaTwist;
use log::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use slotmap::{new_key_type, SlotMap};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

new_key_type! {
    pub struct LandmarkKey;
}

/// An image and one of its features.
type Observation = (usize, usize);

#[derive(Debug, Clone)]
struct Landmark {
    point: Point3<f64>,
    observations: Vec<Observation>,
}

impl Landmark {
    fn observes_image(&self, image: usize) -> bool {
        self.observations.iter().any(|&(observer, _)| observer == image)
    }
}

/// The state of the model being grown.
#[derive(Debug, Default)]
struct MapState {
    poses: BTreeMap<usize, WorldToCamera>,
    landmarks: SlotMap<LandmarkKey, Landmark>,
    observations: HashMap<Observation, LandmarkKey>,
}

impl MapState {
    fn add_landmark(&mut self, point: Point3<f64>, observations: Vec<Observation>) -> LandmarkKey {
        let landmark = self.landmarks.insert(Landmark {
            point,
            observations: observations.clone(),
        });
        for observation in observations {
            self.observations.insert(observation, landmark);
        }
        landmark
    }

    fn remove_landmark(&mut self, landmark: LandmarkKey) {
        if let Some(removed) = self.landmarks.remove(landmark) {
            for observation in removed.observations {
                self.observations.remove(&observation);
            }
        }
    }
}

/// Every verified correspondence of every feature.
struct CorrespondenceGraph {
    correspondences: Vec<Vec<Vec<Observation>>>,
}

impl CorrespondenceGraph {
    fn new(database: &Database) -> Self {
        let mut correspondences: Vec<Vec<Vec<Observation>>> = database
            .images
            .iter()
            .map(|image| vec![vec![]; image.keypoints.len()])
            .collect();
        for (&(a, b), geometry) in &database.two_view_geometries {
            for &[fa, fb] in &geometry.inliers {
                correspondences[a][fa as usize].push((b, fb as usize));
                correspondences[b][fb as usize].push((a, fa as usize));
            }
        }
        Self { correspondences }
    }

    fn of(&self, (image, feature): Observation) -> &[Observation] {
        &self.correspondences[image][feature]
    }

    fn num_features(&self, image: usize) -> usize {
        self.correspondences[image].len()
    }
}

/// Grows models one image at a time from verified two-view geometries.
pub struct IncrementalMapper<'a> {
    database: &'a Database,
    settings: ReconstructionSettings,
    graph: CorrespondenceGraph,
    triangulator: LinearEigenTriangulator,
    pose_consensus: Arrsac<Pcg64>,
    pose_estimator: LambdaTwist,
    /// Images registered in a previous model.
    claimed: HashSet<usize>,
}

impl<'a> IncrementalMapper<'a> {
    pub fn new(database: &'a Database, settings: ReconstructionSettings) -> Self {
        Self {
            database,
            settings,
            graph: CorrespondenceGraph::new(database),
            triangulator: LinearEigenTriangulator::new(),
            pose_consensus: Arrsac::new(
                settings.single_view_consensus_threshold,
                Pcg64::seed_from_u64(settings.seed),
            ),
            pose_estimator: LambdaTwist::new(),
            claimed: HashSet::new(),
        }
    }

    /// Builds models until no verified pair of unregistered images can seed another one.
    pub fn run(&mut self) -> Vec<Reconstruction> {
        let mut models = vec![];
        while let Some(mut state) = self.initialize() {
            self.grow(&mut state);
            self.refine(&mut state);
            self.claimed.extend(state.poses.keys().copied());
            let model = self.to_reconstruction(&state);
            info!(
                "model {} has {} images and {} points",
                models.len(),
                model.num_reg_images(),
                model.num_points3d()
            );
            models.push(model);
            if !self.settings.multiple_models {
                break;
            }
        }
        models
    }

    fn bearing(&self, (image, feature): Observation) -> UnitVector3<f64> {
        self.database.images[image].bearings[feature]
    }

    /// Tries the verified pairs by decreasing number of inliers until one seeds a model.
    fn initialize(&self) -> Option<MapState> {
        let candidates = self
            .database
            .two_view_geometries
            .iter()
            .filter(|&(&(a, b), geometry)| {
                !self.claimed.contains(&a)
                    && !self.claimed.contains(&b)
                    && geometry.inliers.len() >= self.settings.init_minimum_inliers
            })
            .sorted_by_key(|&(_, geometry)| Reverse(geometry.inliers.len()));
        for (&(a, b), geometry) in candidates {
            info!(
                "trying to initialize from {} and {} with {} inliers",
                self.database.images[a].name,
                self.database.images[b].name,
                geometry.inliers.len()
            );
            if let Some(state) = self.try_init(a, b, geometry) {
                return Some(state);
            }
        }
        info!("no pair left to initialize a model");
        None
    }

    fn try_init(&self, a: usize, b: usize, geometry: &TwoViewGeometry) -> Option<MapState> {
        let mut state = MapState::default();
        state.poses.insert(a, WorldToCamera::identity());
        state.poses.insert(b, WorldToCamera(geometry.pose.0));

        // Perform the pure chirality test.
        let chirality_passes = geometry
            .inliers
            .iter()
            .filter(|&&[fa, fb]| {
                let observations = [(a, fa as usize), (b, fb as usize)];
                self.triangulate(&state, &observations)
                    .map_or(false, |point| {
                        observations
                            .iter()
                            .all(|&(image, _)| (state.poses[&image].0 * point).z > 0.0)
                    })
            })
            .count();
        let chirality_pass_ratio = chirality_passes as f64 / geometry.inliers.len() as f64;
        if chirality_pass_ratio < self.settings.two_view_chirality_minimum_threshold {
            info!(
                "initial chirality test pass ratio was {} ({}/{}), but needed {}; rejecting two-view match",
                chirality_pass_ratio,
                chirality_passes,
                geometry.inliers.len(),
                self.settings.two_view_chirality_minimum_threshold
            );
            return None;
        }

        for &[fa, fb] in &geometry.inliers {
            self.try_add_landmark(&mut state, vec![(a, fa as usize), (b, fb as usize)]);
        }
        if state.landmarks.len() < self.settings.init_minimum_landmarks {
            info!(
                "only triangulated {} landmarks, but needed {}; rejecting two-view match",
                state.landmarks.len(),
                self.settings.init_minimum_landmarks
            );
            return None;
        }
        info!(
            "initialized model with {} landmarks",
            state.landmarks.len()
        );
        Some(state)
    }

    /// Registers images until none has enough correspondences to landmarks.
    ///
    /// An image that fails registration is only retried once another image was registered.
    fn grow(&mut self, state: &mut MapState) {
        let mut failed: HashSet<usize> = HashSet::new();
        while let Some((image, matches)) = self.next_image(state, &failed) {
            info!(
                "trying to register {} with {} landmark correspondences",
                self.database.images[image].name,
                matches.len()
            );
            if self.register_image(state, image, &matches) {
                failed.clear();
                self.triangulate_image(state, image);
            } else {
                failed.insert(image);
            }
        }
    }

    /// The unregistered image with the most features matched to landmarks, with those matches.
    #[allow(clippy::type_complexity)]
    fn next_image(
        &self,
        state: &MapState,
        failed: &HashSet<usize>,
    ) -> Option<(usize, Vec<(usize, LandmarkKey)>)> {
        let minimum = self
            .settings
            .single_view_minimum_landmarks
            .max(<LambdaTwist as Estimator<FeatureWorldMatch>>::MIN_SAMPLES);
        (0..self.database.images.len())
            .filter(|image| {
                !state.poses.contains_key(image)
                    && !self.claimed.contains(image)
                    && !failed.contains(image)
            })
            .map(|image| (image, self.landmark_matches(state, image)))
            .filter(|(_, matches)| matches.len() >= minimum)
            .max_by_key(|&(image, ref matches)| (matches.len(), Reverse(image)))
    }

    /// Matches features of `image` to landmarks through the correspondence graph.
    ///
    /// Landmarks matched by several features are ambiguous and left out.
    fn landmark_matches(&self, state: &MapState, image: usize) -> Vec<(usize, LandmarkKey)> {
        let mut matches: Vec<(usize, LandmarkKey)> = (0..self.graph.num_features(image))
            .filter_map(|feature| {
                self.graph
                    .of((image, feature))
                    .iter()
                    .find_map(|observation| state.observations.get(observation))
                    .map(|&landmark| (feature, landmark))
            })
            .collect();
        let landmark_counts = matches.iter().counts_by(|&(_, landmark)| landmark);
        matches.retain(|(_, landmark)| landmark_counts[landmark] == 1);
        matches
    }

    fn register_image(
        &mut self,
        state: &mut MapState,
        image: usize,
        matches: &[(usize, LandmarkKey)],
    ) -> bool {
        let matches_3d: Vec<FeatureWorldMatch> = matches
            .iter()
            .map(|&(feature, landmark)| {
                FeatureWorldMatch(
                    self.bearing((image, feature)),
                    WorldPoint::from_point(state.landmarks[landmark].point),
                )
            })
            .collect();
        let (pose, inliers) = match self
            .pose_consensus
            .model_inliers(&self.pose_estimator, matches_3d.iter().copied())
        {
            Some(outcome) => outcome,
            None => {
                info!("no pose found; frame registration aborted");
                return false;
            }
        };
        let inlier_ratio = inliers.len() as f64 / matches.len() as f64;
        if inlier_ratio < self.settings.single_view_inlier_minimum_threshold {
            info!(
                "inlier ratio was {}, less than the threshold for acceptance ({}); rejecting single-view match",
                inlier_ratio, self.settings.single_view_inlier_minimum_threshold
            );
            return false;
        }

        state.poses.insert(image, pose);
        let mut attached = 0;
        for ix in inliers {
            let (feature, landmark) = matches[ix];
            let point = state.landmarks[landmark].point;
            if !state.landmarks[landmark].observes_image(image)
                && self.is_observation_good(state, point, (image, feature))
            {
                state.landmarks[landmark].observations.push((image, feature));
                state.observations.insert((image, feature), landmark);
                attached += 1;
            }
        }
        info!(
            "registered {} with {} of {} correspondences",
            self.database.images[image].name,
            attached,
            matches.len()
        );
        true
    }

    /// Extends landmarks with the features of a freshly registered image and triangulates new ones.
    fn triangulate_image(&self, state: &mut MapState, image: usize) {
        let landmarks_before = state.landmarks.len();
        for feature in 0..self.graph.num_features(image) {
            let observation = (image, feature);
            for &other in self.graph.of(observation) {
                if !state.poses.contains_key(&other.0) {
                    continue;
                }
                match (
                    state.observations.get(&observation).copied(),
                    state.observations.get(&other).copied(),
                ) {
                    // Both already belong to landmarks.
                    (Some(_), Some(_)) => {}
                    (Some(landmark), None) => {
                        self.try_extend_landmark(state, landmark, other);
                    }
                    (None, Some(landmark)) => {
                        self.try_extend_landmark(state, landmark, observation);
                    }
                    (None, None) => {
                        self.try_add_landmark(state, vec![other, observation]);
                    }
                }
            }
        }
        debug!(
            "triangulated {} new landmarks",
            state.landmarks.len() - landmarks_before
        );
    }

    fn try_add_landmark(&self, state: &mut MapState, observations: Vec<Observation>) -> bool {
        let point = match self.triangulate(state, &observations) {
            Some(point) => point,
            None => return false,
        };
        if !self.is_incidence_sufficient(state, &observations)
            || !observations
                .iter()
                .all(|&observation| self.is_observation_good(state, point, observation))
        {
            return false;
        }
        state.add_landmark(point, observations);
        true
    }

    fn try_extend_landmark(
        &self,
        state: &mut MapState,
        landmark: LandmarkKey,
        observation: Observation,
    ) -> bool {
        if state.landmarks[landmark].observes_image(observation.0) {
            return false;
        }
        let mut observations = state.landmarks[landmark].observations.clone();
        observations.push(observation);
        let point = match self.triangulate(state, &observations) {
            Some(point) => point,
            None => return false,
        };
        if !observations
            .iter()
            .all(|&observation| self.is_observation_good(state, point, observation))
        {
            return false;
        }
        state.landmarks[landmark] = Landmark {
            point,
            observations,
        };
        state.observations.insert(observation, landmark);
        true
    }

    /// Retriangulates every landmark from its whole track and drops observations that disagree.
    fn refine(&self, state: &mut MapState) {
        for iteration in 0..self.settings.refinement_iterations {
            let mut dropped = 0;
            let mut removed = 0;
            let landmarks: Vec<LandmarkKey> = state.landmarks.keys().collect();
            for landmark in landmarks {
                let observations = state.landmarks[landmark].observations.clone();
                let point = self
                    .triangulate(state, &observations)
                    .unwrap_or(state.landmarks[landmark].point);
                let (good, bad): (Vec<Observation>, Vec<Observation>) = observations
                    .into_iter()
                    .partition(|&observation| self.is_observation_good(state, point, observation));
                if good.len() < 2 {
                    state.remove_landmark(landmark);
                    removed += 1;
                    continue;
                }
                dropped += bad.len();
                for observation in bad {
                    state.observations.remove(&observation);
                }
                state.landmarks[landmark] = Landmark {
                    point,
                    observations: good,
                };
            }
            info!(
                "refinement {}: dropped {} observations and removed {} landmarks",
                iteration, dropped, removed
            );
        }
    }

    fn triangulate(&self, state: &MapState, observations: &[Observation]) -> Option<Point3<f64>> {
        let pairs = observations.iter().filter_map(|&observation| {
            Some((*state.poses.get(&observation.0)?, self.bearing(observation)))
        });
        self.triangulator
            .triangulate_observations(pairs)
            .and_then(Projective::point)
    }

    /// The point is in front of the camera and close to the bearing of the feature.
    fn is_observation_good(
        &self,
        state: &MapState,
        point: Point3<f64>,
        observation: Observation,
    ) -> bool {
        let pose = match state.poses.get(&observation.0) {
            Some(pose) => pose,
            None => return false,
        };
        let camera_point = pose.0 * point;
        if camera_point.z <= 0.0 {
            return false;
        }
        let residual = 1.0 - self.bearing(observation).dot(&camera_point.coords.normalize());
        residual.is_finite() && residual < self.settings.maximum_cosine_distance
    }

    /// Some pair of observations looks at the point from sufficiently different directions.
    fn is_incidence_sufficient(&self, state: &MapState, observations: &[Observation]) -> bool {
        let world_bearings: Vec<_> = observations
            .iter()
            .filter_map(|&observation| {
                let pose = state.poses.get(&observation.0)?;
                Some(pose.0.rotation.inverse() * self.bearing(observation).into_inner())
            })
            .collect();
        world_bearings.iter().tuple_combinations().any(|(a, b)| {
            1.0 - a.dot(b) > self.settings.incidence_minimum_cosine_distance
        })
    }

    fn to_reconstruction(&self, state: &MapState) -> Reconstruction {
        let mut reconstruction = Reconstruction::default();
        let image_id = |image: usize| image as u32 + 1;
        let point_ids: HashMap<LandmarkKey, u64> = state
            .landmarks
            .keys()
            .enumerate()
            .map(|(ix, landmark)| (landmark, ix as u64 + 1))
            .collect();

        for (&image, &pose) in &state.poses {
            let db_image = &self.database.images[image];
            if let Some(camera) = self.database.cameras.get(&db_image.camera_id) {
                reconstruction.cameras.insert(camera.id, camera.clone());
            }
            let point3d_ids = (0..db_image.keypoints.len())
                .map(|feature| {
                    state
                        .observations
                        .get(&(image, feature))
                        .and_then(|landmark| point_ids.get(landmark).copied())
                })
                .collect();
            let mut model_image = Image {
                id: image_id(image),
                name: db_image.name.clone(),
                camera_id: db_image.camera_id,
                qvec: [1.0, 0.0, 0.0, 0.0],
                tvec: [0.0; 3],
                keypoints: db_image.keypoints.clone(),
                point3d_ids,
            };
            model_image.set_pose(pose);
            reconstruction.images.insert(model_image.id, model_image);
        }

        for (landmark_key, landmark) in &state.landmarks {
            let xyz = [landmark.point.x, landmark.point.y, landmark.point.z];
            let track: Vec<TrackElement> = landmark
                .observations
                .iter()
                .map(|&(image, feature)| TrackElement {
                    image_id: image_id(image),
                    point2d_idx: feature as u32,
                })
                .collect();
            let error = track
                .iter()
                .map(|element| {
                    reconstruction.reprojection_error(
                        &reconstruction.images[&element.image_id],
                        element.point2d_idx as usize,
                        xyz,
                    )
                })
                .sum::<f64>()
                / track.len() as f64;
            let mut color_sum = [0u32; 3];
            for &(image, feature) in &landmark.observations {
                let color = self.database.images[image]
                    .colors
                    .get(feature)
                    .copied()
                    .unwrap_or_default();
                for (sum, channel) in color_sum.iter_mut().zip(color) {
                    *sum += channel as u32;
                }
            }
            let count = landmark.observations.len().max(1) as u32;
            reconstruction.points3d.insert(
                point_ids[&landmark_key],
                Point3D {
                    xyz,
                    color: color_sum.map(|sum| (sum / count) as u8),
                    error,
                    track,
                },
            );
        }
        reconstruction
    }
}
