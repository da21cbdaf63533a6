use serde::{Deserialize, Serialize};

/// The settings for the incremental reconstruction.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionSettings {
    /// The threshold used for two-view sample consensus
    #[serde(default = "default_two_view_consensus_threshold")]
    pub two_view_consensus_threshold: f64,
    /// The minimum number of geometrically verified matches for a pair to be kept.
    #[serde(default = "default_two_view_minimum_inliers")]
    pub two_view_minimum_inliers: usize,
    /// The ratio of matches that must be in front of both cameras for the relative pose to be trusted.
    #[serde(default = "default_two_view_chirality_minimum_threshold")]
    pub two_view_chirality_minimum_threshold: f64,
    /// The minimum number of verified matches of the pair that seeds a model.
    #[serde(default = "default_init_minimum_inliers")]
    pub init_minimum_inliers: usize,
    /// The minimum number of points the seed pair must triangulate.
    #[serde(default = "default_init_minimum_landmarks")]
    pub init_minimum_landmarks: usize,
    /// The minimum cosine distance between two bearings of a new point.
    #[serde(default = "default_incidence_minimum_cosine_distance")]
    pub incidence_minimum_cosine_distance: f64,
    /// The threshold used for single-view sample consensus
    #[serde(default = "default_single_view_consensus_threshold")]
    pub single_view_consensus_threshold: f64,
    /// The minimum number of 3d landmarks required for single-view registration.
    #[serde(default = "default_single_view_minimum_landmarks")]
    pub single_view_minimum_landmarks: usize,
    /// The ratio of good matches to total matches to consider a single-view match successful.
    #[serde(default = "default_single_view_inlier_minimum_threshold")]
    pub single_view_inlier_minimum_threshold: f64,
    /// The maximum cosine distance between an observation and the bearing of its landmark.
    #[serde(default = "default_maximum_cosine_distance")]
    pub maximum_cosine_distance: f64,
    /// The number of retriangulation and filtering passes after registration.
    #[serde(default = "default_refinement_iterations")]
    pub refinement_iterations: usize,
    /// Keep seeding models from unregistered images once a model stops growing.
    #[serde(default = "default_multiple_models")]
    pub multiple_models: bool,
    /// The seed of the consensus random number generators.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            two_view_consensus_threshold: default_two_view_consensus_threshold(),
            two_view_minimum_inliers: default_two_view_minimum_inliers(),
            two_view_chirality_minimum_threshold: default_two_view_chirality_minimum_threshold(),
            init_minimum_inliers: default_init_minimum_inliers(),
            init_minimum_landmarks: default_init_minimum_landmarks(),
            incidence_minimum_cosine_distance: default_incidence_minimum_cosine_distance(),
            single_view_consensus_threshold: default_single_view_consensus_threshold(),
            single_view_minimum_landmarks: default_single_view_minimum_landmarks(),
            single_view_inlier_minimum_threshold: default_single_view_inlier_minimum_threshold(),
            maximum_cosine_distance: default_maximum_cosine_distance(),
            refinement_iterations: default_refinement_iterations(),
            multiple_models: default_multiple_models(),
            seed: default_seed(),
        }
    }
}

fn default_two_view_consensus_threshold() -> f64 {
    0.00001
}

fn default_two_view_minimum_inliers() -> usize {
    15
}

fn default_two_view_chirality_minimum_threshold() -> f64 {
    0.9
}

fn default_init_minimum_inliers() -> usize {
    100
}

fn default_init_minimum_landmarks() -> usize {
    50
}

fn default_incidence_minimum_cosine_distance() -> f64 {
    0.0003
}

fn default_single_view_consensus_threshold() -> f64 {
    0.00001
}

fn default_single_view_minimum_landmarks() -> usize {
    24
}

fn default_single_view_inlier_minimum_threshold() -> f64 {
    0.25
}

fn default_maximum_cosine_distance() -> f64 {
    0.00001
}

fn default_refinement_iterations() -> usize {
    1
}

fn default_multiple_models() -> bool {
    true
}

fn default_seed() -> u64 {
    5
}
