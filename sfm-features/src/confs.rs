use serde::{Deserialize, Serialize};

/// Configuration of local feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalConf {
    /// Stem of the feature store written by extraction.
    #[serde(default = "default_local_output")]
    pub output: String,
    /// The AKAZE detector threshold.
    ///
    /// 0.01 will be very sparse and 0.0001 will be very dense.
    #[serde(default = "default_detector_threshold")]
    pub threshold: f64,
    /// Only the strongest keypoints are kept.
    #[serde(default = "default_max_keypoints")]
    pub max_keypoints: Option<usize>,
    /// Images are downscaled before detection so their longest side is at most this.
    #[serde(default = "default_resize_max")]
    pub resize_max: Option<u32>,
}

impl Default for LocalConf {
    fn default() -> Self {
        Self {
            output: default_local_output(),
            threshold: default_detector_threshold(),
            max_keypoints: default_max_keypoints(),
            resize_max: default_resize_max(),
        }
    }
}

/// Configuration of global descriptor extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConf {
    /// Stem of the descriptor store written by extraction.
    #[serde(default = "default_global_output")]
    pub output: String,
    /// The AKAZE detector threshold for the words aggregated into the descriptor.
    #[serde(default = "default_detector_threshold")]
    pub threshold: f64,
    #[serde(default = "default_resize_max")]
    pub resize_max: Option<u32>,
}

impl Default for GlobalConf {
    fn default() -> Self {
        Self {
            output: default_global_output(),
            threshold: default_detector_threshold(),
            resize_max: default_resize_max(),
        }
    }
}

/// Configuration of the symmetric Hamming matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConf {
    /// Tag inserted in the name of the match store.
    #[serde(default = "default_matcher_output")]
    pub output: String,
    /// The amount of bits the best match must beat the second best match by.
    #[serde(default = "default_better_by")]
    pub better_by: u32,
    /// Matches at a larger Hamming distance are rejected.
    #[serde(default)]
    pub max_distance: Option<u32>,
}

impl Default for MatcherConf {
    fn default() -> Self {
        Self {
            output: default_matcher_output(),
            better_by: default_better_by(),
            max_distance: None,
        }
    }
}

fn default_local_output() -> String {
    "feats-akaze-n4096-r1024".to_owned()
}

fn default_global_output() -> String {
    "global-feats-bvlad".to_owned()
}

fn default_matcher_output() -> String {
    "matches-NN-mutual".to_owned()
}

fn default_detector_threshold() -> f64 {
    0.001
}

fn default_max_keypoints() -> Option<usize> {
    Some(4096)
}

fn default_resize_max() -> Option<u32> {
    Some(1024)
}

fn default_better_by() -> u32 {
    24
}
