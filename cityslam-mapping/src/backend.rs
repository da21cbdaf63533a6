//! The stages a mapping session delegates to.

use crate::Result;
use sfm_features::{GlobalConf, LocalConf, MatcherConf};
use sfm_pairs::SequenceOptions;
use sfm_reconstruction::{Reconstruction, ReconstructionInputs, ReconstructionSettings};
use sfm_viz::ColorBy;
use std::path::{Path, PathBuf};

pub trait FeatureExtraction {
    /// Writes global descriptors of the listed images under `export_dir` and returns the store.
    fn extract_global(
        &mut self,
        conf: &GlobalConf,
        image_dir: &Path,
        export_dir: &Path,
        image_list: &[String],
        overwrite: bool,
    ) -> Result<PathBuf>;

    /// Writes local features of the listed images under `export_dir` and returns the store.
    fn extract_local(
        &mut self,
        conf: &LocalConf,
        image_dir: &Path,
        export_dir: &Path,
        image_list: &[String],
        overwrite: bool,
    ) -> Result<PathBuf>;
}

pub trait PairGeneration {
    fn pairs_from_sequence(
        &mut self,
        output: &Path,
        image_list: &[String],
        options: &SequenceOptions,
    ) -> Result<PathBuf>;

    fn pairs_from_retrieval(
        &mut self,
        descriptors: &Path,
        output: &Path,
        image_list: &[String],
        num_matched: usize,
    ) -> Result<PathBuf>;
}

pub trait FeatureMatching {
    /// Matches the features of the listed pairs into the store at `matches` and returns it.
    fn match_features(
        &mut self,
        conf: &MatcherConf,
        pairs: &Path,
        features: &Path,
        matches: &Path,
        overwrite: bool,
    ) -> Result<PathBuf>;
}

pub trait Reconstruct {
    /// Returns the model, or `None` when no model could be built or loaded.
    fn reconstruct(
        &mut self,
        inputs: &ReconstructionInputs<'_>,
        settings: &ReconstructionSettings,
    ) -> Result<Option<Reconstruction>>;
}

pub trait Plotting {
    /// Renders up to `n` registered images of `model` colored by `color_by` into `output`.
    fn plot(
        &mut self,
        model: &Reconstruction,
        image_dir: &Path,
        color_by: ColorBy,
        n: usize,
        output: &Path,
    ) -> Result<()>;
}

/// Everything a mapping session needs.
pub trait Backend:
    FeatureExtraction + PairGeneration + FeatureMatching + Reconstruct + Plotting
{
}

impl<T> Backend for T where
    T: FeatureExtraction + PairGeneration + FeatureMatching + Reconstruct + Plotting
{
}
