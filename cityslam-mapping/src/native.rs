use crate::backend::{FeatureExtraction, FeatureMatching, PairGeneration, Plotting, Reconstruct};
use crate::Result;
use sfm_features::{GlobalConf, LocalConf, MatcherConf};
use sfm_pairs::SequenceOptions;
use sfm_reconstruction::{Reconstruction, ReconstructionInputs, ReconstructionSettings};
use sfm_viz::ColorBy;
use std::path::{Path, PathBuf};

/// Runs every stage with the `sfm-*` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend {
    /// Seeds the choice of the plotted images.
    pub plot_seed: u64,
}

impl NativeBackend {
    pub fn new(plot_seed: u64) -> Self {
        Self { plot_seed }
    }
}

impl FeatureExtraction for NativeBackend {
    fn extract_global(
        &mut self,
        conf: &GlobalConf,
        image_dir: &Path,
        export_dir: &Path,
        image_list: &[String],
        overwrite: bool,
    ) -> Result<PathBuf> {
        Ok(sfm_features::extract_global_descriptors(
            conf, image_dir, export_dir, image_list, overwrite,
        )?)
    }

    fn extract_local(
        &mut self,
        conf: &LocalConf,
        image_dir: &Path,
        export_dir: &Path,
        image_list: &[String],
        overwrite: bool,
    ) -> Result<PathBuf> {
        Ok(sfm_features::extract_local_features(
            conf, image_dir, export_dir, image_list, overwrite,
        )?)
    }
}

impl PairGeneration for NativeBackend {
    fn pairs_from_sequence(
        &mut self,
        output: &Path,
        image_list: &[String],
        options: &SequenceOptions,
    ) -> Result<PathBuf> {
        Ok(sfm_pairs::pairs_from_sequence(output, image_list, options)?)
    }

    fn pairs_from_retrieval(
        &mut self,
        descriptors: &Path,
        output: &Path,
        image_list: &[String],
        num_matched: usize,
    ) -> Result<PathBuf> {
        Ok(sfm_pairs::pairs_from_retrieval(
            descriptors,
            output,
            image_list,
            num_matched,
        )?)
    }
}

impl FeatureMatching for NativeBackend {
    fn match_features(
        &mut self,
        conf: &MatcherConf,
        pairs: &Path,
        features: &Path,
        matches: &Path,
        overwrite: bool,
    ) -> Result<PathBuf> {
        Ok(sfm_features::match_features(
            conf, pairs, features, matches, overwrite,
        )?)
    }
}

impl Reconstruct for NativeBackend {
    fn reconstruct(
        &mut self,
        inputs: &ReconstructionInputs<'_>,
        settings: &ReconstructionSettings,
    ) -> Result<Option<Reconstruction>> {
        Ok(sfm_reconstruction::reconstruct(inputs, settings)?)
    }
}

impl Plotting for NativeBackend {
    fn plot(
        &mut self,
        model: &Reconstruction,
        image_dir: &Path,
        color_by: ColorBy,
        n: usize,
        output: &Path,
    ) -> Result<()> {
        let plot = sfm_viz::visualize_sfm_2d(model, image_dir, color_by, n, self.plot_seed)?;
        sfm_viz::save_plot(&plot, output)?;
        Ok(())
    }
}
