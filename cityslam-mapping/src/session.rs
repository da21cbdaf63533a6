use crate::{Error, Result};
use log::*;
use sfm_viz::ColorBy;
use std::path::{Path, PathBuf};

/// Where a mapping session writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// `<outputs>/<video_id>`: pair lists and the model.
    pub output_model: PathBuf,
    /// Feature and match stores. The parts of a video share the stores of the video.
    pub output_model_base: PathBuf,
    pub plots: PathBuf,
}

impl SessionPaths {
    pub fn new(outputs: &Path, video_id: &str) -> Self {
        let output_model = outputs.join(video_id);
        let output_model_base = match output_model.parent() {
            Some(parent) if video_id.contains("part") => parent.to_path_buf(),
            _ => output_model.clone(),
        };
        Self {
            output_model,
            output_model_base,
            plots: outputs.join("plots"),
        }
    }

    /// Creates the session directory. Existing directories are kept.
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_model).map_err(|source| Error::Io {
            path: self.output_model.clone(),
            source,
        })?;
        debug!("session directory {:?}", self.output_model);
        Ok(())
    }

    /// The match store of the features in `features` matched over the pairs in `pairs`.
    pub fn matches_path(&self, features: &Path, matcher_output: &str, pairs: &Path) -> PathBuf {
        let stem = |path: &Path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        self.output_model_base.join(format!(
            "{}_{}_{}.bin",
            stem(features),
            matcher_output,
            stem(pairs)
        ))
    }

    pub fn plot_path(&self, color_by: ColorBy) -> PathBuf {
        self.plots.join(format!("{}.png", color_by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_of_a_video_share_the_stores_of_the_video() {
        let paths = SessionPaths::new(Path::new("/out"), "W25QdyiFnh0/part0");
        assert_eq!(paths.output_model, Path::new("/out/W25QdyiFnh0/part0"));
        assert_eq!(paths.output_model_base, Path::new("/out/W25QdyiFnh0"));

        let paths = SessionPaths::new(Path::new("/out"), "W25QdyiFnh0");
        assert_eq!(paths.output_model_base, paths.output_model);
    }

    #[test]
    fn match_stores_are_named_after_features_matcher_and_pairs() {
        let paths = SessionPaths::new(Path::new("/out"), "video");
        assert_eq!(
            paths.matches_path(
                Path::new("/out/video/feats-akaze-n4096-r1024.bin"),
                "matches-NN-mutual",
                Path::new("/out/video/pairs-sequential6.txt"),
            ),
            Path::new("/out/video/feats-akaze-n4096-r1024_matches-NN-mutual_pairs-sequential6.bin")
        );
    }

    #[test]
    fn plots_go_next_to_the_sessions() {
        let paths = SessionPaths::new(Path::new("/out"), "video/part1");
        assert_eq!(
            paths.plot_path(ColorBy::TrackLength),
            Path::new("/out/plots/track_length.png")
        );
    }
}
