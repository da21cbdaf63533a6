//! Structure from motion over the images of one video session.
//!
//! A session reads the ordered image list of a video, pairs the images sequentially, by
//! retrieval or both, extracts and matches local features over the pairs and reconstructs a
//! sparse model. Every stage is delegated to a [`Backend`]; [`NativeBackend`] runs them with the
//! `sfm-*` crates.

pub mod backend;
mod error;
mod native;
mod pairing;
mod session;
mod settings;

pub use backend::Backend;
pub use error::*;
pub use native::*;
pub use pairing::*;
pub use session::*;
pub use settings::*;

use backend::{FeatureExtraction, FeatureMatching, PairGeneration, Plotting, Reconstruct};
use log::*;
use sfm_pairs::{LoopClosure, SequenceOptions};
use sfm_reconstruction::{CameraMode, Reconstruction, ReconstructionInputs};
use sfm_viz::ColorBy;
use std::path::{Path, PathBuf};

/// The inputs of a mapping session.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingConfig {
    /// The root the image names of the image list are relative to.
    pub images_path: PathBuf,
    /// The image list, or a directory holding `<video_id>.txt`.
    pub image_list: PathBuf,
    pub outputs: PathBuf,
    pub video_id: String,
    /// How many following images each image is paired with.
    pub window_size: usize,
    /// How many images a retrieval query returns.
    pub num_loc: usize,
    /// Every this many images a loop closure query is made.
    pub retrieval_interval: usize,
    /// One of `sequential`, `retrieval` or `sequential+retrieval`.
    pub pairing: String,
    pub run_reconstruction: bool,
    pub overwrite: bool,
    pub camera_mode: CameraMode,
    /// How many images each plot shows.
    pub num_plots: usize,
}

pub struct Mapper<B> {
    pub config: MappingConfig,
    pub settings: MappingSettings,
    pub backend: B,
}

impl<B: Backend> Mapper<B> {
    pub fn new(config: MappingConfig, settings: MappingSettings, backend: B) -> Self {
        Self {
            config,
            settings,
            backend,
        }
    }

    pub fn paths(&self) -> SessionPaths {
        SessionPaths::new(&self.config.outputs, &self.config.video_id)
    }

    /// Runs the session and returns its model, or `None` if no model was created.
    pub fn run(&mut self) -> Result<Option<Reconstruction>> {
        let paths = self.paths();
        paths.create()?;
        let pairing: PairingMode = self.config.pairing.parse()?;

        info!("getting images");
        let image_list_path =
            sfm_pairs::resolve_image_list(&self.config.image_list, &self.config.video_id);
        let image_list = sfm_pairs::parse_image_list(&image_list_path)?;
        info!("num images: {}", image_list.len());

        let sfm_pairs = self.pairs(pairing, &paths, &image_list)?;

        let config = &self.config;
        let settings = &self.settings;
        let features = self.backend.extract_local(
            &settings.local,
            &config.images_path,
            &paths.output_model_base,
            &image_list,
            config.overwrite,
        )?;
        let matches = paths.matches_path(&features, &settings.matcher.output, &sfm_pairs);
        let matches = self.backend.match_features(
            &settings.matcher,
            &sfm_pairs,
            &features,
            &matches,
            config.overwrite,
        )?;

        let inputs = ReconstructionInputs {
            sfm_dir: &paths.output_model,
            image_dir: &config.images_path,
            pairs: &sfm_pairs,
            features: &features,
            matches: &matches,
            image_list: &image_list,
            camera_mode: config.camera_mode,
            run: config.run_reconstruction,
            overwrite: config.overwrite,
        };
        self.backend.reconstruct(&inputs, &settings.reconstruction)
    }

    fn pairs(
        &mut self,
        pairing: PairingMode,
        paths: &SessionPaths,
        image_list: &[String],
    ) -> Result<PathBuf> {
        let MappingConfig {
            window_size,
            num_loc,
            retrieval_interval,
            ..
        } = self.config;
        let output = paths
            .output_model
            .join(pairing.pairs_file_name(window_size, num_loc));
        info!("pairing images with {}", pairing);
        let mut options = SequenceOptions {
            window_size,
            quadratic_overlap: true,
            loop_closure: None,
        };
        match pairing {
            PairingMode::Sequential => {
                self.backend
                    .pairs_from_sequence(&output, image_list, &options)
            }
            PairingMode::Retrieval => {
                let descriptors = self.extract_global(&paths.output_model_base, image_list)?;
                self.backend
                    .pairs_from_retrieval(&descriptors, &output, image_list, num_loc)
            }
            PairingMode::SequentialRetrieval => {
                let descriptors = self.extract_global(&paths.output_model_base, image_list)?;
                options.loop_closure = Some(LoopClosure {
                    retrieval_path: descriptors,
                    retrieval_interval,
                    num_loc,
                });
                self.backend
                    .pairs_from_sequence(&output, image_list, &options)
            }
        }
    }

    fn extract_global(&mut self, export_dir: &Path, image_list: &[String]) -> Result<PathBuf> {
        self.backend.extract_global(
            &self.settings.global,
            &self.config.images_path,
            export_dir,
            image_list,
            self.config.overwrite,
        )
    }

    /// Plots some registered images of the model colored by visibility, track length and depth
    /// and returns the written plots. Without a model nothing is plotted.
    pub fn plot(&mut self, model: Option<&Reconstruction>) -> Result<Vec<PathBuf>> {
        let model = match model {
            Some(model) => model,
            None => {
                warn!("model is not created, run the reconstruction first");
                return Ok(vec![]);
            }
        };
        if self.config.num_plots == 0 {
            info!("no images requested, skipping plots");
            return Ok(vec![]);
        }
        info!("plotting some registered images of the model");
        let paths = self.paths();
        let mut plots = Vec::with_capacity(ColorBy::ALL.len());
        for color_by in ColorBy::ALL {
            let output = paths.plot_path(color_by);
            self.backend.plot(
                model,
                &self.config.images_path,
                color_by,
                self.config.num_plots,
                &output,
            )?;
            plots.push(output);
        }
        Ok(plots)
    }
}
