//! Incremental structure from motion.
//!
//! The images, features and matches produced by `sfm-features` are imported into a [`Database`],
//! every matched pair is verified with the eight-point algorithm under ARRSAC, and the
//! [`IncrementalMapper`] grows models from the best verified pair by registering images with
//! Lambda Twist and triangulating new landmarks. The largest model is kept.

mod camera_mode;
mod database;
mod error;
mod export;
mod mapper;
mod model;
mod settings;

pub use camera_mode::*;
pub use database::*;
pub use error::*;
pub use export::*;
pub use mapper::*;
pub use model::*;
pub use settings::*;

use log::*;
use sfm_features::{pair_list, FeatureStore, MatchStore};
use std::path::{Path, PathBuf};

/// The file the model of a reconstruction directory is stored in.
pub const MODEL_FILE: &str = "reconstruction.bin";

/// The point cloud exported next to the model.
pub const POINT_CLOUD_FILE: &str = "points.ply";

/// Everything a reconstruction reads.
#[derive(Debug, Clone)]
pub struct ReconstructionInputs<'a> {
    /// Where the model is written.
    pub sfm_dir: &'a Path,
    pub image_dir: &'a Path,
    pub pairs: &'a Path,
    pub features: &'a Path,
    pub matches: &'a Path,
    pub image_list: &'a [String],
    pub camera_mode: CameraMode,
    /// Run the mapper, or only load a model written by a previous run.
    pub run: bool,
    /// Run the mapper even if a model was already written.
    pub overwrite: bool,
}

impl ReconstructionInputs<'_> {
    pub fn model_path(&self) -> PathBuf {
        self.sfm_dir.join(MODEL_FILE)
    }
}

/// Returns the largest model that can be built from the inputs, or `None` if no model has at
/// least two registered images.
pub fn reconstruct(
    inputs: &ReconstructionInputs<'_>,
    settings: &ReconstructionSettings,
) -> Result<Option<Reconstruction>> {
    let model_path = inputs.model_path();
    if !inputs.run || (model_path.exists() && !inputs.overwrite) {
        return load_existing(&model_path);
    }

    std::fs::create_dir_all(inputs.sfm_dir).map_err(|source| Error::Io {
        path: inputs.sfm_dir.to_path_buf(),
        source,
    })?;
    remove_previous(&model_path)?;
    remove_previous(&inputs.sfm_dir.join(POINT_CLOUD_FILE))?;
    let features = FeatureStore::open_existing(inputs.features)?;
    let matches = MatchStore::open_existing(inputs.matches)?;
    let pairs = pair_list::parse_pairs(inputs.pairs)?;

    let mut database = Database::import_images(
        inputs.image_dir,
        inputs.image_list,
        &features,
        inputs.camera_mode,
    )?;
    database.import_matches(&pairs, inputs.pairs, &matches)?;
    database.verify_matches(settings);

    let models = IncrementalMapper::new(&database, *settings).run();
    let num_models = models.len();
    let largest = models
        .into_iter()
        .filter(|model| model.num_reg_images() >= 2)
        .max_by_key(Reconstruction::num_reg_images);
    let model = match largest {
        Some(model) => model,
        None => {
            warn!("could not reconstruct any model");
            return Ok(None);
        }
    };
    info!(
        "largest of {} models has {} images",
        num_models,
        model.num_reg_images()
    );
    info!("{}", model.summary());
    model.write(&model_path)?;
    model.export_ply(&inputs.sfm_dir.join(POINT_CLOUD_FILE))?;
    Ok(Some(model))
}

/// Removes the output of an earlier run.
fn remove_previous(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("removed previous {:?}", path);
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_existing(model_path: &Path) -> Result<Option<Reconstruction>> {
    if model_path.exists() {
        info!("loading existing model from {:?}", model_path);
        Reconstruction::read(model_path).map(Some)
    } else {
        info!("no model at {:?}", model_path);
        Ok(None)
    }
}
