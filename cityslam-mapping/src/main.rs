use cityslam_mapping::{Error, Mapper, MappingConfig, MappingSettings, NativeBackend};
use log::*;
use sfm_reconstruction::CameraMode;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "cityslam-mapping",
    about = "Runs a structure from motion reconstruction on the images of a video"
)]
struct Opt {
    /// The root directory of the images.
    #[structopt(long, parse(from_os_str))]
    images_path: PathBuf,
    /// The image list of the video, relative to the image root.
    ///
    /// If this is a directory, the list `<video-id>.txt` inside it is used.
    #[structopt(long, alias = "image-splits", parse(from_os_str))]
    image_list: PathBuf,
    /// The output directory.
    #[structopt(long, parse(from_os_str))]
    outputs: PathBuf,
    /// The video id, which names the output subdirectory.
    ///
    /// Ids containing `part` share features and matches with the other parts of the video.
    #[structopt(long)]
    video_id: String,
    /// Size of the window of images to match sequentially.
    #[structopt(long, default_value = "6")]
    window_size: usize,
    /// Number of image pairs for retrieval.
    #[structopt(long, default_value = "7")]
    num_loc: usize,
    /// How often to trigger retrieval.
    #[structopt(long, default_value = "5")]
    retrieval_interval: usize,
    /// The pairing method: sequential, retrieval or sequential+retrieval.
    #[structopt(long, default_value = "sequential+retrieval")]
    pairing: String,
    /// Run the reconstruction instead of only loading a model of a previous run.
    #[structopt(long)]
    run_reconstruction: bool,
    /// Recompute features, matches and the model even when they exist.
    #[structopt(long)]
    overwrite: bool,
    /// How images share cameras: auto, single, per_folder or per_image.
    #[structopt(long, default_value = "single")]
    camera_mode: CameraMode,
    /// The file where settings are specified.
    ///
    /// This is in the format of `cityslam_mapping::MappingSettings`.
    #[structopt(short, long, parse(from_os_str))]
    settings: Option<PathBuf>,
    /// How many registered images each plot shows.
    #[structopt(long, default_value = "5")]
    num_plots: usize,
}

fn main() -> Result<(), Error> {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    let settings = MappingSettings::load(opt.settings.as_deref())?;
    let backend = NativeBackend::new(settings.plot_seed);
    let config = MappingConfig {
        images_path: opt.images_path,
        image_list: opt.image_list,
        outputs: opt.outputs,
        video_id: opt.video_id,
        window_size: opt.window_size,
        num_loc: opt.num_loc,
        retrieval_interval: opt.retrieval_interval,
        pairing: opt.pairing,
        run_reconstruction: opt.run_reconstruction,
        overwrite: opt.overwrite,
        camera_mode: opt.camera_mode,
        num_plots: opt.num_plots,
    };
    let mut mapper = Mapper::new(config, settings, backend);

    let model = mapper.run()?;
    if model.is_none() {
        println!("Model is not created!\n Run the reconstruction with --run-reconstruction!");
    }
    for plot in mapper.plot(model.as_ref())? {
        info!("saved {:?}", plot);
    }
    Ok(())
}
