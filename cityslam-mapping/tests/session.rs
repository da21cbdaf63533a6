use cityslam_mapping::backend::{
    FeatureExtraction, FeatureMatching, PairGeneration, Plotting, Reconstruct,
};
use cityslam_mapping::{Error, Mapper, MappingConfig, MappingSettings, PairingMode};
use sfm_features::{GlobalConf, LocalConf, MatcherConf};
use sfm_pairs::SequenceOptions;
use sfm_reconstruction::{CameraMode, Reconstruction, ReconstructionInputs, ReconstructionSettings};
use sfm_viz::ColorBy;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    ExtractGlobal { export_dir: PathBuf },
    ExtractLocal { export_dir: PathBuf },
    Sequence { output: PathBuf, loop_closure: Option<(PathBuf, usize, usize)> },
    Retrieval { descriptors: PathBuf, output: PathBuf, num_matched: usize },
    Match { pairs: PathBuf, features: PathBuf, matches: PathBuf },
    Reconstruct { sfm_dir: PathBuf, run: bool, images: usize },
    Plot { color_by: ColorBy, n: usize, output: PathBuf },
}

/// Records every call and hands out paths without touching the disk.
#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    model: Option<Reconstruction>,
}

impl FeatureExtraction for Recorder {
    fn extract_global(
        &mut self,
        conf: &GlobalConf,
        _image_dir: &Path,
        export_dir: &Path,
        _image_list: &[String],
        _overwrite: bool,
    ) -> cityslam_mapping::Result<PathBuf> {
        self.calls.push(Call::ExtractGlobal {
            export_dir: export_dir.to_path_buf(),
        });
        Ok(export_dir.join(format!("{}.bin", conf.output)))
    }

    fn extract_local(
        &mut self,
        conf: &LocalConf,
        _image_dir: &Path,
        export_dir: &Path,
        _image_list: &[String],
        _overwrite: bool,
    ) -> cityslam_mapping::Result<PathBuf> {
        self.calls.push(Call::ExtractLocal {
            export_dir: export_dir.to_path_buf(),
        });
        Ok(export_dir.join(format!("{}.bin", conf.output)))
    }
}

impl PairGeneration for Recorder {
    fn pairs_from_sequence(
        &mut self,
        output: &Path,
        _image_list: &[String],
        options: &SequenceOptions,
    ) -> cityslam_mapping::Result<PathBuf> {
        self.calls.push(Call::Sequence {
            output: output.to_path_buf(),
            loop_closure: options.loop_closure.as_ref().map(|loop_closure| {
                (
                    loop_closure.retrieval_path.clone(),
                    loop_closure.retrieval_interval,
                    loop_closure.num_loc,
                )
            }),
        });
        Ok(output.to_path_buf())
    }

    fn pairs_from_retrieval(
        &mut self,
        descriptors: &Path,
        output: &Path,
        _image_list: &[String],
        num_matched: usize,
    ) -> cityslam_mapping::Result<PathBuf> {
        self.calls.push(Call::Retrieval {
            descriptors: descriptors.to_path_buf(),
            output: output.to_path_buf(),
            num_matched,
        });
        Ok(output.to_path_buf())
    }
}

impl FeatureMatching for Recorder {
    fn match_features(
        &mut self,
        _conf: &MatcherConf,
        pairs: &Path,
        features: &Path,
        matches: &Path,
        _overwrite: bool,
    ) -> cityslam_mapping::Result<PathBuf> {
        self.calls.push(Call::Match {
            pairs: pairs.to_path_buf(),
            features: features.to_path_buf(),
            matches: matches.to_path_buf(),
        });
        Ok(matches.to_path_buf())
    }
}

impl Reconstruct for Recorder {
    fn reconstruct(
        &mut self,
        inputs: &ReconstructionInputs<'_>,
        _settings: &ReconstructionSettings,
    ) -> cityslam_mapping::Result<Option<Reconstruction>> {
        self.calls.push(Call::Reconstruct {
            sfm_dir: inputs.sfm_dir.to_path_buf(),
            run: inputs.run,
            images: inputs.image_list.len(),
        });
        Ok(self.model.clone())
    }
}

impl Plotting for Recorder {
    fn plot(
        &mut self,
        _model: &Reconstruction,
        _image_dir: &Path,
        color_by: ColorBy,
        n: usize,
        output: &Path,
    ) -> cityslam_mapping::Result<()> {
        self.calls.push(Call::Plot {
            color_by,
            n,
            output: output.to_path_buf(),
        });
        Ok(())
    }
}

struct Session {
    dir: tempfile::TempDir,
    config: MappingConfig,
}

fn new_session(video_id: &str, pairing: &str) -> Session {
    let dir = tempfile::tempdir().unwrap();
    let image_list = dir.path().join("list.txt");
    std::fs::write(&image_list, "seq/0.jpg\nseq/1.jpg\n\nseq/2.jpg\n").unwrap();
    let config = MappingConfig {
        images_path: dir.path().join("images"),
        image_list,
        outputs: dir.path().join("outputs"),
        video_id: video_id.to_owned(),
        window_size: 6,
        num_loc: 7,
        retrieval_interval: 5,
        pairing: pairing.to_owned(),
        run_reconstruction: true,
        overwrite: false,
        camera_mode: CameraMode::Single,
        num_plots: 5,
    };
    Session { dir, config }
}

fn recording_mapper(session: &Session, model: Option<Reconstruction>) -> Mapper<Recorder> {
    Mapper::new(
        session.config.clone(),
        MappingSettings::default(),
        Recorder {
            calls: vec![],
            model,
        },
    )
}

fn pair_list_of(calls: &[Call]) -> Option<PathBuf> {
    calls.iter().find_map(|call| match call {
        Call::Sequence { output, .. } | Call::Retrieval { output, .. } => Some(output.clone()),
        _ => None,
    })
}

#[test]
fn pair_lists_are_named_after_the_pairing_mode() {
    for mode in PairingMode::ALL {
        let session = new_session("video", &mode.to_string());
        let mut mapper = recording_mapper(&session, None);
        mapper.run().unwrap();
        let expected = session
            .dir
            .path()
            .join("outputs/video")
            .join(mode.pairs_file_name(6, 7));
        assert_eq!(pair_list_of(&mapper.backend.calls), Some(expected));
    }
}

#[test]
fn unknown_pairing_fails_before_any_stage() {
    let session = new_session("video", "exhaustive");
    let mut mapper = recording_mapper(&session, None);
    let result = mapper.run();
    assert!(matches!(result, Err(Error::UnknownPairing(mode)) if mode == "exhaustive"));
    assert!(mapper.backend.calls.is_empty());
    assert!(session.dir.path().join("outputs/video").is_dir());
}

#[test]
fn unknown_pairing_is_reported_before_a_missing_image_list() {
    let mut session = new_session("video", "exhaustive");
    session.config.image_list = session.dir.path().join("absent.txt");
    let mut mapper = recording_mapper(&session, None);
    let result = mapper.run();
    assert!(matches!(result, Err(Error::UnknownPairing(mode)) if mode == "exhaustive"));
    assert!(mapper.backend.calls.is_empty());
}

#[test]
fn session_directory_is_created_idempotently() {
    let session = new_session("video", "sequential");
    std::fs::create_dir_all(session.dir.path().join("outputs/video")).unwrap();
    let mut mapper = recording_mapper(&session, None);
    mapper.run().unwrap();
    mapper.run().unwrap();
    assert!(session.dir.path().join("outputs/video").is_dir());
}

#[test]
fn stages_run_in_order_with_session_paths() {
    let session = new_session("video/part0", "sequential+retrieval");
    let mut mapper = recording_mapper(&session, None);
    assert!(mapper.run().unwrap().is_none());

    let outputs = session.dir.path().join("outputs");
    let base = outputs.join("video");
    let output_model = base.join("part0");
    let descriptors = base.join(format!("{}.bin", GlobalConf::default().output));
    let features = base.join(format!("{}.bin", LocalConf::default().output));
    let pairs = output_model.join("pairs-sequential6-retrieval-netvlad7.txt");
    let matches = base.join(format!(
        "{}_{}_pairs-sequential6-retrieval-netvlad7.bin",
        LocalConf::default().output,
        MatcherConf::default().output
    ));
    assert_eq!(
        mapper.backend.calls,
        vec![
            Call::ExtractGlobal {
                export_dir: base.clone()
            },
            Call::Sequence {
                output: pairs.clone(),
                loop_closure: Some((descriptors, 5, 7)),
            },
            Call::ExtractLocal {
                export_dir: base.clone()
            },
            Call::Match {
                pairs,
                features,
                matches,
            },
            Call::Reconstruct {
                sfm_dir: output_model,
                run: true,
                images: 3,
            },
        ]
    );
}

#[test]
fn global_descriptors_are_only_extracted_for_retrieval() {
    let session = new_session("video", "sequential");
    let mut mapper = recording_mapper(&session, None);
    mapper.run().unwrap();
    assert!(!mapper
        .backend
        .calls
        .iter()
        .any(|call| matches!(call, Call::ExtractGlobal { .. })));
    assert!(matches!(
        mapper.backend.calls[0],
        Call::Sequence {
            loop_closure: None,
            ..
        }
    ));

    let session = new_session("video", "retrieval");
    let mut mapper = recording_mapper(&session, None);
    mapper.run().unwrap();
    assert!(matches!(mapper.backend.calls[0], Call::ExtractGlobal { .. }));
    assert!(matches!(
        mapper.backend.calls[1],
        Call::Retrieval { num_matched: 7, .. }
    ));
}

#[test]
fn image_list_directories_hold_one_list_per_video() {
    let mut session = new_session("video", "sequential");
    let lists = session.dir.path().join("image_splits");
    std::fs::create_dir_all(&lists).unwrap();
    std::fs::write(lists.join("video.txt"), "a.jpg\nb.jpg\n").unwrap();
    session.config.image_list = lists;
    let mut mapper = recording_mapper(&session, None);
    mapper.run().unwrap();
    assert!(mapper
        .backend
        .calls
        .contains(&Call::Reconstruct {
            sfm_dir: session.dir.path().join("outputs/video"),
            run: true,
            images: 2,
        }));
}

#[test]
fn missing_model_is_not_plotted() {
    let session = new_session("video", "sequential");
    let mut mapper = recording_mapper(&session, None);
    let model = mapper.run().unwrap();
    let calls = mapper.backend.calls.len();
    assert!(mapper.plot(model.as_ref()).unwrap().is_empty());
    assert_eq!(mapper.backend.calls.len(), calls);
}

#[test]
fn a_model_is_plotted_three_ways() {
    let session = new_session("video", "sequential");
    let mut mapper = recording_mapper(&session, Some(Reconstruction::default()));
    let model = mapper.run().unwrap();
    assert!(model.is_some());
    mapper.backend.calls.clear();

    let plots = mapper.plot(model.as_ref()).unwrap();
    let dir = session.dir.path().join("outputs/plots");
    assert_eq!(
        plots,
        vec![
            dir.join("visibility.png"),
            dir.join("track_length.png"),
            dir.join("depth.png"),
        ]
    );
    assert_eq!(
        mapper.backend.calls,
        ColorBy::ALL
            .iter()
            .zip(&plots)
            .map(|(&color_by, output)| Call::Plot {
                color_by,
                n: 5,
                output: output.clone(),
            })
            .collect::<Vec<_>>()
    );
}

#[test]
fn no_plots_are_made_for_zero_images() {
    let mut session = new_session("video", "sequential");
    session.config.num_plots = 0;
    let mut mapper = recording_mapper(&session, Some(Reconstruction::default()));
    let model = mapper.run().unwrap();
    mapper.backend.calls.clear();
    assert!(mapper.plot(model.as_ref()).unwrap().is_empty());
    assert!(mapper.backend.calls.is_empty());
}
