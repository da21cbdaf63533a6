use crate::{Error, Result};
use log::*;
use serde::{Deserialize, Serialize};
use sfm_features::{GlobalConf, LocalConf, MatcherConf};
use sfm_reconstruction::ReconstructionSettings;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The tunables of every stage of a mapping session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSettings {
    #[serde(default)]
    pub local: LocalConf,
    #[serde(default)]
    pub global: GlobalConf,
    #[serde(default)]
    pub matcher: MatcherConf,
    #[serde(default)]
    pub reconstruction: ReconstructionSettings,
    /// Seeds the choice of the plotted images.
    #[serde(default)]
    pub plot_seed: u64,
}

impl MappingSettings {
    /// Reads settings from a JSON file. Without a file, or if the file does not exist, the
    /// defaults are used. Fields missing from the file take their default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if path.exists() => path,
            Some(path) => {
                info!("settings {:?} do not exist, using default settings", path);
                return Ok(Self::default());
            }
            None => {
                info!("using default settings");
                return Ok(Self::default());
            }
        };
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            Error::Settings {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("loaded settings from {:?}", path);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(MappingSettings::load(None).unwrap(), MappingSettings::default());
        assert_eq!(
            MappingSettings::load(Some(&dir.path().join("mapping.json"))).unwrap(),
            MappingSettings::default()
        );
    }

    #[test]
    fn partial_settings_keep_the_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        std::fs::write(
            &path,
            r#"{ "matcher": { "better_by": 10 }, "reconstruction": { "init_minimum_inliers": 30 } }"#,
        )
        .unwrap();
        let settings = MappingSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.matcher.better_by, 10);
        assert_eq!(settings.matcher.output, MatcherConf::default().output);
        assert_eq!(settings.reconstruction.init_minimum_inliers, 30);
        assert_eq!(
            settings.reconstruction.init_minimum_landmarks,
            ReconstructionSettings::default().init_minimum_landmarks
        );
        assert_eq!(settings.local, LocalConf::default());
    }

    #[test]
    fn malformed_settings_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        std::fs::write(&path, "{ \"matcher\": 3 }").unwrap();
        assert!(matches!(
            MappingSettings::load(Some(&path)),
            Err(Error::Settings { .. })
        ));
    }
}
