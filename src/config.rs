// SPDX-License-Identifier: MPL-2.0

use crate::notes::{EstimatedMetrics, NoteStyle, PanelSettings, Size};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "floating-notes";
const CONFIG_FILE: &str = "config.json";
const DEF_DATABASE_FILE: &str = "notes.sqlite";
const DEF_SCREEN_WIDTH: i32 = 1920;
const DEF_SCREEN_HEIGHT: i32 = 1080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed accessing config file {}: {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Failed parsing config file {}: {}", .0.display(), .1)]
    Json(PathBuf, serde_json::Error),
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub screen: Size,
    pub style: NoteStyle,
    pub panel: PanelSettings,
    pub metrics: EstimatedMetrics,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: dirs_next::data_dir().map_or_else(
                || PathBuf::from(DEF_DATABASE_FILE),
                |mut data| {
                    data.push(APP_DIR);
                    data.push(DEF_DATABASE_FILE);
                    data
                },
            ),
            screen: Size::new(DEF_SCREEN_WIDTH, DEF_SCREEN_HEIGHT),
            style: NoteStyle::default(),
            panel: PanelSettings::default(),
            metrics: EstimatedMetrics::default(),
            debug: false,
        }
    }
}

#[allow(clippy::missing_errors_doc)]
impl Config {
    /// `<config_dir>/floating-notes/config.json`, if the platform has a config dir
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|mut dir| {
            dir.push(APP_DIR);
            dir.push(CONFIG_FILE);
            dir
        })
    }

    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;
        config.panel = config.panel.validated();
        Ok(config)
    }

    pub fn try_save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        }
        std::fs::write(path, json).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    /// Reads the config file, any failure falls back to the defaults
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::info!("no config directory, using default settings");
            return Self::default();
        };
        match Self::try_load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(_, e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                Self::default()
            }
        }
    }
}

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(
        &path,
        r##"{ "screen": { "width": 800, "height": 600 }, "style": { "background": "#AABBCC" } }"##,
    )
    .expect("config must be written");

    let config = Config::load_or_default(Some(path.as_path()));
    assert_eq!(config.screen, Size::new(800, 600));
    assert_eq!(config.style.background, palette::Srgb::new(0xaa, 0xbb, 0xcc));
    assert_eq!(config.style.font, NoteStyle::default().font);
    assert_eq!(config.panel, PanelSettings::default());
    assert!(!config.debug);
}

#[test]
fn broken_or_missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let missing = dir.path().join("missing.json");
    assert_eq!(Config::load_or_default(Some(missing.as_path())), Config::default());

    let broken = dir.path().join(CONFIG_FILE);
    std::fs::write(&broken, "{ not json").expect("config must be written");
    assert!(matches!(
        Config::try_load(&broken),
        Err(ConfigError::Json(..))
    ));
    assert_eq!(Config::load_or_default(Some(broken.as_path())), Config::default());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let path = dir.path().join(APP_DIR).join(CONFIG_FILE);
    let mut config = Config::default();
    config.panel.recent_fonts_limit = 8;
    config.debug = true;
    config.try_save(&path).expect("config must be saved");
    assert_eq!(Config::try_load(&path).expect("config must load"), config);
}

#[test]
fn inverted_fit_limits_fall_back_to_defaults() {
    use crate::notes::{FitLimits, FitRequest, fit};

    let dir = tempfile::tempdir().expect("temp dir must be created");
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(
        &path,
        r#"{ "panel": { "limits": { "min_font_size": 72, "max_font_size": 8 }, "note_size": { "width": 5000, "height": 10 } } }"#,
    )
    .expect("config must be written");

    let config = Config::load_or_default(Some(path.as_path()));
    assert_eq!(config.panel.limits, FitLimits::default());
    assert_eq!(config.panel.note_size, Size::new(800, 150));

    // the loaded limits are safe to fit with
    let request = FitRequest {
        content_area: Size::new(290, 190),
        text: "Hello",
        font_family: "Arial",
        font_size: 12,
        window_size: Size::new(300, 200),
    };
    let outcome = fit(&request, &config.panel.limits, &config.metrics);
    assert!((8..=72).contains(&outcome.font_size));
}

#[test]
fn errors_name_the_config_file() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let missing = dir.path().join("missing.json");
    let message = Config::try_load(&missing)
        .expect_err("missing file must fail")
        .to_string();
    assert!(message.starts_with("Failed accessing config file "));
    assert!(message.contains("missing.json"));
}
