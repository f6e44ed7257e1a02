use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::Duration;

use crate::viewer::{DEFAULT_RENDER_SCALE, ViewMode};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "readpane";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Base URL of the document/chat backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub view_mode: ViewMode,

    #[serde(default = "default_render_scale")]
    pub render_scale: f32,

    /// Seconds a single page may take before it is reported as stalled
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Language passed to the translate action
    #[serde(default = "default_translate_language")]
    pub translate_language: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_render_scale() -> f32 {
    DEFAULT_RENDER_SCALE
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_translate_language() -> String {
    "Chinese".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            api_base_url: default_api_base_url(),
            view_mode: ViewMode::default(),
            render_scale: default_render_scale(),
            page_timeout_secs: default_page_timeout_secs(),
            translate_language: default_translate_language(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::from(SETTINGS_HEADER);

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("api_base_url: {}\n", quoted(&settings.api_base_url)));
    content.push_str(&format!("view_mode: {}\n", settings.view_mode.as_str()));
    content.push_str(&format!("render_scale: {}\n", settings.render_scale));
    content.push_str(&format!(
        "page_timeout_secs: {}\n",
        settings.page_timeout_secs
    ));
    content.push_str(&format!(
        "translate_language: {}\n",
        quoted(&settings.translate_language)
    ));

    content
}

/// Double-quoted scalar. A JSON string literal is valid YAML, escapes included.
fn quoted(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

const SETTINGS_HEADER: &str = r#"# readpane configuration
#
# view_mode: "paged" shows one page with page-turn controls,
#            "continuous" stacks every page in a scrolling column.
# render_scale: zoom factor used for every rendered page.

"#;

// Public API for accessing/modifying settings

pub fn get_api_base_url() -> String {
    SETTINGS
        .read()
        .map(|s| s.api_base_url.clone())
        .unwrap_or_else(|_| default_api_base_url())
}

pub fn set_api_base_url(url: &str) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.api_base_url = url.trim_end_matches('/').to_string();
    }
}

pub fn get_view_mode() -> ViewMode {
    SETTINGS.read().map(|s| s.view_mode).unwrap_or_default()
}

pub fn set_view_mode(mode: ViewMode) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.view_mode = mode;
    }
}

pub fn get_render_scale() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.render_scale)
        .ok()
        .filter(|scale| scale.is_finite() && *scale > 0.0)
        .unwrap_or(DEFAULT_RENDER_SCALE)
}

pub fn get_page_timeout() -> Duration {
    let secs = SETTINGS
        .read()
        .map(|s| s.page_timeout_secs)
        .unwrap_or_else(|_| default_page_timeout_secs());
    Duration::from_secs(secs.max(1))
}

pub fn get_translate_language() -> String {
    SETTINGS
        .read()
        .map(|s| s.translate_language.clone())
        .unwrap_or_else(|_| default_translate_language())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn reset() {
        if let Ok(mut settings) = SETTINGS.write() {
            *settings = Settings::default();
        }
    }

    #[test]
    fn generated_yaml_round_trips() {
        let settings = Settings {
            view_mode: ViewMode::Paged,
            render_scale: 2.0,
            ..Settings::default()
        };

        let yaml = generate_settings_yaml(&settings);
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.view_mode, ViewMode::Paged);
        assert_eq!(parsed.render_scale, 2.0);
        assert_eq!(parsed.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn quotes_and_backslashes_survive_saving() {
        let settings = Settings {
            api_base_url: r#"http://host/api?q="a\b""#.to_string(),
            translate_language: "Simplified \"Mandarin\" \\ 中文\n".to_string(),
            ..Settings::default()
        };

        let yaml = generate_settings_yaml(&settings);
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.api_base_url, settings.api_base_url);
        assert_eq!(parsed.translate_language, settings.translate_language);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed: Settings = serde_yaml::from_str("view_mode: paged\n").unwrap();

        assert_eq!(parsed.version, CURRENT_VERSION);
        assert_eq!(parsed.render_scale, DEFAULT_RENDER_SCALE);
        assert_eq!(parsed.page_timeout_secs, 30);
        assert_eq!(parsed.translate_language, "Chinese");
    }

    #[test]
    #[serial]
    fn load_from_path_replaces_globals() {
        reset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(
            &path,
            "view_mode: paged\nrender_scale: 0\napi_base_url: \"http://example.test/api\"\n",
        )
        .unwrap();

        load_settings_from_path(&path);

        assert_eq!(get_view_mode(), ViewMode::Paged);
        assert_eq!(get_api_base_url(), "http://example.test/api");
        // Non-positive scale falls back to the default
        assert_eq!(get_render_scale(), DEFAULT_RENDER_SCALE);
        reset();
    }

    #[test]
    #[serial]
    fn unparsable_file_keeps_current_settings() {
        reset();
        set_view_mode(ViewMode::Paged);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "view_mode: [not, a, mode]\n").unwrap();

        load_settings_from_path(&path);

        assert_eq!(get_view_mode(), ViewMode::Paged);
        reset();
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);

        save_settings_to_file(&Settings::default(), &path);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# readpane configuration"));
        assert!(written.contains("view_mode: continuous"));
    }
}
