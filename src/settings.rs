use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::ask::{DEFAULT_ASK_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::selection::DEFAULT_MENU_OFFSET;
use crate::viewport::DEFAULT_MAX_RENDER_WIDTH;
use crate::widget::ask_dialog::DEFAULT_DIALOG_OFFSET;

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "askpdf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    /// URL the ask dialog POSTs `{context, question}` to
    #[serde(default = "default_endpoint")]
    pub ask_endpoint: String,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound of the page width, in pixels
    #[serde(default = "default_max_render_width")]
    pub max_render_width: u32,

    #[serde(default = "default_true")]
    pub clear_selection_on_scroll: bool,

    /// Rows between a selection and its menu
    #[serde(default = "default_menu_offset")]
    pub menu_offset: i32,

    /// Rows between the menu and a dialog that was not dragged yet
    #[serde(default = "default_dialog_offset")]
    pub dialog_offset: i32,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    "Oceanic Next".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ASK_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_render_width() -> u32 {
    DEFAULT_MAX_RENDER_WIDTH
}

fn default_menu_offset() -> i32 {
    DEFAULT_MENU_OFFSET
}

fn default_dialog_offset() -> i32 {
    DEFAULT_DIALOG_OFFSET
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            ask_endpoint: default_endpoint(),
            request_timeout_secs: default_timeout(),
            max_render_width: default_max_render_width(),
            clear_selection_on_scroll: true,
            menu_offset: default_menu_offset(),
            dialog_offset: default_dialog_offset(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load `config.yaml`, creating it with defaults when missing
pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

/// Replace the global settings with the contents of `path`.
///
/// Unreadable or malformed files are logged and leave the current settings
/// in place.
pub fn load_settings_from(path: &Path) {
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

    // v1 stored the request timeout in milliseconds
    if settings.version < 2 && settings.request_timeout_secs > 10_000 {
        settings.request_timeout_secs /= 1000;
    }

    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
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
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("theme: \"{}\"\n", settings.theme));
    content.push('\n');
    content.push_str("# Question answering endpoint (POST {context, question})\n");
    content.push_str(&format!("ask_endpoint: \"{}\"\n", settings.ask_endpoint));
    content.push_str(&format!(
        "request_timeout_secs: {}\n",
        settings.request_timeout_secs
    ));
    content.push('\n');
    content.push_str("# Widest page layout in pixels (columns x cell width)\n");
    content.push_str(&format!(
        "max_render_width: {}\n",
        settings.max_render_width
    ));
    content.push_str(&format!(
        "clear_selection_on_scroll: {}\n",
        settings.clear_selection_on_scroll
    ));
    content.push_str(&format!("menu_offset: {}\n", settings.menu_offset));
    content.push_str(&format!("dialog_offset: {}\n", settings.dialog_offset));

    content
}

// Public API for accessing settings

pub fn snapshot() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn get_theme_name() -> String {
    SETTINGS
        .read()
        .map(|s| s.theme.clone())
        .unwrap_or_else(|_| default_theme())
}

pub fn get_ask_endpoint() -> String {
    SETTINGS
        .read()
        .map(|s| s.ask_endpoint.clone())
        .unwrap_or_else(|_| default_endpoint())
}

pub fn get_request_timeout_secs() -> u64 {
    SETTINGS
        .read()
        .map(|s| s.request_timeout_secs)
        .unwrap_or_else(|_| default_timeout())
}

pub fn get_max_render_width() -> u32 {
    SETTINGS
        .read()
        .map(|s| s.max_render_width)
        .unwrap_or_else(|_| default_max_render_width())
}

pub fn is_clear_selection_on_scroll() -> bool {
    SETTINGS
        .read()
        .map(|s| s.clear_selection_on_scroll)
        .unwrap_or(true)
}

pub fn get_menu_offset() -> i32 {
    SETTINGS
        .read()
        .map(|s| s.menu_offset)
        .unwrap_or_else(|_| default_menu_offset())
}

pub fn get_dialog_offset() -> i32 {
    SETTINGS
        .read()
        .map(|s| s.dialog_offset)
        .unwrap_or_else(|_| default_dialog_offset())
}

/// Command-line overrides; these last for the session and are never saved
pub fn apply_overrides(endpoint: Option<&str>, keep_selection_on_scroll: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        if let Some(endpoint) = endpoint {
            settings.ask_endpoint = endpoint.to_string();
        }
        if keep_selection_on_scroll {
            settings.clear_selection_on_scroll = false;
        }
    }
}

/// Put the defaults back (tests share the process-wide settings)
pub fn reset_to_defaults() {
    if let Ok(mut settings) = SETTINGS.write() {
        *settings = Settings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_fields_take_defaults() {
        reset_to_defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 2\nask_endpoint: \"http://example.com/ask\"\n").unwrap();

        load_settings_from(&path);
        assert_eq!(get_ask_endpoint(), "http://example.com/ask");
        assert_eq!(get_max_render_width(), 800);
        assert!(is_clear_selection_on_scroll());
        assert_eq!(get_menu_offset(), 1);
        assert_eq!(get_dialog_offset(), 3);
        reset_to_defaults();
    }

    #[test]
    #[serial]
    fn malformed_file_keeps_current_settings() {
        reset_to_defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "max_render_width: [not a number").unwrap();

        load_settings_from(&path);
        assert_eq!(snapshot(), Settings::default());
    }

    #[test]
    #[serial]
    fn old_versions_are_migrated_and_saved() {
        reset_to_defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 1\nrequest_timeout_secs: 360000\n").unwrap();

        load_settings_from(&path);
        assert_eq!(get_request_timeout_secs(), 360);

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("version: 2"));
        assert!(saved.contains("request_timeout_secs: 360"));
        reset_to_defaults();
    }

    #[test]
    #[serial]
    fn generated_yaml_round_trips() {
        let settings = Settings {
            clear_selection_on_scroll: false,
            menu_offset: 2,
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    #[serial]
    fn overrides_apply_for_session() {
        reset_to_defaults();
        apply_overrides(Some("http://localhost:9000/ask"), true);
        assert_eq!(get_ask_endpoint(), "http://localhost:9000/ask");
        assert!(!is_clear_selection_on_scroll());

        apply_overrides(None, false);
        assert_eq!(get_ask_endpoint(), "http://localhost:9000/ask");
        reset_to_defaults();
    }
}
