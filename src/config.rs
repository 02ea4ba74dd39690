use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::comments::{AccountInfo, DEFAULT_ANONYMOUS_NAME};
use crate::script::{DEFAULT_CONTEXT, WHOLE_FILE_CONTEXT};

#[derive(Debug, Clone)]
pub struct SidediffConfig {
    pub ignore_whitespace: Option<bool>,
    pub intraline_difference: Option<bool>,
    pub context_lines: Option<usize>,
    pub expand_comments: Option<bool>,
    /// Prefix for download links, e.g. `https://review.example.com/`.
    pub base_url: Option<String>,
    pub anonymous_name: String,
    /// Signed-in identity; `None` means signed out.
    pub user: Option<AccountInfo>,
}

impl Default for SidediffConfig {
    fn default() -> Self {
        Self {
            ignore_whitespace: None,
            intraline_difference: None,
            context_lines: None,
            expand_comments: None,
            base_url: None,
            anonymous_name: DEFAULT_ANONYMOUS_NAME.to_string(),
            user: None,
        }
    }
}

impl SidediffConfig {
    pub fn context_lines_or_default(&self) -> usize {
        self.context_lines.unwrap_or(DEFAULT_CONTEXT)
    }
}

#[derive(Debug, Deserialize)]
struct UserSection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ignore_whitespace: Option<bool>,
    #[serde(default)]
    intraline_difference: Option<bool>,
    #[serde(default)]
    context_lines: Option<usize>,
    #[serde(default)]
    expand_comments: Option<bool>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    anonymous_name: Option<String>,
    #[serde(default)]
    user: Option<UserSection>,
}

pub fn config_path() -> PathBuf {
    let mut path = dirs_home().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("sidediff");
    path.push("config.toml");
    path
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Load config from `~/.config/sidediff/config.toml`, falling back to defaults.
pub fn load_config() -> SidediffConfig {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> SidediffConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return SidediffConfig::default(),
    };

    let file: ConfigFile = match toml::from_str(&contents) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), "ignoring invalid config: {e}");
            return SidediffConfig::default();
        }
    };

    // A [user] table without a name or email is treated as signed out.
    let user = file
        .user
        .filter(|u| u.name.is_some() || u.email.is_some())
        .map(|u| AccountInfo {
            name: u.name,
            email: u.email,
        });

    SidediffConfig {
        ignore_whitespace: file.ignore_whitespace,
        intraline_difference: file.intraline_difference,
        context_lines: file.context_lines.map(context_from_file),
        expand_comments: file.expand_comments,
        base_url: file.base_url,
        anonymous_name: file
            .anonymous_name
            .unwrap_or_else(|| DEFAULT_ANONYMOUS_NAME.to_string()),
        user,
    }
}

/// TOML integers stop at `i64::MAX`, which is what whole-file context is
/// saved as.
fn context_from_file(lines: usize) -> usize {
    if lines as u64 >= i64::MAX as u64 {
        WHOLE_FILE_CONTEXT
    } else {
        lines
    }
}

/// Diff preferences written back to config.toml.
pub struct PersistentSettings {
    pub ignore_whitespace: bool,
    pub intraline_difference: bool,
    pub context_lines: usize,
    pub expand_comments: bool,
}

/// Save persistent settings to `~/.config/sidediff/config.toml`.
pub fn save_settings(settings: &PersistentSettings) {
    save_settings_to(&config_path(), settings);
}

/// Updates only the settings fields and keeps every other value in the file.
pub fn save_settings_to(path: &Path, settings: &PersistentSettings) {
    let mut table = if let Ok(contents) = std::fs::read_to_string(path) {
        contents.parse::<toml::Table>().unwrap_or_else(|e| {
            warn!(path = %path.display(), "replacing unreadable config: {e}");
            toml::Table::new()
        })
    } else {
        toml::Table::new()
    };

    table.insert(
        "ignore_whitespace".to_string(),
        toml::Value::Boolean(settings.ignore_whitespace),
    );
    table.insert(
        "intraline_difference".to_string(),
        toml::Value::Boolean(settings.intraline_difference),
    );
    table.insert(
        "context_lines".to_string(),
        toml::Value::Integer(i64::try_from(settings.context_lines).unwrap_or(i64::MAX)),
    );
    table.insert(
        "expand_comments".to_string(),
        toml::Value::Boolean(settings.expand_comments),
    );

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let toml_string = toml::to_string_pretty(&table).unwrap_or_default();
    if let Err(e) = std::fs::write(path, toml_string) {
        warn!(path = %path.display(), "failed to save settings: {e}");
    }
}
