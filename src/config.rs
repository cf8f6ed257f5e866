use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::bucket::{BucketPolicy, LaneLayout, WeekWindow};
use crate::core::classify::ViewScope;
use crate::error::{Error, Result};

pub const CONFIG_VERSION: u64 = 1;

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("lanes")
}

fn default_page_size() -> usize {
    20
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("lanes")
        .join("config.json")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    pub version: u64,
    pub data_directory: PathBuf,
    pub layout: LaneLayout,
    pub week_window: WeekWindow,
    pub view_scope: ViewScope,
    pub page_size: usize,
    pub debug_logging: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data_directory: default_data_dir(),
            layout: LaneLayout::default(),
            week_window: WeekWindow::default(),
            view_scope: ViewScope::default(),
            page_size: default_page_size(),
            debug_logging: false,
        }
    }
}

impl BoardConfig {
    /// Load from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        Self::try_load_from(path).unwrap_or_else(|e| {
            log::warn!("Invalid config at {}, using defaults: {}", path.display(), e);
            Self::default()
        })
    }

    /// Like [`Self::load_from`], but hands a broken file back to the caller
    /// instead of logging it. A missing file still yields the defaults.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    pub fn policy(&self) -> BucketPolicy {
        BucketPolicy::from_layout(self.layout, self.week_window)
    }

    /// Item file of one resource, e.g. `events.json`.
    pub fn items_path(&self, resource: &str) -> PathBuf {
        self.data_directory.join(format!("{resource}.json"))
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.data_directory.join("cursors.json")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_directory)
            .map_err(|e| Error::io(&self.data_directory, e))
    }
}
