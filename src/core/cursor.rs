use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::bucket::BucketKey;
use crate::error::{Error, Result};

/// Pagination position per resource and lane, the only board state kept on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorStore {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    pages: BTreeMap<String, BTreeMap<BucketKey, usize>>,
}

impl CursorStore {
    pub fn load(path: &Path) -> Self {
        let mut store: Self = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable cursors in {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        store.path = path.to_path_buf();
        store
    }

    pub fn page(&self, resource: &str, lane: BucketKey) -> usize {
        self.pages
            .get(resource)
            .and_then(|lanes| lanes.get(&lane))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_page(&mut self, resource: &str, lane: BucketKey, page: usize) {
        if page > 0 {
            self.pages
                .entry(resource.to_string())
                .or_default()
                .insert(lane, page);
            return;
        }
        if let Some(lanes) = self.pages.get_mut(resource) {
            lanes.remove(&lane);
            if lanes.is_empty() {
                self.pages.remove(resource);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))
    }
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// One page of `items`. Pages past the end clamp to the last page.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return items;
    }
    let page = page.min(page_count(items.len(), page_size) - 1);
    let start = page * page_size;
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrip_by_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("cursors.json");

        let mut store = CursorStore::load(&path);
        assert_eq!(store.page("events", BucketKey::Today), 0);
        store.set_page("events", BucketKey::Today, 3);
        store.set_page("opportunities", BucketKey::Today, 1);
        store.save().unwrap();

        let reloaded = CursorStore::load(&path);
        assert_eq!(reloaded.page("events", BucketKey::Today), 3);
        assert_eq!(reloaded.page("opportunities", BucketKey::Today), 1);
        assert_eq!(reloaded.page("properties", BucketKey::Today), 0);
    }

    #[test]
    fn lanes_of_one_resource_page_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursors.json");

        let mut store = CursorStore::load(&path);
        store.set_page("events", BucketKey::Overdue, 2);
        store.set_page("events", BucketKey::Next, 4);
        store.save().unwrap();

        let reloaded = CursorStore::load(&path);
        assert_eq!(reloaded.page("events", BucketKey::Overdue), 2);
        assert_eq!(reloaded.page("events", BucketKey::Next), 4);
        assert_eq!(reloaded.page("events", BucketKey::Today), 0);

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"overdue\": 2"), "{json}");
    }

    #[test]
    fn first_page_is_not_stored() {
        let mut store = CursorStore::default();
        store.set_page("events", BucketKey::Week, 2);
        store.set_page("events", BucketKey::Today, 1);
        store.set_page("events", BucketKey::Week, 0);
        assert_eq!(store.pages["events"].len(), 1);
        store.set_page("events", BucketKey::Today, 0);
        assert!(store.pages.is_empty());
    }

    #[test]
    fn corrupt_cursor_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursors.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(CursorStore::load(&path).page("events", BucketKey::Today), 0);
    }

    #[test]
    fn paginate_clamps_to_last_page() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(paginate(&items, 0, 3), &[0, 1, 2]);
        assert_eq!(paginate(&items, 2, 3), &[6]);
        assert_eq!(paginate(&items, 9, 3), &[6]);
        assert_eq!(paginate(&items, 1, 0), &items[..]);
        assert_eq!(page_count(7, 3), 3);
        assert_eq!(page_count(0, 3), 1);

        let empty: Vec<u32> = Vec::new();
        assert!(paginate(&empty, 4, 3).is_empty());
    }
}
