use std::collections::HashMap;
use std::hash::Hash;

/// Collapsed/expanded state for lanes and cards.
///
/// A global default applies to everything; individual entities can deviate
/// from it through overrides. An override never equals the default: it is
/// dropped as soon as it would.
#[derive(Debug, Clone)]
pub struct CollapseState<K> {
    global_default: bool,
    overrides: HashMap<K, bool>,
}

impl<K> Default for CollapseState<K> {
    fn default() -> Self {
        Self {
            global_default: false,
            overrides: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> CollapseState<K> {
    pub fn new(global_default: bool) -> Self {
        Self {
            global_default,
            overrides: HashMap::new(),
        }
    }

    pub fn global_default(&self) -> bool {
        self.global_default
    }

    pub fn is_collapsed(&self, id: &K) -> bool {
        self.overrides
            .get(id)
            .copied()
            .unwrap_or(self.global_default)
    }

    /// Flip one entity. Returns its new state.
    pub fn toggle(&mut self, id: K) -> bool {
        let collapsed = !self.is_collapsed(&id);
        if collapsed == self.global_default {
            self.overrides.remove(&id);
        } else {
            self.overrides.insert(id, collapsed);
        }
        collapsed
    }

    /// Flip the default for everything. Per-entity exceptions are discarded.
    pub fn toggle_global_default(&mut self) -> bool {
        self.global_default = !self.global_default;
        self.overrides.clear();
        self.global_default
    }

    pub fn set_global_default(&mut self, collapsed: bool) {
        if collapsed != self.global_default {
            self.toggle_global_default();
        }
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&K, bool)> {
        self.overrides.iter().map(|(k, v)| (k, *v))
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Drop overrides for entities that no longer exist, e.g. cards removed by a refresh.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.overrides.retain(|k, _| keep(k));
    }
}
