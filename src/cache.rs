//! Local cache of mbox content returned by the service.
use std::collections::HashMap;

use serde_json::Value;

/// Mbox JSON as returned by the service.
pub type MboxJson = serde_json::Map<String, Value>;

pub(crate) const NAME: &str = "name";
pub(crate) const STATE: &str = "state";
pub(crate) const OPTIONS: &str = "options";
pub(crate) const METRICS: &str = "metrics";
pub(crate) const EVENT_TOKEN: &str = "eventToken";
pub(crate) const TYPE: &str = "type";

/// Only these keys are kept for loaded mboxes. Everything else is only needed for rendering.
const LOADED_MBOX_ACCEPTED_KEYS: [&str; 2] = [NAME, METRICS];

/// Two disjoint namespaces of cached mboxes.
///
/// *Prefetched* mboxes come from prefetch calls and can produce display notifications. *Loaded*
/// mboxes come from execute calls and are kept only for click tracking. A name present in the
/// prefetched namespace is never copied into the loaded namespace.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    prefetched: HashMap<String, MboxJson>,
    loaded: HashMap<String, MboxJson>,
}

impl ContentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ContentCache::default()
    }

    /// Prefetched mboxes.
    pub fn prefetched(&self) -> &HashMap<String, MboxJson> {
        &self.prefetched
    }

    /// Loaded mboxes.
    pub fn loaded(&self) -> &HashMap<String, MboxJson> {
        &self.loaded
    }

    /// Look up a prefetched mbox.
    pub fn prefetched_mbox(&self, name: &str) -> Option<&MboxJson> {
        self.prefetched.get(name)
    }

    /// Look up a loaded mbox.
    pub fn loaded_mbox(&self, name: &str) -> Option<&MboxJson> {
        self.loaded.get(name)
    }

    /// Merge prefetched mboxes. New entries replace old ones with the same name, and a name moved
    /// into the prefetched namespace leaves the loaded one.
    pub(crate) fn merge_prefetched(&mut self, mboxes: &HashMap<String, MboxJson>) {
        for (name, mbox) in mboxes {
            self.loaded.remove(name);
            self.prefetched.insert(name.clone(), mbox.clone());
        }
    }

    /// Save loaded mboxes, skipping names that were prefetched.
    pub(crate) fn save_loaded(&mut self, mboxes: &HashMap<String, MboxJson>) {
        for (name, mbox) in mboxes {
            if name.is_empty() || self.prefetched.contains_key(name) {
                continue;
            }
            let trimmed: MboxJson = mbox
                .iter()
                .filter(|(key, _)| LOADED_MBOX_ACCEPTED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            self.loaded.insert(name.clone(), trimmed);
        }
    }

    /// Drop everything.
    pub(crate) fn clear(&mut self) {
        self.prefetched.clear();
        self.loaded.clear();
    }
}
