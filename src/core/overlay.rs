/// Lazy, idempotent interaction-file loading.

use log::warn;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::source::{OverlayStore, SourceError};
use crate::schema::node::NodeId;
use crate::schema::overlay::{InteractionEntry, InteractionOverlay};

/// Interaction files loaded so far, keyed by file name.
///
/// A file that the store reports missing is remembered as missing and never
/// requested again.
#[derive(Debug, Default)]
pub struct OverlayCache {
    files: Mutex<FxHashMap<String, Option<Arc<InteractionOverlay>>>>,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file once; later calls return the cached copy.
    pub fn load(
        &self,
        store: &dyn OverlayStore,
        file_name: &str,
    ) -> Result<Option<Arc<InteractionOverlay>>, SourceError> {
        if let Some(cached) = self.lock().get(file_name) {
            return Ok(cached.clone());
        }

        let loaded = store.load_overlay(file_name)?.map(Arc::new);
        if loaded.is_none() {
            warn!("interaction file {} is referenced but missing", file_name);
        }
        let mut files = self.lock();
        Ok(files
            .entry(file_name.to_string())
            .or_insert(loaded)
            .clone())
    }

    /// The interaction entry for a dialogue line, if any file describes it.
    pub fn entry_for(
        &self,
        store: &dyn OverlayStore,
        dialog_id: NodeId,
    ) -> Result<Option<InteractionEntry>, SourceError> {
        let Some(reference) = store.overlay_ref(dialog_id)? else {
            return Ok(None);
        };
        let Some(overlay) = self.load(store, &reference.file_name)? else {
            return Ok(None);
        };
        Ok(store
            .find_overlay_entry(&overlay, &reference, dialog_id)
            .cloned())
    }

    pub fn loaded_count(&self) -> usize {
        self.lock().values().filter(|f| f.is_some()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Option<Arc<InteractionOverlay>>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::overlay::{ActionKind, InteractionGroup, OverlayRef};
    use std::cell::Cell;

    struct CountingStore {
        loads: Cell<usize>,
    }

    impl OverlayStore for CountingStore {
        fn overlay_ref(&self, dialog_id: NodeId) -> Result<Option<OverlayRef>, SourceError> {
            Ok(match dialog_id.0 {
                1 => Some(OverlayRef {
                    file_name: "Q1.ron".to_string(),
                    group_id: 10,
                    group_index: 0,
                }),
                2 => Some(OverlayRef {
                    file_name: "Missing.ron".to_string(),
                    group_id: 10,
                    group_index: 0,
                }),
                _ => None,
            })
        }

        fn load_overlay(&self, file_name: &str) -> Result<Option<InteractionOverlay>, SourceError> {
            self.loads.set(self.loads.get() + 1);
            if file_name != "Q1.ron" {
                return Ok(None);
            }
            Ok(Some(InteractionOverlay {
                file_name: file_name.to_string(),
                groups: vec![InteractionGroup {
                    group_id: 10,
                    next_group_id: None,
                    entries: vec![InteractionEntry {
                        dialog_id: NodeId(1),
                        kind: ActionKind::Dialog,
                        intermediate: Vec::new(),
                        next_dialog_ids: Some(vec![NodeId(3)]),
                    }],
                }],
            }))
        }
    }

    #[test]
    fn files_load_once() {
        let store = CountingStore { loads: Cell::new(0) };
        let cache = OverlayCache::new();

        let first = cache.entry_for(&store, NodeId(1)).unwrap().unwrap();
        let second = cache.entry_for(&store, NodeId(1)).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.loads.get(), 1);
        assert_eq!(cache.loaded_count(), 1);
    }

    #[test]
    fn missing_file_is_no_overlay_and_cached() {
        let store = CountingStore { loads: Cell::new(0) };
        let cache = OverlayCache::new();

        assert!(cache.entry_for(&store, NodeId(2)).unwrap().is_none());
        assert!(cache.entry_for(&store, NodeId(2)).unwrap().is_none());
        assert_eq!(store.loads.get(), 1);
    }

    #[test]
    fn unindexed_dialog_has_no_overlay() {
        let store = CountingStore { loads: Cell::new(0) };
        let cache = OverlayCache::new();
        assert!(cache.entry_for(&store, NodeId(9)).unwrap().is_none());
        assert_eq!(store.loads.get(), 0);
    }
}
