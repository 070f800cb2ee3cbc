/// Quest-scoped state that outlives a single resolution.

use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::schema::node::{ImageRef, QuestId, ReadableId};

/// Counters and registries for one quest.
///
/// The same in-game image always receives the same generated name, across
/// every `resolve` call made for the quest.
#[derive(Debug, Clone, Default)]
pub struct QuestState {
    next_image_number: u32,
    image_names: FxHashMap<String, ImageRef>,
    image_numbers: FxHashMap<String, u32>,
    in_dialogue_readables: Vec<ReadableId>,
}

impl QuestState {
    /// Wiki name for an image basename, allocating the next number on first sight.
    pub fn image_ref(&mut self, quest_id: QuestId, basename: &str) -> ImageRef {
        if let Some(existing) = self.image_names.get(basename) {
            return existing.clone();
        }
        self.next_image_number += 1;
        let number = self.next_image_number;
        let image = ImageRef {
            name: basename.to_string(),
            wiki_name: still_name(quest_id, number),
        };
        self.image_names.insert(basename.to_string(), image.clone());
        self.image_numbers.insert(basename.to_string(), number);
        image
    }

    /// The sequential number assigned to an image, if any.
    pub fn image_number(&self, basename: &str) -> Option<u32> {
        self.image_numbers.get(basename).copied()
    }

    pub fn image_count(&self) -> u32 {
        self.next_image_number
    }

    /// Record a readable shown in dialogue. Returns false if already recorded.
    pub fn register_readable(&mut self, id: ReadableId) -> bool {
        if self.in_dialogue_readables.contains(&id) {
            return false;
        }
        self.in_dialogue_readables.push(id);
        true
    }

    pub fn in_dialogue_readables(&self) -> &[ReadableId] {
        &self.in_dialogue_readables
    }
}

/// Wiki-facing name of the n-th still of a quest.
pub fn still_name(quest_id: QuestId, number: u32) -> String {
    format!("Q{}_Still_{}", quest_id.0, number)
}

/// Shared handle to one quest's state.
pub type QuestHandle = Arc<Mutex<QuestState>>;

/// Lock a quest's state. A poisoned lock still holds consistent counters.
pub fn lock_quest(handle: &QuestHandle) -> MutexGuard<'_, QuestState> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-quest state for every quest an engine has touched.
///
/// Calls for different quests never contend on the same state lock.
#[derive(Debug, Default)]
pub struct QuestRegistry {
    quests: Mutex<FxHashMap<QuestId, QuestHandle>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the state for a quest.
    pub fn quest(&self, id: QuestId) -> QuestHandle {
        let mut quests = self.quests.lock().unwrap_or_else(PoisonError::into_inner);
        quests.entry(id).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.quests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
