/// In-memory data store loaded from a single RON dataset.
///
/// Implements every collaborator trait, so a dataset file is enough to drive
/// the engine from tools and tests.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::source::{
    CodexLookup, DialogueRepository, ManualTextLookup, OverlayStore, ReadableLookup, SourceError,
    TextStore, VoiceOverLookup,
};
use crate::schema::codex::{CodexEntry, CodexGroup};
use crate::schema::node::{DialogueNode, NodeId, QuestId, ReadableId, TextHash};
use crate::schema::overlay::{InteractionOverlay, OverlayRef};
use crate::schema::readable::Readable;

/// On-disk layout of a dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub nodes: Vec<DialogueNode>,
    /// Language code to localized text table.
    pub text: FxHashMap<String, FxHashMap<TextHash, String>>,
    pub overlay_index: FxHashMap<NodeId, OverlayRef>,
    pub overlays: Vec<InteractionOverlay>,
    pub readables: Vec<Readable>,
    pub codex: FxHashMap<QuestId, Vec<CodexEntry>>,
    /// Voice-over file names per dialogue line.
    pub voice_overs: FxHashMap<NodeId, Vec<String>>,
    /// Language code to manual text table.
    pub manual_text: FxHashMap<String, FxHashMap<String, String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: FxHashMap<NodeId, DialogueNode>,
    node_order: Vec<NodeId>,
    text: FxHashMap<String, FxHashMap<TextHash, String>>,
    overlay_index: FxHashMap<NodeId, OverlayRef>,
    overlays: FxHashMap<String, InteractionOverlay>,
    readables: FxHashMap<ReadableId, Readable>,
    codex: FxHashMap<QuestId, Vec<CodexEntry>>,
    voice_overs: FxHashMap<NodeId, Vec<String>>,
    manual_text: FxHashMap<String, FxHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut store = Self {
            text: dataset.text,
            overlay_index: dataset.overlay_index,
            codex: dataset.codex,
            voice_overs: dataset.voice_overs,
            manual_text: dataset.manual_text,
            ..Self::default()
        };
        for node in dataset.nodes {
            store.insert_node(node);
        }
        for overlay in dataset.overlays {
            store.overlays.insert(overlay.file_name.clone(), overlay);
        }
        for readable in dataset.readables {
            store.readables.insert(readable.id, readable);
        }
        store
    }

    /// Load a dataset from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a dataset from a RON string.
    pub fn parse_ron(input: &str) -> Result<Self, SourceError> {
        let dataset: Dataset = ron::from_str(input)?;
        Ok(Self::from_dataset(dataset))
    }

    pub fn insert_node(&mut self, node: DialogueNode) {
        if !self.nodes.contains_key(&node.id) {
            self.node_order.push(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    pub fn insert_text(&mut self, lang_code: &str, hash: TextHash, text: &str) {
        self.text
            .entry(lang_code.to_string())
            .or_default()
            .insert(hash, text.to_string());
    }

    pub fn insert_overlay(&mut self, overlay: InteractionOverlay) {
        self.overlays.insert(overlay.file_name.clone(), overlay);
    }

    pub fn index_overlay(&mut self, dialog_id: NodeId, reference: OverlayRef) {
        self.overlay_index.insert(dialog_id, reference);
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DialogueNode> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&DialogueNode> {
        self.nodes.get(&id)
    }

    pub fn overlay_index(&self) -> &FxHashMap<NodeId, OverlayRef> {
        &self.overlay_index
    }

    pub fn overlay_files(&self) -> impl Iterator<Item = &InteractionOverlay> {
        self.overlays.values()
    }

    pub fn codex_entries(&self) -> &FxHashMap<QuestId, Vec<CodexEntry>> {
        &self.codex
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl DialogueRepository for MemoryStore {
    fn fetch_node(&self, id: NodeId) -> Result<Option<DialogueNode>, SourceError> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<DialogueNode>, SourceError> {
        Ok(ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
    }

    fn fetch_nodes_by_role(&self, role_id: u32) -> Result<Vec<DialogueNode>, SourceError> {
        Ok(self
            .nodes()
            .filter(|n| n.talk_role.role_id() == Some(role_id))
            .cloned()
            .collect())
    }
}

impl OverlayStore for MemoryStore {
    fn overlay_ref(&self, dialog_id: NodeId) -> Result<Option<OverlayRef>, SourceError> {
        Ok(self.overlay_index.get(&dialog_id).cloned())
    }

    fn load_overlay(&self, file_name: &str) -> Result<Option<InteractionOverlay>, SourceError> {
        Ok(self.overlays.get(file_name).cloned())
    }
}

impl TextStore for MemoryStore {
    fn get_text(&self, hash: TextHash, lang_code: &str) -> Option<String> {
        self.text.get(lang_code)?.get(&hash).cloned()
    }
}

impl ReadableLookup for MemoryStore {
    fn get_readable(&self, id: ReadableId) -> Result<Option<Readable>, SourceError> {
        Ok(self.readables.get(&id).cloned())
    }
}

impl CodexLookup for MemoryStore {
    fn get_codex_group(&self, quest_id: QuestId) -> Result<CodexGroup, SourceError> {
        Ok(self
            .codex
            .get(&quest_id)
            .map(|entries| CodexGroup::from_entries(entries.iter().cloned()))
            .unwrap_or_default())
    }
}

impl VoiceOverLookup for MemoryStore {
    fn has_voice_items(&self, dialog_id: NodeId) -> bool {
        self.voice_overs
            .get(&dialog_id)
            .is_some_and(|files| !files.is_empty())
    }

    fn vo_prefix(&self, dialog_id: NodeId) -> String {
        match self.voice_overs.get(&dialog_id) {
            Some(files) => files.iter().map(|f| format!("{{{{A|{}}}}} ", f)).collect(),
            None => String::new(),
        }
    }
}

impl ManualTextLookup for MemoryStore {
    fn manual_text(&self, key: &str, lang_code: &str) -> Option<String> {
        self.manual_text.get(lang_code)?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::TalkRole;

    const DATASET: &str = r#"(
        nodes: [
            (id: 1, talk_role: NonPlayerCharacter(npc_id: 1005), content_ref: Some(10), successor_ids: [2]),
            (id: 2, talk_role: Player(), content_ref: Some(20)),
            (id: 3, talk_role: NonPlayerCharacter(npc_id: 1005), content_ref: Some(30)),
        ],
        text: { "EN": { 10: "Hello there.", 20: "Hi." } },
        voice_overs: { 1: ["VO_paimon_1.ogg"] },
        manual_text: { "EN": { "MALE_KEY": "he" } },
        codex: { 77: [(item_id: 1, content_ref: 10, content_text: "Hello there.", content_type: DialogNormal)] },
    )"#;

    #[test]
    fn parse_and_fetch() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        assert_eq!(store.len(), 3);
        let node = store.fetch_node(NodeId(1)).unwrap().unwrap();
        assert_eq!(node.successor_ids, vec![NodeId(2)]);
        assert!(store.fetch_node(NodeId(99)).unwrap().is_none());
    }

    #[test]
    fn fetch_nodes_keeps_requested_order_and_skips_unknown() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        let nodes = store
            .fetch_nodes(&[NodeId(3), NodeId(404), NodeId(1)])
            .unwrap();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(3), NodeId(1)]);
    }

    #[test]
    fn fetch_by_role() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        let ids: Vec<NodeId> = store
            .fetch_nodes_by_role(1005)
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn text_and_voice_lookups() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        assert_eq!(store.get_text(TextHash(10), "EN").as_deref(), Some("Hello there."));
        assert!(store.get_text(TextHash(10), "JP").is_none());
        assert!(store.has_voice_items(NodeId(1)));
        assert!(!store.has_voice_items(NodeId(2)));
        assert_eq!(store.vo_prefix(NodeId(1)), "{{A|VO_paimon_1.ogg}} ");
        assert_eq!(store.vo_prefix(NodeId(2)), "");
        assert_eq!(store.manual_text("MALE_KEY", "EN").as_deref(), Some("he"));
    }

    #[test]
    fn codex_group_for_unknown_quest_is_empty() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        assert!(!store.get_codex_group(QuestId(77)).unwrap().is_empty());
        assert!(store.get_codex_group(QuestId(1)).unwrap().is_empty());
    }

    #[test]
    fn insert_helpers() {
        let mut store = MemoryStore::new();
        store.insert_node(DialogueNode::new(NodeId(5), TalkRole::MateCompanion));
        store.insert_text("EN", TextHash(1), "x");
        assert_eq!(store.node(NodeId(5)).map(|n| n.id), Some(NodeId(5)));
        assert_eq!(store.get_text(TextHash(1), "EN").as_deref(), Some("x"));
    }
}
