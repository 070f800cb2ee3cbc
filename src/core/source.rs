/// External collaborators the engine reads from.
///
/// Every data source sits behind a trait so that a database, a file dump or
/// the in-memory store can back the engine interchangeably.

use thiserror::Error;

use crate::schema::codex::CodexGroup;
use crate::schema::node::{DialogueNode, NodeId, QuestId, ReadableId, TextHash};
use crate::schema::overlay::{InteractionEntry, InteractionOverlay, OverlayRef};
use crate::schema::readable::Readable;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Raw dialogue records, before overlay resolution or hydration.
pub trait DialogueRepository {
    fn fetch_node(&self, id: NodeId) -> Result<Option<DialogueNode>, SourceError>;

    /// Records for `ids`, in the order requested. Unknown ids are skipped.
    fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<DialogueNode>, SourceError>;

    fn fetch_nodes_by_role(&self, role_id: u32) -> Result<Vec<DialogueNode>, SourceError>;
}

/// Interaction files and the dialog-to-file index.
pub trait OverlayStore {
    /// Which file and group hold the interaction entry for a dialogue line.
    fn overlay_ref(&self, dialog_id: NodeId) -> Result<Option<OverlayRef>, SourceError>;

    /// Load one interaction file. `Ok(None)` when the file does not exist.
    fn load_overlay(&self, file_name: &str) -> Result<Option<InteractionOverlay>, SourceError>;

    fn find_overlay_entry<'o>(
        &self,
        overlay: &'o InteractionOverlay,
        reference: &OverlayRef,
        dialog_id: NodeId,
    ) -> Option<&'o InteractionEntry> {
        let target = overlay.target_group(reference.group_id, reference.group_index);
        overlay.find_entry(target, dialog_id)
    }
}

pub trait TextStore {
    fn get_text(&self, hash: TextHash, lang_code: &str) -> Option<String>;
}

pub trait ReadableLookup {
    fn get_readable(&self, id: ReadableId) -> Result<Option<Readable>, SourceError>;
}

pub trait CodexLookup {
    /// All codex entries of a quest. An empty group when the quest has none.
    fn get_codex_group(&self, quest_id: QuestId) -> Result<CodexGroup, SourceError>;
}

pub trait VoiceOverLookup {
    fn has_voice_items(&self, dialog_id: NodeId) -> bool;

    /// Markup placed before a voiced line. Empty for unvoiced lines.
    fn vo_prefix(&self, dialog_id: NodeId) -> String;
}

/// Hand-authored strings referenced by key from inside other text.
pub trait ManualTextLookup {
    fn manual_text(&self, key: &str, lang_code: &str) -> Option<String>;
}

/// Every collaborator one resolution needs.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub dialogue: &'a dyn DialogueRepository,
    pub overlays: &'a dyn OverlayStore,
    pub text: &'a dyn TextStore,
    pub readables: &'a dyn ReadableLookup,
    pub codex: &'a dyn CodexLookup,
    pub voice: &'a dyn VoiceOverLookup,
    pub manual_text: &'a dyn ManualTextLookup,
}

impl<'a> Sources<'a> {
    /// Use one store for every collaborator.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: DialogueRepository
            + OverlayStore
            + TextStore
            + ReadableLookup
            + CodexLookup
            + VoiceOverLookup
            + ManualTextLookup,
    {
        Self {
            dialogue: store,
            overlays: store,
            text: store,
            readables: store,
            codex: store,
            voice: store,
            manual_text: store,
        }
    }
}
