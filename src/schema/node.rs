use serde::{Deserialize, Serialize};

/// Newtype wrapper for dialogue node IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Newtype wrapper for localized-text hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextHash(pub u64);

/// Newtype wrapper for quest IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(pub u32);

/// Newtype wrapper for readable document IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadableId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for QuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which flavour of black-screen narration a node uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlackScreenVariant {
    #[default]
    Plain,
    Consequent,
    NeedClick,
    ConsequentNeedClick,
}

/// Who speaks a dialogue line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TalkRole {
    /// The player character. A named player line is a forced line, not a choice.
    Player {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        name_ref: Option<TextHash>,
    },
    NonPlayerCharacter {
        npc_id: u32,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        name_ref: Option<TextHash>,
    },
    /// An interactable object that "speaks" (signs, terminals).
    Gadget {
        gadget_id: u32,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        name_ref: Option<TextHash>,
    },
    /// The player's twin sibling.
    MateCompanion,
    BlackScreen(BlackScreenVariant),
    /// Nodes fabricated for the wiki output.
    CustomWiki,
    /// A role string the data uses but this crate does not know.
    Unrecognized(String),
}

impl TalkRole {
    pub fn player() -> Self {
        Self::Player {
            name: None,
            name_ref: None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player { .. })
    }

    pub fn is_black_screen(&self) -> bool {
        matches!(self, Self::BlackScreen(_))
    }

    /// Resolved speaker name, if the role carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Player { name, .. }
            | Self::NonPlayerCharacter { name, .. }
            | Self::Gadget { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn name_ref(&self) -> Option<TextHash> {
        match self {
            Self::Player { name_ref, .. }
            | Self::NonPlayerCharacter { name_ref, .. }
            | Self::Gadget { name_ref, .. } => *name_ref,
            _ => None,
        }
    }

    /// Fill in the speaker name if the role has a slot for one and it is empty.
    pub fn set_name_if_missing(&mut self, resolved: String) {
        match self {
            Self::Player { name, .. }
            | Self::NonPlayerCharacter { name, .. }
            | Self::Gadget { name, .. } => {
                if name.is_none() {
                    *name = Some(resolved);
                }
            }
            _ => {}
        }
    }

    /// The numeric role id used by `fetch_nodes_by_role`.
    pub fn role_id(&self) -> Option<u32> {
        match self {
            Self::NonPlayerCharacter { npc_id, .. } => Some(*npc_id),
            Self::Gadget { gadget_id, .. } => Some(*gadget_id),
            _ => None,
        }
    }
}

/// How the game presents a player line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShowType {
    #[default]
    Default,
    /// Shown as a selectable option even when it has a speaker name.
    ForceSelect,
}

/// One image of a synthesized still, with the wiki-facing name assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Stable in-game basename (no directory, no extension).
    pub name: String,
    pub wiki_name: String,
}

/// Extra data carried by synthetic or special nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomPayload {
    /// Codex narration shown between two real lines.
    TravelLogText { text: String },
    /// A background still; `secondary` holds the paired variant when merged.
    ImagePair {
        primary: ImageRef,
        secondary: Option<ImageRef>,
    },
    FreeformNote {
        text: String,
        comment: Option<String>,
    },
    EmbeddedReadable {
        readable_ref: ReadableId,
        title: String,
        paragraphs: Vec<String>,
    },
}

/// One line of a conversation.
///
/// Edges are stored as ids, never as owned nodes, so the graph can contain
/// cycles. Fields below `successor_ids` are filled during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: NodeId,
    pub talk_role: TalkRole,
    #[serde(default)]
    pub content_ref: Option<TextHash>,
    #[serde(default)]
    pub successor_ids: Vec<NodeId>,
    #[serde(default)]
    pub show_type: ShowType,
    #[serde(default)]
    pub option_icon: Option<String>,
    #[serde(default)]
    pub custom_payload: Option<CustomPayload>,

    /// Localized text for `content_ref`, resolved when the node enters resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(default)]
    pub player_option: bool,
    #[serde(default)]
    pub recurse_marker: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<Vec<DialogueNode>>>,
}

impl DialogueNode {
    pub fn new(id: NodeId, talk_role: TalkRole) -> Self {
        Self {
            id,
            talk_role,
            content_ref: None,
            successor_ids: Vec::new(),
            show_type: ShowType::Default,
            option_icon: None,
            custom_payload: None,
            content_text: None,
            player_option: false,
            recurse_marker: false,
            branches: None,
        }
    }

    /// A node fabricated during resolution.
    pub fn synthetic(id: NodeId, payload: CustomPayload) -> Self {
        let mut node = Self::new(id, TalkRole::CustomWiki);
        node.custom_payload = Some(payload);
        node
    }

    pub fn is_player(&self) -> bool {
        self.talk_role.is_player()
    }

    pub fn is_black_screen(&self) -> bool {
        self.talk_role.is_black_screen()
    }

    pub fn text(&self) -> Option<&str> {
        self.content_text.as_deref().filter(|t| !t.is_empty())
    }

    /// True when the node produces output: resolved text or any payload.
    pub fn has_renderable_content(&self) -> bool {
        self.text().is_some() || self.custom_payload.is_some()
    }

    /// Whether the line is a genuine player choice rather than a forced line.
    ///
    /// Voiced player lines are never options.
    pub fn derive_player_option(&self, has_voice_over: bool) -> bool {
        self.is_player()
            && (self.talk_role.name().is_none() || self.show_type == ShowType::ForceSelect)
            && !has_voice_over
    }

    /// Shallow copy marking a re-encounter. Never put the copy back into the walk.
    pub fn recurse_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.recurse_marker = true;
        copy.branches = None;
        copy
    }

    pub fn has_branches(&self) -> bool {
        self.branches.as_ref().is_some_and(|b| !b.is_empty())
    }
}
