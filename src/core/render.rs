/// Wikitext rendering of resolved trunks.
///
/// Produces the text together with a parallel stream of line ids, one per
/// output line, so callers can map lines back to the records they came from.

use log::warn;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::ids::is_synthetic;
use crate::core::placeholder::normalize_text;
use crate::core::source::{ManualTextLookup, VoiceOverLookup};
use crate::schema::node::{CustomPayload, DialogueNode, NodeId, TalkRole, TextHash};

/// The source record behind one rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineId {
    pub node_id: NodeId,
    #[serde(default)]
    pub content_ref: Option<TextHash>,
}

impl LineId {
    pub fn of(node: &DialogueNode) -> Self {
        Self {
            node_id: node.id,
            content_ref: node.content_ref,
        }
    }
}

/// Rendered wikitext and its line ids.
///
/// `line_ids` has one entry per line of `wikitext`; `None` marks blank and
/// continuation lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikitextResult {
    pub wikitext: String,
    pub line_ids: Vec<Option<LineId>>,
}

impl WikitextResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.wikitext.is_empty() && self.line_ids.is_empty()
    }

    /// Add a single line.
    pub fn push_line(&mut self, line: &str, id: Option<LineId>) {
        self.append(WikitextResult {
            wikitext: line.to_string(),
            line_ids: vec![id],
        });
    }

    pub fn append(&mut self, other: WikitextResult) {
        if other.line_ids.is_empty() && other.wikitext.is_empty() {
            return;
        }
        if !self.wikitext.is_empty() || !self.line_ids.is_empty() {
            self.wikitext.push('\n');
        }
        self.wikitext.push_str(&other.wikitext);
        self.line_ids.extend(other.line_ids);
    }

    pub fn append_empty_line(&mut self) {
        self.wikitext.push('\n');
        self.line_ids.push(None);
    }

    /// Append raw text; each newline it contains starts an id-less line.
    pub fn append_freeform(&mut self, text: &str) {
        self.wikitext.push_str(text);
        let breaks = text.matches('\n').count();
        self.line_ids.extend(std::iter::repeat(None).take(breaks));
    }

    pub fn prepend(&mut self, other: WikitextResult) {
        if other.line_ids.is_empty() && other.wikitext.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other;
            return;
        }
        let mut wikitext = other.wikitext;
        wikitext.push('\n');
        wikitext.push_str(&self.wikitext);
        self.wikitext = wikitext;

        let mut line_ids = other.line_ids;
        line_ids.append(&mut self.line_ids);
        self.line_ids = line_ids;
    }

    pub fn prepend_freeform(&mut self, text: &str) {
        self.wikitext.insert_str(0, text);
        let breaks = text.matches('\n').count();
        let mut line_ids = vec![None; breaks];
        line_ids.append(&mut self.line_ids);
        self.line_ids = line_ids;
    }
}

fn colons(count: usize) -> String {
    ":".repeat(count)
}

/// Renders trunks with the engine's placeholders and the voice-over source.
pub struct Renderer<'a> {
    config: &'a EngineConfig,
    voice: &'a dyn VoiceOverLookup,
    manual: &'a dyn ManualTextLookup,
}

impl<'a> Renderer<'a> {
    pub fn new(
        config: &'a EngineConfig,
        voice: &'a dyn VoiceOverLookup,
        manual: &'a dyn ManualTextLookup,
    ) -> Self {
        Self {
            config,
            voice,
            manual,
        }
    }

    /// Render a top-level trunk.
    pub fn render_trunk(&self, trunk: &[DialogueNode], depth: usize) -> WikitextResult {
        self.render(trunk, depth, None, false, &mut FxHashSet::default())
    }

    /// Render one trunk at `depth`.
    ///
    /// `originator` is the node whose branch this trunk is, and
    /// `visited_branch_starts` collects the first line of every branch
    /// rendered so far at this level, so a branch already shown is replaced
    /// by a return note.
    pub fn render(
        &self,
        trunk: &[DialogueNode],
        depth: usize,
        originator: Option<&DialogueNode>,
        originator_is_first_of_branch: bool,
        visited_branch_starts: &mut FxHashSet<NodeId>,
    ) -> WikitextResult {
        let mut out = WikitextResult::new();
        let mut depth = depth;
        let mut previous: Option<&DialogueNode> = None;
        let mut previous_option_indent: Option<usize> = None;

        if let Some(first) = trunk.first() {
            visited_branch_starts.insert(first.id);
        }

        let mut i = 0;
        while i < trunk.len() {
            let node = &trunk[i];
            let index = i;
            let dicon_indent = if index == 0 && node.is_player() {
                if originator.is_some_and(|o| o.is_player()) && !originator_is_first_of_branch {
                    depth += 1;
                    depth - 1
                } else {
                    depth.saturating_sub(1).max(1)
                }
            } else {
                depth
            };
            let prefix = colons(depth);

            let chained = previous.is_some_and(|prev| is_chained_option(prev, node));
            let option_indent = match previous_option_indent {
                Some(prev_indent) if chained => prev_indent + 1,
                _ => dicon_indent,
            };
            previous_option_indent = (node.player_option && !node.recurse_marker).then_some(option_indent);

            if node.recurse_marker {
                let indent = if node.is_player() {
                    dicon_indent
                } else {
                    dicon_indent.saturating_sub(1)
                };
                out.push_line(&format!("{};{}", colons(indent), self.config.return_note), None);
            } else {
                self.render_line(&mut out, node, &prefix, option_indent);
            }

            let mut last = node;
            if node.has_branches() {
                // The branch point's synthetic run renders before its branches.
                while let Some(next) = trunk
                    .get(i + 1)
                    .filter(|n| is_synthetic(n.id) && !n.has_branches())
                {
                    self.render_line(&mut out, next, &prefix, depth);
                    last = next;
                    i += 1;
                }

                let branches = node.branches.as_deref().unwrap_or_default();
                let mut level_starts = visited_branch_starts.clone();
                for head in branches.iter().filter_map(|b| b.first()) {
                    level_starts.insert(head.id);
                }

                let mut included = 0;
                let mut excluded = 0;
                for branch in branches {
                    let Some(head) = branch.first() else {
                        continue;
                    };
                    if visited_branch_starts.contains(&head.id) {
                        excluded += 1;
                        continue;
                    }
                    included += 1;
                    out.append(self.render(branch, depth + 1, Some(node), index == 0, &mut level_starts));
                }
                if included == 0 && excluded > 0 {
                    out.push_line(&format!("{};{}", colons(dicon_indent), self.config.return_note), None);
                }
            }

            previous = Some(last);
            i += 1;
        }
        out
    }

    fn render_line(&self, out: &mut WikitextResult, node: &DialogueNode, prefix: &str, option_indent: usize) {
        let id = Some(LineId::of(node));

        if let Some(payload) = &node.custom_payload {
            match payload {
                CustomPayload::TravelLogText { text } => {
                    let text = self.norm(text);
                    out.push_line(&format!("{}{{{{Color|menu|{}}}}}", prefix, text), id);
                }
                CustomPayload::ImagePair { primary, secondary } => {
                    out.push_line("<gallery>", id);
                    out.push_line(&format!("{}.png", primary.wiki_name), None);
                    if let Some(secondary) = secondary {
                        out.push_line(&format!("{}.png", secondary.wiki_name), None);
                    }
                    out.push_line("</gallery>", None);
                }
                CustomPayload::FreeformNote { text, comment } => {
                    let mut line = format!("{}{{{{Dialogue Note|{}}}}}", prefix, text);
                    if let Some(comment) = comment {
                        line.push_str(&format!(" <!-- {} -->", comment));
                    }
                    out.push_line(&line, id);
                }
                CustomPayload::EmbeddedReadable { paragraphs, .. } => {
                    for (n, paragraph) in paragraphs.iter().enumerate() {
                        let line_id = if n == 0 { id } else { None };
                        out.push_line(&format!("{}:{}", prefix, self.norm(paragraph)), line_id);
                    }
                }
            }
            return;
        }

        let Some(raw) = node.text() else {
            if let TalkRole::Unrecognized(role) = &node.talk_role {
                warn!("dialog {} has unrecognized role {} and no text", node.id, role);
            }
            return;
        };
        let text = self.norm(raw);
        let vo = self.voice.vo_prefix(node.id);

        let line = match &node.talk_role {
            TalkRole::BlackScreen(_) => format!("{}{{{{Black Screen|{}{}}}}}", prefix, vo, text),
            TalkRole::Player { name, .. } => {
                if node.player_option {
                    let dicon = self.config.dicon(node.option_icon.as_deref());
                    format!("{}{} {}", colons(option_indent), dicon, text)
                } else {
                    let name = match name {
                        Some(name) => self.norm(name),
                        None => self.config.player_placeholder.clone(),
                    };
                    format!("{}{}'''{}:''' {}", prefix, vo, name, text)
                }
            }
            TalkRole::NonPlayerCharacter { name, .. } | TalkRole::Gadget { name, .. } => {
                let name = match name {
                    Some(name) => self.norm(name),
                    None => self.config.unknown_speaker_placeholder.clone(),
                };
                format!("{}{}'''{}:''' {}", prefix, vo, name, text)
            }
            TalkRole::MateCompanion => {
                format!("{}{}'''{}:''' {}", prefix, vo, self.config.sibling_placeholder, text)
            }
            TalkRole::CustomWiki => {
                format!("{}:'''{}:''' {}", prefix, self.config.unknown_speaker_placeholder, text)
            }
            TalkRole::Unrecognized(role) => {
                warn!("dialog {} has unrecognized role {}", node.id, role);
                format!("{}:'''{}:''' {}", prefix, self.config.unknown_speaker_placeholder, text)
            }
        };
        out.push_line(&line, id);
    }

    fn norm(&self, text: &str) -> String {
        normalize_text(text, self.config, self.manual)
    }
}

/// Whether `node` is an option that directly follows the option `prev`,
/// rather than one of several options offered together.
fn is_chained_option(prev: &DialogueNode, node: &DialogueNode) -> bool {
    if !prev.player_option || !node.player_option || prev.recurse_marker || node.recurse_marker {
        return false;
    }
    if !prev.successor_ids.contains(&node.id) {
        return false;
    }
    prev.successor_ids.len() == 1
        || prev.branches.as_ref().is_some_and(|branches| {
            branches
                .iter()
                .filter_map(|b| b.first())
                .all(|head| head.player_option)
        })
}
