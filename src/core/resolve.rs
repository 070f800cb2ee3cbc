/// Branch resolution: walks the dialogue graph from a start line and
/// produces the trunk, with alternatives attached at branch points.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::cache::ResolutionCache;
use crate::core::config::EngineConfig;
use crate::core::ids::is_synthetic;
use crate::core::overlay::OverlayCache;
use crate::core::quest::QuestHandle;
use crate::core::source::{SourceError, Sources};
use crate::core::synth::{link_run, synthesize_actions, synthesize_codex, SynthContext};
use crate::schema::codex::CodexGroup;
use crate::schema::node::{DialogueNode, NodeId, QuestId};
use crate::schema::overlay::ActionKind;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

/// Resolves trunks for one quest.
///
/// Holds the quest's codex group, fetched once, and borrows everything else
/// from the engine and the caller.
pub struct Resolver<'a> {
    sources: Sources<'a>,
    config: &'a EngineConfig,
    overlays: &'a OverlayCache,
    quest_id: QuestId,
    quest: QuestHandle,
    codex: CodexGroup,
}

impl<'a> Resolver<'a> {
    pub fn new(
        sources: Sources<'a>,
        config: &'a EngineConfig,
        overlays: &'a OverlayCache,
        quest_id: QuestId,
        quest: QuestHandle,
    ) -> Result<Self, ResolveError> {
        let codex = sources.codex.get_codex_group(quest_id)?;
        Ok(Self {
            sources,
            config,
            overlays,
            quest_id,
            quest,
            codex,
        })
    }

    /// Resolve localized text, the speaker name and the option flag.
    pub fn hydrate(&self, node: &mut DialogueNode) {
        let lang = self.config.lang_code.as_str();
        if node.content_text.is_none() {
            node.content_text = node
                .content_ref
                .and_then(|hash| self.sources.text.get_text(hash, lang));
        }
        if node.talk_role.name().is_none() {
            if let Some(name) = node
                .talk_role
                .name_ref()
                .and_then(|hash| self.sources.text.get_text(hash, lang))
                .filter(|name| !name.is_empty())
            {
                node.talk_role.set_name_if_missing(name);
            }
        }
        node.player_option = node.derive_player_option(self.sources.voice.has_voice_items(node.id));
    }

    /// Resolve the trunk starting at `start`.
    ///
    /// `cache` is scoped to one top-level call. Resolving the same start
    /// again with the same cache returns the memoized trunk.
    pub fn resolve(
        &self,
        start: &DialogueNode,
        cache: &mut ResolutionCache,
        debug_tag: &str,
    ) -> Result<Vec<DialogueNode>, ResolveError> {
        let mut start = start.clone();
        if !start.recurse_marker {
            self.hydrate(&mut start);
        }
        self.resolve_at(start, cache, debug_tag, 0)
    }

    fn resolve_at(
        &self,
        start: DialogueNode,
        cache: &mut ResolutionCache,
        tag: &str,
        depth: usize,
    ) -> Result<Vec<DialogueNode>, ResolveError> {
        let start_id = start.id;
        if let Some(trunk) = cache.memoized(start_id) {
            debug!("[dialog:{}] branch for {} (already seen)", tag, start_id);
            return Ok(trunk.to_vec());
        }
        debug!("[dialog:{}] selecting branch for {}", tag, start_id);

        let mut trunk: Vec<DialogueNode> = Vec::new();
        let mut current = Some(start);
        let mut start_recurred = false;

        while let Some(mut node) = current.take() {
            if node.recurse_marker || cache.has_visited(node.id) {
                start_recurred = trunk.is_empty() && node.id == start_id;
                trunk.push(node.recurse_copy());
                break;
            }
            cache.mark_visited(node.id);

            let entry = self.overlays.entry_for(self.sources.overlays, node.id)?;
            if let Some(entry) = &entry {
                if entry.kind == ActionKind::Dialog && node.is_player() {
                    node.player_option = false;
                }
                if let Some(next) = &entry.next_dialog_ids {
                    node.successor_ids = next.clone();
                }
            }

            let mut successors = self.fetch_successors(&node.successor_ids)?;

            let mut run = match &entry {
                Some(entry) if !entry.intermediate.is_empty() => {
                    let ctx = SynthContext {
                        quest_id: self.quest_id,
                        quest: &self.quest,
                        config: self.config,
                        readables: self.sources.readables,
                    };
                    synthesize_actions(&ctx, node.id, &entry.intermediate)?
                }
                _ => Vec::new(),
            };
            run.extend(synthesize_codex(
                self.quest_id,
                &self.codex,
                &node,
                &successors,
                self.config.codex_chain_limit,
            ));
            if !run.is_empty() {
                link_run(&mut run, successors.iter().map(|n| n.id).collect());
                for synthetic in &run {
                    cache.mark_visited(synthetic.id);
                }
            }

            if successors.len() < 2 {
                if node.has_renderable_content() {
                    trunk.push(node);
                }
                trunk.extend(run);
                current = successors.pop();
                continue;
            }

            // Branch point. The node carries its branches even when it renders
            // nothing; its synthetic run follows it in the trunk.
            let branch_point = node.id;

            if depth >= self.config.max_branch_depth {
                warn!(
                    "[dialog:{}] branch nesting at {} exceeds {}, not expanding",
                    tag, branch_point, self.config.max_branch_depth
                );
                node.branches = Some(
                    successors
                        .iter()
                        .map(|successor| vec![successor.recurse_copy()])
                        .collect(),
                );
                trunk.push(node);
                trunk.extend(run);
                break;
            }

            let child_tag = format!("{}:{}", tag, branch_point);
            let mut branches = Vec::with_capacity(successors.len());
            for successor in successors {
                let mut fork = cache.fork();
                branches.push(self.resolve_at(successor, &mut fork, &child_tag, depth + 1)?);
            }

            let rejoin = self.find_rejoin(&branches, &child_tag);
            let next = rejoin.and_then(|rejoin_id| truncate_at_rejoin(&mut branches, rejoin_id));
            if let Some(rejoin) = &next {
                debug!("[dialog:{}] branches of {} rejoin at {}", tag, branch_point, rejoin.id);
            }
            node.branches = Some(branches);
            trunk.push(node);
            trunk.extend(run);
            current = next;
        }

        if !start_recurred {
            cache.memoize(start_id, trunk.clone());
        }
        Ok(trunk)
    }

    /// Fetch and hydrate successors, keeping listed order and dropping lines
    /// with nothing to render.
    fn fetch_successors(&self, ids: &[NodeId]) -> Result<Vec<DialogueNode>, ResolveError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut seen = FxHashSet::default();
        let unique: Vec<NodeId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut nodes = self.sources.dialogue.fetch_nodes(&unique)?;
        for node in &mut nodes {
            self.hydrate(node);
        }
        nodes.retain(|n| n.has_renderable_content());
        Ok(nodes)
    }

    /// The first line of the first branch that every other branch also
    /// reaches. Player options, synthetic lines and recursion markers never
    /// qualify.
    fn find_rejoin(&self, branches: &[Vec<DialogueNode>], tag: &str) -> Option<NodeId> {
        let (first, rest) = branches.split_first()?;
        if rest.is_empty() {
            return None;
        }

        let mut examined = 0;
        for candidate in first {
            if candidate.recurse_marker || candidate.player_option || is_synthetic(candidate.id) {
                continue;
            }
            examined += 1;
            if examined > self.config.rejoin_search_limit {
                warn!(
                    "[dialog:{}] rejoin search gave up after {} candidates",
                    tag, self.config.rejoin_search_limit
                );
                return None;
            }
            let shared = rest.iter().all(|branch| {
                branch
                    .iter()
                    .any(|n| n.id == candidate.id && !n.recurse_marker)
            });
            if shared {
                return Some(candidate.id);
            }
        }
        None
    }
}

/// Cut every branch just before the rejoin line and return the line the
/// trunk continues from.
fn truncate_at_rejoin(branches: &mut [Vec<DialogueNode>], rejoin_id: NodeId) -> Option<DialogueNode> {
    let mut rejoin = None;
    for branch in branches.iter_mut() {
        let Some(position) = branch
            .iter()
            .position(|n| n.id == rejoin_id && !n.recurse_marker)
        else {
            continue;
        };
        let mut cut = branch.split_off(position);
        if rejoin.is_none() && !cut.is_empty() {
            let mut node = cut.swap_remove(0);
            node.branches = None;
            rejoin = Some(node);
        }
    }
    rejoin
}
