/// The dialogue pipeline: start line → resolved trunk → wikitext.
///
/// Owns the state that outlives single calls (quest counters, loaded
/// interaction files) and wires resolution and rendering together.

use log::{debug, info};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::cache::ResolutionCache;
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::overlay::OverlayCache;
use crate::core::quest::{QuestHandle, QuestRegistry};
use crate::core::render::{Renderer, WikitextResult};
use crate::core::resolve::{ResolveError, Resolver};
use crate::core::source::{SourceError, Sources};
use crate::schema::node::{DialogueNode, NodeId, QuestId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("start node not found: {0}")]
    StartNodeNotFound(NodeId),
}

/// The top-level dialogue engine. Built via `DialogueEngine::builder()`.
///
/// Safe to share between threads; calls for different quests only share the
/// interaction-file cache.
pub struct DialogueEngine {
    config: EngineConfig,
    quests: QuestRegistry,
    overlays: OverlayCache,
}

/// Builder for constructing a `DialogueEngine`.
pub struct DialogueEngineBuilder {
    config_path: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            config_path: None,
            config: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The state kept for a quest across calls.
    pub fn quest_state(&self, quest_id: QuestId) -> QuestHandle {
        self.quests.quest(quest_id)
    }

    fn resolver<'a>(
        &'a self,
        sources: &Sources<'a>,
        quest_id: QuestId,
    ) -> Result<Resolver<'a>, ResolveError> {
        Resolver::new(
            *sources,
            &self.config,
            &self.overlays,
            quest_id,
            self.quests.quest(quest_id),
        )
    }

    /// Resolve the trunk starting at `start` for a quest.
    ///
    /// `cache` belongs to one top-level call; pass a fresh one per call
    /// unless repeated starts should hit the memo.
    pub fn resolve(
        &self,
        sources: &Sources<'_>,
        quest_id: QuestId,
        start: &DialogueNode,
        cache: &mut ResolutionCache,
    ) -> Result<Vec<DialogueNode>, ResolveError> {
        let resolver = self.resolver(sources, quest_id)?;
        resolver.resolve(start, cache, "any")
    }

    /// Fetch the start line by id, then resolve from it.
    pub fn resolve_from_id(
        &self,
        sources: &Sources<'_>,
        quest_id: QuestId,
        start_id: NodeId,
        cache: &mut ResolutionCache,
    ) -> Result<Vec<DialogueNode>, EngineError> {
        let start = sources
            .dialogue
            .fetch_node(start_id)?
            .ok_or(EngineError::StartNodeNotFound(start_id))?;
        Ok(self.resolve(sources, quest_id, &start, cache)?)
    }

    /// Render a resolved trunk at `depth`.
    pub fn render(&self, sources: &Sources<'_>, trunk: &[DialogueNode], depth: usize) -> WikitextResult {
        Renderer::new(&self.config, sources.voice, sources.manual_text).render_trunk(trunk, depth)
    }

    /// Resolve from a start id with a fresh cache and render the result.
    ///
    /// Renders one level deeper when the conversation opens on a player line,
    /// so its options sit under the line that leads into them.
    pub fn generate(
        &self,
        sources: &Sources<'_>,
        quest_id: QuestId,
        start_id: NodeId,
    ) -> Result<WikitextResult, EngineError> {
        let mut cache = ResolutionCache::new();
        let trunk = self.resolve_from_id(sources, quest_id, start_id, &mut cache)?;
        let depth = if trunk.first().is_some_and(|n| n.is_player()) { 2 } else { 1 };
        debug!(
            "generated {} trunk lines from {} ({} nodes visited)",
            trunk.len(),
            start_id,
            cache.visited_count()
        );
        Ok(self.render(sources, &trunk, depth))
    }

    /// Render every conversation a speaker opens.
    ///
    /// Conversation starts are the speaker's lines that no other line of the
    /// same speaker leads into. Starts already covered by an earlier
    /// conversation are skipped.
    pub fn generate_for_role(
        &self,
        sources: &Sources<'_>,
        quest_id: QuestId,
        role_id: u32,
    ) -> Result<Vec<WikitextResult>, EngineError> {
        let nodes = sources.dialogue.fetch_nodes_by_role(role_id)?;
        let targets: FxHashSet<NodeId> = nodes
            .iter()
            .flat_map(|n| n.successor_ids.iter().copied())
            .collect();

        let resolver = self.resolver(sources, quest_id)?;
        let mut covered = ResolutionCache::new();
        let mut results = Vec::new();
        for start in nodes.iter().filter(|n| !targets.contains(&n.id)) {
            if covered.has_visited(start.id) {
                continue;
            }
            let mut cache = ResolutionCache::new();
            let trunk = resolver.resolve(start, &mut cache, &format!("role{}", role_id))?;
            for node in &trunk {
                mark_covered(&mut covered, node);
            }
            let depth = if trunk.first().is_some_and(|n| n.is_player()) { 2 } else { 1 };
            results.push(self.render(sources, &trunk, depth));
        }
        info!(
            "rendered {} conversations for role {}",
            results.len(),
            role_id
        );
        Ok(results)
    }
}

fn mark_covered(covered: &mut ResolutionCache, node: &DialogueNode) {
    covered.mark_visited(node.id);
    for branch in node.branches.iter().flatten() {
        for child in branch {
            mark_covered(covered, child);
        }
    }
}

impl DialogueEngineBuilder {
    pub fn config_path(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// A direct config wins over a config path.
    pub fn build(self) -> Result<DialogueEngine, EngineError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };

        Ok(DialogueEngine {
            config,
            quests: QuestRegistry::new(),
            overlays: OverlayCache::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;

    const DATASET: &str = r#"(
        nodes: [
            (id: 1, talk_role: Player(), content_ref: Some(1), successor_ids: [2]),
            (id: 2, talk_role: NonPlayerCharacter(npc_id: 9, name: Some("Katheryne")), content_ref: Some(2), successor_ids: [3, 4]),
            (id: 3, talk_role: Player(), content_ref: Some(3)),
            (id: 4, talk_role: Player(), content_ref: Some(4)),
        ],
        text: { "EN": { 1: "Hello.", 2: "Ad astra abyssosque!", 3: "Bye.", 4: "Commission?" } },
    )"#;

    #[test]
    fn builder_defaults() {
        let engine = DialogueEngine::builder().build().unwrap();
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn builder_reports_missing_config_file() {
        let result = DialogueEngine::builder()
            .config_path(Path::new("does/not/exist.ron"))
            .build();
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Io(_)))));
    }

    #[test]
    fn generate_opening_player_line_renders_deeper() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        let sources = Sources::from_store(&store);
        let engine = DialogueEngine::builder().build().unwrap();

        let result = engine.generate(&sources, QuestId(1), NodeId(1)).unwrap();
        assert_eq!(
            result.wikitext,
            ":{{DIcon}} Hello.\n::'''Katheryne:''' Ad astra abyssosque!\n::{{DIcon}} Bye.\n::{{DIcon}} Commission?"
        );
        assert_eq!(result.line_ids.len(), 4);
    }

    #[test]
    fn generate_missing_start() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        let sources = Sources::from_store(&store);
        let engine = DialogueEngine::builder().build().unwrap();
        assert!(matches!(
            engine.generate(&sources, QuestId(1), NodeId(99)),
            Err(EngineError::StartNodeNotFound(NodeId(99)))
        ));
    }

    #[test]
    fn generate_for_role_finds_conversation_starts() {
        let store = MemoryStore::parse_ron(DATASET).unwrap();
        let sources = Sources::from_store(&store);
        let engine = DialogueEngine::builder().build().unwrap();
        let results = engine.generate_for_role(&sources, QuestId(1), 9).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].wikitext.starts_with(":'''Katheryne:'''"));
    }
}
