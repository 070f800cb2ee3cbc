/// Synthetic node generation: images, placeholders, embedded readables and
/// codex narration inserted between real dialogue lines.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::core::config::EngineConfig;
use crate::core::ids::derive_synthetic_id;
use crate::core::quest::{lock_quest, QuestHandle};
use crate::core::source::{ReadableLookup, SourceError};
use crate::schema::codex::CodexGroup;
use crate::schema::node::{CustomPayload, DialogueNode, NodeId, QuestId, ReadableId};
use crate::schema::overlay::{IntermediateAction, UiContext};

/// What synthesis needs to know about the quest being resolved.
pub struct SynthContext<'a> {
    pub quest_id: QuestId,
    pub quest: &'a QuestHandle,
    pub config: &'a EngineConfig,
    pub readables: &'a dyn ReadableLookup,
}

/// Synthetic nodes for the intermediate actions that follow `dialog_id`.
///
/// Each action yields zero or one node, except that a `ShowImage` directly
/// followed by its paired variant yields a single `ImagePair` node for both.
pub fn synthesize_actions(
    ctx: &SynthContext<'_>,
    dialog_id: NodeId,
    actions: &[IntermediateAction],
) -> Result<Vec<DialogueNode>, SourceError> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < actions.len() {
        match &actions[i] {
            IntermediateAction::ShowImage { pic_path, .. } => {
                let paired = match actions.get(i + 1) {
                    Some(IntermediateAction::ShowImage {
                        pic_path: variant,
                        paired_variant: true,
                    }) => Some(variant.as_str()),
                    _ => None,
                };
                out.push(image_node(ctx, pic_path, paired));
                i += if paired.is_some() { 2 } else { 1 };
                continue;
            }
            IntermediateAction::UiTrigger { context, param } => match context {
                UiContext::QuestPictureDialog => {
                    let key = format!("Q{}_Picture_{}_{}", ctx.quest_id, dialog_id, i);
                    out.push(DialogueNode::synthetic(
                        derive_synthetic_id(&key),
                        CustomPayload::FreeformNote {
                            text: ctx.config.picture_placeholder_text.clone(),
                            comment: None,
                        },
                    ));
                }
                UiContext::QuestReadingDialog => {
                    if let Some(node) = readable_node(ctx, dialog_id, *param)? {
                        out.push(node);
                    }
                }
                UiContext::Other(name) => {
                    debug!("ignoring UI trigger {} after dialog {}", name, dialog_id);
                }
            },
            IntermediateAction::Cutscene { cutscene_id } => {
                debug!("cutscene {} after dialog {} has no wiki form", cutscene_id, dialog_id);
            }
            IntermediateAction::VideoPlay { video_name } => {
                debug!("video {} after dialog {} has no wiki form", video_name, dialog_id);
            }
        }
        i += 1;
    }
    Ok(out)
}

fn image_node(ctx: &SynthContext<'_>, pic_path: &str, paired: Option<&str>) -> DialogueNode {
    let mut state = lock_quest(ctx.quest);
    let primary = state.image_ref(ctx.quest_id, image_basename(pic_path));
    let secondary = paired.map(|path| state.image_ref(ctx.quest_id, image_basename(path)));
    drop(state);

    DialogueNode::synthetic(
        derive_synthetic_id(&primary.wiki_name),
        CustomPayload::ImagePair { primary, secondary },
    )
}

fn readable_node(
    ctx: &SynthContext<'_>,
    dialog_id: NodeId,
    param: Option<i64>,
) -> Result<Option<DialogueNode>, SourceError> {
    let Some(id) = param.and_then(|p| u32::try_from(p).ok()).map(ReadableId) else {
        warn!("reading dialog after {} has no usable readable id", dialog_id);
        return Ok(None);
    };
    let Some(readable) = ctx.readables.get_readable(id)? else {
        warn!("readable {} shown after dialog {} not found", id.0, dialog_id);
        return Ok(None);
    };

    lock_quest(ctx.quest).register_readable(id);
    let key = format!("Q{}_Readable_{}", ctx.quest_id, id.0);
    Ok(Some(DialogueNode::synthetic(
        derive_synthetic_id(&key),
        CustomPayload::EmbeddedReadable {
            readable_ref: id,
            paragraphs: readable.paragraphs(),
            title: readable.title,
        },
    )))
}

/// Stable basename of an image path: last segment, extension stripped.
pub fn image_basename(pic_path: &str) -> &str {
    let file = pic_path
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(pic_path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// Travel-log narration that follows `node`, read from the quest's codex.
///
/// Follows the forward chain from the entry matching the node's text while
/// entries are narration. An entry whose text belongs to a black-screen
/// successor is skipped, since that line renders the same beat.
pub fn synthesize_codex(
    quest_id: QuestId,
    codex: &CodexGroup,
    node: &DialogueNode,
    real_successors: &[DialogueNode],
    limit: usize,
) -> Vec<DialogueNode> {
    let mut out = Vec::new();
    let Some(own_entry) = node
        .content_ref
        .and_then(|hash| codex.by_content_hash.get(&hash))
    else {
        return out;
    };

    let mut steps = 0;
    let mut seen = FxHashSet::default();
    seen.insert(own_entry.item_id);
    let mut next = codex.next_of(own_entry);
    while let Some(entry) = next {
        if !entry.content_type.is_narratage() {
            break;
        }
        if !seen.insert(entry.item_id) {
            warn!(
                "codex chain after dialog {} loops back to item {}",
                node.id, entry.item_id
            );
            break;
        }
        steps += 1;
        if steps > limit {
            warn!(
                "codex chain after dialog {} exceeds {} entries, truncating",
                node.id, limit
            );
            break;
        }
        let rendered_as_black_screen = real_successors
            .iter()
            .find(|n| n.content_ref == Some(entry.content_ref))
            .is_some_and(|n| n.is_black_screen());
        if !rendered_as_black_screen {
            let key = format!("Q{}_Codex_{}", quest_id, entry.item_id);
            out.push(DialogueNode::synthetic(
                derive_synthetic_id(&key),
                CustomPayload::TravelLogText {
                    text: entry.content_text.clone(),
                },
            ));
        }
        next = codex.next_of(entry);
    }
    out
}

/// Chain a run of synthetic nodes: each points at the next, the last at `tail`.
pub fn link_run(run: &mut [DialogueNode], tail: Vec<NodeId>) {
    let ids: Vec<NodeId> = run.iter().map(|n| n.id).collect();
    let count = run.len();
    for (i, node) in run.iter_mut().enumerate() {
        node.successor_ids = if i + 1 < count {
            vec![ids[i + 1]]
        } else {
            tail.clone()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quest::QuestRegistry;
    use crate::schema::codex::{CodexContentType, CodexEntry};
    use crate::schema::node::{BlackScreenVariant, TalkRole, TextHash};
    use crate::schema::readable::Readable;

    struct Readables;

    impl ReadableLookup for Readables {
        fn get_readable(&self, id: ReadableId) -> Result<Option<Readable>, SourceError> {
            Ok((id.0 == 300).then(|| Readable {
                id,
                title: "Wanted Poster".to_string(),
                text: "Reward offered.\n\nInquire within.".to_string(),
            }))
        }
    }

    fn image(path: &str, paired_variant: bool) -> IntermediateAction {
        IntermediateAction::ShowImage {
            pic_path: path.to_string(),
            paired_variant,
        }
    }

    #[test]
    fn basename_strips_directories_and_extension() {
        assert_eq!(image_basename("UI/Stills/Q1_Still_A.png"), "Q1_Still_A");
        assert_eq!(image_basename("UI\\Stills\\B.png"), "B");
        assert_eq!(image_basename("plain"), "plain");
        assert_eq!(image_basename(".hidden"), ".hidden");
    }

    #[test]
    fn paired_images_merge_into_one_node() {
        let registry = QuestRegistry::new();
        let quest = registry.quest(QuestId(123));
        let config = EngineConfig::default();
        let ctx = SynthContext {
            quest_id: QuestId(123),
            quest: &quest,
            config: &config,
            readables: &Readables,
        };
        let nodes = synthesize_actions(
            &ctx,
            NodeId(1),
            &[
                image("Stills/A_Boy.png", false),
                image("Stills/A_Girl.png", true),
                image("Stills/B.png", false),
            ],
        )
        .unwrap();

        assert_eq!(nodes.len(), 2);
        match &nodes[0].custom_payload {
            Some(CustomPayload::ImagePair { primary, secondary }) => {
                assert_eq!(primary.wiki_name, "Q123_Still_1");
                assert_eq!(secondary.as_ref().map(|s| s.wiki_name.as_str()), Some("Q123_Still_2"));
            }
            other => panic!("expected image pair, got {:?}", other),
        }
        assert_eq!(nodes[0].id, derive_synthetic_id("Q123_Still_1"));
        assert!(matches!(
            &nodes[1].custom_payload,
            Some(CustomPayload::ImagePair { secondary: None, .. })
        ));
    }

    #[test]
    fn ui_triggers_and_dropped_actions() {
        let registry = QuestRegistry::new();
        let quest = registry.quest(QuestId(7));
        let config = EngineConfig::default();
        let ctx = SynthContext {
            quest_id: QuestId(7),
            quest: &quest,
            config: &config,
            readables: &Readables,
        };
        let nodes = synthesize_actions(
            &ctx,
            NodeId(50),
            &[
                IntermediateAction::UiTrigger {
                    context: UiContext::QuestPictureDialog,
                    param: None,
                },
                IntermediateAction::Cutscene { cutscene_id: 9 },
                IntermediateAction::VideoPlay {
                    video_name: "Intro".to_string(),
                },
                IntermediateAction::UiTrigger {
                    context: UiContext::QuestReadingDialog,
                    param: Some(300),
                },
                IntermediateAction::UiTrigger {
                    context: UiContext::QuestReadingDialog,
                    param: Some(404),
                },
            ],
        )
        .unwrap();

        assert_eq!(nodes.len(), 2);
        assert!(matches!(
            &nodes[0].custom_payload,
            Some(CustomPayload::FreeformNote { text, .. }) if text == "Quest picture"
        ));
        match &nodes[1].custom_payload {
            Some(CustomPayload::EmbeddedReadable { readable_ref, paragraphs, .. }) => {
                assert_eq!(*readable_ref, ReadableId(300));
                assert_eq!(paragraphs.len(), 2);
            }
            other => panic!("expected readable, got {:?}", other),
        }
        assert_eq!(lock_quest(&quest).in_dialogue_readables(), &[ReadableId(300)]);
    }

    fn codex_entry(item_id: u32, next: Option<u32>, hash: u64, ty: CodexContentType) -> CodexEntry {
        CodexEntry {
            item_id,
            next_item_id: next,
            content_ref: TextHash(hash),
            content_text: format!("narration {}", item_id),
            content_type: ty,
        }
    }

    fn line(id: u64, hash: u64, role: TalkRole) -> DialogueNode {
        let mut node = DialogueNode::new(NodeId(id), role);
        node.content_ref = Some(TextHash(hash));
        node.content_text = Some("text".to_string());
        node
    }

    #[test]
    fn codex_chain_stops_at_non_narration_and_skips_black_screens() {
        let codex = CodexGroup::from_entries(vec![
            codex_entry(1, Some(2), 100, CodexContentType::DialogNormal),
            codex_entry(2, Some(3), 200, CodexContentType::Narratage),
            codex_entry(3, Some(4), 300, CodexContentType::IpCustomizedWhole),
            codex_entry(4, Some(5), 400, CodexContentType::DialogNormal),
            codex_entry(5, None, 500, CodexContentType::Narratage),
        ]);
        let node = line(10, 100, TalkRole::MateCompanion);
        let successors = vec![line(11, 300, TalkRole::BlackScreen(BlackScreenVariant::Plain))];

        let run = synthesize_codex(QuestId(1), &codex, &node, &successors, 100);
        assert_eq!(run.len(), 1);
        assert_eq!(run[0].id, derive_synthetic_id("Q1_Codex_2"));
        assert!(matches!(
            &run[0].custom_payload,
            Some(CustomPayload::TravelLogText { text }) if text == "narration 2"
        ));
    }

    #[test]
    fn codex_chain_stops_when_it_loops() {
        let codex = CodexGroup::from_entries(vec![
            codex_entry(1, Some(2), 100, CodexContentType::DialogNormal),
            codex_entry(2, Some(3), 200, CodexContentType::Narratage),
            codex_entry(3, Some(2), 300, CodexContentType::Narratage),
        ]);
        let node = line(10, 100, TalkRole::MateCompanion);
        let run = synthesize_codex(QuestId(1), &codex, &node, &[], 100);
        let ids: Vec<NodeId> = run.iter().map(|n| n.id).collect();
        assert_eq!(
            ids,
            vec![derive_synthetic_id("Q1_Codex_2"), derive_synthetic_id("Q1_Codex_3")]
        );
    }

    #[test]
    fn codex_chain_respects_limit() {
        let mut entries = vec![codex_entry(1, Some(2), 100, CodexContentType::DialogNormal)];
        for item in 2..20 {
            entries.push(codex_entry(item, Some(item + 1), u64::from(item) * 100, CodexContentType::Narratage));
        }
        let codex = CodexGroup::from_entries(entries);
        let node = line(10, 100, TalkRole::MateCompanion);
        let run = synthesize_codex(QuestId(1), &codex, &node, &[], 5);
        assert_eq!(run.len(), 5);
    }

    #[test]
    fn run_links_to_tail() {
        let mut run = vec![
            DialogueNode::synthetic(NodeId(900), CustomPayload::TravelLogText { text: "a".into() }),
            DialogueNode::synthetic(NodeId(901), CustomPayload::TravelLogText { text: "b".into() }),
        ];
        link_run(&mut run, vec![NodeId(2), NodeId(3)]);
        assert_eq!(run[0].successor_ids, vec![NodeId(901)]);
        assert_eq!(run[1].successor_ids, vec![NodeId(2), NodeId(3)]);
    }
}
