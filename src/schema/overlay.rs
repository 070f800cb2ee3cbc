use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Which UI a `UiTrigger` action opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiContext {
    /// A picture the player looks at. No image data is available for it.
    QuestPictureDialog,
    /// A document the player reads; the action parameter is the readable id.
    QuestReadingDialog,
    Other(String),
}

/// The kind of the interaction that owns a dialogue line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Dialog,
    ShowImage,
    UiTrigger(UiContext),
    Cutscene,
    VideoPlay,
}

/// A non-dialogue action run after a line and before the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntermediateAction {
    ShowImage {
        pic_path: String,
        /// Set on the second image of two avatar variants of one still.
        #[serde(default)]
        paired_variant: bool,
    },
    UiTrigger {
        context: UiContext,
        #[serde(default)]
        param: Option<i64>,
    },
    Cutscene { cutscene_id: u32 },
    VideoPlay { video_name: String },
}

/// Maps one dialogue line to what the interaction file says happens around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub dialog_id: NodeId,
    pub kind: ActionKind,
    #[serde(default)]
    pub intermediate: Vec<IntermediateAction>,
    /// When present, replaces the node's own successor list (even if empty).
    #[serde(default)]
    pub next_dialog_ids: Option<Vec<NodeId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionGroup {
    pub group_id: u32,
    #[serde(default)]
    pub next_group_id: Option<u32>,
    #[serde(default)]
    pub entries: Vec<InteractionEntry>,
}

/// A named interaction file: ordered groups of entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionOverlay {
    pub file_name: String,
    #[serde(default)]
    pub groups: Vec<InteractionGroup>,
}

/// Where the overlay for a dialogue id lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayRef {
    pub file_name: String,
    pub group_id: u32,
    pub group_index: usize,
}

impl InteractionOverlay {
    /// The group a reference points at: by index when the id matches there,
    /// otherwise the first group carrying that id.
    pub fn target_group(&self, group_id: u32, group_index: usize) -> Option<&InteractionGroup> {
        match self.groups.get(group_index) {
            Some(group) if group.group_id == group_id => Some(group),
            _ => self.groups.iter().find(|g| g.group_id == group_id),
        }
    }

    /// Find the entry for a dialogue line, searching the target group first.
    pub fn find_entry<'a>(
        &'a self,
        target: Option<&'a InteractionGroup>,
        dialog_id: NodeId,
    ) -> Option<&'a InteractionEntry> {
        if let Some(group) = target {
            if let Some(entry) = group.entries.iter().find(|e| e.dialog_id == dialog_id) {
                return Some(entry);
            }
        }
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .find(|e| e.dialog_id == dialog_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dialog_id: u64, next: Option<Vec<u64>>) -> InteractionEntry {
        InteractionEntry {
            dialog_id: NodeId(dialog_id),
            kind: ActionKind::Dialog,
            intermediate: Vec::new(),
            next_dialog_ids: next.map(|ids| ids.into_iter().map(NodeId).collect()),
        }
    }

    fn overlay() -> InteractionOverlay {
        InteractionOverlay {
            file_name: "Q1001.ron".to_string(),
            groups: vec![
                InteractionGroup {
                    group_id: 10,
                    next_group_id: Some(20),
                    entries: vec![entry(1, Some(vec![2])), entry(5, Some(vec![6]))],
                },
                InteractionGroup {
                    group_id: 20,
                    next_group_id: None,
                    entries: vec![entry(5, Some(vec![7])), entry(9, None)],
                },
            ],
        }
    }

    #[test]
    fn target_group_by_index() {
        let ov = overlay();
        assert_eq!(ov.target_group(20, 1).map(|g| g.group_id), Some(20));
    }

    #[test]
    fn target_group_falls_back_to_id_search() {
        let ov = overlay();
        assert_eq!(ov.target_group(20, 0).map(|g| g.group_id), Some(20));
        assert!(ov.target_group(99, 0).is_none());
    }

    #[test]
    fn find_entry_prefers_target_group() {
        let ov = overlay();
        let target = ov.target_group(20, 1);
        let found = ov.find_entry(target, NodeId(5)).unwrap();
        assert_eq!(found.next_dialog_ids, Some(vec![NodeId(7)]));

        let found = ov.find_entry(None, NodeId(5)).unwrap();
        assert_eq!(found.next_dialog_ids, Some(vec![NodeId(6)]));
    }

    #[test]
    fn find_entry_searches_all_groups() {
        let ov = overlay();
        let target = ov.target_group(10, 0);
        let found = ov.find_entry(target, NodeId(9)).unwrap();
        assert_eq!(found.next_dialog_ids, None);
        assert!(ov.find_entry(target, NodeId(404)).is_none());
    }

    #[test]
    fn ron_intermediate_actions() {
        let input = r#"(
            dialog_id: 1,
            kind: UiTrigger(QuestReadingDialog),
            intermediate: [
                ShowImage(pic_path: "UI/Stills/Q1001_Still_A.png"),
                ShowImage(pic_path: "UI/Stills/Q1001_Still_A_F.png", paired_variant: true),
                UiTrigger(context: QuestReadingDialog, param: Some(300)),
                VideoPlay(video_name: "Intro"),
            ],
            next_dialog_ids: Some([2]),
        )"#;
        let parsed: InteractionEntry = ron::from_str(input).unwrap();
        assert_eq!(parsed.intermediate.len(), 4);
        assert!(matches!(
            &parsed.intermediate[1],
            IntermediateAction::ShowImage { paired_variant: true, .. }
        ));
        assert_eq!(parsed.kind, ActionKind::UiTrigger(UiContext::QuestReadingDialog));
    }
}
