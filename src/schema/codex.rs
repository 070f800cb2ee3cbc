use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::node::TextHash;

/// How a codex entry's text is presented in the travel log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodexContentType {
    Aside,
    DialogNormal,
    IpCustomizedWhole,
    Narratage,
}

impl CodexContentType {
    /// Narration that has no dialogue line of its own.
    pub fn is_narratage(&self) -> bool {
        matches!(self, Self::Narratage | Self::IpCustomizedWhole)
    }
}

/// One travel-log entry. Entries form forward chains via `next_item_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexEntry {
    pub item_id: u32,
    #[serde(default)]
    pub next_item_id: Option<u32>,
    pub content_ref: TextHash,
    pub content_text: String,
    pub content_type: CodexContentType,
}

/// All codex entries of one quest, indexed both ways.
#[derive(Debug, Clone, Default)]
pub struct CodexGroup {
    pub by_content_hash: FxHashMap<TextHash, CodexEntry>,
    pub by_item_id: FxHashMap<u32, CodexEntry>,
}

impl CodexGroup {
    pub fn from_entries(entries: impl IntoIterator<Item = CodexEntry>) -> Self {
        let mut group = Self::default();
        for entry in entries {
            group.by_content_hash.insert(entry.content_ref, entry.clone());
            group.by_item_id.insert(entry.item_id, entry);
        }
        group
    }

    pub fn is_empty(&self) -> bool {
        self.by_item_id.is_empty()
    }

    /// The entry following `entry` in its chain.
    pub fn next_of(&self, entry: &CodexEntry) -> Option<&CodexEntry> {
        entry.next_item_id.and_then(|id| self.by_item_id.get(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(item_id: u32, next: Option<u32>, hash: u64, ty: CodexContentType) -> CodexEntry {
        CodexEntry {
            item_id,
            next_item_id: next,
            content_ref: TextHash(hash),
            content_text: format!("entry {}", item_id),
            content_type: ty,
        }
    }

    #[test]
    fn narratage_types() {
        assert!(CodexContentType::Narratage.is_narratage());
        assert!(CodexContentType::IpCustomizedWhole.is_narratage());
        assert!(!CodexContentType::DialogNormal.is_narratage());
        assert!(!CodexContentType::Aside.is_narratage());
    }

    #[test]
    fn group_indexes_both_ways() {
        let group = CodexGroup::from_entries(vec![
            entry(1, Some(2), 100, CodexContentType::DialogNormal),
            entry(2, None, 200, CodexContentType::Narratage),
        ]);
        assert!(!group.is_empty());
        let first = &group.by_content_hash[&TextHash(100)];
        assert_eq!(first.item_id, 1);
        let next = group.next_of(first).unwrap();
        assert_eq!(next.item_id, 2);
        assert!(group.next_of(next).is_none());
    }
}
