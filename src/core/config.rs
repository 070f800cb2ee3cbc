/// Engine configuration, loadable from RON.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output language for localized text lookups.
    pub lang_code: String,
    /// Maximum rejoin candidates examined at one branch point.
    pub rejoin_search_limit: usize,
    /// Maximum codex entries followed from one dialogue line.
    pub codex_chain_limit: usize,
    /// Nesting depth past which a branch point is left unexpanded.
    pub max_branch_depth: usize,
    pub player_placeholder: String,
    pub sibling_placeholder: String,
    pub unknown_speaker_placeholder: String,
    pub return_note: String,
    pub picture_placeholder_text: String,
    /// In-game option icon key to wiki icon key.
    pub option_icons: FxHashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lang_code: "EN".to_string(),
            rejoin_search_limit: 100,
            codex_chain_limit: 100,
            max_branch_depth: 64,
            player_placeholder: "(Traveler)".to_string(),
            sibling_placeholder: "(Traveler's Sibling)".to_string(),
            unknown_speaker_placeholder: "Cutscene_Character_Replace_me".to_string(),
            return_note: "(Return to dialogue option)".to_string(),
            picture_placeholder_text: "Quest picture".to_string(),
            option_icons: FxHashMap::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// The `{{DIcon}}` template for an option, with its icon when mapped.
    pub fn dicon(&self, option_icon: Option<&str>) -> String {
        match option_icon
            .and_then(|key| self.option_icons.get(key))
            .filter(|wiki_key| !wiki_key.is_empty())
        {
            Some(wiki_key) => format!("{{{{DIcon|{}}}}}", wiki_key),
            None => "{{DIcon}}".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EngineConfig::parse_ron(r#"(lang_code: "CHS", rejoin_search_limit: 5)"#).unwrap();
        assert_eq!(config.lang_code, "CHS");
        assert_eq!(config.rejoin_search_limit, 5);
        assert_eq!(config.codex_chain_limit, 100);
        assert_eq!(config.return_note, "(Return to dialogue option)");
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(EngineConfig::parse_ron("()").unwrap(), EngineConfig::default());
    }

    #[test]
    fn dicon_with_and_without_icon() {
        let mut config = EngineConfig::default();
        config.option_icons.insert("ICON_SHOP".to_string(), "Shop".to_string());
        config.option_icons.insert("ICON_EMPTY".to_string(), String::new());

        assert_eq!(config.dicon(None), "{{DIcon}}");
        assert_eq!(config.dicon(Some("ICON_SHOP")), "{{DIcon|Shop}}");
        assert_eq!(config.dicon(Some("ICON_EMPTY")), "{{DIcon}}");
        assert_eq!(config.dicon(Some("ICON_UNKNOWN")), "{{DIcon}}");
    }

    #[test]
    fn bad_ron_is_an_error() {
        assert!(matches!(
            EngineConfig::parse_ron("(lang_code: 5)"),
            Err(ConfigError::Ron(_))
        ));
    }
}
