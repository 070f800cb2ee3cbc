/// Text normalization for wiki output.
///
/// Rewrites the placeholders the game embeds in dialogue text:
/// - `{NICKNAME}` → the player placeholder name
/// - `{PLAYERAVATAR#SEXPRO[a|b]}` → `{{MC|m=..|f=..}}`
/// - `{MATEAVATAR#SEXPRO[a|b]}` → `{{MC|m=..|f=..|mc=1}}`
/// - a literal `\n` escape → `<br />`
/// - anything else in braces is kept as written

use log::warn;

use crate::core::config::EngineConfig;
use crate::core::source::ManualTextLookup;

/// One recognized placeholder.
#[derive(Debug, Clone, PartialEq)]
enum Placeholder<'t> {
    Nickname,
    GenderedPair {
        mate: bool,
        first: &'t str,
        second: &'t str,
    },
}

impl<'t> Placeholder<'t> {
    fn parse(content: &'t str) -> Option<Self> {
        if content == "NICKNAME" {
            return Some(Self::Nickname);
        }
        let (avatar, rest) = content.split_once("#SEXPRO[")?;
        let mate = match avatar {
            "PLAYERAVATAR" => false,
            "MATEAVATAR" => true,
            _ => return None,
        };
        let arms = rest.strip_suffix(']')?;
        let (first, second) = arms.split_once('|')?;
        Some(Self::GenderedPair {
            mate,
            first,
            second,
        })
    }
}

/// Normalize one line of dialogue text.
pub fn normalize_text(text: &str, config: &EngineConfig, manual: &dyn ManualTextLookup) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("\\n") {
            out.push_str("<br />");
            rest = after;
            continue;
        }
        if rest.starts_with('{') {
            if let Some(end) = rest.find('}') {
                if let Some(placeholder) = Placeholder::parse(&rest[1..end]) {
                    out.push_str(&expand(&placeholder, config, manual));
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn expand(placeholder: &Placeholder<'_>, config: &EngineConfig, manual: &dyn ManualTextLookup) -> String {
    match placeholder {
        Placeholder::Nickname => config.player_placeholder.clone(),
        Placeholder::GenderedPair {
            mate,
            first,
            second,
        } => {
            let (male_key, female_key) = if first.contains("FEMALE") {
                (*second, *first)
            } else {
                (*first, *second)
            };
            let male = arm_text(male_key, config, manual);
            let female = arm_text(female_key, config, manual);
            let extra = if *mate { "|mc=1" } else { "" };
            format!("{{{{MC|m={}|f={}{}}}}}", male, female, extra)
        }
    }
}

fn arm_text(key: &str, config: &EngineConfig, manual: &dyn ManualTextLookup) -> String {
    match manual.manual_text(key, &config.lang_code) {
        Some(text) => text,
        None => {
            warn!("no manual text for gendered placeholder key {}", key);
            key.to_string()
        }
    }
}
