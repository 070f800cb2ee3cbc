use serde::{Deserialize, Serialize};

use super::node::ReadableId;

/// A readable document (book page, letter, note) in the output language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readable {
    pub id: ReadableId,
    pub title: String,
    /// Body text. Paragraphs are separated by blank lines.
    pub text: String,
}

impl Readable {
    /// Non-empty paragraphs, trimmed.
    pub fn paragraphs(&self) -> Vec<String> {
        self.text
            .split("\n\n")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect()
    }
}
