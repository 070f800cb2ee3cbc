pub mod codex;
pub mod node;
pub mod overlay;
pub mod readable;
