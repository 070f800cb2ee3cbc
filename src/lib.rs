//! Dialogue Wikitext: branching dialogue resolution and wiki markup generation.
//!
//! Walks a cyclic graph of dialogue records, synthesizes pseudo-nodes from
//! interaction overlays and codex narration, truncates branches where they
//! reconverge, and renders the result as indentation-sensitive wikitext with
//! a parallel stream of source-line identifiers.

pub mod core;
pub mod schema;
