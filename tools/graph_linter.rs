/// Graph Linter: reports data-quality problems in a dialogue dataset.
///
/// Usage: graph_linter <dataset.ron> [--lang <code>]

use dialogue_wikitext::core::memory::MemoryStore;
use dialogue_wikitext::core::source::TextStore;
use dialogue_wikitext::schema::node::{NodeId, TalkRole};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: graph_linter <dataset.ron> [--lang <code>]");
        process::exit(0);
    }

    let dataset_path = &args[1];
    let mut lang = "EN".to_string();

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--lang" && i + 1 < args.len() {
            i += 1;
            lang = args[i].clone();
        }
        i += 1;
    }

    let store = match MemoryStore::load_from_ron(Path::new(dataset_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("ERROR: Failed to load dataset: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} dialogue nodes", store.len());

    let (errors, warnings) = lint_dataset(&store, &lang);

    println!("\n=== Dialogue Graph Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn lint_dataset(store: &MemoryStore, lang: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Successor links
    for node in store.nodes() {
        for next in &node.successor_ids {
            if *next == node.id {
                warnings.push(format!("node {} lists itself as a successor", node.id));
            } else if store.node(*next).is_none() {
                errors.push(format!("node {} points at missing node {}", node.id, next));
            }
        }

        let has_text = node
            .content_ref
            .and_then(|hash| store.get_text(hash, lang))
            .is_some_and(|t| !t.is_empty());
        if let TalkRole::Unrecognized(role) = &node.talk_role {
            if !has_text && node.custom_payload.is_none() {
                warnings.push(format!(
                    "node {} has unrecognized role '{}' and no text",
                    node.id, role
                ));
            }
        }
        if node.content_ref.is_some() && !has_text {
            warnings.push(format!(
                "node {} has a text reference with no {} text",
                node.id, lang
            ));
        }
    }

    // Interaction files
    let files: FxHashSet<&str> = store
        .overlay_files()
        .map(|f| f.file_name.as_str())
        .collect();
    let mut index: Vec<(&NodeId, &str)> = store
        .overlay_index()
        .iter()
        .map(|(id, r)| (id, r.file_name.as_str()))
        .collect();
    index.sort();
    for (dialog_id, file_name) in index {
        if !files.contains(file_name) {
            errors.push(format!(
                "dialog {} indexed to missing interaction file {}",
                dialog_id, file_name
            ));
        }
    }
    for overlay in store.overlay_files() {
        for entry in overlay.groups.iter().flat_map(|g| g.entries.iter()) {
            for next in entry.next_dialog_ids.iter().flatten() {
                if store.node(*next).is_none() {
                    errors.push(format!(
                        "{}: dialog {} continues to missing node {}",
                        overlay.file_name, entry.dialog_id, next
                    ));
                }
            }
        }
    }

    // Codex chains
    for (quest_id, entries) in store.codex_entries() {
        let by_item: FxHashMap<u32, Option<u32>> = entries
            .iter()
            .map(|e| (e.item_id, e.next_item_id))
            .collect();
        for entry in entries {
            let mut visited = FxHashSet::default();
            let mut next = entry.next_item_id;
            while let Some(item) = next {
                if !visited.insert(item) {
                    errors.push(format!(
                        "quest {} codex chain from item {} loops at item {}",
                        quest_id, entry.item_id, item
                    ));
                    break;
                }
                match by_item.get(&item) {
                    Some(following) => next = *following,
                    None => {
                        warnings.push(format!(
                            "quest {} codex item {} links to missing item {}",
                            quest_id, entry.item_id, item
                        ));
                        break;
                    }
                }
            }
        }
    }

    (errors, warnings)
}
