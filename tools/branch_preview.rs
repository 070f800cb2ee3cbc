/// Branch Preview: resolve and render one conversation from a RON dataset.
///
/// Usage: branch_preview <dataset.ron> <start_id> [--quest <id>] [--config <path>]
///                       [--line-ids] [--tree]
///
///   --quest <id>     quest whose codex and image counters apply (default 0)
///   --config <path>  engine config RON file
///   --line-ids       print the line id next to each rendered line
///   --tree           print the resolved trunk structure instead of wikitext

use dialogue_wikitext::core::cache::ResolutionCache;
use dialogue_wikitext::core::memory::MemoryStore;
use dialogue_wikitext::core::pipeline::DialogueEngine;
use dialogue_wikitext::core::source::Sources;
use dialogue_wikitext::schema::node::{DialogueNode, NodeId, QuestId};
use std::path::Path;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let dataset_path = &args[1];
    let start_id: u64 = args[2].parse().unwrap_or_else(|_| {
        eprintln!("Error: start id must be an integer, got '{}'", args[2]);
        process::exit(1);
    });

    let mut quest_id = 0u32;
    let mut config_path = None;
    let mut show_line_ids = false;
    let mut show_tree = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--quest" if i + 1 < args.len() => {
                i += 1;
                quest_id = args[i].parse().unwrap_or_else(|_| {
                    eprintln!("Error: --quest must be an integer");
                    process::exit(1);
                });
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--line-ids" => show_line_ids = true,
            "--tree" => show_tree = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
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

    let mut builder = DialogueEngine::builder();
    if let Some(ref path) = config_path {
        builder = builder.config_path(Path::new(path));
    }
    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to build engine: {}", e);
            process::exit(1);
        }
    };

    let sources = Sources::from_store(&store);
    let quest_id = QuestId(quest_id);
    let start_id = NodeId(start_id);

    if show_tree {
        let mut cache = ResolutionCache::new();
        match engine.resolve_from_id(&sources, quest_id, start_id, &mut cache) {
            Ok(trunk) => print_tree(&trunk, 0),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let result = match engine.generate(&sources, quest_id, start_id) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    if show_line_ids {
        for (line, id) in result.wikitext.split('\n').zip(&result.line_ids) {
            let id = match id {
                Some(id) => id.node_id.to_string(),
                None => "-".to_string(),
            };
            println!("{:>12}  {}", id, line);
        }
    } else {
        println!("{}", result.wikitext);
    }
}

fn print_tree(trunk: &[DialogueNode], level: usize) {
    let indent = "  ".repeat(level);
    for node in trunk {
        let marker = if node.recurse_marker { " (recurse)" } else { "" };
        let text = node.text().unwrap_or("");
        println!("{}{}{} {}", indent, node.id, marker, text);
        for (n, branch) in node.branches.iter().flatten().enumerate() {
            println!("{}  branch {}:", indent, n + 1);
            print_tree(branch, level + 2);
        }
    }
}

fn print_usage() {
    println!("Usage: branch_preview <dataset.ron> <start_id> [--quest <id>] [--config <path>] [--line-ids] [--tree]");
}
