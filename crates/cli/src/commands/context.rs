//! `akyuu context`: Assemble a prompt from a story file.

use std::path::{Path, PathBuf};

use akyuu_context::{AssembledContext, ContextEntry, LoreSource, Lorebook};
use akyuu_story::{Story, TextKind};
use tracing::{debug, info};

use super::{load_config, load_tokenizer};

pub struct ContextArgs {
    pub story: PathBuf,
    pub lorebook: Option<PathBuf>,
    pub memory: Option<String>,
    pub note: Option<String>,
    pub max_tokens: Option<usize>,
    pub no_preamble: bool,
    pub report: bool,
}

pub async fn run(
    config_path: Option<&Path>,
    args: ContextArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let tokenizer = load_tokenizer(&config.tokenizer)?;

    let mut story = read_story(&args.story)?;
    if let Some(memory) = args.memory {
        story.set_memory(memory);
    }
    if let Some(note) = args.note {
        story.set_authors_note(&note);
    }
    if args.no_preamble || !config.context.preamble {
        story.metadata.context_preamble = false;
    }

    let lorebook_path = args
        .lorebook
        .or_else(|| story.metadata.lorebook.as_ref().map(PathBuf::from))
        .or_else(|| config.context.lorebook.clone());
    let lore: Vec<ContextEntry> = match &lorebook_path {
        Some(path) => Lorebook::from_path(path)?.entries()?,
        None => Vec::new(),
    };
    debug!(entries = lore.len(), "Lore loaded");

    let max_tokens = args.max_tokens.unwrap_or(config.context.max_tokens);
    let assembled =
        story.context_with_report(tokenizer, lore.as_slice(), &config.entries, max_tokens)?;
    info!(story = %story.id, max_tokens, "Prompt assembled");

    println!("{}", assembled.text);
    if args.report {
        print_report(&assembled);
    }
    Ok(())
}

/// Read a story JSON file, or treat any other file as the story body.
pub fn read_story(path: &Path) -> Result<Story, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    if let Ok(story) = serde_json::from_str::<Story>(&raw) {
        return Ok(story);
    }
    let mut story = Story::new(0);
    story.action(raw, TextKind::User);
    Ok(story)
}

fn print_report(assembled: &AssembledContext) {
    let meta = &assembled.metadata;
    eprintln!();
    eprintln!("📊 Assembly Report");
    eprintln!("==================");
    eprintln!(
        "  Budget:     {} tokens ({} used, {:.1}%)",
        meta.budget, meta.total_tokens, meta.utilization_pct
    );
    eprintln!("  Remaining:  {}", meta.remaining_budget);
    eprintln!();
    eprintln!(
        "  {:<24} {:>6} {:>7} {:>7} {:>8} {:>4}",
        "entry", "order", "tokens", "used", "reserved", "at"
    );
    for entry in &meta.entries {
        eprintln!(
            "  {:<24} {:>6} {:>7} {:>7} {:>8} {:>4}{}",
            entry.label,
            entry.insertion_order,
            entry.tokens_available,
            entry.tokens_used,
            entry.reserved_tokens,
            entry.splice_index,
            if entry.trimmed { "  ✂" } else { "" }
        );
    }
    if !meta.inactive.is_empty() {
        eprintln!();
        eprintln!("  Inactive:   {}", meta.inactive.join(", "));
    }
}
