//! `akyuu lore`: Inspect a lorebook.

use std::path::Path;

use akyuu_context::{ContextEntry, LoreSource, Lorebook, resolve};
use akyuu_core::tokenizer::Tokenizer;

use super::{load_config, load_tokenizer};

pub async fn run(
    config_path: Option<&Path>,
    lorebook: &Path,
    text: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let tokenizer = load_tokenizer(&config.tokenizer)?;
    let entries = Lorebook::from_path(lorebook)?.entries()?;

    println!("📚 {} ({} entries)", lorebook.display(), entries.len());
    println!();

    let active = match text {
        Some(text) => Some(activated_by(tokenizer.as_ref(), &entries, text)?),
        None => None,
    };

    for (i, entry) in entries.iter().enumerate() {
        let marker = match &active {
            Some(active) if active.contains(&i) => "✅ ",
            Some(_) => "   ",
            None => "",
        };
        let tokens = tokenizer.count(entry.text())?;
        println!(
            "{marker}{:<24} order {:>5}  pos {:>3}  {:>5} tok  keys: {}",
            entry.label().unwrap_or("-"),
            entry.insertion_order(),
            entry.insertion_position(),
            tokens,
            entry.keys().join(", ")
        );
    }

    if let Some(active) = active {
        println!();
        println!("{} of {} entries activated", active.len(), entries.len());
    }
    Ok(())
}

/// Indices of `entries` that `text` would activate as a forced, cascading
/// entry, forced entries included.
pub fn activated_by(
    tokenizer: &dyn Tokenizer,
    entries: &[ContextEntry],
    text: &str,
) -> Result<Vec<usize>, Box<dyn std::error::Error>> {
    let scan = ContextEntry::builder(text)
        .forced(true)
        .cascading(true)
        .build()?;
    let mut pool = entries.to_vec();
    pool.push(scan);
    let scan_index = entries.len();

    let activation = resolve(tokenizer, &pool)?;
    let mut active: Vec<usize> = activation
        .order()
        .iter()
        .copied()
        .filter(|&i| i != scan_index)
        .collect();
    active.sort_unstable();
    Ok(active)
}
