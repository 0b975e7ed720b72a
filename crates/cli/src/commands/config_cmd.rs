//! `akyuu config`: Configuration management commands.

use std::path::Path;

use akyuu_config::AppConfig;

use super::load_config;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.provider.endpoint.is_none() {
                warnings.push("No provider endpoint set; prompts can be assembled but not sent");
            }

            if config.tokenizer.kind == "huggingface" && cfg!(not(feature = "hf")) {
                warnings.push("tokenizer.kind = \"huggingface\" needs a build with `--features hf`");
            }

            if let Some(lorebook) = &config.context.lorebook {
                if !lorebook.exists() {
                    warnings.push("Configured lorebook does not exist");
                }
            }

            if config.entries.story.reserved_tokens > config.context.max_tokens {
                warnings.push("Story reservation exceeds context.max_tokens");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Tokenizer:  {}", config.tokenizer.kind);
            println!(
                "   Budget:     {} tokens (window {})",
                config.context.max_tokens, config.context.context_window
            );
            println!("   Model:      {}", config.generation.model);
            println!("   Store:      {}", config.store.backend);
            match &config.context.lorebook {
                Some(path) => println!("   Lorebook:   {}", path.display()),
                None => println!("   Lorebook:   (none)"),
            }
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e);
        }
    }

    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };
    println!("{}", path.display());
    Ok(())
}
