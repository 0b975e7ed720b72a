//! `akyuu onboard`: First-time setup.

use akyuu_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let lorebook_dir = config_dir.join("lorebooks");

    println!("📜 akyuu — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !lorebook_dir.exists() {
        std::fs::create_dir_all(&lorebook_dir)?;
        println!("✅ Created lorebook directory: {}", lorebook_dir.display());
    }

    let store_dir = AppConfig::default().store_dir();
    if !store_dir.exists() {
        std::fs::create_dir_all(&store_dir)?;
        println!("✅ Created store directory: {}", store_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let default_toml = AppConfig::default_toml();
        std::fs::write(&config_path, &default_toml)?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!(
            "   1. Put a lorebook in {} and set context.lorebook",
            lorebook_dir.display()
        );
        println!("   2. Run: akyuu story new --title \"My Story\"");
        println!("   3. Run: akyuu story write \"Your first line.\"\n");
    }

    println!("🎉 Setup complete! Run `akyuu story prompt` to see what the model would get.\n");

    Ok(())
}
