//! `akyuu story`: Keep stories in the local record store.

use std::path::{Path, PathBuf};

use akyuu_config::AppConfig;
use akyuu_core::error::{Error, StoryError};
use akyuu_core::provider::GenerationRequest;
use akyuu_core::store::RecordStore;
use akyuu_story::{GenerationContext, RawTextOptions, Sessions, Story, TextKind, User};
use tracing::{debug, warn};

use super::{load_config, load_tokenizer, open_store};
use crate::StoryAction;

pub async fn run(
    config_path: Option<&Path>,
    user_id: u64,
    action: StoryAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let backend = open_store(&config);
    let store: &dyn RecordStore = &*backend;
    let sessions_path = sessions_path();
    let mut sessions = load_sessions(&sessions_path);
    let mut user = load_or_register(store, user_id, &config.generation).await?;

    match action {
        StoryAction::New { title, description } => {
            let mut story = user.create_story(store).await?;
            story.edit(title, description);
            story.save(store).await?;
            sessions.select(&user, &story.id)?;
            save_sessions(&sessions_path, &sessions)?;
            println!("📖 Created \"{}\" ({})", story.metadata.title, story.id);
        }
        StoryAction::Edit { title, description } => {
            if title.is_none() && description.is_none() {
                return Err("Nothing to edit: pass --title and/or --description".into());
            }
            let mut story = current_story(store, &user, &sessions).await?;
            story.edit(title, description);
            story.save(store).await?;
            println!("✏️  Story is now \"{}\"", story.metadata.title);
        }
        StoryAction::List => {
            let stories = user.stories(store).await?;
            if stories.is_empty() {
                println!("No stories yet. Run `akyuu story new` to start one.");
                return Ok(());
            }
            let current = sessions.current(user.id).ok();
            println!("📚 Stories ({}):", stories.len());
            for story in &stories {
                let marker = if current == Some(story.id.as_str()) { "▶" } else { " " };
                println!(
                    "  {marker} {}  {:<32} {:>4} entries  updated {}",
                    story.id,
                    story.metadata.title,
                    story.entries().len(),
                    story.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        StoryAction::Select { id } => {
            sessions.select(&user, &id)?;
            save_sessions(&sessions_path, &sessions)?;
            let story = user.story(store, &id).await?;
            println!("▶ Selected \"{}\"", story.metadata.title);
        }
        StoryAction::Show { chars } => {
            let story = current_story(store, &user, &sessions).await?;
            let options = RawTextOptions {
                highlight_last_line: true,
                char_limit: Some(chars),
                ..RawTextOptions::default()
            };
            println!("📖 {}", story.metadata.title);
            println!();
            println!("{}", story.raw_text(&options));
        }
        StoryAction::Write { text } => {
            let mut story = current_story(store, &user, &sessions).await?;
            story.action(as_action(&story, &text), TextKind::User);
            story.save(store).await?;
            println!("✅ Added to \"{}\"", story.metadata.title);
        }
        StoryAction::Undo => {
            let mut story = current_story(store, &user, &sessions).await?;
            match story.undo() {
                Some(removed) => {
                    story.save(store).await?;
                    println!("↩️  Removed: {}", removed.text.trim());
                }
                None => println!("Nothing to undo."),
            }
        }
        StoryAction::Alter { text } => {
            let mut story = current_story(store, &user, &sessions).await?;
            story.alter(&text)?;
            story.save(store).await?;
            println!("✏️  Last action replaced");
        }
        StoryAction::Add { text } => {
            let mut story = current_story(store, &user, &sessions).await?;
            story.add(&text)?;
            story.save(store).await?;
            println!("✏️  Last action replaced");
        }
        StoryAction::Memory { text } => {
            let mut story = current_story(store, &user, &sessions).await?;
            story.set_memory(text);
            story.save(store).await?;
            println!("🧠 Memory updated");
        }
        StoryAction::Note { text } => {
            let mut story = current_story(store, &user, &sessions).await?;
            story.set_authors_note(&text);
            story.save(store).await?;
            if story.metadata.authors_note.is_empty() {
                println!("📝 Author's note cleared");
            } else {
                println!("📝 Author's note set");
            }
        }
        StoryAction::Prompt => {
            let story = current_story(store, &user, &sessions).await?;
            let tokenizer = load_tokenizer(&config.tokenizer)?;
            let ctx = GenerationContext::from_config(tokenizer, &config)?;
            let request = ctx.request(&user, &story)?;
            debug!(
                model = %request.model,
                max_length = request.gen_args.max_length,
                "Generation request built"
            );
            println!("{}", request.prompt);
        }
        StoryAction::Delete => {
            let story_id = sessions.current(user.id)?.to_string();
            user.delete_story(store, &story_id).await?;
            sessions.forget_story(&story_id);
            save_sessions(&sessions_path, &sessions)?;
            println!("🗑️  Deleted story {story_id}");
        }
    }

    Ok(())
}

/// Load the user, registering them with the configured generation settings
/// on first use.
async fn load_or_register(
    store: &dyn RecordStore,
    user_id: u64,
    settings: &GenerationRequest,
) -> Result<User, Box<dyn std::error::Error>> {
    match User::load(store, user_id).await {
        Ok(user) => Ok(user),
        Err(Error::Story(StoryError::UnknownUser(_))) => {
            Ok(User::register(store, user_id, settings.clone()).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn current_story(
    store: &dyn RecordStore,
    user: &User,
    sessions: &Sessions,
) -> Result<Story, Box<dyn std::error::Error>> {
    let story_id = sessions.current(user.id)?;
    Ok(user.story(store, story_id).await?)
}

/// Written text goes on a line of its own after earlier actions.
fn as_action(story: &Story, text: &str) -> String {
    let mut action = String::new();
    let continues_line = story
        .entries()
        .last()
        .is_some_and(|last| !last.text.ends_with('\n'));
    if story.entries().len() > 1 && continues_line {
        action.push('\n');
    }
    action.push_str(text);
    if !action.ends_with('\n') {
        action.push('\n');
    }
    action
}

fn sessions_path() -> PathBuf {
    AppConfig::config_dir().join("sessions.json")
}

fn load_sessions(path: &Path) -> Sessions {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Sessions::new(),
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring unreadable sessions file");
        Sessions::new()
    })
}

fn save_sessions(path: &Path, sessions: &Sessions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(sessions)?)?;
    Ok(())
}
