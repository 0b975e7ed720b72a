//! The generation flow: user input in, model continuation appended.

use std::borrow::Cow;
use std::sync::Arc;

use akyuu_config::{AppConfig, EntryPolicies};
use akyuu_context::{ContextEntry, LoreSource, Lorebook};
use akyuu_core::error::{ProviderError, Result, StoryError};
use akyuu_core::provider::{GenerationProvider, GenerationRequest};
use akyuu_core::tokenizer::Tokenizer;
use tracing::{debug, info};

use crate::story::{Story, TextKind};
use crate::user::User;

/// Tokens the model sees, prompt and continuation together.
pub const DEFAULT_CONTEXT_WINDOW: usize = 1280;

/// Phrases that would let the model write story scaffolding instead of story.
pub const STORY_BAD_WORDS: [&str; 5] = [" Author", "Author", "Chapter", " Chapter", "***"];

/// Everything a generation needs besides the user and the story.
pub struct GenerationContext {
    tokenizer: Arc<dyn Tokenizer>,
    lore: Vec<ContextEntry>,
    policies: EntryPolicies,
    context_window: usize,
}

impl GenerationContext {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            lore: Vec::new(),
            policies: EntryPolicies::default(),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Build from configuration, loading the configured lorebook if any.
    pub fn from_config(tokenizer: Arc<dyn Tokenizer>, config: &AppConfig) -> Result<Self> {
        let lore = match &config.context.lorebook {
            Some(path) => Lorebook::from_path(path)?.entries()?,
            None => Vec::new(),
        };
        Ok(Self::new(tokenizer)
            .with_lore(lore)
            .with_policies(config.entries.clone())
            .with_context_window(config.context.context_window))
    }

    pub fn with_lore(mut self, lore: Vec<ContextEntry>) -> Self {
        self.lore = lore;
        self
    }

    pub fn with_policies(mut self, policies: EntryPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn lore(&self) -> &[ContextEntry] {
        &self.lore
    }

    /// Prompt budget left once the continuation is set aside.
    pub fn prompt_budget(&self, settings: &GenerationRequest) -> usize {
        self.context_window
            .saturating_sub(settings.gen_args.max_length as usize)
    }

    /// The lore used for `story`: its own lorebook when it names one,
    /// otherwise the configured lore.
    pub fn lore_for(&self, story: &Story) -> Result<Cow<'_, [ContextEntry]>> {
        match &story.metadata.lorebook {
            Some(path) => {
                let entries = Lorebook::from_path(path)?.entries()?;
                debug!(
                    story = %story.id,
                    lorebook = %path,
                    entries = entries.len(),
                    "Story lorebook loaded"
                );
                Ok(Cow::Owned(entries))
            }
            None => Ok(Cow::Borrowed(self.lore.as_slice())),
        }
    }

    /// The request that would be sent for `story` under `user`'s settings.
    pub fn request(&self, user: &User, story: &Story) -> Result<GenerationRequest> {
        let mut request = user.settings.clone();
        let budget = self.prompt_budget(&request);
        let lore = self.lore_for(story)?;
        request.prompt = story.context(
            Arc::clone(&self.tokenizer),
            &*lore,
            &self.policies,
            budget,
        )?;
        request.sample_args.bad_words = STORY_BAD_WORDS.iter().map(|w| w.to_string()).collect();
        Ok(request)
    }
}

/// Append optional user input to `story`, ask `provider` for a continuation
/// and append that too. Returns the appended continuation.
///
/// With `newline_prefix` the input starts a new line.
pub async fn generate(
    user: &User,
    story: &mut Story,
    input: Option<&str>,
    newline_prefix: bool,
    provider: &dyn GenerationProvider,
    ctx: &GenerationContext,
) -> Result<String> {
    if user.quota == 0 {
        return Err(StoryError::QuotaExceeded.into());
    }

    if let Some(input) = input {
        let input = input.trim_end();
        if !input.is_empty() {
            let prefix = if newline_prefix { "\n" } else { "" };
            story.action(format!("{prefix}{input}"), TextKind::User);
        }
    }

    let request = ctx.request(user, story)?;
    debug!(
        story = %story.id,
        provider = provider.name(),
        prompt_chars = request.prompt.len(),
        "Requesting continuation"
    );

    let output = provider.generate(request).await?;
    let mut text = cut_trailing_sentence(&output).to_string();
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse.into());
    }
    if !text.ends_with('\n') {
        text.push('\n');
    }

    story.action(text.clone(), TextKind::Ai);
    info!(story = %story.id, user = user.id, chars = text.len(), "Continuation appended");
    Ok(text)
}

/// Replace the last action of `story` with a fresh continuation.
pub async fn retry(
    user: &User,
    story: &mut Story,
    provider: &dyn GenerationProvider,
    ctx: &GenerationContext,
) -> Result<String> {
    if user.quota == 0 {
        return Err(StoryError::QuotaExceeded.into());
    }
    let Some(dropped) = story.undo() else {
        return Err(StoryError::EmptyStory.into());
    };
    debug!(story = %story.id, chars = dropped.text.len(), "Retrying last action");
    generate(user, story, None, false, provider, ctx).await
}

/// Cut `text` after its last sentence terminator, keeping a closing quote.
/// Text with no terminator past the first character is returned whole.
pub fn cut_trailing_sentence(text: &str) -> &str {
    match text.rfind(['.', '!', '?']) {
        None | Some(0) => text,
        Some(index) => {
            let mut end = index + 1;
            if text[end..].starts_with('"') {
                end += 1;
            }
            &text[..end]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akyuu_context::ByteTokenizer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a canned reply and records the request it saw.
    struct ScriptedProvider {
        reply: String,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                seen: Mutex::new(None),
            }
        }

        fn seen(&self) -> GenerationRequest {
            self.seen.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> std::result::Result<String, ProviderError> {
            *self.seen.lock().unwrap() = Some(request);
            Ok(self.reply.clone())
        }
    }

    fn ctx() -> GenerationContext {
        GenerationContext::new(Arc::new(ByteTokenizer))
    }

    #[test]
    fn cut_keeps_complete_sentences() {
        assert_eq!(cut_trailing_sentence(" She ran. Then she"), " She ran.");
        assert_eq!(cut_trailing_sentence("Why? Be"), "Why?");
        assert_eq!(cut_trailing_sentence("\"Go.\" He"), "\"Go.\"");
    }

    #[test]
    fn cut_without_terminator_keeps_everything() {
        assert_eq!(cut_trailing_sentence("no end in sight"), "no end in sight");
        assert_eq!(cut_trailing_sentence(".x"), ".x");
    }

    #[test]
    fn prompt_budget_leaves_room_for_output() {
        let user = User::new(1);
        assert_eq!(ctx().prompt_budget(&user.settings), 1240);
        let small = ctx().with_context_window(10);
        assert_eq!(small.prompt_budget(&user.settings), 0);
    }

    #[tokio::test]
    async fn input_and_continuation_are_appended() {
        let user = User::new(1);
        let mut story = Story::new(1);
        story.action("You stand at the gate.", TextKind::Ai);
        let provider = ScriptedProvider::new(" The guard nods. He opens");

        let text = generate(&user, &mut story, Some("You knock.  \n"), true, &provider, &ctx())
            .await
            .unwrap();

        assert_eq!(text, " The guard nods.\n");
        let entries = story.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].text, "\nYou knock.");
        assert_eq!(entries[1].kind, TextKind::User);
        assert_eq!(entries[2].kind, TextKind::Ai);
    }

    #[tokio::test]
    async fn request_carries_prompt_and_story_bad_words() {
        let user = User::new(1);
        let mut story = Story::new(1);
        story.set_memory("Alice lives in a tower.");
        story.action("The door creaked open.", TextKind::User);
        let provider = ScriptedProvider::new("It was dark.");

        generate(&user, &mut story, None, true, &provider, &ctx()).await.unwrap();

        let request = provider.seen();
        assert_eq!(request.prompt, "***\nAlice lives in a tower.\nThe door creaked open.");
        assert_eq!(request.sample_args.bad_words, STORY_BAD_WORDS);
        assert_eq!(request.model, "lit-6b");
        assert_eq!(user.settings.sample_args.bad_words, ["[", " ["]);
    }

    #[tokio::test]
    async fn exhausted_quota_is_rejected() {
        let mut user = User::new(1);
        user.quota = 0;
        let mut story = Story::new(1);
        let provider = ScriptedProvider::new("Never.");

        let err = generate(&user, &mut story, Some("hi"), true, &provider, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, akyuu_core::Error::Story(StoryError::QuotaExceeded)));
        assert!(story.is_empty());
    }

    #[tokio::test]
    async fn blank_output_is_an_error() {
        let user = User::new(1);
        let mut story = Story::new(1);
        let provider = ScriptedProvider::new("   ");

        let err = generate(&user, &mut story, None, true, &provider, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            akyuu_core::Error::Provider(ProviderError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn lore_reaches_the_prompt() {
        let user = User::new(1);
        let mut story = Story::new(1);
        story.action("Reimu swept the shrine.", TextKind::User);
        let lore = vec![
            ContextEntry::builder("The shrine is poor.")
                .keys(["shrine"])
                .insertion_position(0)
                .build()
                .unwrap(),
        ];
        let provider = ScriptedProvider::new("Nobody came.");

        generate(&user, &mut story, None, true, &provider, &ctx().with_lore(lore))
            .await
            .unwrap();
        assert!(provider.seen().prompt.contains("The shrine is poor."));
    }

    #[tokio::test]
    async fn input_without_newline_prefix_continues_the_line() {
        let user = User::new(1);
        let mut story = Story::new(1);
        story.action("You stand at the gate", TextKind::Ai);
        let provider = ScriptedProvider::new(" The guard nods.");

        generate(&user, &mut story, Some(" and knock."), false, &provider, &ctx())
            .await
            .unwrap();

        assert_eq!(story.entries()[1].text, " and knock.");
        assert_eq!(
            provider.seen().prompt,
            "***\nYou stand at the gate and knock."
        );
    }

    #[tokio::test]
    async fn retry_replaces_the_last_action() {
        let user = User::new(1);
        let mut story = Story::new(1);
        story.action("The door creaked open.\n", TextKind::User);
        story.action("A ghost waved.\n", TextKind::Ai);
        let provider = ScriptedProvider::new("Nobody was there.");

        let text = retry(&user, &mut story, &provider, &ctx()).await.unwrap();

        assert_eq!(text, "Nobody was there.\n");
        assert_eq!(story.entries().len(), 2);
        assert_eq!(story.entries()[1].text, "Nobody was there.\n");
        assert_eq!(provider.seen().prompt, "***\nThe door creaked open.");
    }

    #[tokio::test]
    async fn retry_on_empty_story_is_rejected() {
        let user = User::new(1);
        let mut story = Story::new(1);
        let provider = ScriptedProvider::new("Never.");

        let err = retry(&user, &mut story, &provider, &ctx()).await.unwrap_err();
        assert!(matches!(err, akyuu_core::Error::Story(StoryError::EmptyStory)));
    }

    #[tokio::test]
    async fn retry_without_quota_keeps_the_story() {
        let mut user = User::new(1);
        user.quota = 0;
        let mut story = Story::new(1);
        story.action("Kept.\n", TextKind::Ai);
        let provider = ScriptedProvider::new("Never.");

        assert!(retry(&user, &mut story, &provider, &ctx()).await.is_err());
        assert_eq!(story.entries().len(), 1);
    }

    #[test]
    fn story_lorebook_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrine.json");
        std::fs::write(
            &path,
            r#"{"entries": [{"keys": ["shrine"], "text": "The shrine is rich.", "contextConfig": {"insertionPosition": 0}}]}"#,
        )
        .unwrap();
        let configured = vec![
            ContextEntry::builder("The shrine is poor.")
                .keys(["shrine"])
                .insertion_position(0)
                .build()
                .unwrap(),
        ];
        let ctx = ctx().with_lore(configured);
        let user = User::new(1);

        let mut story = Story::new(1);
        story.action("Reimu swept the shrine.", TextKind::User);
        let request = ctx.request(&user, &story).unwrap();
        assert_eq!(
            request.prompt,
            "***\nThe shrine is poor.\nReimu swept the shrine."
        );

        story.metadata.lorebook = Some(path.display().to_string());
        assert_eq!(ctx.lore_for(&story).unwrap().len(), 1);
        let request = ctx.request(&user, &story).unwrap();
        assert_eq!(
            request.prompt,
            "***\nThe shrine is rich.\nReimu swept the shrine."
        );
    }
}
