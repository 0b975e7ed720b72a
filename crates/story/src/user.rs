//! Users: generation settings, owned stories and a generation quota.

use akyuu_core::error::{Error, Result, StoreError, StoryError};
use akyuu_core::provider::GenerationRequest;
use akyuu_core::store::{RecordKind, RecordStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::story::Story;

/// Generations a new user may request.
pub const DEFAULT_QUOTA: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub settings: GenerationRequest,
    #[serde(default)]
    pub story_ids: Vec<String>,
    #[serde(default = "default_quota")]
    pub quota: u32,
}

fn default_quota() -> u32 {
    DEFAULT_QUOTA
}

impl User {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            settings: GenerationRequest::default(),
            story_ids: Vec::new(),
            quota: DEFAULT_QUOTA,
        }
    }

    pub fn owns(&self, story_id: &str) -> bool {
        self.story_ids.iter().any(|id| id == story_id)
    }

    /// Create and persist a new user with generation `settings`. Fails if
    /// the id is taken.
    pub async fn register(
        store: &dyn RecordStore,
        id: u64,
        settings: GenerationRequest,
    ) -> Result<Self> {
        if store.get(RecordKind::User, &id.to_string()).await?.is_some() {
            return Err(StoryError::UserExists(id).into());
        }
        let user = Self {
            settings,
            ..Self::new(id)
        };
        user.save(store).await?;
        info!(user = id, "User registered");
        Ok(user)
    }

    pub async fn save(&self, store: &dyn RecordStore) -> Result<()> {
        let payload = serde_json::to_string(self)?;
        store.put(RecordKind::User, &self.id.to_string(), payload).await?;
        Ok(())
    }

    pub async fn load(store: &dyn RecordStore, id: u64) -> Result<Self> {
        let key = id.to_string();
        let payload = store
            .get(RecordKind::User, &key)
            .await?
            .ok_or(StoryError::UnknownUser(id))?;
        serde_json::from_str(&payload).map_err(|e| {
            Error::Store(StoreError::Corrupted {
                key,
                reason: e.to_string(),
            })
        })
    }

    /// Delete the user and every story they own.
    pub async fn delete(&self, store: &dyn RecordStore) -> Result<bool> {
        for story_id in &self.story_ids {
            store.delete(RecordKind::Story, story_id).await?;
        }
        let existed = store.delete(RecordKind::User, &self.id.to_string()).await?;
        info!(user = self.id, stories = self.story_ids.len(), "User deleted");
        Ok(existed)
    }

    /// Create a story owned by this user and persist both.
    pub async fn create_story(&mut self, store: &dyn RecordStore) -> Result<Story> {
        let story = Story::new(self.id);
        self.story_ids.push(story.id.clone());
        story.save(store).await?;
        self.save(store).await?;
        info!(user = self.id, story = %story.id, "Story created");
        Ok(story)
    }

    pub async fn delete_story(&mut self, store: &dyn RecordStore, story_id: &str) -> Result<()> {
        let Some(index) = self.story_ids.iter().position(|id| id == story_id) else {
            return Err(StoryError::UnknownStory(story_id.to_string()).into());
        };
        self.story_ids.remove(index);
        store.delete(RecordKind::Story, story_id).await?;
        self.save(store).await?;
        info!(user = self.id, story = story_id, "Story deleted");
        Ok(())
    }

    /// Load every story this user owns, in creation order.
    pub async fn stories(&self, store: &dyn RecordStore) -> Result<Vec<Story>> {
        let mut stories = Vec::with_capacity(self.story_ids.len());
        for id in &self.story_ids {
            stories.push(Story::load(store, id).await?);
        }
        Ok(stories)
    }

    /// Load one of this user's stories.
    pub async fn story(&self, store: &dyn RecordStore, story_id: &str) -> Result<Story> {
        if !self.owns(story_id) {
            return Err(StoryError::UnknownStory(story_id.to_string()).into());
        }
        Story::load(store, story_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akyuu_store::InMemoryStore;

    #[test]
    fn default_settings() {
        let user = User::new(1);
        assert_eq!(user.quota, 2000);
        assert_eq!(user.settings.model, "lit-6b");
        assert_eq!(user.settings.gen_args.max_length, 40);
        assert_eq!(user.settings.sample_args.temp, Some(0.51));
        assert_eq!(user.settings.sample_args.bad_words, ["[", " ["]);
    }

    #[tokio::test]
    async fn register_keeps_given_settings() {
        let store = InMemoryStore::new();
        let mut settings = GenerationRequest::default();
        settings.model = "euterpe-v2".into();
        settings.gen_args.max_length = 60;

        User::register(&store, 8, settings.clone()).await.unwrap();

        let loaded = User::load(&store, 8).await.unwrap();
        assert_eq!(loaded.settings, settings);
    }

    #[tokio::test]
    async fn register_twice_fails() {
        let store = InMemoryStore::new();
        User::register(&store, 5, GenerationRequest::default()).await.unwrap();
        let err = User::register(&store, 5, GenerationRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::Story(StoryError::UserExists(5))));
    }

    #[tokio::test]
    async fn load_unknown_user_fails() {
        let store = InMemoryStore::new();
        let err = User::load(&store, 9).await.unwrap_err();
        assert!(matches!(err, Error::Story(StoryError::UnknownUser(9))));
    }

    #[tokio::test]
    async fn create_and_list_stories() {
        let store = InMemoryStore::new();
        let mut user = User::register(&store, 1, GenerationRequest::default()).await.unwrap();
        let a = user.create_story(&store).await.unwrap();
        let b = user.create_story(&store).await.unwrap();

        let reloaded = User::load(&store, 1).await.unwrap();
        assert_eq!(reloaded.story_ids, [a.id.clone(), b.id.clone()]);

        let stories = reloaded.stories(&store).await.unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id, a.id);
        assert_eq!(stories[1].owner_id, 1);
    }

    #[tokio::test]
    async fn delete_story_removes_record_and_id() {
        let store = InMemoryStore::new();
        let mut user = User::register(&store, 1, GenerationRequest::default()).await.unwrap();
        let story = user.create_story(&store).await.unwrap();

        user.delete_story(&store, &story.id).await.unwrap();
        assert!(user.story_ids.is_empty());
        assert!(store.get(RecordKind::Story, &story.id).await.unwrap().is_none());

        let err = user.delete_story(&store, &story.id).await.unwrap_err();
        assert!(matches!(err, Error::Story(StoryError::UnknownStory(_))));
    }

    #[tokio::test]
    async fn foreign_story_is_not_loaded() {
        let store = InMemoryStore::new();
        let mut owner = User::register(&store, 1, GenerationRequest::default()).await.unwrap();
        let other = User::register(&store, 2, GenerationRequest::default()).await.unwrap();
        let story = owner.create_story(&store).await.unwrap();

        assert!(owner.story(&store, &story.id).await.is_ok());
        assert!(other.story(&store, &story.id).await.is_err());
    }

    #[tokio::test]
    async fn delete_user_removes_stories() {
        let store = InMemoryStore::new();
        let mut user = User::register(&store, 3, GenerationRequest::default()).await.unwrap();
        user.create_story(&store).await.unwrap();
        user.create_story(&store).await.unwrap();

        assert!(user.delete(&store).await.unwrap());
        assert!(store.is_empty().await);
    }
}
