//! Per-user story selection.
//!
//! Front-ends act on "the current story" of a user. The selection is kept in
//! an explicit [`Sessions`] value owned by the caller, which can persist it
//! with serde between runs.

use akyuu_core::error::StoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::user::User;

/// Which story each user is working on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sessions {
    current: BTreeMap<u64, String>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `story_id` the user's current story. The user must own it.
    pub fn select(&mut self, user: &User, story_id: &str) -> Result<(), StoryError> {
        if !user.owns(story_id) {
            return Err(StoryError::UnknownStory(story_id.to_string()));
        }
        self.current.insert(user.id, story_id.to_string());
        debug!(user = user.id, story = story_id, "Story selected");
        Ok(())
    }

    pub fn current(&self, user_id: u64) -> Result<&str, StoryError> {
        self.current
            .get(&user_id)
            .map(String::as_str)
            .ok_or(StoryError::NoStorySelected)
    }

    /// Drop the user's selection, returning what was selected.
    pub fn clear(&mut self, user_id: u64) -> Option<String> {
        self.current.remove(&user_id)
    }

    /// Drop every selection pointing at `story_id`.
    pub fn forget_story(&mut self, story_id: &str) {
        self.current.retain(|_, id| id != story_id);
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
