//! Stories, users and the generation flow.
//!
//! A [`Story`] is a log of user and model text plus a memory and an
//! author's note. [`Story::context`] turns it into a pool of context entries
//! and assembles the prompt; [`generate`] sends that prompt to a
//! [`GenerationProvider`](akyuu_core::GenerationProvider) and appends the
//! reply. Users own stories and carry generation settings; [`Sessions`]
//! tracks which story each user is working on.

pub mod generate;
pub mod session;
pub mod story;
pub mod user;

pub use generate::{
    DEFAULT_CONTEXT_WINDOW, GenerationContext, STORY_BAD_WORDS, cut_trailing_sentence, generate,
    retry,
};
pub use session::Sessions;
pub use story::{
    PREAMBLE, RawTextOptions, Story, StoryContent, StoryMetadata, StoryText, TextKind,
};
pub use user::{DEFAULT_QUOTA, User};
