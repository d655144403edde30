//! Data models for episcope.

mod episode;

pub use episode::{CharacterPresence, EpisodeRecord, PageKind};
