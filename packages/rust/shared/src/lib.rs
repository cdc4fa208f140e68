//! Shared types, error model, and configuration for PureLearn.
//!
//! This crate is the foundation depended on by all other PureLearn crates.
//! It provides:
//! - [`PurelearnError`] — the unified error type
//! - Domain types ([`Course`], [`Topic`], [`Subtopic`], [`SectionId`], [`QuizRecord`],
//!   [`QuizQuestion`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentConfig, StorageConfig, config_dir, config_file_path, expand_home,
    init_config, load_config, load_config_from,
};
pub use error::{PurelearnError, Result};
pub use types::{
    Bookmarks, COURSES_PATH_PREFIX, Course, NavigationLink, Position, QuizProgress, QuizQuestion,
    QuizRecord, Reference, SectionId, SectionProgress, Subtopic, Topic, TopicNavigation,
    key_belongs_to_course,
};
