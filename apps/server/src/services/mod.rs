//! Service layer - business logic between handlers and the store

pub mod questions;
pub mod tags;

pub use questions::QuestionService;
pub use tags::{ensure_tags_exist, missing_slugs, TagService};
