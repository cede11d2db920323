//! Domain models for questions and tags

pub mod question;
pub mod tag;

pub use question::{ListQuestionsParams, Question, QuestionInput};
pub use tag::{ListTagsParams, Tag};
