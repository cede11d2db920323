//! Storage seam for questions and tags

use crate::{
    models::{Question, Tag},
    Result,
};
use async_trait::async_trait;

/// Storage operations needed by the question and tag services.
///
/// Every call is an independent unit of work: implementations must not hold
/// locks or transactions open across calls. Any backend (PostgreSQL, in-memory,
/// a document store with single-document atomic updates, ...) can implement it.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Load a question by id.
    ///
    /// # Returns
    /// * `Ok(Some(question))` - Question exists
    /// * `Ok(None)` - No question with that id
    async fn find_question(&self, id: &str) -> Result<Option<Question>>;

    /// Persist a newly constructed question.
    async fn insert_question(&self, question: &Question) -> Result<()>;

    /// Atomically add one to a question's view count.
    ///
    /// Concurrent calls for the same id must each contribute exactly one.
    ///
    /// # Returns
    /// The number of rows touched (0 when the question no longer exists)
    async fn increment_view_count(&self, id: &str) -> Result<u64>;

    /// Overwrite title, content, tag slugs and `updated_at` of an existing question.
    ///
    /// Asker fields, view count and creation time are never written.
    ///
    /// # Returns
    /// `false` when the question no longer exists
    async fn update_question(&self, question: &Question) -> Result<bool>;

    /// Permanently remove a question.
    ///
    /// # Returns
    /// `false` when the question no longer exists
    async fn delete_question(&self, id: &str) -> Result<bool>;

    /// List questions newest first, optionally restricted to those carrying `tag`.
    async fn list_questions(&self, tag: Option<&str>) -> Result<Vec<Question>>;

    /// Return the tags whose slug is in `slugs`. Unknown slugs are simply absent.
    async fn find_tags(&self, slugs: &[String]) -> Result<Vec<Tag>>;

    /// All tags ordered by name ascending.
    async fn list_tags(&self) -> Result<Vec<Tag>>;
}
