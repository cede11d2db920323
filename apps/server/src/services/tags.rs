//! Tag vocabulary lookups and the tag reference check shared by create and update

use std::collections::HashSet;
use std::sync::Arc;

use crate::{db::QuestionStore, models::Tag, Error, Result};

#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn QuestionStore>,
}

impl TagService {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    /// All tags, ordered by display name.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.store.list_tags().await
    }
}

/// Fail with a validation error unless every requested slug names an existing tag.
///
/// The error message lists each missing slug once, in request order.
pub async fn ensure_tags_exist(store: &dyn QuestionStore, requested: &[String]) -> Result<()> {
    if requested.is_empty() {
        return Ok(());
    }

    let found = store.find_tags(requested).await?;
    let missing = missing_slugs(requested, &found);
    if missing.is_empty() {
        return Ok(());
    }

    tracing::debug!(missing = ?missing, "Rejected unknown tag slugs");
    Err(Error::Validation(format!(
        "Invalid tags: {}",
        missing.join(", ")
    )))
}

/// Requested slugs with no matching tag, deduplicated, in request order.
pub fn missing_slugs(requested: &[String], found: &[Tag]) -> Vec<String> {
    let known: HashSet<&str> = found.iter().map(|t| t.slug.as_str()).collect();
    let mut reported = HashSet::new();

    requested
        .iter()
        .filter(|slug| !known.contains(slug.as_str()))
        .filter(|slug| reported.insert(slug.as_str()))
        .cloned()
        .collect()
}
