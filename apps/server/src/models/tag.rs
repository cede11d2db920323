//! Tag vocabulary entries

use serde::{Deserialize, Serialize};

/// A topic tag. Tags are seeded by an external process and are read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Stable, URL-safe identifier referenced from `Question::tag_slugs`
    pub slug: String,

    /// Human-readable label
    pub name: String,
}

impl Tag {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Query parameters for `GET /tags`.
///
/// `sort` is accepted for client compatibility; tags are always ordered by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTagsParams {
    pub sort: Option<String>,
}
