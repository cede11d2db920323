//! Question records and their request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A question record as stored and as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Server-assigned identifier (UUID v4)
    pub id: String,

    pub title: String,

    pub content: String,

    /// Tag slugs in the order the asker supplied them
    pub tag_slugs: Vec<String>,

    /// Subject of the authenticated creator; never taken from client input
    pub asker_id: String,

    /// Display name captured when the question was created
    pub asker_display_name: String,

    pub view_count: i32,

    pub created_at: DateTime<Utc>,

    /// `None` until the first successful update
    pub updated_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Build a new, never-viewed question owned by the given asker.
    pub fn new(
        input: QuestionInput,
        asker_id: impl Into<String>,
        asker_display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            tag_slugs: input.tags,
            asker_id: asker_id.into(),
            asker_display_name: asker_display_name.into(),
            view_count: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Overwrite the editable fields and stamp the edit time.
    pub fn apply(&mut self, input: QuestionInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.content = input.content;
        self.tag_slugs = input.tags;
        self.updated_at = Some(now);
    }

    pub fn is_asked_by(&self, subject: Option<&str>) -> bool {
        subject == Some(self.asker_id.as_str())
    }
}

/// Body of `POST /questions` and `PUT /questions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct QuestionInput {
    #[validate(length(min = 1))]
    pub title: String,

    #[validate(length(min = 1))]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Query parameters for `GET /questions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuestionsParams {
    pub tag: Option<String>,
}

impl ListQuestionsParams {
    /// The tag filter, treating an empty value as no filter.
    pub fn tag_filter(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}
