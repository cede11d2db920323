//! In-process question store.
//!
//! Used by the `memory` backend and by the integration tests. Questions are kept in
//! insertion order so that listing can break `created_at` ties newest-first.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::QuestionStore;
use crate::{
    models::{Question, Tag},
    Result,
};

#[derive(Debug, Default)]
struct MemoryState {
    questions: Vec<Question>,
    tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryQuestionStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose tag vocabulary is pre-seeded.
    pub fn with_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut seen = HashSet::new();
        let tags: Vec<Tag> = tags
            .into_iter()
            .filter(|t| seen.insert(t.slug.clone()))
            .collect();
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                questions: Vec::new(),
                tags,
            })),
        }
    }

    pub async fn question_count(&self) -> usize {
        self.state.read().await.questions.len()
    }
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn find_question(&self, id: &str) -> Result<Option<Question>> {
        let state = self.state.read().await;
        Ok(state.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        let mut state = self.state.write().await;
        if state.questions.iter().any(|q| q.id == question.id) {
            return Err(crate::Error::Internal(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        state.questions.push(question.clone());
        Ok(())
    }

    async fn increment_view_count(&self, id: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        match state.questions.iter_mut().find(|q| q.id == id) {
            Some(question) => {
                question.view_count += 1;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_question(&self, question: &Question) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(stored) = state.questions.iter_mut().find(|q| q.id == question.id) else {
            return Ok(false);
        };

        stored.title = question.title.clone();
        stored.content = question.content.clone();
        stored.tag_slugs = question.tag_slugs.clone();
        stored.updated_at = question.updated_at;
        Ok(true)
    }

    async fn delete_question(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.questions.len();
        state.questions.retain(|q| q.id != id);
        Ok(state.questions.len() != before)
    }

    async fn list_questions(&self, tag: Option<&str>) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        let mut questions: Vec<Question> = state
            .questions
            .iter()
            .rev()
            .filter(|q| tag.map_or(true, |t| q.tag_slugs.iter().any(|s| s == t)))
            .cloned()
            .collect();

        // Stable sort keeps the reversed insertion order for equal timestamps.
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    async fn find_tags(&self, slugs: &[String]) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(state
            .tags
            .iter()
            .filter(|t| slugs.contains(&t.slug))
            .cloned()
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut tags = state.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionInput;
    use chrono::{Duration, Utc};

    fn question(title: &str, tags: &[&str]) -> Question {
        Question::new(
            QuestionInput {
                title: title.to_string(),
                content: "body".to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            "user-1",
            "Ada",
        )
    }

    #[test]
    fn increment_on_missing_question_touches_nothing() {
        tokio_test::block_on(async {
            let store = InMemoryQuestionStore::new();
            let q = question("a", &[]);
            store.insert_question(&q).await.unwrap();

            assert_eq!(store.increment_view_count("missing").await.unwrap(), 0);
            let stored = store.find_question(&q.id).await.unwrap().unwrap();
            assert_eq!(stored.view_count, 0);
        });
    }

    #[tokio::test]
    async fn list_filters_by_exact_slug_newest_first() {
        let store = InMemoryQuestionStore::new();

        let mut old = question("old", &["rust"]);
        old.created_at = Utc::now() - Duration::minutes(5);
        let newer = question("newer", &["rust", "go"]);
        let other = question("other", &["rusty"]);

        for q in [&old, &newer, &other] {
            store.insert_question(q).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_questions(Some("rust"))
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.title)
            .collect();
        assert_eq!(titles, vec!["newer", "old"]);

        let all = store.list_questions(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().title, "old");
    }

    #[tokio::test]
    async fn update_never_touches_owner_or_views() {
        let store = InMemoryQuestionStore::new();
        let q = question("a", &["rust"]);
        store.insert_question(&q).await.unwrap();
        store.increment_view_count(&q.id).await.unwrap();

        let mut changed = q.clone();
        changed.title = "b".to_string();
        changed.asker_id = "someone-else".to_string();
        changed.view_count = 100;
        changed.updated_at = Some(Utc::now());
        assert!(store.update_question(&changed).await.unwrap());

        let stored = store.find_question(&q.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "b");
        assert_eq!(stored.asker_id, "user-1");
        assert_eq!(stored.view_count, 1);
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn tags_are_listed_by_name_and_looked_up_by_slug() {
        let store = InMemoryQuestionStore::with_tags([
            Tag::new("rust", "Rust"),
            Tag::new("go", "Go"),
            Tag::new("cpp", "C++"),
        ]);

        let names: Vec<String> = store
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["C++", "Go", "Rust"]);

        let found = store
            .find_tags(&["go".to_string(), "madeup".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec![Tag::new("go", "Go")]);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = InMemoryQuestionStore::new();
        let q = question("a", &[]);
        store.insert_question(&q).await.unwrap();

        assert!(store.delete_question(&q.id).await.unwrap());
        assert!(!store.delete_question(&q.id).await.unwrap());
        assert_eq!(store.question_count().await, 0);
    }
}
