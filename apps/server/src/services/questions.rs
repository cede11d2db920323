//! Question business logic: validation, ownership and the view counter

use chrono::Utc;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

use super::tags::ensure_tags_exist;
use crate::{
    auth::Principal,
    db::QuestionStore,
    metrics,
    models::{Question, QuestionInput},
    Error, Result,
};

#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn QuestionStore>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    /// Create a question owned by the caller.
    ///
    /// Tags are checked before identity claims, and nothing is written unless both pass.
    #[tracing::instrument(skip(self, principal, input), fields(subject = ?principal.subject))]
    pub async fn create(&self, principal: &Principal, input: QuestionInput) -> Result<Question> {
        let result = self.create_inner(principal, input).await;
        metrics::record_question_operation("create", &result);
        result
    }

    async fn create_inner(&self, principal: &Principal, input: QuestionInput) -> Result<Question> {
        validate_input(&input)?;
        ensure_tags_exist(self.store.as_ref(), &input.tags).await?;

        let (Some(asker_id), Some(asker_name)) = (&principal.subject, &principal.display_name)
        else {
            return Err(Error::Validation("Cannot get user details".to_string()));
        };

        let question = Question::new(input, asker_id, asker_name);
        self.store.insert_question(&question).await?;

        tracing::info!(question_id = %question.id, tags = ?question.tag_slugs, "Question created");
        Ok(question)
    }

    /// All questions newest first, optionally only those tagged with `tag`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, tag: Option<&str>) -> Result<Vec<Question>> {
        let result = self.store.list_questions(tag).await;
        metrics::record_question_operation("list", &result);
        result
    }

    /// Read a question and count the view.
    ///
    /// The returned record is the one read before the increment, so its
    /// `view_count` does not include this view.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Question> {
        let result = self.get_inner(id).await;
        metrics::record_question_operation("read", &result);
        result
    }

    async fn get_inner(&self, id: &str) -> Result<Question> {
        let question = self.find_existing(id).await?;

        if self.store.increment_view_count(id).await? > 0 {
            metrics::QUESTION_VIEWS_TOTAL.inc();
        }

        Ok(question)
    }

    /// Replace title, content and tags. Only the asker may do this.
    #[tracing::instrument(skip(self, principal, input), fields(subject = ?principal.subject))]
    pub async fn update(&self, principal: &Principal, id: &str, input: QuestionInput) -> Result<()> {
        let result = self.update_inner(principal, id, input).await;
        metrics::record_question_operation("update", &result);
        result
    }

    async fn update_inner(&self, principal: &Principal, id: &str, input: QuestionInput) -> Result<()> {
        let mut question = self.find_existing(id).await?;
        self.ensure_owner(principal, &question)?;

        validate_input(&input)?;
        ensure_tags_exist(self.store.as_ref(), &input.tags).await?;

        question.apply(input, Utc::now());
        if !self.store.update_question(&question).await? {
            return Err(not_found(id));
        }

        tracing::info!(question_id = %id, "Question updated");
        Ok(())
    }

    /// Permanently remove a question. Only the asker may do this.
    #[tracing::instrument(skip(self, principal), fields(subject = ?principal.subject))]
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let result = self.delete_inner(principal, id).await;
        metrics::record_question_operation("delete", &result);
        result
    }

    async fn delete_inner(&self, principal: &Principal, id: &str) -> Result<()> {
        let question = self.find_existing(id).await?;
        self.ensure_owner(principal, &question)?;

        if !self.store.delete_question(id).await? {
            return Err(not_found(id));
        }

        tracing::info!(question_id = %id, "Question deleted");
        Ok(())
    }

    async fn find_existing(&self, id: &str) -> Result<Question> {
        self.store
            .find_question(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    fn ensure_owner(&self, principal: &Principal, question: &Question) -> Result<()> {
        if question.is_asked_by(principal.subject.as_deref()) {
            return Ok(());
        }

        tracing::warn!(question_id = %question.id, "Caller is not the asker");
        Err(Error::Forbidden)
    }
}

fn not_found(id: &str) -> Error {
    Error::NotFound(format!("Question {id}"))
}

fn validate_input(input: &QuestionInput) -> Result<()> {
    input
        .validate()
        .map_err(|errors| Error::Validation(describe_invalid_fields(&errors)))
}

fn describe_invalid_fields(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
    fields.sort_unstable();
    format!("Invalid fields: {}", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::InMemoryQuestionStore, models::Tag};

    fn store() -> Arc<InMemoryQuestionStore> {
        Arc::new(InMemoryQuestionStore::with_tags([
            Tag::new("go", "Go"),
            Tag::new("rust", "Rust"),
        ]))
    }

    fn input(tags: &[&str]) -> QuestionInput {
        QuestionInput {
            title: "Title".to_string(),
            content: "Content".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn alice() -> Principal {
        Principal::new("alice", "Alice")
    }

    #[tokio::test]
    async fn create_takes_asker_from_principal() {
        let store = store();
        let service = QuestionService::new(store.clone());

        let q = service.create(&alice(), input(&["go", "rust"])).await.unwrap();
        assert_eq!(q.asker_id, "alice");
        assert_eq!(q.asker_display_name, "Alice");
        assert_eq!(q.tag_slugs, vec!["go", "rust"]);
        assert_eq!(q.view_count, 0);
        assert_eq!(store.question_count().await, 1);
    }

    #[tokio::test]
    async fn create_without_display_name_writes_nothing() {
        let store = store();
        let service = QuestionService::new(store.clone());
        let principal = Principal {
            subject: Some("alice".to_string()),
            ..Principal::default()
        };

        let err = service.create(&principal, input(&["go"])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Cannot get user details"));
        assert_eq!(store.question_count().await, 0);
    }

    #[tokio::test]
    async fn tag_errors_take_precedence_over_identity_errors() {
        let service = QuestionService::new(store());
        let err = service
            .create(&Principal::default(), input(&["madeup"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Invalid tags: madeup"));
    }

    #[tokio::test]
    async fn blank_fields_are_named() {
        let service = QuestionService::new(store());
        let mut bad = input(&[]);
        bad.title.clear();
        bad.content.clear();

        let err = service.create(&alice(), bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Invalid fields: content, title"));
    }

    #[tokio::test]
    async fn get_returns_pre_increment_count() {
        let store = store();
        let service = QuestionService::new(store.clone());
        let q = service.create(&alice(), input(&[])).await.unwrap();

        let first = service.get(&q.id).await.unwrap();
        let second = service.get(&q.id).await.unwrap();
        assert_eq!(first.view_count, 0);
        assert_eq!(second.view_count, 1);

        let stored = store.find_question(&q.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 2);
    }

    #[tokio::test]
    async fn missing_question_is_not_found() {
        let service = QuestionService::new(store());
        assert!(matches!(
            service.get("nope").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            service.delete(&alice(), "nope").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn ownership_is_checked_before_tags() {
        let store = store();
        let service = QuestionService::new(store.clone());
        let q = service.create(&alice(), input(&["go"])).await.unwrap();

        let bob = Principal::new("bob", "Bob");
        let err = service
            .update(&bob, &q.id, input(&["madeup"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn principal_without_subject_cannot_mutate() {
        let service = QuestionService::new(store());
        let q = service.create(&alice(), input(&[])).await.unwrap();

        let err = service.delete(&Principal::default(), &q.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let store = store();
        let service = QuestionService::new(store.clone());
        let q = service.create(&alice(), input(&["go"])).await.unwrap();

        let mut changed = input(&["go", "madeup"]);
        changed.title = "Changed".to_string();
        assert!(service.update(&alice(), &q.id, changed).await.is_err());

        let stored = store.find_question(&q.id).await.unwrap().unwrap();
        assert_eq!(stored, q);
    }

    #[tokio::test]
    async fn update_sets_updated_at() {
        let store = store();
        let service = QuestionService::new(store.clone());
        let q = service.create(&alice(), input(&["go"])).await.unwrap();

        service
            .update(&alice(), &q.id, input(&["rust"]))
            .await
            .unwrap();

        let stored = store.find_question(&q.id).await.unwrap().unwrap();
        assert_eq!(stored.tag_slugs, vec!["rust"]);
        assert!(stored.updated_at.is_some());
        assert_eq!(stored.created_at, q.created_at);
    }

    #[test]
    fn invalid_fields_lists_only_failing_fields() {
        let mut bad = input(&[]);
        bad.content.clear();

        let errors = bad.validate().unwrap_err();
        assert_eq!(describe_invalid_fields(&errors), "Invalid fields: content");
    }
}
