//! PostgreSQL-backed question store

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Executor, PgPool, Row,
};
use std::time::Duration;

use super::traits::QuestionStore;
use crate::{
    config::DatabaseConfig,
    models::{Question, Tag},
    Error, Result,
};

const QUESTION_COLUMNS: &str = r#"
    id,
    title,
    content,
    tag_slugs,
    asker_id,
    asker_display_name,
    view_count,
    created_at,
    updated_at
"#;

/// Open a connection pool using the configured sizing and timeouts.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let statement_timeout_ms = config.statement_timeout_seconds * 1000;

    PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET statement_timeout = {statement_timeout_ms}").as_str())
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
        .map_err(Error::Database)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Repository for question and tag rows
#[derive(Debug, Clone)]
pub struct PostgresQuestionStore {
    pool: PgPool,
}

impl PostgresQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn question_from_row(row: &PgRow) -> Question {
    Question {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        tag_slugs: row.get("tag_slugs"),
        asker_id: row.get("asker_id"),
        asker_display_name: row.get("asker_display_name"),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn tag_from_row(row: &PgRow) -> Tag {
    Tag {
        slug: row.get("slug"),
        name: row.get("name"),
    }
}

#[async_trait]
impl QuestionStore for PostgresQuestionStore {
    async fn find_question(&self, id: &str) -> Result<Option<Question>> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(question_from_row))
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO questions (
                id,
                title,
                content,
                tag_slugs,
                asker_id,
                asker_display_name,
                view_count,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&question.id)
        .bind(&question.title)
        .bind(&question.content)
        .bind(&question.tag_slugs)
        .bind(&question.asker_id)
        .bind(&question.asker_display_name)
        .bind(question.view_count)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn increment_view_count(&self, id: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE questions SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn update_question(&self, question: &Question) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET title = $2,
                content = $3,
                tag_slugs = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(&question.id)
        .bind(&question.title)
        .bind(&question.content)
        .bind(&question.tag_slugs)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_question(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, tag: Option<&str>) -> Result<Vec<Question>> {
        let rows = match tag {
            Some(tag) => {
                let query = format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions \
                     WHERE $1 = ANY(tag_slugs) \
                     ORDER BY created_at DESC"
                );
                sqlx::query(&query)
                    .bind(tag)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query =
                    format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at DESC");
                sqlx::query(&query).fetch_all(&self.pool).await
            }
        }
        .map_err(Error::Database)?;

        Ok(rows.iter().map(question_from_row).collect())
    }

    async fn find_tags(&self, slugs: &[String]) -> Result<Vec<Tag>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT slug, name FROM tags WHERE slug = ANY($1)")
            .bind(slugs)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT slug, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }
}
