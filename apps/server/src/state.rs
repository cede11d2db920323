//! Shared application state handed to every handler

use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    auth::{IdentityProvider, JwtIdentityProvider},
    config::{Config, StoreBackend},
    db::{postgres, InMemoryQuestionStore, PostgresQuestionStore, QuestionStore},
    models::Tag,
    services::{QuestionService, TagService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityProvider>,
    pub question_service: QuestionService,
    pub tag_service: TagService,
    /// Present only for the postgres backend.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Build state from configuration: connect the configured store and identity provider.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (store, db_pool): (Arc<dyn QuestionStore>, Option<PgPool>) =
            match config.database.backend {
                StoreBackend::Postgres => {
                    let pool = postgres::connect(&config.database)
                        .await
                        .context("Failed to connect to PostgreSQL")?;
                    if config.database.run_migrations {
                        postgres::run_migrations(&pool)
                            .await
                            .context("Failed to run database migrations")?;
                        tracing::info!("Database migrations applied");
                    }
                    (
                        Arc::new(PostgresQuestionStore::new(pool.clone())),
                        Some(pool),
                    )
                }
                StoreBackend::Memory => {
                    let tags = config
                        .database
                        .seed_tags
                        .iter()
                        .map(|t| Tag::new(&t.slug, &t.name));
                    tracing::warn!("Using in-memory store; data is lost on shutdown");
                    (Arc::new(InMemoryQuestionStore::with_tags(tags)), None)
                }
            };

        let identity = JwtIdentityProvider::new(config.auth.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize authentication: {e:?}"))?;

        let mut state = Self::with_components(config, store, Arc::new(identity));
        state.db_pool = db_pool;
        Ok(state)
    }

    /// Assemble state from already-built collaborators.
    pub fn with_components(
        config: Config,
        store: Arc<dyn QuestionStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            question_service: QuestionService::new(store.clone()),
            tag_service: TagService::new(store),
            identity,
            db_pool: None,
        }
    }
}
