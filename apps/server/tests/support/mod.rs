pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use futures::FutureExt as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::Connection as _;
use question_service::{
    api::create_router,
    auth::JwtIdentityProvider,
    config::StoreBackend,
    db::InMemoryQuestionStore,
    models::Tag,
    AppState, Config,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt as _;
use url::Url;
use uuid::Uuid;

pub use assertions::*;
pub use fixtures::*;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Checked before `DATABASE_URL` when looking for a Postgres server to test against.
pub const TEST_DATABASE_URL_ENV: &str = "QA_TEST_DATABASE_URL";

pub enum Backend {
    Memory(Arc<InMemoryQuestionStore>),
    /// Each app gets its own schema, dropped in `cleanup`.
    Postgres {
        schema: String,
        admin_database_url: String,
    },
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: Backend,
}

impl TestApp {
    pub fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {})
    }

    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let mut config = base_config();
        config.database.backend = StoreBackend::Memory;
        configure(&mut config);

        let store = Arc::new(InMemoryQuestionStore::with_tags(seed_tags()));
        let identity = JwtIdentityProvider::new(config.auth.clone())
            .map_err(|e| anyhow::anyhow!("build identity provider: {e:?}"))?;

        let state = AppState::with_components(config, store.clone(), Arc::new(identity));
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            backend: Backend::Memory(store),
        })
    }

    /// Build an app on a fresh Postgres schema, or `None` when no test database is configured.
    pub async fn postgres() -> anyhow::Result<Option<Self>> {
        let Some(admin_database_url) = test_database_url() else {
            return Ok(None);
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        let mut config = base_config();
        config.database.backend = StoreBackend::Postgres;
        config.database.url = with_search_path(&admin_database_url, &schema)?;
        config.database.run_migrations = true;
        config.database.pool_min_size = 0;
        config.database.pool_max_size = 4;
        config.database.pool_timeout_seconds = 30;
        config.database.statement_timeout_seconds = 30;

        let state = AppState::new(config)
            .await
            .context("initialize AppState on postgres")?;
        let pool = state
            .db_pool
            .clone()
            .context("postgres backend exposes its pool")?;
        for tag in seed_tags() {
            sqlx::query("INSERT INTO tags (slug, name) VALUES ($1, $2)")
                .bind(&tag.slug)
                .bind(&tag.name)
                .execute(&pool)
                .await
                .context("seed tag")?;
        }

        let router = create_router(state.clone());
        Ok(Some(Self {
            router,
            state,
            backend: Backend::Postgres {
                schema,
                admin_database_url,
            },
        }))
    }

    pub async fn question_count(&self) -> anyhow::Result<usize> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.question_count().await),
            Backend::Postgres { .. } => {
                let pool = self.state.db_pool.as_ref().context("postgres pool")?;
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
                    .fetch_one(pool)
                    .await
                    .context("count questions")?;
                Ok(count as usize)
            }
        }
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        let Backend::Postgres {
            schema,
            admin_database_url,
        } = self.backend
        else {
            return Ok(());
        };

        if let Some(pool) = &self.state.db_pool {
            pool.close().await;
        }

        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;

        Ok(())
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut builder = Request::builder().method(method).uri(path_and_query);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).context("serialize body")?)
            }
            None => Body::empty(),
        };
        let request = builder.body(body).context("build request")?;

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }

    /// POST a question as `token` and return the created record.
    pub async fn create_question(&self, token: &str, body: Value) -> anyhow::Result<Value> {
        let (status, _headers, bytes) = self
            .request(Method::POST, "/questions", Some(body), Some(token))
            .await?;
        assert_status(status, StatusCode::CREATED, "create question");
        serde_json::from_slice(&bytes).context("parse created question")
    }

    pub async fn get_json(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let (status, _headers, bytes) = self.request(Method::GET, path, None, None).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("parse response body")?
        };
        Ok((status, value))
    }
}

/// Run `f` against a Postgres-backed app and drop its schema afterwards, even on panic.
///
/// Without a configured test database the test is skipped.
pub async fn with_postgres_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(app) = TestApp::postgres().await? else {
        eprintln!("skipping postgres test: set {TEST_DATABASE_URL_ENV} or DATABASE_URL");
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&app)).catch_unwind().await;
    if let Err(e) = app.cleanup().await {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn test_database_url() -> Option<String> {
    std::env::var(TEST_DATABASE_URL_ENV)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}

fn base_config() -> Config {
    let mut config = Config::default();
    config.auth.hs256_secret = Some(TEST_SECRET.to_string());
    config
}

fn seed_tags() -> Vec<Tag> {
    vec![
        Tag::new("rust", "Rust"),
        Tag::new("go", "Go"),
        Tag::new("python", "Python"),
        Tag::new("databases", "Databases"),
    ]
}

/// Mint an HS256 token carrying `sub` and `name`.
pub fn token_for(subject: &str, name: &str) -> String {
    sign(json!({ "sub": subject, "name": name }))
}

/// Sign arbitrary claims; an `exp` one hour out is added when absent.
pub fn sign(mut claims: Value) -> String {
    if claims.get("exp").is_none() {
        claims["exp"] = json!(chrono::Utc::now().timestamp() + 3600);
    }
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("sign test token")
}
