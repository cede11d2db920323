//! Authentication primitives.
//!
//! The service is an OAuth2/OIDC *resource server*: an external identity provider
//! issues bearer tokens and this service only verifies them. Handlers never touch
//! tokens directly; they receive a [`Principal`] that the middleware attached to the
//! request, so any [`IdentityProvider`] implementation can be swapped in.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::{
    config::AuthConfig, error::error_response, request_context::RequestContext, state::AppState,
};

/// The verified caller, as far as the token told us.
///
/// Both claims are optional: a token can be valid and still lack them. Operations
/// that need them decide how to fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub subject: Option<String>,
    pub display_name: Option<String>,
    pub issuer: Option<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            display_name: Some(display_name.into()),
            issuer: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
    Misconfigured(String),
    Upstream(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn diagnostics(&self) -> String {
        match self {
            Self::MissingToken => "Missing bearer token".to_string(),
            Self::InvalidToken(msg) => format!("Invalid bearer token: {msg}"),
            Self::Misconfigured(msg) => format!("Authentication misconfigured: {msg}"),
            Self::Upstream(msg) => format!("Authentication upstream error: {msg}"),
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.diagnostics(), "Authentication failure");
        }

        let mut response = error_response(status, self.diagnostics());
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Source of caller identity for a request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify the credentials carried in `headers`.
    ///
    /// # Returns
    /// * `Ok(Some(principal))` - A valid credential was presented
    /// * `Ok(None)` - No credential was presented
    /// * `Err(_)` - A credential was presented but could not be verified
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: Option<String>,
    pub jwks_uri: String,
}

#[derive(Debug, Default)]
struct JwksCache {
    jwks_uri: Option<String>,
    jwks: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

/// Verifies JWT bearer tokens: RS256 against the issuer's JWKS, HS256 against a shared secret.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    config: Arc<AuthConfig>,
    http: reqwest::Client,
    jwks_cache: Arc<RwLock<JwksCache>>,
}

impl JwtIdentityProvider {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let timeout = Duration::from_secs(config.oidc.http_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Misconfigured(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            http,
            jwks_cache: Arc::new(RwLock::new(JwksCache::default())),
        })
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn principal_from_claims(&self, claims: &serde_json::Value) -> Principal {
        let string_claim = |name: &str| {
            claims
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        Principal {
            subject: string_claim(&self.config.subject_claim),
            display_name: string_claim(&self.config.display_name_claim),
            issuer: string_claim("iss"),
        }
    }

    async fn decode_and_validate_jwt(
        &self,
        token: &str,
    ) -> Result<TokenData<serde_json::Value>, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("Failed to decode JWT header: {e}")))?;

        let (decoding_key, mut validation) = match header.alg {
            Algorithm::RS256 => {
                let kid = header.kid.clone().ok_or_else(|| {
                    AuthError::InvalidToken("JWT header missing 'kid'".to_string())
                })?;
                if self.config.oidc.issuer_url.is_none() {
                    return Err(AuthError::InvalidToken(
                        "RS256 tokens are not accepted without an OIDC issuer".to_string(),
                    ));
                }
                let jwks = self.get_jwks().await?;
                let jwk = jwks.find(&kid).ok_or_else(|| {
                    AuthError::InvalidToken(format!("No matching JWK for kid '{kid}'"))
                })?;
                (decoding_key_from_jwk(jwk)?, Validation::new(Algorithm::RS256))
            }
            Algorithm::HS256 => {
                let secret = self.config.hs256_secret.as_deref().ok_or_else(|| {
                    AuthError::InvalidToken("HS256 tokens are not accepted".to_string())
                })?;
                (
                    DecodingKey::from_secret(secret.as_bytes()),
                    Validation::new(Algorithm::HS256),
                )
            }
            other => {
                return Err(AuthError::InvalidToken(format!(
                    "Unsupported JWT alg '{other:?}' (only RS256 and HS256 are supported)"
                )));
            }
        };

        match &self.config.oidc.issuer_url {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match &self.config.oidc.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation.leeway = 60;

        decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(format!("{e}")))
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        let ttl = Duration::from_secs(self.config.oidc.jwks_cache_ttl_seconds);

        {
            let cache = self.jwks_cache.read().await;
            if let (Some(jwks), Some(fetched_at)) = (&cache.jwks, cache.fetched_at) {
                if fetched_at.elapsed() <= ttl {
                    return Ok(jwks.clone());
                }
            }
        }

        let jwks_uri = self.get_jwks_uri().await?;
        let jwks = self.fetch_json::<JwkSet>(&jwks_uri, "JWKS").await?;

        let mut cache = self.jwks_cache.write().await;
        cache.jwks = Some(jwks.clone());
        cache.jwks_uri = Some(jwks_uri);
        cache.fetched_at = Some(Instant::now());
        Ok(jwks)
    }

    async fn get_jwks_uri(&self) -> Result<String, AuthError> {
        if let Some(uri) = self.config.oidc.jwks_url.clone() {
            return Ok(uri);
        }

        {
            let cache = self.jwks_cache.read().await;
            if let Some(uri) = cache.jwks_uri.clone() {
                return Ok(uri);
            }
        }

        let issuer = self
            .config
            .oidc
            .issuer_url
            .as_deref()
            .ok_or_else(|| AuthError::Misconfigured("auth.oidc.issuer_url is not set".into()))?;
        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );

        let doc = self.fetch_json::<OidcDiscovery>(&url, "OIDC discovery").await?;
        check_discovered_issuer(issuer, doc.issuer.as_deref())?;
        Ok(doc.jwks_uri)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, AuthError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("{what} fetch failed: {e}")))?;
        if !res.status().is_success() {
            return Err(AuthError::Upstream(format!(
                "{what} fetch returned HTTP {}",
                res.status()
            )));
        }
        res.json::<T>()
            .await
            .map_err(|e| AuthError::Upstream(format!("{what} JSON parse failed: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
        if !self.enabled() {
            return Ok(None);
        }

        let Some(token) = bearer_token(headers)? else {
            return Ok(None);
        };

        let token_data = self.decode_and_validate_jwt(token).await?;
        Ok(Some(self.principal_from_claims(&token_data.claims)))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(authz) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let authz = authz.to_str().map_err(|_| {
        AuthError::InvalidToken("Authorization header is not valid UTF-8".to_string())
    })?;

    authz
        .strip_prefix("Bearer ")
        .or_else(|| authz.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| {
            AuthError::InvalidToken("Authorization header must be 'Bearer <token>'".to_string())
        })
}

/// The discovery document must describe the configured issuer, ignoring a trailing slash.
fn check_discovered_issuer(configured: &str, discovered: Option<&str>) -> Result<(), AuthError> {
    match discovered {
        None => Ok(()),
        Some(found) if found.trim_end_matches('/') == configured.trim_end_matches('/') => Ok(()),
        Some(found) => Err(AuthError::Misconfigured(format!(
            "OIDC discovery issuer '{found}' does not match configured issuer '{configured}'"
        ))),
    }
}

fn decoding_key_from_jwk(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::InvalidToken(format!("Failed to build RSA decoding key: {e}"))),
        _ => Err(AuthError::InvalidToken(
            "Unsupported JWK type (only RSA keys are supported)".to_string(),
        )),
    }
}

/// Extractor for the principal attached by [`auth_middleware`].
///
/// Protected handlers take this; requests without a verified credential are
/// rejected with 401 before the handler (and therefore the store) runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or_else(|| AuthError::MissingToken.into_response())
    }
}

/// Attach the caller's `Principal` when a valid bearer token is present.
///
/// Missing tokens pass through so public routes stay public; presented but
/// invalid tokens are rejected outright.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    match state.identity.authenticate(req.headers()).await {
        Ok(Some(principal)) => {
            tracing::debug!(
                subject = ?principal.subject,
                issuer = ?principal.issuer,
                "Authenticated request"
            );
            req.extensions_mut().insert::<Principal>(principal);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(err) => {
            let request_id = req
                .extensions()
                .get::<RequestContext>()
                .map(|c| c.request_id.clone());
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                request_id = ?request_id,
                error = %err.diagnostics(),
                "Rejected bearer token"
            );
            err.into_response()
        }
    }
}
