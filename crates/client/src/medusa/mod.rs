//! Medusa-compatible commerce backend client.
//!
//! # Architecture
//!
//! - One [`MedusaClient`] is the single gateway for outbound HTTP calls
//! - The backend is the source of truth - every call returns its authoritative
//!   JSON, typed but otherwise untransformed
//! - Every request carries the tenant header and, when a customer is signed
//!   in, `Authorization: Bearer <token>`
//! - No retries and no backoff: failures propagate to the caller immediately
//! - Catalog reads (products, collections) are cached via `moka`
//!
//! # Resource families
//!
//! Each domain module adds methods for one family of `/store/*` endpoints:
//! [`auth`], [`cart`], [`checkout`], [`products`], [`orders`],
//! [`subscriptions`], [`addresses`], [`payments`], [`content`], and
//! [`analytics`] (which wraps the client in an [`AnalyticsTracker`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medusa_storefront_client::medusa::MedusaClient;
//! use medusa_storefront_client::storage::MemoryStore;
//!
//! let client = MedusaClient::new(&config, Arc::new(MemoryStore::new()))?;
//!
//! let product = client.get_product_by_handle("cold-brew").await?;
//! let cart = client.add_line_item(&product.variants[0].id, 1).await?;
//! ```

pub mod addresses;
pub mod analytics;
pub mod auth;
mod cache;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod orders;
pub mod payments;
pub mod products;
pub mod subscriptions;
pub mod types;

pub use analytics::AnalyticsTracker;
pub use types::*;

use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{PUBLISHABLE_KEY_HEADER, StorefrontConfig, TENANT_HEADER};
use crate::storage::{KeyValueStore, StorageError, keys};

use cache::CacheValue;

/// Characters of a response body included in log events.
const LOG_BODY_LIMIT: usize = 500;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum MedusaError {
    /// Network-level failure (DNS, connection refused, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend-provided `message`, or a generic fallback.
        message: String,
    },

    /// A 2xx body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A lookup by handle or slug matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisting identity state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MedusaError {
    /// HTTP status for backend errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }

    /// Whether the backend rejected the credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Extract the user-facing message from an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed (HTTP {})", status.as_u16()))
}

/// Percent-encode one URL path segment so ids and codes cannot change the
/// route (`#`, `/`, `?`).
pub(crate) fn segment<T: AsRef<str> + ?Sized>(value: &T) -> Cow<'_, str> {
    urlencoding::encode(value.as_ref())
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

// =============================================================================
// MedusaClient
// =============================================================================

/// Client for the Medusa-compatible storefront API.
///
/// Cheap to clone; all clones share the HTTP connection pool, the bearer
/// token, the identity store and the catalog cache.
#[derive(Clone)]
pub struct MedusaClient {
    inner: Arc<MedusaClientInner>,
}

struct MedusaClientInner {
    http: reqwest::Client,
    base_url: String,
    tenant_id: String,
    publishable_key: Option<SecretString>,
    token: RwLock<Option<SecretString>>,
    store: Arc<dyn KeyValueStore>,
    catalog: Option<Cache<String, CacheValue>>,
}

impl MedusaClient {
    /// Create a new client, picking up any bearer token already in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: &StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, MedusaError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let catalog = (!config.catalog_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(config.catalog_cache_ttl)
                .build()
        });

        let token = store.get(keys::AUTH_TOKEN).map(SecretString::from);

        Ok(Self {
            inner: Arc::new(MedusaClientInner {
                http: builder.build()?,
                base_url: config.backend_url.as_str().trim_end_matches('/').to_string(),
                tenant_id: config.tenant_id.clone(),
                publishable_key: config.publishable_key.clone(),
                token: RwLock::new(token),
                store,
                catalog,
            }),
        })
    }

    /// The identity store shared with the session layer.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    pub(crate) fn catalog(&self) -> Option<&Cache<String, CacheValue>> {
        self.inner.catalog.as_ref()
    }

    // =========================================================================
    // Bearer Token
    // =========================================================================

    /// Whether a bearer token is currently held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the bearer token and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the token could not be persisted; the in-memory
    /// token is updated regardless.
    pub fn set_token(&self, token: &str) -> Result<(), MedusaError> {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(SecretString::from(token.to_owned()));
        self.inner.store.set(keys::AUTH_TOKEN, token)?;
        Ok(())
    }

    /// Drop the bearer token from memory and storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token could not be removed; the
    /// in-memory token is cleared regardless.
    pub fn clear_token(&self) -> Result<(), MedusaError> {
        self.inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.store.remove(keys::AUTH_TOKEN)?;
        Ok(())
    }

    fn bearer(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET` a resource.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or a body that
    /// does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, MedusaError> {
        self.send(self.request(Method::GET, path)).await
    }

    /// `GET` a resource with serialized query parameters.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::get`].
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, MedusaError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path).query(query))
            .await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::get`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, MedusaError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// `POST` without a body.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::get`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, MedusaError> {
        self.send(self.request(Method::POST, path)).await
    }

    /// `PATCH` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::get`].
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, MedusaError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, path).json(body))
            .await
    }

    /// `DELETE` a resource.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::get`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, MedusaError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .header(TENANT_HEADER, &self.inner.tenant_id);

        if let Some(key) = &self.inner.publishable_key {
            builder = builder.header(PUBLISHABLE_KEY_HEADER, key.expose_secret());
        }
        if let Some(bearer) = self.bearer() {
            builder = builder.header(reqwest::header::AUTHORIZATION, bearer);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, MedusaError> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED && self.has_token() {
                tracing::info!(path = %url, "Backend rejected bearer token, clearing it");
                if let Err(e) = self.clear_token() {
                    tracing::warn!(error = %e, "Failed to remove rejected token from storage");
                }
            }

            let message = error_message(status, &text);
            tracing::warn!(
                status = %status,
                path = %url,
                body = %truncate(&text),
                "Backend returned non-success status"
            );
            return Err(MedusaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %url,
                body = %truncate(&text),
                "Failed to parse backend response"
            );
            MedusaError::Parse(e)
        })
    }
}
