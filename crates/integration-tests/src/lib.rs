//! End-to-end tests of the storefront sessions.
//!
//! Every test runs the real client against a `wiremock` server standing in
//! for the commerce backend, so no network access or backend is needed.
//!
//! ```bash
//! cargo test -p medusa-storefront-integration-tests
//! ```
//!
//! This library holds the shared fixtures: a [`TestBackend`] that wires a
//! [`Storefront`] to a mock server, and JSON builders for backend payloads.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medusa_storefront_client::storage::{KeyValueStore, MemoryStore, keys};
use medusa_storefront_client::{MedusaClient, Storefront, StorefrontConfig};

/// Tenant slug every test client sends.
pub const TENANT: &str = "sunrise";

/// A mock backend plus the identity store the storefront persists into.
pub struct TestBackend {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
}

impl TestBackend {
    /// Start a mock backend with analytics endpoints accepting everything.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        for endpoint in ["/store/webhooks/track", "/store/webhooks/identify"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .mount(&server)
                .await;
        }
        Self {
            server,
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Client configuration pointing at the mock backend.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config = StorefrontConfig::new(self.server.uri().parse().unwrap(), TENANT);
        config.catalog_cache_ttl = Duration::from_secs(60);
        config
    }

    /// A fresh storefront over the shared store, as after a page reload.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        Storefront::from_client(MedusaClient::new(&self.config(), store).unwrap())
    }

    /// Pretend a previous visit left a cart id behind.
    pub fn remember_cart(&self, cart_id: &str) {
        self.store.set(keys::CART_ID, cart_id).unwrap();
    }

    /// Pretend a previous visit left a token behind.
    pub fn remember_token(&self, token: &str) {
        self.store.set(keys::AUTH_TOKEN, token).unwrap();
    }

    /// Stored cart id, if any.
    #[must_use]
    pub fn stored_cart_id(&self) -> Option<String> {
        self.store.get(keys::CART_ID)
    }

    /// Requests the backend received for `method` on `path`.
    pub async fn requests_to(&self, http_method: &str, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .count()
    }
}

/// A cart line as the backend returns it.
#[must_use]
pub fn line(id: &str, variant_id: &str, quantity: u32, unit_price: i64) -> Value {
    json!({
        "id": id,
        "variant_id": variant_id,
        "title": format!("Variant {variant_id}"),
        "quantity": quantity,
        "unit_price": unit_price,
    })
}

/// A cart as the backend returns it. The subtotal is given, not derived,
/// so tests can tell backend totals from client arithmetic.
#[must_use]
pub fn cart(id: &str, items: &[Value], subtotal: i64) -> Value {
    json!({
        "cart": {
            "id": id,
            "currency_code": "usd",
            "items": items,
            "subtotal": subtotal,
            "total": subtotal,
        }
    })
}

/// A customer as the backend returns it.
#[must_use]
pub fn customer(id: &str, email: &str) -> Value {
    json!({ "id": id, "email": email, "first_name": "Jane", "last_name": "Doe" })
}

/// JSON response helper.
#[must_use]
pub fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Backend error response with a `message`.
#[must_use]
pub fn error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "message": message }))
}
