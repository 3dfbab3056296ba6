//! Storefront analytics ingestion.
//!
//! Anonymous behavior is correlated through two opaque ids:
//!
//! - a long-lived **fingerprint**, generated once and persisted under
//!   [`keys::FINGERPRINT_ID`], reused until the store is wiped
//! - a **session id**, generated per [`AnalyticsTracker`] and never persisted
//!
//! [`AnalyticsTracker::identify`] ties both to a customer after sign-in.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use super::types::{Customer, LineItem};
use super::{MedusaClient, MedusaError};
use crate::storage::keys;

/// Event names understood by the backend.
pub mod events {
    pub const VIEWED_PRODUCT: &str = "Viewed Product";
    pub const ADDED_TO_CART: &str = "Added to Cart";
    pub const STARTED_SUBSCRIPTION: &str = "Started Subscription";
    pub const STARTED_CHECKOUT: &str = "Started Checkout";
    pub const PLACED_ORDER: &str = "Placed Order";
}

/// Sends track and identify calls for one visitor session.
#[derive(Clone)]
pub struct AnalyticsTracker {
    client: MedusaClient,
    fingerprint_id: String,
    session_id: String,
}

impl std::fmt::Debug for AnalyticsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsTracker")
            .field("fingerprint_id", &self.fingerprint_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl AnalyticsTracker {
    /// Start a session, reusing the stored fingerprint or creating one.
    ///
    /// A fingerprint that cannot be persisted is still used for this
    /// session; the failure is logged.
    #[must_use]
    pub fn new(client: MedusaClient) -> Self {
        let fingerprint_id = client.store().get(keys::FINGERPRINT_ID).unwrap_or_else(|| {
            let id = Uuid::new_v4().to_string();
            if let Err(e) = client.store().set(keys::FINGERPRINT_ID, &id) {
                tracing::warn!(error = %e, "Failed to persist analytics fingerprint");
            }
            id
        });

        Self {
            client,
            fingerprint_id,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Long-lived anonymous visitor id.
    #[must_use]
    pub fn fingerprint_id(&self) -> &str {
        &self.fingerprint_id
    }

    /// Id of this session.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the event.
    #[instrument(skip(self, properties))]
    pub async fn track(&self, event: &str, properties: Value) -> Result<(), MedusaError> {
        let body = json!({
            "event": event,
            "properties": properties,
            "fingerprint_id": self.fingerprint_id,
            "session_id": self.session_id,
            "timestamp": Utc::now(),
        });
        let _: serde::de::IgnoredAny = self.client.post("/store/webhooks/track", &body).await?;
        Ok(())
    }

    /// Associate this visitor with a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the call.
    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    pub async fn identify(&self, customer: &Customer) -> Result<(), MedusaError> {
        let body = json!({
            "fingerprint_id": self.fingerprint_id,
            "session_id": self.session_id,
            "customer_id": customer.id,
            "email": customer.email,
            "first_name": customer.first_name,
            "last_name": customer.last_name,
        });
        let _: serde::de::IgnoredAny = self
            .client
            .post("/store/webhooks/identify", &body)
            .await?;
        Ok(())
    }

    /// [`track`](Self::track), logging instead of returning failures.
    pub async fn record(&self, event: &str, properties: Value) {
        if let Err(e) = self.track(event, properties).await {
            tracing::warn!(event, error = %e, "Analytics event dropped");
        }
    }

    /// [`identify`](Self::identify), logging instead of returning failures.
    pub async fn record_identity(&self, customer: &Customer) {
        if let Err(e) = self.identify(customer).await {
            tracing::warn!(customer_id = %customer.id, error = %e, "Analytics identify dropped");
        }
    }
}

/// Event properties for a cart line, taken from the backend's snapshot.
#[must_use]
pub fn line_properties(line: &LineItem, currency_code: &str) -> Value {
    json!({
        "line_item_id": line.id,
        "variant_id": line.variant_id,
        "product_id": line.product_id,
        "title": line.title,
        "quantity": line.quantity,
        "unit_price": line.unit_price,
        "currency_code": currency_code,
        "is_subscription": line.is_subscription(),
    })
}
