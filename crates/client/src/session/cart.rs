//! Current cart state.
//!
//! Every mutation replaces the whole snapshot with the cart the backend
//! returned; nothing is patched locally. Mutations on one session are
//! serialized, so responses are applied in the order the calls were made.
//! Item count and subtotal are read from the snapshot on every call.

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::instrument;

use medusa_storefront_core::{LineItemId, VariantId, format_amount};

use crate::error::{LoadError, add_breadcrumb, messages, report};
use crate::medusa::analytics::{AnalyticsTracker, events, line_properties};
use crate::medusa::cart::{SubscriptionLineInput, UpdateCartInput};
use crate::medusa::{Cart, LineItem, MedusaClient, MedusaError};

/// Holds the one in-memory copy of the current cart.
pub struct CartSession {
    client: MedusaClient,
    analytics: Option<AnalyticsTracker>,
    mutations: Mutex<()>,
    cart: RwLock<Option<Cart>>,
    error: RwLock<Option<&'static str>>,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("cart_id", &self.cart().map(|c| c.id))
            .field("item_count", &self.item_count())
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// New session with no cart loaded.
    #[must_use]
    pub fn new(client: MedusaClient) -> Self {
        Self {
            client,
            analytics: None,
            mutations: Mutex::new(()),
            cart: RwLock::new(None),
            error: RwLock::new(None),
        }
    }

    /// Report confirmed additions through `tracker`.
    #[must_use]
    pub fn with_analytics(mut self, tracker: AnalyticsTracker) -> Self {
        self.analytics = Some(tracker);
        self
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// The last cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines of the last snapshot.
    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|cart| cart.items.clone())
            .unwrap_or_default()
    }

    /// Sum of line quantities in the last snapshot.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Cart::item_count)
    }

    /// Backend-reported subtotal of the last snapshot, in minor units.
    #[must_use]
    pub fn subtotal(&self) -> i64 {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |cart| cart.subtotal)
    }

    /// Subtotal formatted in the cart currency.
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or_else(|| format_amount(0, "usd"), Cart::subtotal_display)
    }

    /// User-facing message from the last failed action.
    #[must_use]
    pub fn error(&self) -> Option<&'static str> {
        *self.error.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dismiss the error message.
    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn set_error(&self, message: Option<&'static str>) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn replace(&self, cart: Option<Cart>) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = cart;
    }

    // =========================================================================
    // Loader
    // =========================================================================

    /// Load the cart named by the stored id. Never creates a cart.
    ///
    /// On failure the snapshot is left empty and, for backend failures,
    /// [`messages::CART_LOAD_FAILED`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoIdentity`] when there is no current cart, or
    /// [`LoadError::Backend`] when it could not be fetched.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Cart, LoadError> {
        let _guard = self.mutations.lock().await;

        match self.client.current_cart().await {
            Ok(Some(cart)) => {
                self.set_error(None);
                self.replace(Some(cart.clone()));
                Ok(cart)
            }
            Ok(None) => {
                self.replace(None);
                Err(LoadError::NoIdentity("cart id"))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cart");
                report(&e);
                self.set_error(Some(messages::CART_LOAD_FAILED));
                self.replace(None);
                Err(LoadError::Backend(e))
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Run one backend mutation with the session lock held and install its
    /// snapshot.
    async fn mutate<F, Fut>(&self, failure: &'static str, op: F) -> Result<Cart, MedusaError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Cart, MedusaError>>,
    {
        let _guard = self.mutations.lock().await;

        match op().await {
            Ok(cart) => {
                self.set_error(None);
                self.replace(Some(cart.clone()));
                Ok(cart)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cart mutation failed");
                report(&e);
                self.set_error(Some(failure));
                Err(e)
            }
        }
    }

    async fn record_line(&self, event: &str, cart: &Cart, variant_id: &VariantId) {
        let (Some(tracker), Some(line)) = (&self.analytics, cart.find_line_by_variant(variant_id))
        else {
            return;
        };
        tracker
            .record(event, line_properties(line, &cart.currency_code))
            .await;
    }

    /// Add a variant to the cart.
    ///
    /// On success an analytics event is sent with the line as the backend
    /// returned it.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::ADD_TO_CART_FAILED`].
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn add_to_cart(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", variant_id.as_str())]));
        let cart = self
            .mutate(messages::ADD_TO_CART_FAILED, || {
                self.client.add_line_item(variant_id, quantity)
            })
            .await?;
        self.record_line(events::ADDED_TO_CART, &cart, variant_id)
            .await;
        Ok(cart)
    }

    /// Add a subscription line.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::ADD_TO_CART_FAILED`].
    #[instrument(skip(self, input), fields(variant_id = %input.variant_id))]
    pub async fn add_subscription(
        &self,
        input: &SubscriptionLineInput,
    ) -> Result<Cart, MedusaError> {
        add_breadcrumb(
            "cart",
            "Add subscription",
            Some(&[("variant_id", input.variant_id.as_str())]),
        );
        let cart = self
            .mutate(messages::ADD_TO_CART_FAILED, || {
                self.client.add_subscription_item(input)
            })
            .await?;
        self.record_line(events::STARTED_SUBSCRIPTION, &cart, &input.variant_id)
            .await;
        Ok(cart)
    }

    /// Set a line's quantity. Zero or less removes the line instead.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::CART_UPDATE_FAILED`]
    /// (or [`messages::REMOVE_FROM_CART_FAILED`] for removals).
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &self,
        line_id: &LineItemId,
        quantity: i64,
    ) -> Result<Cart, MedusaError> {
        if quantity <= 0 {
            return self.remove_item(line_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        self.mutate(messages::CART_UPDATE_FAILED, || {
            self.client.update_line_item(line_id, quantity)
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting
    /// [`messages::REMOVE_FROM_CART_FAILED`].
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: &LineItemId) -> Result<Cart, MedusaError> {
        self.mutate(messages::REMOVE_FROM_CART_FAILED, || {
            self.client.remove_line_item(line_id)
        })
        .await
    }

    /// Apply a discount code.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::DISCOUNT_FAILED`].
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, code: &str) -> Result<Cart, MedusaError> {
        self.mutate(messages::DISCOUNT_FAILED, || self.client.apply_discount(code))
            .await
    }

    /// Remove a discount code.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::CART_UPDATE_FAILED`].
    #[instrument(skip(self))]
    pub async fn remove_discount(&self, code: &str) -> Result<Cart, MedusaError> {
        self.mutate(messages::CART_UPDATE_FAILED, || {
            self.client.remove_discount(code)
        })
        .await
    }

    /// Set checkout email and addresses.
    ///
    /// # Errors
    ///
    /// Returns the backend error after setting [`messages::CART_UPDATE_FAILED`].
    #[instrument(skip(self, input))]
    pub async fn set_addresses(&self, input: &UpdateCartInput) -> Result<Cart, MedusaError> {
        self.mutate(messages::CART_UPDATE_FAILED, || self.client.update_cart(input))
            .await
    }

    /// Forget the current cart; the next addition starts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored cart id could not be removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), MedusaError> {
        let _guard = self.mutations.lock().await;
        self.client.forget_cart()?;
        self.replace(None);
        self.set_error(None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::medusa::tests::test_client;
    use crate::storage::{KeyValueStore, keys};

    fn cart_body(items: serde_json::Value, subtotal: i64) -> serde_json::Value {
        json!({"cart": {"id": "cart_1", "items": items, "subtotal": subtotal, "total": subtotal}})
    }

    fn line(id: &str, variant: &str, quantity: u32) -> serde_json::Value {
        json!({"id": id, "variant_id": variant, "title": "Cold Brew", "quantity": quantity, "unit_price": 600})
    }

    async fn mount_existing_cart(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/store/carts/cart_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(json!([]), 0)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_load_without_cart_id() {
        let server = MockServer::start().await;
        let (client, _) = test_client(&server);
        let session = CartSession::new(client);

        let err = session.load().await.unwrap_err();
        assert!(err.is_no_identity());
        assert!(session.cart().is_none());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_sets_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/carts/cart_1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session = CartSession::new(client);

        assert!(matches!(session.load().await, Err(LoadError::Backend(_))));
        assert!(session.cart().is_none());
        assert_eq!(session.error(), Some(messages::CART_LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_snapshot_is_replaced_not_merged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/carts/cart_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(
                json!([line("li_1", "variant_1", 1), line("li_2", "variant_2", 1)]),
                1200,
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/line-items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(cart_body(json!([line("li_3", "variant_3", 2)]), 1200)),
            )
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session = CartSession::new(client);
        session.load().await.unwrap();
        assert_eq!(session.items().len(), 2);

        let returned = session
            .add_to_cart(&VariantId::new("variant_3"), 2)
            .await
            .unwrap();

        assert_eq!(session.items(), returned.items);
        assert_eq!(session.item_count(), 2);
        assert_eq!(session.subtotal(), 1200);
        assert_eq!(session.subtotal_display(), "$12.00");
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let server = MockServer::start().await;
        mount_existing_cart(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/store/carts/cart_1/line-items/li_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(json!([]), 0)))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/line-items/li_1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session = CartSession::new(client);
        let line_id = LineItemId::new("li_1");

        session.update_quantity(&line_id, 0).await.unwrap();
        assert!(session.items().is_empty());
        session.update_quantity(&line_id, -3).await.unwrap();
        assert_eq!(session.item_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/carts/cart_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(cart_body(json!([line("li_1", "variant_1", 1)]), 600)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/discounts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Code expired"})))
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session = CartSession::new(client);
        session.load().await.unwrap();

        let err = session.apply_discount("SUMMER").await.unwrap_err();
        assert_eq!(err.to_string(), "Code expired");
        assert_eq!(session.error(), Some(messages::DISCOUNT_FAILED));
        assert_eq!(session.item_count(), 1);
    }

    #[tokio::test]
    async fn test_add_reports_confirmed_line() {
        let server = MockServer::start().await;
        mount_existing_cart(&server).await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/line-items"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(cart_body(json!([line("li_1", "variant_1", 3)]), 1800)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/webhooks/track"))
            .and(wiremock::matchers::body_partial_json(json!({
                "event": "Added to Cart",
                "properties": {"variant_id": "variant_1", "quantity": 3, "unit_price": 600}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session =
            CartSession::new(client.clone()).with_analytics(AnalyticsTracker::new(client));

        session
            .add_to_cart(&VariantId::new("variant_1"), 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clear_forgets_cart() {
        let server = MockServer::start().await;
        mount_existing_cart(&server).await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();
        let session = CartSession::new(client);
        session.load().await.unwrap();

        session.clear().await.unwrap();
        assert!(session.cart().is_none());
        assert!(store.get(keys::CART_ID).is_none());
    }
}
