//! Checkout: shipping, payment sessions and cart completion.
//!
//! Checkout hands off to the backend; nothing here validates or prices the
//! cart locally.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use medusa_storefront_core::{CartId, ShippingOptionId};

use super::cart::CartEnvelope;
use super::types::{Cart, Order, ShippingOption};
use super::{MedusaClient, MedusaError, segment};

/// Outcome of completing a cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum CompletedCart {
    /// The cart became an order.
    Order(Box<Order>),
    /// Payment needs further action; the cart is still open.
    Cart(Box<Cart>),
}

impl CompletedCart {
    /// The placed order, if completion succeeded.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Order(order) => Some(order),
            Self::Cart(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ShippingOptionsEnvelope {
    shipping_options: Vec<ShippingOption>,
}

impl MedusaClient {
    /// Shipping options available for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart does not exist or the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn list_shipping_options(
        &self,
        cart_id: &CartId,
    ) -> Result<Vec<ShippingOption>, MedusaError> {
        let envelope: ShippingOptionsEnvelope = self
            .get(&format!("/store/shipping-options/{}", segment(cart_id)))
            .await?;
        Ok(envelope.shipping_options)
    }

    /// Select a shipping option for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is not valid for the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, option_id = %option_id))]
    pub async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, MedusaError> {
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/shipping-methods", segment(cart_id)),
                &json!({ "option_id": option_id }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Initialize payment sessions for every provider enabled on the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the sessions.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn create_payment_sessions(&self, cart_id: &CartId) -> Result<Cart, MedusaError> {
        let envelope: CartEnvelope = self
            .post_empty(&format!("/store/carts/{}/payment-sessions", segment(cart_id)))
            .await?;
        Ok(envelope.cart)
    }

    /// Choose the payment provider for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no session on the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &str,
    ) -> Result<Cart, MedusaError> {
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/payment-session", segment(cart_id)),
                &json!({ "provider_id": provider_id }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Complete a cart. When an order comes back and the cart was the stored
    /// current cart, the stored id is cleared so the next mutation creates a
    /// fresh cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to complete the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn complete_cart(&self, cart_id: &CartId) -> Result<CompletedCart, MedusaError> {
        let completed: CompletedCart = self
            .post_empty(&format!("/store/carts/{}/complete", segment(cart_id)))
            .await?;

        if let CompletedCart::Order(order) = &completed {
            tracing::info!(cart_id = %cart_id, order_id = %order.id, "Cart completed");
            if self.stored_cart_id().as_ref() == Some(cart_id) {
                self.forget_cart()?;
            }
        }
        Ok(completed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::medusa::tests::test_client;
    use crate::storage::{KeyValueStore, keys};

    #[tokio::test]
    async fn test_shipping_flow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/shipping-options/cart_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shipping_options": [{"id": "so_std", "name": "Standard", "amount": 500}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/shipping-methods"))
            .and(body_json(json!({"option_id": "so_std"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cart": {"id": "cart_1", "shipping_total": 500, "shipping_methods": [{"id": "sm_1", "price": 500}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let cart_id = CartId::new("cart_1");
        let options = client.list_shipping_options(&cart_id).await.unwrap();
        assert_eq!(options[0].name, "Standard");

        let cart = client
            .add_shipping_method(&cart_id, &options[0].id)
            .await
            .unwrap();
        assert_eq!(cart.shipping_total, 500);
    }

    #[tokio::test]
    async fn test_select_payment_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/payment-sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cart": {"id": "cart_1", "payment_sessions": [{"provider_id": "stripe"}, {"provider_id": "manual"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/payment-session"))
            .and(body_json(json!({"provider_id": "stripe"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cart": {"id": "cart_1", "payment_session": {"provider_id": "stripe", "is_selected": true}}
            })))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let cart_id = CartId::new("cart_1");
        let cart = client.create_payment_sessions(&cart_id).await.unwrap();
        assert_eq!(cart.payment_sessions.len(), 2);

        let cart = client.select_payment_session(&cart_id, "stripe").await.unwrap();
        assert_eq!(cart.payment_session.unwrap().provider_id, "stripe");
    }

    #[tokio::test]
    async fn test_complete_cart_clears_stored_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/complete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "order",
                "data": {"id": "order_1", "display_id": 1042, "status": "pending", "total": 2400}
            })))
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();

        let completed = client.complete_cart(&CartId::new("cart_1")).await.unwrap();
        assert_eq!(completed.order().unwrap().display_number(), "#1042");
        assert!(store.get(keys::CART_ID).is_none());
    }

    #[tokio::test]
    async fn test_incomplete_payment_keeps_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/carts/cart_1/complete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "cart",
                "data": {"id": "cart_1"}
            })))
            .mount(&server)
            .await;

        let (client, store) = test_client(&server);
        store.set(keys::CART_ID, "cart_1").unwrap();

        let completed = client.complete_cart(&CartId::new("cart_1")).await.unwrap();
        assert!(completed.order().is_none());
        assert_eq!(store.get(keys::CART_ID).as_deref(), Some("cart_1"));
    }
}
