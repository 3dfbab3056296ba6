//! Server cart operations.
//!
//! The current cart id lives in the identity store under
//! [`keys::CART_ID`]. [`MedusaClient::get_or_create_cart`] is the only place
//! a cart is created: a stored id that no longer resolves is treated as a
//! cart that is gone, never as an error.
//!
//! Every mutation returns the backend's full cart snapshot.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use medusa_storefront_core::{CartId, LineItemId, VariantId};

use super::types::{AddressInput, Cart, Frequency};
use super::{MedusaClient, MedusaError, segment};
use crate::storage::keys;

/// Response wrapper shared by every cart endpoint.
#[derive(Deserialize)]
pub(super) struct CartEnvelope {
    pub(super) cart: Cart,
}

/// A subscription product to add as a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionLineInput {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub frequency: Frequency,
}

/// Cart fields the customer may set before checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCartInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<AddressInput>,
}

impl MedusaClient {
    /// The stored cart id, if any.
    #[must_use]
    pub fn stored_cart_id(&self) -> Option<CartId> {
        self.store().get(keys::CART_ID).map(CartId::new)
    }

    /// Drop the stored cart id so the next mutation starts a new cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored id could not be removed.
    pub fn forget_cart(&self) -> Result<(), MedusaError> {
        self.store().remove(keys::CART_ID)?;
        Ok(())
    }

    fn remember_cart(&self, id: &CartId) -> Result<(), MedusaError> {
        self.store().set(keys::CART_ID, id.as_str())?;
        Ok(())
    }

    /// Create a new cart and make it current.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request or the new id
    /// cannot be stored.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, MedusaError> {
        let envelope: CartEnvelope = self.post("/store/carts", &json!({})).await?;
        self.remember_cart(&envelope.cart.id)?;
        tracing::info!(cart_id = %envelope.cart.id, "Created cart");
        Ok(envelope.cart)
    }

    /// Fetch a cart by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart does not exist or the request fails.
    #[instrument(skip(self), fields(cart_id = %id))]
    pub async fn get_cart(&self, id: &CartId) -> Result<Cart, MedusaError> {
        let envelope: CartEnvelope = self.get(&format!("/store/carts/{}", segment(id))).await?;
        Ok(envelope.cart)
    }

    /// Resolve the current cart id, creating a cart when needed.
    ///
    /// A stored id whose cart cannot be fetched (deleted, expired, or any
    /// other failure) or whose cart has already been completed is discarded
    /// and replaced by a fresh cart.
    ///
    /// # Errors
    ///
    /// Returns an error only if creating the replacement cart fails.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self) -> Result<CartId, MedusaError> {
        if let Some(id) = self.stored_cart_id() {
            match self.get_cart(&id).await {
                Ok(cart) if cart.completed_at.is_none() => return Ok(cart.id),
                Ok(_) => tracing::debug!(cart_id = %id, "Stored cart already completed"),
                Err(e) => tracing::info!(cart_id = %id, error = %e, "Stored cart unavailable"),
            }
            if let Err(e) = self.forget_cart() {
                tracing::warn!(error = %e, "Failed to clear stale cart id");
            }
        }

        Ok(self.create_cart().await?.id)
    }

    /// Fetch the cart named by the stored id without ever creating one.
    ///
    /// Returns `Ok(None)` when no id is stored or the backend no longer
    /// knows the cart; the stale id is cleared in the latter case.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than a missing cart.
    #[instrument(skip(self))]
    pub async fn current_cart(&self) -> Result<Option<Cart>, MedusaError> {
        let Some(id) = self.stored_cart_id() else {
            return Ok(None);
        };

        match self.get_cart(&id).await {
            Ok(cart) => Ok(Some(cart)),
            Err(e) if e.is_not_found() => {
                tracing::info!(cart_id = %id, "Stored cart no longer exists");
                self.forget_cart()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Add a variant to the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be resolved or the backend
    /// rejects the line (e.g., out of stock).
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/line-items", segment(&cart_id)),
                &json!({ "variant_id": variant_id, "quantity": quantity }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Add a subscription line: the variant plus its delivery frequency in
    /// the line metadata.
    ///
    /// # Errors
    ///
    /// See [`MedusaClient::add_line_item`].
    #[instrument(skip(self, input), fields(variant_id = %input.variant_id))]
    pub async fn add_subscription_item(
        &self,
        input: &SubscriptionLineInput,
    ) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/line-items", segment(&cart_id)),
                &json!({
                    "variant_id": input.variant_id,
                    "quantity": input.quantity,
                    "metadata": {
                        "is_subscription": true,
                        "frequency_interval": input.frequency.interval,
                        "frequency_value": input.frequency.value,
                    },
                }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the backend rejects
    /// the quantity.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_line_item(
        &self,
        line_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/line-items/{}", segment(&cart_id), segment(line_id)),
                &json!({ "quantity": quantity }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Remove a line from the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the request fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line_item(&self, line_id: &LineItemId) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .delete(&format!("/store/carts/{}/line-items/{}", segment(&cart_id), segment(line_id)))
            .await?;
        Ok(envelope.cart)
    }

    /// Set email and addresses on the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, input))]
    pub async fn update_cart(&self, input: &UpdateCartInput) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .patch(&format!("/store/carts/{}", segment(&cart_id)), input)
            .await?;
        Ok(envelope.cart)
    }

    /// Apply a discount code to the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is invalid or not applicable.
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, code: &str) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .post(
                &format!("/store/carts/{}/discounts", segment(&cart_id)),
                &json!({ "code": code }),
            )
            .await?;
        Ok(envelope.cart)
    }

    /// Remove a discount code from the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_discount(&self, code: &str) -> Result<Cart, MedusaError> {
        let cart_id = self.get_or_create_cart().await?;
        let envelope: CartEnvelope = self
            .delete(&format!("/store/carts/{}/discounts/{}", segment(&cart_id), segment(code)))
            .await?;
        Ok(envelope.cart)
    }
}
