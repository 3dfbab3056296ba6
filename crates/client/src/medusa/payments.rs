//! Saved payment methods of the signed-in customer.
//!
//! Card data never passes through here: the processor tokenizes it and only
//! the provider id and token are sent to the backend.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use medusa_storefront_core::PaymentMethodId;

use super::types::PaymentMethod;
use super::{MedusaClient, MedusaError, segment};

#[derive(Deserialize)]
struct PaymentMethodEnvelope {
    payment_method: PaymentMethod,
}

#[derive(Deserialize)]
struct PaymentMethodsEnvelope {
    payment_methods: Vec<PaymentMethod>,
}

impl MedusaClient {
    /// All saved payment methods.
    ///
    /// # Errors
    ///
    /// Returns an error if no customer is signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, MedusaError> {
        let envelope: PaymentMethodsEnvelope = self.get("/store/payment-methods/me").await?;
        Ok(envelope.payment_methods)
    }

    /// Save a processor-tokenized payment method.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor rejects the token.
    #[instrument(skip(self, token))]
    pub async fn add_payment_method(
        &self,
        provider_id: &str,
        token: &str,
    ) -> Result<PaymentMethod, MedusaError> {
        let envelope: PaymentMethodEnvelope = self
            .post(
                "/store/payment-methods/me",
                &json!({ "provider_id": provider_id, "token": token }),
            )
            .await?;
        Ok(envelope.payment_method)
    }

    /// Remove a saved payment method.
    ///
    /// # Errors
    ///
    /// Returns an error if the method is still used by an active subscription
    /// or the request fails.
    #[instrument(skip(self), fields(payment_method_id = %id))]
    pub async fn delete_payment_method(&self, id: &PaymentMethodId) -> Result<(), MedusaError> {
        let _: serde::de::IgnoredAny = self
            .delete(&format!("/store/payment-methods/me/{}", segment(id)))
            .await?;
        Ok(())
    }

    /// Make a payment method the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the method does not exist.
    #[instrument(skip(self), fields(payment_method_id = %id))]
    pub async fn set_default_payment_method(
        &self,
        id: &PaymentMethodId,
    ) -> Result<PaymentMethod, MedusaError> {
        let envelope: PaymentMethodEnvelope = self
            .post_empty(&format!("/store/payment-methods/me/{}/default", segment(id)))
            .await?;
        Ok(envelope.payment_method)
    }
}
