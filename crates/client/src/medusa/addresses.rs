//! Saved addresses of the signed-in customer.

use serde::Deserialize;
use tracing::instrument;

use medusa_storefront_core::AddressId;

use super::types::{Address, AddressInput};
use super::{MedusaClient, MedusaError, segment};

#[derive(Deserialize)]
struct AddressEnvelope {
    address: Address,
}

#[derive(Deserialize)]
struct AddressesEnvelope {
    addresses: Vec<Address>,
}

impl MedusaClient {
    /// All saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if no customer is signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self) -> Result<Vec<Address>, MedusaError> {
        let envelope: AddressesEnvelope = self.get("/store/addresses/me").await?;
        Ok(envelope.addresses)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address.
    #[instrument(skip(self, input))]
    pub async fn create_address(&self, input: &AddressInput) -> Result<Address, MedusaError> {
        let envelope: AddressEnvelope = self.post("/store/addresses/me", input).await?;
        Ok(envelope.address)
    }

    /// Update a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist or is rejected.
    #[instrument(skip(self, input), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        id: &AddressId,
        input: &AddressInput,
    ) -> Result<Address, MedusaError> {
        let envelope: AddressEnvelope = self
            .patch(&format!("/store/addresses/me/{}", segment(id)), input)
            .await?;
        Ok(envelope.address)
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: &AddressId) -> Result<(), MedusaError> {
        let _: serde::de::IgnoredAny = self
            .delete(&format!("/store/addresses/me/{}", segment(id)))
            .await?;
        Ok(())
    }

    /// Make an address the default for checkout and subscriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn set_default_address(&self, id: &AddressId) -> Result<Address, MedusaError> {
        let envelope: AddressEnvelope = self
            .post_empty(&format!("/store/addresses/me/{}/default", segment(id)))
            .await?;
        Ok(envelope.address)
    }
}
