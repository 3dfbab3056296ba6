//! Recurring product subscriptions of the signed-in customer.
//!
//! Every change is a dedicated endpoint that returns the updated
//! subscription; the backend decides whether the change is allowed.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use medusa_storefront_core::{AddressId, PaymentMethodId, SubscriptionId, VariantId};

use super::types::{Frequency, Subscription};
use super::{MedusaClient, MedusaError, segment};

const BASE: &str = "/store/product-subscriptions/me";

/// Replacement item list entry for [`MedusaClient::change_items`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionItemInput {
    pub variant_id: VariantId,
    pub quantity: u32,
}

#[derive(Deserialize)]
struct SubscriptionEnvelope {
    subscription: Subscription,
}

#[derive(Deserialize)]
struct SubscriptionsEnvelope {
    subscriptions: Vec<Subscription>,
}

impl MedusaClient {
    /// All subscriptions of the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if no customer is signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, MedusaError> {
        let envelope: SubscriptionsEnvelope = self.get(BASE).await?;
        Ok(envelope.subscriptions)
    }

    /// One subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription does not exist.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn get_subscription(&self, id: &SubscriptionId) -> Result<Subscription, MedusaError> {
        let envelope: SubscriptionEnvelope = self.get(&format!("{BASE}/{}", segment(id))).await?;
        Ok(envelope.subscription)
    }

    async fn subscription_action(
        &self,
        id: &SubscriptionId,
        action: &str,
        body: &serde_json::Value,
    ) -> Result<Subscription, MedusaError> {
        let envelope: SubscriptionEnvelope =
            self.post(&format!("{BASE}/{}/{}", segment(id), segment(action)), body).await?;
        tracing::info!(subscription_id = %id, action, status = %envelope.subscription.status, "Subscription updated");
        Ok(envelope.subscription)
    }

    async fn subscription_change<B: Serialize + ?Sized>(
        &self,
        id: &SubscriptionId,
        field: &str,
        body: &B,
    ) -> Result<Subscription, MedusaError> {
        let envelope: SubscriptionEnvelope =
            self.patch(&format!("{BASE}/{}/{}", segment(id), segment(field)), body).await?;
        Ok(envelope.subscription)
    }

    /// Pause deliveries until resumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be paused in its state.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn pause_subscription(&self, id: &SubscriptionId) -> Result<Subscription, MedusaError> {
        self.subscription_action(id, "pause", &json!({})).await
    }

    /// Resume a paused subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is not paused.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn resume_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, MedusaError> {
        self.subscription_action(id, "resume", &json!({})).await
    }

    /// Cancel a subscription, optionally recording why.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is already ended.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn cancel_subscription(
        &self,
        id: &SubscriptionId,
        reason: Option<&str>,
    ) -> Result<Subscription, MedusaError> {
        let body = reason.map_or_else(|| json!({}), |reason| json!({ "reason": reason }));
        self.subscription_action(id, "cancel", &body).await
    }

    /// Skip the next scheduled delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no upcoming delivery to skip.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn skip_next_delivery(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, MedusaError> {
        self.subscription_action(id, "skip", &json!({})).await
    }

    /// Change how often deliveries happen.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the frequency.
    #[instrument(skip(self), fields(subscription_id = %id, frequency = %frequency.label()))]
    pub async fn change_frequency(
        &self,
        id: &SubscriptionId,
        frequency: Frequency,
    ) -> Result<Subscription, MedusaError> {
        self.subscription_change(id, "frequency", &frequency).await
    }

    /// Ship future deliveries to a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not belong to the customer.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn change_address(
        &self,
        id: &SubscriptionId,
        address_id: &AddressId,
    ) -> Result<Subscription, MedusaError> {
        self.subscription_change(id, "address", &json!({ "address_id": address_id }))
            .await
    }

    /// Charge future deliveries to a saved payment method.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment method does not belong to the customer.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn change_payment_method(
        &self,
        id: &SubscriptionId,
        payment_method_id: &PaymentMethodId,
    ) -> Result<Subscription, MedusaError> {
        self.subscription_change(
            id,
            "payment-method",
            &json!({ "payment_method_id": payment_method_id }),
        )
        .await
    }

    /// Replace the products on a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if any variant is unavailable for subscription.
    #[instrument(skip(self, items), fields(subscription_id = %id, items = items.len()))]
    pub async fn change_items(
        &self,
        id: &SubscriptionId,
        items: &[SubscriptionItemInput],
    ) -> Result<Subscription, MedusaError> {
        self.subscription_change(id, "items", &json!({ "items": items }))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use medusa_storefront_core::SubscriptionStatus;

    use super::*;
    use crate::medusa::tests::test_client;
    use crate::medusa::types::FrequencyInterval;

    fn subscription_json(status: &str) -> serde_json::Value {
        json!({"subscription": {
            "id": "sub_1",
            "status": status,
            "frequency_interval": "week",
            "frequency_value": 2,
            "next_delivery_date": "2026-11-02",
            "items": [{"variant_id": "variant_1", "quantity": 1}]
        }})
    }

    #[tokio::test]
    async fn test_list_subscriptions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/product-subscriptions/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subscriptions": [subscription_json("active")["subscription"]]
            })))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let subs = client.list_subscriptions().await.unwrap();

        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].frequency.label(), "Every 2 weeks");
        assert!(subs[0].can_pause());
    }

    #[tokio::test]
    async fn test_pause_then_resume() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/product-subscriptions/me/sub_1/pause"))
            .respond_with(ResponseTemplate::new(200).set_body_json(subscription_json("paused")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/store/product-subscriptions/me/sub_1/resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(subscription_json("active")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let id = SubscriptionId::new("sub_1");

        let paused = client.pause_subscription(&id).await.unwrap();
        assert_eq!(paused.status, SubscriptionStatus::Paused);
        assert!(paused.can_resume());

        let resumed = client.resume_subscription(&id).await.unwrap();
        assert_eq!(resumed.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_cancel_sends_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/product-subscriptions/me/sub_1/cancel"))
            .and(body_json(json!({"reason": "Too much coffee"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(subscription_json("cancelled")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let sub = client
            .cancel_subscription(&SubscriptionId::new("sub_1"), Some("Too much coffee"))
            .await
            .unwrap();
        assert!(!sub.status.is_live());
    }

    #[tokio::test]
    async fn test_change_frequency_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/store/product-subscriptions/me/sub_1/frequency"))
            .and(body_json(json!({"frequency_interval": "month", "frequency_value": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(subscription_json("active")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        client
            .change_frequency(
                &SubscriptionId::new("sub_1"),
                Frequency::new(FrequencyInterval::Month, 1),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_items_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/store/product-subscriptions/me/sub_1/items"))
            .and(body_json(json!({"items": [{"variant_id": "variant_2", "quantity": 3}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(subscription_json("active")))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        client
            .change_items(
                &SubscriptionId::new("sub_1"),
                &[SubscriptionItemInput {
                    variant_id: VariantId::new("variant_2"),
                    quantity: 3,
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_skip_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/product-subscriptions/me/sub_1/skip"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"message": "No upcoming delivery"})),
            )
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let err = client
            .skip_next_delivery(&SubscriptionId::new("sub_1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No upcoming delivery");
    }
}
