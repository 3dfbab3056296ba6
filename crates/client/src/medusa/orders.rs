//! Order history and returns for the signed-in customer.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use medusa_storefront_core::{LineItemId, OrderId};

use super::types::{Order, OrderList, ReturnRecord};
use super::{MedusaClient, MedusaError, segment};

/// One line to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnItem {
    pub item_id: LineItemId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A return request for part or all of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnRequest {
    pub order_id: OrderId,
    pub items: Vec<ReturnItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Serialize)]
struct Page {
    limit: u32,
    offset: u32,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: Order,
}

#[derive(Deserialize)]
struct ReturnEnvelope {
    #[serde(rename = "return")]
    record: ReturnRecord,
}

impl MedusaClient {
    /// One page of the customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if no customer is signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, limit: u32, offset: u32) -> Result<OrderList, MedusaError> {
        self.get_with_query("/store/purchases/me", &Page { limit, offset })
            .await
    }

    /// One of the customer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or belongs to someone else.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Order, MedusaError> {
        let envelope: OrderEnvelope = self
            .get(&format!("/store/purchases/me/{}", segment(id)))
            .await?;
        Ok(envelope.order)
    }

    /// Ask for a return. The backend decides eligibility and refund amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn request_return(
        &self,
        request: &ReturnRequest,
    ) -> Result<ReturnRecord, MedusaError> {
        let envelope: ReturnEnvelope = self.post("/store/returns", request).await?;
        tracing::info!(return_id = %envelope.record.id, "Return requested");
        Ok(envelope.record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use medusa_storefront_core::{FulfillmentStatus, ReturnStatus};

    use super::*;
    use crate::medusa::tests::test_client;

    #[tokio::test]
    async fn test_list_orders_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/purchases/me"))
            .and(query_param("limit", "10"))
            .and(query_param("offset", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "orders": [{"id": "order_1", "display_id": 7, "fulfillment_status": "shipped", "total": 4200}],
                "count": 21, "offset": 20, "limit": 10
            })))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let page = client.list_orders(10, 20).await.unwrap();

        assert_eq!(page.count, 21);
        let order = &page.orders[0];
        assert_eq!(order.display_number(), "#7");
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Shipped);
        assert_eq!(order.total_display(), "$42.00");
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/purchases/me/order_x"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Order not found"})))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let err = client.get_order(&OrderId::new("order_x")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Order not found");
    }

    #[tokio::test]
    async fn test_request_return() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/returns"))
            .and(body_json(json!({
                "order_id": "order_1",
                "items": [{"item_id": "li_1", "quantity": 1, "reason": "damaged"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "return": {"id": "ret_1", "order_id": "order_1", "status": "requested", "refund_amount": 1800}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let record = client
            .request_return(&ReturnRequest {
                order_id: OrderId::new("order_1"),
                items: vec![ReturnItem {
                    item_id: LineItemId::new("li_1"),
                    quantity: 1,
                    reason: Some("damaged".to_string()),
                }],
                note: None,
            })
            .await
            .unwrap();

        assert_eq!(record.status, ReturnStatus::Requested);
        assert_eq!(record.refund_amount, Some(1800));
    }
}
