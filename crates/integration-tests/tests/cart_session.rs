//! Cart session behaviour against a mock backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::Mock;

use medusa_storefront_client::error::messages;
use medusa_storefront_core::{LineItemId, VariantId};
use medusa_storefront_integration_tests::{TestBackend, cart, error, line, ok};

async fn mount_stored_cart(backend: &TestBackend, body: serde_json::Value) {
    backend.remember_cart("cart_1");
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_1"))
        .respond_with(ok(body))
        .mount(&backend.server)
        .await;
}

#[tokio::test]
async fn test_unreachable_stored_cart_is_replaced() {
    let backend = TestBackend::start().await;
    backend.remember_cart("cart_old");
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_old"))
        .respond_with(error(500, "boom"))
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/carts"))
        .respond_with(ok(cart("cart_new", &[], 0)))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_new/line-items"))
        .respond_with(ok(cart("cart_new", &[line("li_1", "v1", 1, 1000)], 1000)))
        .expect(1)
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let snapshot = storefront
        .cart()
        .add_to_cart(&VariantId::new("v1"), 1)
        .await
        .unwrap();

    assert_eq!(snapshot.id.as_str(), "cart_new");
    assert_eq!(backend.stored_cart_id().as_deref(), Some("cart_new"));
}

#[tokio::test]
async fn test_load_forgets_deleted_cart() {
    let backend = TestBackend::start().await;
    backend.remember_cart("cart_gone");
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_gone"))
        .respond_with(error(404, "Cart not found"))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let err = storefront.cart().load().await.unwrap_err();

    assert!(err.is_no_identity());
    assert!(storefront.cart().cart().is_none());
    assert!(storefront.cart().error().is_none());
    assert!(backend.stored_cart_id().is_none());
}

#[tokio::test]
async fn test_load_failure_sets_message_and_keeps_id() {
    let backend = TestBackend::start().await;
    backend.remember_cart("cart_1");
    Mock::given(method("GET"))
        .and(path("/store/carts/cart_1"))
        .respond_with(error(503, "maintenance"))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let err = storefront.cart().load().await.unwrap_err();

    assert!(!err.is_no_identity());
    assert_eq!(storefront.cart().error(), Some(messages::CART_LOAD_FAILED));
    assert_eq!(backend.stored_cart_id().as_deref(), Some("cart_1"));
}

#[tokio::test]
async fn test_adding_twice_uses_backend_totals() {
    let backend = TestBackend::start().await;
    mount_stored_cart(&backend, cart("cart_1", &[], 0)).await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items"))
        .respond_with(ok(cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000)))
        .up_to_n_times(1)
        .mount(&backend.server)
        .await;
    // The backend merges the second addition into the same line and applies
    // a volume price the client could not have computed.
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items"))
        .respond_with(ok(cart("cart_1", &[line("li_1", "v1", 2, 900)], 1800)))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.add_to_cart(&VariantId::new("v1"), 1).await.unwrap();
    session.add_to_cart(&VariantId::new("v1"), 1).await.unwrap();

    assert_eq!(session.items().len(), 1);
    assert_eq!(session.item_count(), 2);
    assert_eq!(session.subtotal(), 1800);
    assert_eq!(session.subtotal_display(), "$18.00");
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let backend = TestBackend::start().await;
    mount_stored_cart(
        &backend,
        cart("cart_1", &[line("li_1", "v1", 2, 1000)], 2000),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/store/carts/cart_1/line-items/li_1"))
        .respond_with(ok(cart("cart_1", &[], 0)))
        .expect(1)
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.load().await.unwrap();
    assert_eq!(session.item_count(), 2);

    session
        .update_quantity(&LineItemId::new("li_1"), 0)
        .await
        .unwrap();

    assert_eq!(session.item_count(), 0);
    assert_eq!(
        backend
            .requests_to("POST", "/store/carts/cart_1/line-items/li_1")
            .await,
        0
    );
}

#[tokio::test]
async fn test_positive_quantity_updates_line() {
    let backend = TestBackend::start().await;
    mount_stored_cart(
        &backend,
        cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items/li_1"))
        .and(body_json(json!({ "quantity": 3 })))
        .respond_with(ok(cart("cart_1", &[line("li_1", "v1", 3, 1000)], 3000)))
        .expect(1)
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let snapshot = storefront
        .cart()
        .update_quantity(&LineItemId::new("li_1"), 3)
        .await
        .unwrap();

    assert_eq!(snapshot.item_count(), 3);
    assert_eq!(storefront.cart().subtotal(), 3000);
}

#[tokio::test]
async fn test_failed_mutation_keeps_snapshot() {
    let backend = TestBackend::start().await;
    mount_stored_cart(
        &backend,
        cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items"))
        .respond_with(error(400, "Variant out of stock"))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.load().await.unwrap();

    let err = session
        .add_to_cart(&VariantId::new("v2"), 1)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Variant out of stock");
    assert_eq!(session.error(), Some(messages::ADD_TO_CART_FAILED));
    assert_eq!(session.item_count(), 1);
}

#[tokio::test]
async fn test_concurrent_mutations_apply_in_call_order() {
    let backend = TestBackend::start().await;
    mount_stored_cart(&backend, cart("cart_1", &[], 0)).await;
    // The first request is answered slowly; its response must not overwrite
    // the later one.
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items"))
        .and(body_partial_json(json!({ "variant_id": "v1" })))
        .respond_with(
            ok(cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/line-items"))
        .and(body_partial_json(json!({ "variant_id": "v2" })))
        .respond_with(ok(cart(
            "cart_1",
            &[line("li_1", "v1", 1, 1000), line("li_2", "v2", 1, 500)],
            1500,
        )))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    let v1 = VariantId::new("v1");
    let v2 = VariantId::new("v2");

    let (first, second) = tokio::join!(session.add_to_cart(&v1, 1), session.add_to_cart(&v2, 1));
    first.unwrap();
    second.unwrap();

    assert_eq!(session.items().len(), 2);
    assert_eq!(session.subtotal(), 1500);
}

#[tokio::test]
async fn test_discount_round_trip() {
    let backend = TestBackend::start().await;
    let items = [line("li_1", "v1", 1, 1000)];
    mount_stored_cart(&backend, cart("cart_1", &items, 1000)).await;

    let mut discounted = cart("cart_1", &items, 1000);
    discounted["cart"]["discounts"] = json!([{ "code": "SUMMER10" }]);
    discounted["cart"]["discount_total"] = json!(100);
    discounted["cart"]["total"] = json!(900);
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/discounts"))
        .and(body_json(json!({ "code": "SUMMER10" })))
        .respond_with(ok(discounted))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/store/carts/cart_1/discounts/SUMMER10"))
        .respond_with(ok(cart("cart_1", &items, 1000)))
        .expect(1)
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.load().await.unwrap();

    let applied = session.apply_discount("SUMMER10").await.unwrap();
    assert_eq!(applied.discounts.len(), 1);
    assert_eq!(applied.discounts[0].code, "SUMMER10");
    assert_eq!(applied.discount_total, 100);
    assert_eq!(session.cart().unwrap().total, 900);
    assert!(session.error().is_none());

    let removed = session.remove_discount("SUMMER10").await.unwrap();
    assert!(removed.discounts.is_empty());
    assert_eq!(session.cart().unwrap().total, 1000);
}

#[tokio::test]
async fn test_rejected_discount_keeps_cart() {
    let backend = TestBackend::start().await;
    mount_stored_cart(&backend, cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000)).await;
    Mock::given(method("POST"))
        .and(path("/store/carts/cart_1/discounts"))
        .and(body_partial_json(json!({ "code": "BADCODE" })))
        .respond_with(error(400, "Discount is not valid"))
        .mount(&backend.server)
        .await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.load().await.unwrap();

    assert!(session.apply_discount("BADCODE").await.is_err());
    assert_eq!(session.error(), Some(messages::DISCOUNT_FAILED));
    assert_eq!(session.subtotal(), 1000);

    session.clear_error();
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_clear_forgets_cart() {
    let backend = TestBackend::start().await;
    mount_stored_cart(&backend, cart("cart_1", &[line("li_1", "v1", 1, 1000)], 1000)).await;

    let storefront = backend.storefront();
    let session = storefront.cart();
    session.load().await.unwrap();
    session.clear().await.unwrap();

    assert!(session.cart().is_none());
    assert_eq!(session.item_count(), 0);
    assert!(backend.stored_cart_id().is_none());
}
