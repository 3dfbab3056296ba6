//! Catalog reads: products and collections.
//!
//! Listings, product lookups and collections are cached for the configured
//! TTL. Free-text search always goes to the backend.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use medusa_storefront_core::{CollectionId, ProductId};

use super::cache::{
    COLLECTIONS_KEY, CacheValue, collection_key, product_handle_key, product_key, products_key,
};
use super::types::{Collection, Product, ProductList};
use super::{MedusaClient, MedusaError, segment};

/// Filters for product listings; unset fields are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<CollectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ProductQuery {
    /// Query for one page of products.
    #[must_use]
    pub const fn page(limit: u32, offset: u32) -> Self {
        Self {
            q: None,
            collection_id: None,
            handle: None,
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Products in a collection.
    #[must_use]
    pub fn in_collection(collection_id: CollectionId) -> Self {
        Self {
            collection_id: Some(collection_id),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: Product,
}

#[derive(Deserialize)]
struct CollectionsEnvelope {
    collections: Vec<Collection>,
}

impl MedusaClient {
    /// List products matching `query`.
    ///
    /// Free-text searches (`q` set) always go to the backend; other listings
    /// are served from the catalog cache when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductList, MedusaError> {
        if query.q.is_some() {
            return self.get_with_query("/store/products", query).await;
        }

        let cache_key = products_key(&serde_json::to_string(query)?);
        if let Some(cache) = self.catalog()
            && let Some(CacheValue::Products(list)) = cache.get(&cache_key).await
        {
            debug!("Cache hit for product listing");
            return Ok(list);
        }

        let list: ProductList = self.get_with_query("/store/products", query).await?;

        if let Some(cache) = self.catalog() {
            cache
                .insert(cache_key, CacheValue::Products(list.clone()))
                .await;
        }
        Ok(list)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, MedusaError> {
        let cache_key = product_key(id.as_str());
        if let Some(cache) = self.catalog()
            && let Some(CacheValue::Product(product)) = cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let envelope: ProductEnvelope = self
            .get(&format!("/store/products/{}", segment(id)))
            .await?;

        if let Some(cache) = self.catalog() {
            cache
                .insert(cache_key, CacheValue::Product(Box::new(envelope.product.clone())))
                .await;
        }
        Ok(envelope.product)
    }

    /// Get a product by its URL handle.
    ///
    /// # Errors
    ///
    /// Returns [`MedusaError::NotFound`] if no product has the handle, or an
    /// error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, MedusaError> {
        let cache_key = product_handle_key(handle);
        if let Some(cache) = self.catalog()
            && let Some(CacheValue::Product(product)) = cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let query = ProductQuery {
            handle: Some(handle.to_string()),
            ..ProductQuery::default()
        };
        let list: ProductList = self.get_with_query("/store/products", &query).await?;
        let product = list
            .products
            .into_iter()
            .next()
            .ok_or_else(|| MedusaError::NotFound(format!("product '{handle}'")))?;

        if let Some(cache) = self.catalog() {
            cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// Free-text product search. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        q: &str,
        limit: Option<u32>,
    ) -> Result<ProductList, MedusaError> {
        let query = ProductQuery {
            q: Some(q.to_string()),
            limit,
            ..ProductQuery::default()
        };
        self.get_with_query("/store/products", &query).await
    }

    /// List all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> Result<Vec<Collection>, MedusaError> {
        if let Some(cache) = self.catalog()
            && let Some(CacheValue::Collections(collections)) = cache.get(COLLECTIONS_KEY).await
        {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let envelope: CollectionsEnvelope = self.get("/store/collections").await?;

        if let Some(cache) = self.catalog() {
            cache
                .insert(
                    COLLECTIONS_KEY.to_string(),
                    CacheValue::Collections(envelope.collections.clone()),
                )
                .await;
        }
        Ok(envelope.collections)
    }

    /// Get a collection by its URL handle.
    ///
    /// # Errors
    ///
    /// Returns [`MedusaError::NotFound`] if no collection has the handle, or
    /// an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_collection_by_handle(&self, handle: &str) -> Result<Collection, MedusaError> {
        let cache_key = collection_key(handle);
        if let Some(cache) = self.catalog()
            && let Some(CacheValue::Collection(collection)) = cache.get(&cache_key).await
        {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let envelope: CollectionsEnvelope = self
            .get_with_query("/store/collections", &[("handle[]", handle)])
            .await?;
        let collection = envelope
            .collections
            .into_iter()
            .next()
            .ok_or_else(|| MedusaError::NotFound(format!("collection '{handle}'")))?;

        if let Some(cache) = self.catalog() {
            cache
                .insert(cache_key, CacheValue::Collection(Box::new(collection.clone())))
                .await;
        }
        Ok(collection)
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_catalog(&self) {
        if let Some(cache) = self.catalog() {
            cache.invalidate_all();
            debug!("Catalog cache invalidated");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::medusa::tests::test_client;
    use crate::storage::MemoryStore;

    fn product_json(handle: &str) -> serde_json::Value {
        json!({
            "id": format!("prod_{handle}"),
            "title": "Cold Brew Concentrate",
            "handle": handle,
            "variants": [{"id": "variant_1", "title": "32 oz", "prices": [{"amount": 1800, "currency_code": "usd"}]}]
        })
    }

    #[tokio::test]
    async fn test_product_by_handle_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .and(query_param("handle", "cold-brew"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [product_json("cold-brew")], "count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let first = client.get_product_by_handle("cold-brew").await.unwrap();
        let second = client.get_product_by_handle("cold-brew").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.price_range("usd"), Some((1800, 1800)));
    }

    #[tokio::test]
    async fn test_invalidate_catalog_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products/prod_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"product": product_json("one")})))
            .expect(2)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let id = ProductId::new("prod_1");
        client.get_product(&id).await.unwrap();
        client.get_product(&id).await.unwrap();
        client.invalidate_catalog();
        client.get_product(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collections": [{"id": "pcol_1", "title": "Coffee", "handle": "coffee"}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = StorefrontConfig::new(server.uri().parse().unwrap(), "sunrise");
        config.catalog_cache_ttl = Duration::ZERO;
        let client = MedusaClient::new(&config, Arc::new(MemoryStore::new())).unwrap();

        assert_eq!(client.list_collections().await.unwrap().len(), 1);
        assert_eq!(client.list_collections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_handle_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"collections": []})))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let err = client.get_collection_by_handle("tea").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_search_is_never_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .and(query_param("q", "brew"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [product_json("cold-brew")], "count": 9, "offset": 0, "limit": 5
            })))
            .expect(2)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let page = client.search_products("brew", Some(5)).await.unwrap();
        assert!(page.has_more());
        client.search_products("brew", Some(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_sends_only_set_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .and(query_param("collection_id", "pcol_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": [], "count": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let list = client
            .list_products(&ProductQuery::in_collection(CollectionId::new("pcol_1")))
            .await
            .unwrap();
        assert!(list.products.is_empty());
        assert!(!list.has_more());
    }

    #[tokio::test]
    async fn test_search_listing_skips_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .and(query_param("q", "brew"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [product_json("cold-brew")], "count": 1
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [product_json("cold-brew")], "count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server);
        let search = ProductQuery {
            q: Some("brew".to_string()),
            ..ProductQuery::default()
        };
        client.list_products(&search).await.unwrap();
        client.list_products(&search).await.unwrap();

        let page = ProductQuery::page(10, 0);
        client.list_products(&page).await.unwrap();
        client.list_products(&page).await.unwrap();
    }
}
