//! Cache types for catalog responses.

use crate::medusa::types::{Collection, Product, ProductList};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductList),
    Collection(Box<Collection>),
    Collections(Vec<Collection>),
}

/// Cache key for a product looked up by ID.
pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}

/// Cache key for a product listing; `query` is the serialized filter.
pub fn products_key(query: &str) -> String {
    format!("products:{query}")
}

/// Cache key for a product looked up by handle.
pub fn product_handle_key(handle: &str) -> String {
    format!("product-handle:{handle}")
}

/// Cache key for a collection looked up by handle.
pub fn collection_key(handle: &str) -> String {
    format!("collection:{handle}")
}

/// Cache key for the collection index.
pub const COLLECTIONS_KEY: &str = "collections";
