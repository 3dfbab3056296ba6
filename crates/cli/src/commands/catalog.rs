//! Catalog browsing commands.

use medusa_storefront_client::Storefront;
use medusa_storefront_client::medusa::products::ProductQuery;
use medusa_storefront_core::{CollectionId, ProductId};

use super::{CollectionAction, ProductAction};
use crate::error::CliError;
use crate::output;

/// Run a `products` subcommand.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn products(storefront: &Storefront, action: ProductAction) -> Result<(), CliError> {
    let client = storefront.client();

    match action {
        ProductAction::List {
            collection,
            limit,
            offset,
        } => {
            let query = ProductQuery {
                collection_id: collection.map(CollectionId::new),
                ..ProductQuery::page(limit, offset)
            };
            let list = client.list_products(&query).await?;
            tracing::info!(count = list.products.len(), has_more = list.has_more(), "Listed products");
            output::print(&list)
        }
        ProductAction::Show { handle, id } => {
            let product = if id {
                client.get_product(&ProductId::new(handle)).await?
            } else {
                client.get_product_by_handle(&handle).await?
            };
            output::print(&product)
        }
        ProductAction::Search { query, limit } => {
            output::print(&client.search_products(&query, Some(limit)).await?)
        }
    }
}

/// Run a `collections` subcommand.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn collections(
    storefront: &Storefront,
    action: CollectionAction,
) -> Result<(), CliError> {
    let client = storefront.client();

    match action {
        CollectionAction::List => output::print(&client.list_collections().await?),
        CollectionAction::Show { handle } => {
            output::print(&client.get_collection_by_handle(&handle).await?)
        }
    }
}
