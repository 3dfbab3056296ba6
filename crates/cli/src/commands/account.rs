//! Signed-in account commands: orders, subscriptions, addresses, payment
//! methods.

use serde_json::json;

use medusa_storefront_client::Storefront;
use medusa_storefront_client::medusa::{Frequency, MedusaClient};
use medusa_storefront_core::{AddressId, OrderId, PaymentMethodId, SubscriptionId};

use super::{AccountAction, SavedAction, SubscriptionAction};
use crate::error::CliError;
use crate::output;

/// Resolve the stored customer session before an account request.
async fn signed_in(storefront: &Storefront) -> Result<&MedusaClient, CliError> {
    storefront.auth().initialize().await?;
    Ok(storefront.client())
}

/// Run an `orders` subcommand.
///
/// # Errors
///
/// Returns an error if no customer is signed in or the request fails.
pub async fn orders(storefront: &Storefront, action: AccountAction) -> Result<(), CliError> {
    let client = signed_in(storefront).await?;

    match action {
        AccountAction::List { limit, offset } => {
            output::print(&client.list_orders(limit, offset).await?)
        }
        AccountAction::Show { id } => {
            let order = client.get_order(&OrderId::new(id)).await?;
            output::print(&json!({
                "order": order,
                "number": order.display_number(),
                "total": order.total_display(),
            }))
        }
    }
}

/// Run a `subscriptions` subcommand.
///
/// # Errors
///
/// Returns an error if no customer is signed in or the backend rejects the
/// change.
pub async fn subscriptions(
    storefront: &Storefront,
    action: SubscriptionAction,
) -> Result<(), CliError> {
    let client = signed_in(storefront).await?;

    let subscription = match action {
        SubscriptionAction::List => return output::print(&client.list_subscriptions().await?),
        SubscriptionAction::Show { id } => {
            client.get_subscription(&SubscriptionId::new(id)).await?
        }
        SubscriptionAction::Pause { id } => {
            client.pause_subscription(&SubscriptionId::new(id)).await?
        }
        SubscriptionAction::Resume { id } => {
            client.resume_subscription(&SubscriptionId::new(id)).await?
        }
        SubscriptionAction::Cancel { id, reason } => {
            client
                .cancel_subscription(&SubscriptionId::new(id), reason.as_deref())
                .await?
        }
        SubscriptionAction::Skip { id } => {
            client.skip_next_delivery(&SubscriptionId::new(id)).await?
        }
        SubscriptionAction::Frequency {
            id,
            interval,
            every,
        } => {
            client
                .change_frequency(&SubscriptionId::new(id), Frequency::new(interval.into(), every))
                .await?
        }
    };

    output::print(&json!({
        "subscription": subscription,
        "frequency": subscription.frequency.label(),
    }))
}

/// Run an `addresses` subcommand.
///
/// # Errors
///
/// Returns an error if no customer is signed in or the request fails.
pub async fn addresses(storefront: &Storefront, action: SavedAction) -> Result<(), CliError> {
    let client = signed_in(storefront).await?;
    let addresses = client.list_addresses().await?;

    match action {
        SavedAction::List => output::print(&addresses),
        SavedAction::Show { id } => {
            let id = AddressId::new(id);
            let address = addresses
                .into_iter()
                .find(|address| address.id.as_ref() == Some(&id))
                .ok_or_else(|| CliError::Invalid(format!("No saved address {id}")))?;
            output::print(&json!({ "address": address, "line": address.one_line() }))
        }
    }
}

/// Run a `payment-methods` subcommand.
///
/// # Errors
///
/// Returns an error if no customer is signed in or the request fails.
pub async fn payment_methods(
    storefront: &Storefront,
    action: SavedAction,
) -> Result<(), CliError> {
    let client = signed_in(storefront).await?;
    let methods = client.list_payment_methods().await?;

    match action {
        SavedAction::List => {
            let today = chrono::Utc::now().date_naive();
            let listed: Vec<_> = methods
                .iter()
                .map(|method| {
                    json!({
                        "method": method,
                        "label": method.label(),
                        "expired": method.is_expired(today),
                    })
                })
                .collect();
            output::print(&listed)
        }
        SavedAction::Show { id } => {
            let id = PaymentMethodId::new(id);
            let method = methods
                .into_iter()
                .find(|method| method.id == id)
                .ok_or_else(|| CliError::Invalid(format!("No saved payment method {id}")))?;
            output::print(&method)
        }
    }
}
