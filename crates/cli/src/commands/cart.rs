//! Cart and basket commands.

use serde_json::json;

use medusa_storefront_client::Storefront;
use medusa_storefront_client::medusa::cart::{SubscriptionLineInput, UpdateCartInput};
use medusa_storefront_client::medusa::{Cart, Frequency};
use medusa_storefront_client::session::Basket;
use medusa_storefront_core::{Email, LineItemId, VariantId};

use super::{BasketAction, CartAction};
use crate::error::CliError;
use crate::output;

fn print_cart(cart: &Cart) -> Result<(), CliError> {
    output::print(&json!({
        "cart": cart,
        "item_count": cart.item_count(),
        "subtotal": cart.subtotal_display(),
        "total": cart.total_display(),
    }))
}

/// Run a `cart` subcommand.
///
/// # Errors
///
/// Returns an error if the backend rejects the change or the cart id cannot
/// be persisted.
pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), CliError> {
    let session = storefront.cart();

    // Prime the snapshot; no stored cart is not an error here.
    match session.load().await {
        Ok(_) => {}
        Err(e) if e.is_no_identity() => {}
        Err(e) => return Err(e.into()),
    }

    let cart = match action {
        CartAction::Show => match session.cart() {
            Some(cart) => cart,
            None => return output::print(&json!({ "cart": null, "item_count": 0 })),
        },
        CartAction::Add {
            variant_id,
            quantity,
        } => {
            session
                .add_to_cart(&VariantId::new(variant_id), quantity)
                .await?
        }
        CartAction::Subscribe {
            variant_id,
            quantity,
            interval,
            every,
        } => {
            let input = SubscriptionLineInput {
                variant_id: VariantId::new(variant_id),
                quantity,
                frequency: Frequency::new(interval.into(), every),
            };
            session.add_subscription(&input).await?
        }
        CartAction::Update { line_id, quantity } => {
            session
                .update_quantity(&LineItemId::new(line_id), quantity)
                .await?
        }
        CartAction::Remove { line_id } => session.remove_item(&LineItemId::new(line_id)).await?,
        CartAction::Discount { code, remove } => {
            if remove {
                session.remove_discount(&code).await?
            } else {
                session.apply_discount(&code).await?
            }
        }
        CartAction::Email { email } => {
            let email = Email::parse(&email).map_err(|e| CliError::Invalid(e.to_string()))?;
            let input = UpdateCartInput {
                email: Some(email.to_string()),
                ..UpdateCartInput::default()
            };
            session.set_addresses(&input).await?
        }
        CartAction::Clear => {
            session.clear().await?;
            tracing::info!("Cart forgotten");
            return output::print(&json!({ "cart": null, "item_count": 0 }));
        }
    };

    print_cart(&cart)
}

fn print_basket(basket: &Basket) -> Result<(), CliError> {
    match basket {
        Basket::Anonymous(lines) => output::print(&json!({
            "kind": "anonymous",
            "lines": lines,
            "item_count": basket.item_count(),
        })),
        Basket::Synced { cart, pending } => output::print(&json!({
            "kind": "synced",
            "cart": cart,
            "pending": pending,
            "item_count": basket.item_count(),
        })),
    }
}

/// Run a `basket` subcommand.
///
/// # Errors
///
/// Returns an error if the backend rejects the change or the local basket
/// cannot be persisted.
pub async fn basket(storefront: &Storefront, action: BasketAction) -> Result<(), CliError> {
    let (auth, cart) = storefront.initialize().await;
    if let Err(e) = auth
        && !e.is_no_identity()
    {
        tracing::warn!(error = %e, "Could not restore customer session");
    }
    if let Err(e) = cart
        && !e.is_no_identity()
    {
        tracing::warn!(error = %e, "Could not restore cart");
    }

    match action {
        BasketAction::Show => print_basket(&storefront.basket()),
        BasketAction::Add {
            variant_id,
            quantity,
        } => {
            let basket = storefront
                .add_to_basket(&VariantId::new(variant_id), quantity)
                .await?;
            print_basket(&basket)
        }
        BasketAction::Set {
            variant_id,
            quantity,
        } => {
            let lines = storefront
                .local_basket()
                .set_quantity(&VariantId::new(variant_id), quantity)?;
            print_basket(&Basket::Anonymous(lines))
        }
        BasketAction::Merge => {
            if !storefront.auth().is_authenticated() {
                return Err(CliError::Invalid(
                    "Sign in before merging the basket".to_string(),
                ));
            }
            let report = storefront.merge_basket().await;
            output::print(&json!({
                "merge": super::auth::merge_summary(&report),
                "cart": report.cart,
            }))
        }
    }
}
