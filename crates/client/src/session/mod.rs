//! Session state mirrored from the backend.
//!
//! [`Storefront`] bundles one client with the customer session, the cart
//! session, the anonymous basket and an analytics tracker. It is the
//! injected service a front end talks to; there is no global state.

pub mod auth;
pub mod basket;
pub mod cart;

pub use auth::{AuthSession, AuthState};
pub use basket::{Basket, BasketLine, LocalBasket, MergeReport};
pub use cart::CartSession;

use std::sync::{Arc, PoisonError, RwLock};

use tracing::instrument;

use medusa_storefront_core::VariantId;

use crate::config::StorefrontConfig;
use crate::error::LoadError;
use crate::medusa::auth::RegisterInput;
use crate::medusa::{AnalyticsTracker, Cart, Customer, MedusaClient, MedusaError};
use crate::storage::KeyValueStore;

/// Storefront session shared by every consumer.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    client: MedusaClient,
    auth: AuthSession,
    cart: CartSession,
    basket: LocalBasket,
    analytics: AnalyticsTracker,
    last_merge: RwLock<Option<MergeReport>>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("auth", &self.inner.auth)
            .field("cart", &self.inner.cart)
            .field("basket", &self.inner.basket)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build the client and every session on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: &StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, MedusaError> {
        Ok(Self::from_client(MedusaClient::new(config, store)?))
    }

    /// Build the sessions around an existing client.
    #[must_use]
    pub fn from_client(client: MedusaClient) -> Self {
        let analytics = AnalyticsTracker::new(client.clone());
        Self {
            inner: Arc::new(StorefrontInner {
                auth: AuthSession::new(client.clone()),
                cart: CartSession::new(client.clone()).with_analytics(analytics.clone()),
                basket: LocalBasket::open(client.store().clone()),
                analytics,
                client,
                last_merge: RwLock::new(None),
            }),
        }
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn client(&self) -> &MedusaClient {
        &self.inner.client
    }

    /// Get a reference to the customer session.
    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.inner.auth
    }

    /// Get a reference to the cart session.
    #[must_use]
    pub fn cart(&self) -> &CartSession {
        &self.inner.cart
    }

    /// Get a reference to the anonymous basket.
    #[must_use]
    pub fn local_basket(&self) -> &LocalBasket {
        &self.inner.basket
    }

    /// Get a reference to the analytics tracker.
    #[must_use]
    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.inner.analytics
    }

    /// Resolve the customer and the cart from stored identity.
    ///
    /// Both loaders run concurrently; each result is returned so the caller
    /// can decide what to surface. When a signed-in customer is restored
    /// while local basket lines are left over, they are merged into the
    /// server cart; see [`Storefront::last_merge`].
    pub async fn initialize(&self) -> (Result<Customer, LoadError>, Result<Cart, LoadError>) {
        let (customer, cart) =
            tokio::join!(self.inner.auth.initialize(), self.inner.cart.load());

        if customer.is_ok() && !self.inner.basket.is_empty() {
            let report = self.merge_basket().await;
            if let Some(merged) = &report.cart {
                return (customer, Ok(merged.clone()));
            }
        }
        (customer, cart)
    }

    /// Sign in, then merge the anonymous basket and identify the visitor.
    ///
    /// # Errors
    ///
    /// Returns the sign-in error. Lines that could not be merged are listed
    /// in the returned [`MergeReport`]; analytics failures are logged.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Customer, MergeReport), MedusaError> {
        let customer = self.inner.auth.login(email, password).await?;
        let report = self.after_sign_in(&customer).await;
        Ok((customer, report))
    }

    /// Create an account, then merge the anonymous basket and identify the
    /// visitor.
    ///
    /// # Errors
    ///
    /// Returns the registration error. Lines that could not be merged are
    /// listed in the returned [`MergeReport`].
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: &RegisterInput,
    ) -> Result<(Customer, MergeReport), MedusaError> {
        let customer = self.inner.auth.register(input).await?;
        let report = self.after_sign_in(&customer).await;
        Ok((customer, report))
    }

    async fn after_sign_in(&self, customer: &Customer) -> MergeReport {
        let report = self.merge_basket().await;
        self.inner.analytics.record_identity(customer).await;
        report
    }

    /// Move the anonymous basket into the server cart.
    ///
    /// The report is also kept for [`Storefront::last_merge`].
    pub async fn merge_basket(&self) -> MergeReport {
        let report = if self.inner.basket.is_empty() {
            MergeReport::default()
        } else {
            self.inner.basket.merge_into(&self.inner.cart).await
        };
        *self
            .inner
            .last_merge
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        report
    }

    /// Outcome of the most recent basket merge, if one ran.
    #[must_use]
    pub fn last_merge(&self) -> Option<MergeReport> {
        self.inner
            .last_merge
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sign out. Always succeeds locally.
    pub async fn logout(&self) {
        self.inner.auth.logout().await;
    }

    /// What the visitor is building: the server cart once signed in, the
    /// local basket before.
    #[must_use]
    pub fn basket(&self) -> Basket {
        if self.inner.auth.is_authenticated() {
            Basket::Synced {
                cart: self.inner.cart.cart().map(Box::new),
                pending: self.inner.basket.lines(),
            }
        } else {
            Basket::Anonymous(self.inner.basket.lines())
        }
    }

    /// Add to the basket: the server cart when signed in, the local basket
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or a storage error for the local basket.
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn add_to_basket(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Basket, MedusaError> {
        if self.inner.auth.is_authenticated() {
            let cart = self.inner.cart.add_to_cart(variant_id, quantity).await?;
            Ok(Basket::Synced {
                cart: Some(Box::new(cart)),
                pending: self.inner.basket.lines(),
            })
        } else {
            let lines = self.inner.basket.add(variant_id, quantity)?;
            Ok(Basket::Anonymous(lines))
        }
    }
}
