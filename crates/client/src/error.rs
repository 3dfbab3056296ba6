//! Session-level errors, user-facing messages and Sentry helpers.
//!
//! Backend failures keep their real message in logs; customers only ever
//! see the fixed strings in [`messages`].

use thiserror::Error;

use crate::medusa::MedusaError;

/// Fixed user-facing messages set by the session layer.
pub mod messages {
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
    pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
    pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile";
    pub const CART_LOAD_FAILED: &str = "Failed to load cart";
    pub const CART_UPDATE_FAILED: &str = "Failed to update cart";
    pub const ADD_TO_CART_FAILED: &str = "Failed to add item to cart";
    pub const REMOVE_FROM_CART_FAILED: &str = "Failed to remove item";
    pub const DISCOUNT_FAILED: &str = "Discount code could not be applied";
}

/// Why a loader produced no value.
///
/// Loaders also collapse their session state (customer to signed out, cart
/// to empty), so callers can ignore this and render the fallback, or surface
/// it.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing stored to load from (no token, no cart id).
    #[error("No stored {0}")]
    NoIdentity(&'static str),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] MedusaError),
}

impl LoadError {
    /// Whether this is the ordinary first-visit case rather than a failure.
    #[must_use]
    pub const fn is_no_identity(&self) -> bool {
        matches!(self, Self::NoIdentity(_))
    }
}

/// Report backend failures that point at a server or client defect.
///
/// Rejections the customer can fix (4xx) are left to the logs.
pub fn report(err: &MedusaError) {
    let reportable = match err {
        MedusaError::Api { status, .. } => *status >= 500,
        MedusaError::Http(_) | MedusaError::Parse(_) | MedusaError::Storage(_) => true,
        MedusaError::NotFound(_) => false,
    };
    if reportable {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Backend error");
    }
}

// =============================================================================
// Sentry Context
// =============================================================================

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with customers.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", "variant_123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
