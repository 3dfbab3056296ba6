//! Status enums reported by the commerce backend.
//!
//! The backend is the only authority for these values; the storefront maps
//! them to customer-facing labels and never derives a status itself.
//! Values the storefront does not recognize deserialize to `Unknown` so a
//! backend upgrade cannot break order history pages.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Archived,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Processing",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
            Self::Unknown => "Unknown",
        }
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Captured,
    PartiallyRefunded,
    Refunded,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotPaid => "Not paid",
            Self::Awaiting => "Awaiting payment",
            Self::Captured => "Paid",
            Self::PartiallyRefunded => "Partially refunded",
            Self::Refunded => "Refunded",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
            Self::Unknown => "Unknown",
        }
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    PartiallyReturned,
    Returned,
    Canceled,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl FulfillmentStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFulfilled => "Preparing",
            Self::PartiallyFulfilled => "Partially packed",
            Self::Fulfilled => "Packed",
            Self::PartiallyShipped => "Partially shipped",
            Self::Shipped => "Shipped",
            Self::PartiallyReturned => "Partially returned",
            Self::Returned => "Returned",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the parcel has left the warehouse.
    #[must_use]
    pub const fn is_shipped(self) -> bool {
        matches!(self, Self::PartiallyShipped | Self::Shipped)
    }
}

/// Product subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Cancelled,
    PastDue,
    Expired,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Paused => "Paused",
            Self::Cancelled => "Cancelled",
            Self::PastDue => "Payment overdue",
            Self::Expired => "Expired",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the subscription will still produce deliveries.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Paused | Self::PastDue)
    }
}

/// Return request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Requested,
    Received,
    RequiresAction,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl ReturnStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Requested => "Return requested",
            Self::Received => "Return received",
            Self::RequiresAction => "Action required",
            Self::Canceled => "Canceled",
            Self::Unknown => "Unknown",
        }
    }
}

macro_rules! display_label {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )*
    };
}

display_label!(
    OrderStatus,
    PaymentStatus,
    FulfillmentStatus,
    SubscriptionStatus,
    ReturnStatus
);
