//! Backend entity types.
//!
//! These mirror the JSON the commerce backend returns. They are transient,
//! point-in-time copies: every total, discount and status is exactly what
//! the backend reported in its latest response. Helper methods only select
//! or format, they never recompute money.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use medusa_storefront_core::{
    AddressId, CartId, CollectionId, CustomerId, FulfillmentStatus, LineItemId, OrderId,
    OrderStatus, PaymentMethodId, PaymentStatus, ProductId, ReturnId, ReturnStatus,
    ShippingOptionId, SubscriptionId, SubscriptionStatus, VariantId, format_amount,
};

fn default_currency() -> String {
    "usd".to_string()
}

// =============================================================================
// Customer Types
// =============================================================================

/// A signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID.
    pub id: CustomerId,
    /// Account email.
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether the customer has a password-protected account.
    #[serde(default)]
    pub has_account: bool,
    /// Whether the email address has been verified.
    #[serde(default)]
    pub email_verified: bool,
    /// Marketing consent.
    #[serde(default)]
    pub accepts_marketing: bool,
    /// Account creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// First and last name joined, when either is present.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Name for greetings, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.first_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| self.email.clone(), str::to_string)
    }
}

// =============================================================================
// Address Types
// =============================================================================

/// A postal address, either saved on the account or attached to a cart/order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address ID (absent on inline cart addresses from some backends).
    #[serde(default)]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2, lowercase.
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether this is the account's default shipping address.
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    /// Single-line rendering, e.g. `"1 Main St, Apt 2, Portland, OR 97201, US"`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let region = [self.province.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let country = self.country_code.as_deref().map(str::to_ascii_uppercase);

        [
            self.address_1.clone(),
            self.address_2.clone(),
            self.city.clone(),
            (!region.is_empty()).then_some(region),
            country,
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Address fields accepted by create/update endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// One row in a cart or order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line item ID, scoped to its cart.
    pub id: LineItemId,
    /// Purchased variant (absent for custom items).
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Parent product.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Display title.
    pub title: String,
    /// Variant description (e.g., "12 oz / Whole bean").
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Price of one unit in minor units.
    pub unit_price: i64,
    /// Backend-computed line subtotal.
    #[serde(default)]
    pub subtotal: Option<i64>,
    /// Backend-computed line total after discounts and tax.
    #[serde(default)]
    pub total: Option<i64>,
    /// Free-form metadata; subscription lines carry their frequency here.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl LineItem {
    /// Whether this line was added as a recurring subscription.
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("is_subscription"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// A discount code applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Customer-entered code.
    pub code: String,
}

/// A shipping method selected on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default)]
    pub name: Option<String>,
    /// Price in minor units.
    #[serde(default)]
    pub price: i64,
}

/// A payment provider session on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    #[serde(default)]
    pub id: Option<String>,
    pub provider_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_selected: Option<bool>,
}

/// A server-side cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Checkout email.
    #[serde(default)]
    pub email: Option<String>,
    /// Owning customer, once identified.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Lowercase ISO 4217 currency of every amount on the cart.
    #[serde(default = "default_currency")]
    pub currency_code: String,
    /// Line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    /// Selected payment session.
    #[serde(default)]
    pub payment_session: Option<PaymentSession>,
    #[serde(default)]
    pub payment_sessions: Vec<PaymentSession>,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    #[serde(default)]
    pub total: i64,
    /// Set once the cart has been turned into an order.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Sum of line quantities, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.quantity))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First line for `variant_id`.
    #[must_use]
    pub fn find_line_by_variant(&self, variant_id: &VariantId) -> Option<&LineItem> {
        self.items
            .iter()
            .find(|item| item.variant_id.as_ref() == Some(variant_id))
    }

    /// Line with the given ID.
    #[must_use]
    pub fn line(&self, line_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == line_id)
    }

    /// Backend subtotal formatted in the cart currency.
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        format_amount(self.subtotal, &self.currency_code)
    }

    /// Backend total formatted in the cart currency.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total, &self.currency_code)
    }
}

/// A shipping option available to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    /// Price in minor units.
    #[serde(default)]
    pub amount: i64,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A price for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyAmount {
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 code.
    pub currency_code: String,
}

/// Product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

/// Product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    pub value: String,
}

/// A purchasable SKU of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID (pass to cart).
    pub id: VariantId,
    /// Variant title (e.g., "12 oz").
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Units on hand, when inventory is tracked.
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub allow_backorder: bool,
    #[serde(default = "default_true")]
    pub manage_inventory: bool,
    /// List prices per currency.
    #[serde(default)]
    pub prices: Vec<MoneyAmount>,
    /// Price the backend computed for the current region/customer.
    #[serde(default)]
    pub calculated_price: Option<i64>,
}

const fn default_true() -> bool {
    true
}

impl ProductVariant {
    /// Whether the variant can be added to a cart right now.
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        !self.manage_inventory
            || self.allow_backorder
            || self.inventory_quantity.is_some_and(|q| q > 0)
    }

    /// Backend price in `currency_code`, preferring the calculated price.
    #[must_use]
    pub fn price_in(&self, currency_code: &str) -> Option<i64> {
        self.calculated_price.or_else(|| {
            self.prices
                .iter()
                .find(|p| p.currency_code.eq_ignore_ascii_case(currency_code))
                .map(|p| p.amount)
        })
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// URL handle.
    pub handle: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tags: Vec<ProductTag>,
}

impl Product {
    /// Lowest and highest variant price in `currency_code`.
    #[must_use]
    pub fn price_range(&self, currency_code: &str) -> Option<(i64, i64)> {
        let prices = self
            .variants
            .iter()
            .filter_map(|v| v.price_in(currency_code));
        prices.fold(None, |range, price| match range {
            None => Some((price, price)),
            Some((lo, hi)) => Some((lo.min(price), hi.max(price))),
        })
    }

    /// Whether any variant is purchasable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.variants.iter().any(ProductVariant::is_in_stock)
    }
}

/// A page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    /// Total matching products across all pages.
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

impl ProductList {
    /// Whether another page exists after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset + (self.products.len() as u64) < self.count
    }
}

/// A product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

// =============================================================================
// Order Types
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing sequential number.
    #[serde(default)]
    pub display_id: Option<u64>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub fulfillment_status: FulfillmentStatus,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Number shown to customers, e.g. `#1042`.
    #[must_use]
    pub fn display_number(&self) -> String {
        self.display_id
            .map_or_else(|| self.id.to_string(), |n| format!("#{n}"))
    }

    /// Backend total formatted in the order currency.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total, &self.currency_code)
    }
}

/// A page of order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

/// A return request on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: ReturnId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub status: ReturnStatus,
    /// Refund the backend intends to issue, in minor units.
    #[serde(default)]
    pub refund_amount: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Subscription Types
// =============================================================================

/// Unit of a delivery frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyInterval {
    Day,
    Week,
    Month,
}

impl FrequencyInterval {
    const fn noun(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// How often a subscription delivers, e.g. every 2 weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frequency {
    #[serde(rename = "frequency_interval")]
    pub interval: FrequencyInterval,
    #[serde(rename = "frequency_value")]
    pub value: u32,
}

impl Frequency {
    /// Create a frequency.
    #[must_use]
    pub const fn new(interval: FrequencyInterval, value: u32) -> Self {
        Self { interval, value }
    }

    /// Customer-facing label: "Every week", "Every 2 months".
    #[must_use]
    pub fn label(&self) -> String {
        match self.value {
            0 | 1 => format!("Every {}", self.interval.noun()),
            n => format!("Every {n} {}s", self.interval.noun()),
        }
    }
}

/// One product on a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub variant_id: VariantId,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    /// Per-delivery unit price in minor units.
    #[serde(default)]
    pub unit_price: Option<i64>,
}

/// A recurring product subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub status: SubscriptionStatus,
    #[serde(flatten)]
    pub frequency: Frequency,
    #[serde(default)]
    pub items: Vec<SubscriptionItem>,
    #[serde(default)]
    pub next_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub payment_method_id: Option<PaymentMethodId>,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether a pause request makes sense.
    #[must_use]
    pub const fn can_pause(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }

    /// Whether a resume request makes sense.
    #[must_use]
    pub const fn can_resume(&self) -> bool {
        matches!(self.status, SubscriptionStatus::Paused)
    }
}

// =============================================================================
// Payment Method Types
// =============================================================================

/// A saved payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Card brand as reported by the processor (e.g., "visa").
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u32>,
    #[serde(default)]
    pub exp_year: Option<i32>,
    #[serde(default)]
    pub is_default: bool,
}

impl PaymentMethod {
    /// Label such as "Visa ending in 4242".
    #[must_use]
    pub fn label(&self) -> String {
        let brand = self.brand.as_deref().map(brand_name);
        match (brand, self.last4.as_deref()) {
            (Some(brand), Some(last4)) => format!("{brand} ending in {last4}"),
            (None, Some(last4)) => format!("Card ending in {last4}"),
            (Some(brand), None) => brand,
            (None, None) => "Saved payment method".to_string(),
        }
    }

    /// Expiry as `MM/YY`.
    #[must_use]
    pub fn expiry_label(&self) -> Option<String> {
        let (month, year) = (self.exp_month?, self.exp_year?);
        Some(format!("{month:02}/{:02}", year.rem_euclid(100)))
    }

    /// Whether the card expired before `on`. Cards stay valid through the
    /// last day of their expiry month.
    #[must_use]
    pub fn is_expired(&self, on: NaiveDate) -> bool {
        match (self.exp_month, self.exp_year) {
            (Some(month), Some(year)) => (year, month) < (on.year(), on.month()),
            _ => false,
        }
    }
}

fn brand_name(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "visa" => "Visa".to_string(),
        "mastercard" => "Mastercard".to_string(),
        "amex" | "american_express" => "American Express".to_string(),
        "discover" => "Discover".to_string(),
        other => {
            let mut chars = other.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        }
    }
}

// =============================================================================
// Content Types
// =============================================================================

/// A CMS-managed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    pub slug: String,
    pub title: String,
    /// Plain-text or markdown body.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentPage {
    /// At most `max_chars` characters of the body, cut at a word boundary.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let body = self.body.trim();
        if body.chars().count() <= max_chars {
            return body.to_string();
        }

        let cut: String = body.chars().take(max_chars).collect();
        let at_word_end = body.chars().nth(max_chars).is_some_and(char::is_whitespace);
        let trimmed = if at_word_end {
            cut.as_str()
        } else {
            cut.rfind(char::is_whitespace)
                .map_or(cut.as_str(), |idx| &cut[..idx])
        };
        format!("{}…", trimmed.trim_end())
    }
}

/// A frequently asked question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}
