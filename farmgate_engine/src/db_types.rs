use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use fgp_common::{Money, Quantity};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        Role        ----------------------------------------------------------

/// The three actors in the marketplace. Shops buy, farmers sell, admins operate the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Farmer,
    Shop,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Farmer => write!(f, "farmer"),
            Role::Shop => write!(f, "shop"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Self::Farmer),
            "shop" => Ok(Self::Shop),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   ProductCategory   ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Vegetables,
    Fruits,
    Grains,
    Dairy,
    Meat,
    Other,
}

impl Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::Vegetables => write!(f, "vegetables"),
            ProductCategory::Fruits => write!(f, "fruits"),
            ProductCategory::Grains => write!(f, "grains"),
            ProductCategory::Dairy => write!(f, "dairy"),
            ProductCategory::Meat => write!(f, "meat"),
            ProductCategory::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ProductCategory {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vegetables" => Ok(Self::Vegetables),
            "fruits" => Ok(Self::Fruits),
            "grains" => Ok(Self::Grains),
            "dairy" => Ok(Self::Dairy),
            "meat" => Ok(Self::Meat),
            "other" => Ok(Self::Other),
            s => Err(ConversionError(format!("Invalid product category: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------

/// Lifecycle states for an order.
///
/// The pure state rules live in [`OrderStatusType::can_become`]; role gating on top of them is the
/// business of the order flow API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Created and stock reserved, awaiting payment.
    Pending,
    /// Payment received (or manually confirmed).
    Confirmed,
    /// The farmer is preparing the order.
    Processing,
    /// Handed to a courier.
    Shipped,
    /// Received by the shop. Terminal.
    Delivered,
    /// Called off by a participant. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }

    /// The state-machine transition table, ignoring roles:
    ///
    /// | From \ To  | pending | confirmed | processing | shipped | delivered | cancelled |
    /// |------------|---------|-----------|------------|---------|-----------|-----------|
    /// | pending    | -       | ✓         | ✓          | ✓       | ✓         | ✓         |
    /// | confirmed  | -       | -         | ✓          | ✓       | ✓         | ✓         |
    /// | processing | -       | -         | -          | ✓       | ✓         | ✓         |
    /// | shipped    | -       | -         | ✓          | -       | ✓         | ✓         |
    /// | delivered  | -       | -         | -          | -       | -         | -         |
    /// | cancelled  | -       | -         | -          | -       | -         | -         |
    ///
    /// Confirmation is only reachable from `pending`. Fulfilment states may be reset backwards
    /// (shipped → processing) so an operator can correct a mistaken advance. Terminal states have
    /// no exits.
    pub fn can_become(&self, new_status: OrderStatusType) -> bool {
        use OrderStatusType::*;
        if self.is_terminal() || *self == new_status {
            return false;
        }
        match new_status {
            Pending => false,
            Confirmed => *self == Pending,
            Processing | Shipped | Delivered | Cancelled => true,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Confirmed => write!(f, "confirmed"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//-----------------------------------  TransactionStatusType  ---------------------------------------------------------

/// Lifecycle states for a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatusType {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl TransactionStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatusType::Failed | TransactionStatusType::Cancelled | TransactionStatusType::Refunded
        )
    }

    /// | From \ To | pending | completed | failed | cancelled | refunded |
    /// |-----------|---------|-----------|--------|-----------|----------|
    /// | pending   | -       | ✓         | ✓      | ✓         | -        |
    /// | completed | -       | -         | -      | -         | ✓        |
    /// | failed    | -       | -         | -      | -         | -        |
    /// | cancelled | -       | -         | -      | -         | -        |
    /// | refunded  | -       | -         | -      | -         | -        |
    pub fn can_become(&self, new_status: TransactionStatusType) -> bool {
        use TransactionStatusType::*;
        match (self, new_status) {
            (Pending, Completed) | (Pending, Failed) | (Pending, Cancelled) => true,
            (Completed, Refunded) => true,
            _ => false,
        }
    }
}

impl Display for TransactionStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatusType::Pending => write!(f, "pending"),
            TransactionStatusType::Completed => write!(f, "completed"),
            TransactionStatusType::Failed => write!(f, "failed"),
            TransactionStatusType::Cancelled => write!(f, "cancelled"),
            TransactionStatusType::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for TransactionStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//------------------------------------  DeliveryStatusType  ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatusType {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl Display for DeliveryStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatusType::Pending => write!(f, "pending"),
            DeliveryStatusType::Assigned => write!(f, "assigned"),
            DeliveryStatusType::InTransit => write!(f, "in_transit"),
            DeliveryStatusType::Delivered => write!(f, "delivered"),
            DeliveryStatusType::Failed => write!(f, "failed"),
            DeliveryStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for DeliveryStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid delivery status: {s}"))),
        }
    }
}

//------------------------------------  PaymentProviderType  ---------------------------------------------------------

/// Tags for the supported payment providers. The tag is stored on the transaction row and is what
/// the provider factory dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentProviderType {
    Payme,
    Click,
    Arca,
    Mock,
}

impl Display for PaymentProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProviderType::Payme => write!(f, "payme"),
            PaymentProviderType::Click => write!(f, "click"),
            PaymentProviderType::Arca => write!(f, "arca"),
            PaymentProviderType::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for PaymentProviderType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payme" => Ok(Self::Payme),
            "click" => Ok(Self::Click),
            "arca" => Ok(Self::Arca),
            "mock" => Ok(Self::Mock),
            s => Err(ConversionError(format!("Invalid payment provider: {s}"))),
        }
    }
}

//--------------------------------------        User        ----------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    pub fn new<P: Into<String>, N: Into<String>>(phone: P, name: N, role: Role) -> Self {
        Self { phone: phone.into(), name: name.into(), role }
    }
}

//--------------------------------------      Product       ----------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub farmer_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    /// The unit the product is sold in ("kg", "bunch", "litre"...). Quantities count hundredths
    /// of this unit.
    pub unit: String,
    pub price: Money,
    pub quantity: Quantity,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub farmer_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub unit: String,
    pub price: Money,
    pub quantity: Quantity,
    pub image_url: Option<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(farmer_id: i64, name: S, price: Money, quantity: Quantity) -> Self {
        Self {
            farmer_id,
            name: name.into(),
            description: None,
            category: ProductCategory::Other,
            unit: "kg".to_string(),
            price,
            quantity,
            image_url: None,
        }
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = unit.into();
        self
    }
}

//--------------------------------------       Order        ----------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub shop_id: i64,
    pub farmer_id: i64,
    pub status: OrderStatusType,
    pub total_amount: Money,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// True if `user_id` is a participant in this order.
    pub fn involves(&self, user_id: i64) -> bool {
        self.shop_id == user_id || self.farmer_id == user_id
    }
}

/// The order header as built by the assembly flow. Lines travel separately as [`NewOrderLine`]s.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shop_id: i64,
    pub farmer_id: i64,
    pub total_amount: Money,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn new(shop_id: i64, farmer_id: i64, total_amount: Money) -> Self {
        Self { shop_id, farmer_id, total_amount, delivery_address: None, notes: None }
    }

    pub fn with_delivery_address<S: Into<String>>(mut self, address: S) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

//--------------------------------------     OrderLine      ----------------------------------------------------------

/// A single line of an order. Immutable once written; `unit_price` is the product price frozen at
/// order time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl NewOrderLine {
    pub fn new(product_id: i64, quantity: Quantity, unit_price: Money) -> Self {
        Self { product_id, quantity, unit_price }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.line_total(self.quantity)
    }
}

//----------------------------------   PaymentTransaction   ----------------------------------------------------------

/// One attempt to collect payment for an order through a specific provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    pub order_id: i64,
    pub amount: Money,
    pub provider: PaymentProviderType,
    pub status: TransactionStatusType,
    /// The provider-side reference for this transaction, set once the provider session exists.
    pub external_id: Option<String>,
    /// Opaque provider payload, stored as JSON text.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_id: i64,
    pub amount: Money,
    pub provider: PaymentProviderType,
}

impl NewTransaction {
    pub fn new(order_id: i64, amount: Money, provider: PaymentProviderType) -> Self {
        Self { order_id, amount, provider }
    }
}

//--------------------------------------     Delivery       ----------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub order_id: i64,
    pub status: DeliveryStatusType,
    pub delivery_address: Option<String>,
    pub courier_name: Option<String>,
    pub courier_phone: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_transitions_follow_the_table() {
        use OrderStatusType::*;
        assert!(Pending.can_become(Confirmed));
        assert!(Pending.can_become(Cancelled));
        assert!(Confirmed.can_become(Shipped));
        assert!(Shipped.can_become(Delivered));
        // fulfilment can be walked back, confirmation cannot be re-applied
        assert!(Shipped.can_become(Processing));
        assert!(!Confirmed.can_become(Confirmed));
        assert!(!Processing.can_become(Confirmed));
        // terminal states are terminal
        assert!(!Delivered.can_become(Cancelled));
        assert!(!Cancelled.can_become(Pending));
        assert!(!Cancelled.can_become(Confirmed));
        // no way back to pending
        assert!(!Confirmed.can_become(Pending));
    }

    #[test]
    fn transaction_transitions_follow_the_table() {
        use TransactionStatusType::*;
        assert!(Pending.can_become(Completed));
        assert!(Pending.can_become(Failed));
        assert!(Pending.can_become(Cancelled));
        assert!(Completed.can_become(Refunded));
        assert!(!Completed.can_become(Failed));
        assert!(!Failed.can_become(Completed));
        assert!(!Refunded.can_become(Pending));
        assert!(!Pending.can_become(Refunded));
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        for s in ["pending", "confirmed", "processing", "shipped", "delivered", "cancelled"] {
            assert_eq!(s.parse::<OrderStatusType>().unwrap().to_string(), s);
        }
        assert_eq!("in_transit".parse::<DeliveryStatusType>().unwrap(), DeliveryStatusType::InTransit);
        assert!("unknown".parse::<TransactionStatusType>().is_err());
    }

    #[test]
    fn line_total_uses_frozen_price() {
        let line = NewOrderLine::new(1, "2.50".parse().unwrap(), "1000.00".parse().unwrap());
        assert_eq!(line.line_total(), "2500.00".parse().unwrap());
    }
}
