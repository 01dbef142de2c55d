use std::fmt::Display;

use chrono::{DateTime, Utc};
use farmgate_engine::{
    catalog_objects::ProductQueryFilter,
    db_types::{NewProduct, OrderLine, OrderStatusType, PaymentProviderType, ProductCategory},
    FullOrder,
};
use fgp_common::{Money, Quantity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// An order with its lines, flattened for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub order_id: i64,
    pub status: OrderStatusType,
    pub total_amount: Money,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl From<FullOrder> for OrderResult {
    fn from(full_order: FullOrder) -> Self {
        let FullOrder { order, lines } = full_order;
        Self {
            order_id: order.id,
            status: order.status,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address,
            notes: order.notes,
            created_at: order.created_at,
            lines,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatusType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsQuery {
    pub order_id: Option<i64>,
}

/// Query parameters for the public catalog listing. Inactive products are never included; owners
/// see those through their own tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListQuery {
    pub farmer_id: Option<i64>,
    pub category: Option<ProductCategory>,
    pub name_like: Option<String>,
}

impl ProductListQuery {
    pub fn into_filter(self) -> ProductQueryFilter {
        let mut filter = ProductQueryFilter::active();
        if let Some(farmer_id) = self.farmer_id {
            filter = filter.with_farmer_id(farmer_id);
        }
        if let Some(category) = self.category {
            filter = filter.with_category(category);
        }
        if let Some(fragment) = self.name_like {
            filter = filter.with_name_like(fragment);
        }
        filter
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitRequest {
    pub order_id: i64,
    pub provider: PaymentProviderType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub transaction_id: i64,
    /// `None` refunds the full captured amount.
    pub amount: Option<Money>,
}

/// Body for a product listing. `farmer_id` only matters for admins; farmers always list under
/// their own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductRequest {
    pub farmer_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub unit: Option<String>,
    pub price: Money,
    pub quantity: Quantity,
    pub image_url: Option<String>,
}

impl NewProductRequest {
    pub fn into_new_product(self, default_farmer_id: i64) -> NewProduct {
        let mut product = NewProduct::new(
            self.farmer_id.unwrap_or(default_farmer_id),
            self.name,
            self.price,
            self.quantity,
        );
        if let Some(category) = self.category {
            product = product.with_category(category);
        }
        if let Some(unit) = self.unit {
            product = product.with_unit(unit);
        }
        product.description = self.description;
        product.image_url = self.image_url;
        product
    }
}
