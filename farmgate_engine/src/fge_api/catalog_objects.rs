use fgp_common::{Money, Quantity};
use serde::{Deserialize, Serialize};

use crate::db_types::ProductCategory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductQueryFilter {
    pub farmer_id: Option<i64>,
    pub category: Option<ProductCategory>,
    pub name_like: Option<String>,
    /// When set (the public listing default), inactive products are excluded.
    pub active_only: bool,
}

impl ProductQueryFilter {
    pub fn active() -> Self {
        Self { active_only: true, ..Self::default() }
    }

    pub fn with_farmer_id(mut self, farmer_id: i64) -> Self {
        self.farmer_id = Some(farmer_id);
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_name_like<S: Into<String>>(mut self, fragment: S) -> Self {
        self.name_like = Some(fragment.into());
        self
    }
}

/// Partial update of a product. Quantity here is a catalog edit (restock/correction) by the
/// owner; order flows never use this path to adjust stock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub unit: Option<String>,
    pub price: Option<Money>,
    pub quantity: Option<Quantity>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.description.is_none() &&
            self.category.is_none() &&
            self.unit.is_none() &&
            self.price.is_none() &&
            self.quantity.is_none() &&
            self.image_url.is_none() &&
            self.is_active.is_none()
    }
}
