use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::DeliveryStatusType;

/// Partial update of a delivery, applied by platform operators as the shipment progresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryUpdate {
    pub status: Option<DeliveryStatusType>,
    pub courier_name: Option<String>,
    pub courier_phone: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl DeliveryUpdate {
    pub fn with_status(mut self, status: DeliveryStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.courier_name.is_none() &&
            self.courier_phone.is_none() &&
            self.tracking_number.is_none() &&
            self.estimated_delivery.is_none() &&
            self.notes.is_none()
    }
}
