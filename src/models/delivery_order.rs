use super::packaging::{AggregateSummary, DeliveryItemRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One consignment shipped against an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOrder {
    pub delivery_number: String,
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub delivery_address: String,
    pub delivery_date: NaiveDate,
    pub items: Vec<DeliveryItemRecord>,
    pub summary: AggregateSummary,
    #[serde(default)]
    pub notes: String,
}
