use super::invoice::{BilledClient, LineItem, Totals};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Converted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub quotation_number: String,
    #[serde(flatten)]
    pub client: BilledClient,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub currency: String,
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub status: QuotationStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_invoice_id: Option<String>,
}

impl Quotation {
    pub fn is_converted(&self) -> bool {
        self.status == QuotationStatus::Converted || self.converted_invoice_id.is_some()
    }
}
