use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Invoice / quotation line. `vat` is a percentage rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: u64,
    pub price: BigDecimal,
    pub vat: BigDecimal,
    pub total: BigDecimal,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u64, price: BigDecimal, vat: BigDecimal) -> Self {
        let mut item = Self {
            name: name.into(),
            quantity,
            price,
            vat,
            total: BigDecimal::zero(),
        };
        item.total = (item.net() + item.vat_amount()).round(2);
        item
    }

    pub fn net(&self) -> BigDecimal {
        BigDecimal::from(self.quantity) * &self.price
    }

    pub fn vat_amount(&self) -> BigDecimal {
        self.net() * &self.vat / BigDecimal::from(100)
    }
}

/// Document totals derived from the lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: BigDecimal,
    pub vat_total: BigDecimal,
    pub total: BigDecimal,
}

impl Totals {
    pub fn of(items: &[LineItem]) -> Self {
        let subtotal = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.net())
            .round(2);
        let vat_total = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.vat_amount())
            .round(2);
        let total = &subtotal + &vat_total;
        Self {
            subtotal,
            vat_total,
            total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// Client details copied onto a sales document when it is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BilledClient {
    pub client_id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub client_trn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    #[serde(flatten)]
    pub client: BilledClient,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub notes: String,
    /// Quotation this invoice was converted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<String>,
}

/// Raw line as submitted by a form. Price and VAT stay textual until validated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub vat: String,
}

/// Submitted invoice or quotation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesDocumentInput {
    #[serde(default)]
    pub client_id: String,
    pub issue_date: Option<NaiveDate>,
    /// Due date on invoices, validity end on quotations
    pub due_date: Option<NaiveDate>,
    pub currency: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub notes: String,
}

/// Accepts `"12.5"` as well as `12.5` and keeps the textual form.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}
