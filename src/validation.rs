//! Form validation. Services run these before every write, so a direct API
//! call gets the same checks as the forms.

use crate::models::lookup::find_currency;
use crate::models::{
    Client, CompanySettings, DeliveryOrder, LineItem, SalesDocumentInput, SettingsInput,
};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Largest quantity a line may carry. Piece counts are `u32`, so a fresh
/// delivery item can always ship its full quantity.
pub const MAX_LINE_QUANTITY: u64 = u32::MAX as u64;

/// Field name → message, in the order the problems were found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Non-negative decimal amount
pub fn parse_amount(input: &str) -> Option<BigDecimal> {
    let value = BigDecimal::from_str(input.trim()).ok()?;
    (value >= BigDecimal::zero()).then_some(value)
}

/// Percentage between 0 and 100 inclusive; a trailing `%` is accepted.
pub fn parse_percentage(input: &str) -> Option<BigDecimal> {
    let trimmed = input.trim().trim_end_matches('%').trim_end();
    let value = parse_amount(trimmed)?;
    (value <= BigDecimal::from(100)).then_some(value)
}

pub fn validate_client(client: &Client) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if client.company_name.trim().is_empty() {
        errors.add("companyName", "Company name is required");
    }
    if client.email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&client.email) {
        errors.add("email", "Email address is invalid");
    }
    errors.into_result()
}

/// Check a submitted invoice/quotation and build its priced lines. An
/// empty VAT cell takes `default_vat`.
pub fn validate_sales_document(
    input: &SalesDocumentInput,
    default_vat: &BigDecimal,
) -> Result<Vec<LineItem>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if input.client_id.trim().is_empty() {
        errors.add("clientId", "A client must be selected");
    }
    if let Some(currency) = &input.currency {
        if find_currency(currency).is_none() {
            errors.add("currency", format!("Unknown currency '{}'", currency.trim()));
        }
    }
    if let (Some(issue), Some(due)) = (input.issue_date, input.due_date) {
        if due < issue {
            errors.add("dueDate", "Due date cannot be before the issue date");
        }
    }
    if input.items.is_empty() {
        errors.add("items", "At least one item is required");
    }

    let mut lines = Vec::with_capacity(input.items.len());
    for (idx, item) in input.items.iter().enumerate() {
        let field = |name: &str| format!("items[{idx}].{name}");
        if item.name.trim().is_empty() {
            errors.add(field("name"), "Item name is required");
        }
        if item.quantity == 0 {
            errors.add(field("quantity"), "Quantity must be at least 1");
        } else if item.quantity > MAX_LINE_QUANTITY {
            errors.add(
                field("quantity"),
                format!("Quantity cannot exceed {MAX_LINE_QUANTITY}"),
            );
        }
        let price = parse_amount(&item.price);
        if price.is_none() {
            errors.add(field("price"), "Price must be a non-negative number");
        }
        let vat = if item.vat.trim().is_empty() {
            Some(default_vat.clone())
        } else {
            parse_percentage(&item.vat)
        };
        if vat.is_none() {
            errors.add(field("vat"), "VAT must be a percentage between 0 and 100");
        }
        if let (Some(price), Some(vat)) = (price, vat) {
            lines.push(LineItem::new(item.name.trim(), item.quantity, price, vat));
        }
    }

    errors.into_result().map(|()| lines)
}

pub fn validate_settings(input: &SettingsInput) -> Result<CompanySettings, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if input.company_name.trim().is_empty() {
        errors.add("companyName", "Company name is required");
    }
    if !input.email.trim().is_empty() && !is_valid_email(&input.email) {
        errors.add("email", "Email address is invalid");
    }
    let currency = find_currency(&input.currency);
    if currency.is_none() {
        errors.add("currency", format!("Unknown currency '{}'", input.currency.trim()));
    }
    let default_vat = parse_percentage(&input.default_vat);
    if default_vat.is_none() {
        errors.add("defaultVat", "VAT must be a percentage between 0 and 100");
    }

    errors.into_result()?;
    Ok(CompanySettings {
        company_name: input.company_name.trim().to_string(),
        address: input.address.trim().to_string(),
        email: input.email.trim().to_string(),
        phone: input.phone.trim().to_string(),
        trn_number: input.trn_number.trim().to_string(),
        currency: currency.map(|c| c.code.to_string()).unwrap_or_default(),
        default_vat: default_vat.unwrap_or_else(BigDecimal::zero),
    })
}

/// Last check before a delivery order reaches the store
pub fn validate_delivery_order(order: &DeliveryOrder) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if order.invoice_id.trim().is_empty() {
        errors.add("invoiceId", "An invoice must be selected");
    }
    if order.items.is_empty() {
        errors.add("items", "A delivery order needs at least one item");
    }
    for (idx, item) in order.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            errors.add(format!("items[{idx}].name"), "Item name is required");
        }
        if item.quantity > MAX_LINE_QUANTITY {
            errors.add(
                format!("items[{idx}].quantity"),
                format!("Quantity cannot exceed {MAX_LINE_QUANTITY}"),
            );
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItemInput;

    fn line(name: &str, quantity: u64, price: &str, vat: &str) -> LineItemInput {
        LineItemInput {
            name: name.to_string(),
            quantity,
            price: price.to_string(),
            vat: vat.to_string(),
        }
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email(" sales@acme.example "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no-at.example"));
        assert!(!is_valid_email("two words@x.y"));
    }

    #[test]
    fn percentage_parsing() {
        assert_eq!(parse_percentage("5"), Some(BigDecimal::from(5)));
        assert_eq!(parse_percentage(" 12.5 % "), BigDecimal::from_str("12.5").ok());
        assert_eq!(parse_percentage("100"), Some(BigDecimal::from(100)));
        assert!(parse_percentage("101").is_none());
        assert!(parse_percentage("-1").is_none());
        assert!(parse_percentage("five").is_none());
    }

    #[test]
    fn client_requires_name_and_valid_email() {
        let err = validate_client(&Client::default()).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), ["companyName", "email"]);

        let err = validate_client(&Client::new("Acme", "bad")).unwrap_err();
        assert_eq!(err.get("email"), Some("Email address is invalid"));

        assert!(validate_client(&Client::new("Acme", "ops@acme.test")).is_ok());
    }

    #[test]
    fn sales_document_reports_each_bad_line() {
        let input = SalesDocumentInput {
            client_id: "c1".into(),
            items: vec![line("Bolt", 2, "1.50", "5"), line("", 0, "x", "abc")],
            ..Default::default()
        };
        let err = validate_sales_document(&input, &BigDecimal::from(5)).unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            [
                "items[1].name",
                "items[1].quantity",
                "items[1].price",
                "items[1].vat"
            ]
        );
    }

    #[test]
    fn sales_document_caps_line_quantity() {
        let input = SalesDocumentInput {
            client_id: "c1".into(),
            items: vec![
                line("Bolt", MAX_LINE_QUANTITY, "1", "5"),
                line("Nut", u64::MAX, "1", "5"),
                line("Washer", 2, "1", "5"),
            ],
            ..Default::default()
        };
        let err = validate_sales_document(&input, &BigDecimal::from(5)).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), ["items[1].quantity"]);
        assert_eq!(
            err.get("items[1].quantity"),
            Some("Quantity cannot exceed 4294967295")
        );
    }

    #[test]
    fn sales_document_uses_default_vat_for_blank_cells() {
        let input = SalesDocumentInput {
            client_id: "c1".into(),
            items: vec![line("Bolt", 10, "2", "")],
            ..Default::default()
        };
        let lines = validate_sales_document(&input, &BigDecimal::from(5)).unwrap();
        assert_eq!(lines[0].vat, BigDecimal::from(5));
        assert_eq!(lines[0].total, BigDecimal::from(21));
    }

    #[test]
    fn sales_document_needs_client_and_items() {
        let err =
            validate_sales_document(&SalesDocumentInput::default(), &BigDecimal::zero()).unwrap_err();
        assert!(err.get("clientId").is_some());
        assert!(err.get("items").is_some());
    }

    #[test]
    fn settings_validation_normalizes_currency() {
        let input = SettingsInput {
            company_name: "Acme".into(),
            currency: "usd".into(),
            default_vat: "5".into(),
            ..Default::default()
        };
        let settings = validate_settings(&input).unwrap();
        assert_eq!(settings.currency, "USD");

        let err = validate_settings(&SettingsInput::default()).unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.to_string().starts_with("companyName: "));
    }
}
