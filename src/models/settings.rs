use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::invoice::string_or_number;

/// Company profile printed on documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub company_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub trn_number: String,
    pub currency: String,
    /// Default VAT percentage for new lines
    pub default_vat: BigDecimal,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            address: String::new(),
            email: String::new(),
            phone: String::new(),
            trn_number: String::new(),
            currency: "AED".to_string(),
            default_vat: BigDecimal::from(5),
        }
    }
}

/// Settings form as submitted
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub trn_number: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub default_vat: String,
}
