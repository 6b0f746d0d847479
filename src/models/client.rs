use serde::{Deserialize, Serialize};

/// Customer company record. Also the shape accepted by create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub country: String,
    /// Tax registration number
    #[serde(default)]
    pub trn_number: String,
}

impl Client {
    pub fn new(company_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Trim every field in place.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.company_name,
            &mut self.email,
            &mut self.phone,
            &mut self.address,
            &mut self.country,
            &mut self.trn_number,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self
    }
}
