//! Currency and country reference tables used by forms and validation.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    pub currency: &'static str,
}

pub const CURRENCIES: &[Currency] = &[
    Currency { code: "AED", name: "UAE Dirham", symbol: "د.إ" },
    Currency { code: "SAR", name: "Saudi Riyal", symbol: "﷼" },
    Currency { code: "QAR", name: "Qatari Riyal", symbol: "ر.ق" },
    Currency { code: "OMR", name: "Omani Rial", symbol: "ر.ع." },
    Currency { code: "KWD", name: "Kuwaiti Dinar", symbol: "د.ك" },
    Currency { code: "BHD", name: "Bahraini Dinar", symbol: ".د.ب" },
    Currency { code: "USD", name: "US Dollar", symbol: "$" },
    Currency { code: "EUR", name: "Euro", symbol: "€" },
    Currency { code: "GBP", name: "British Pound", symbol: "£" },
    Currency { code: "INR", name: "Indian Rupee", symbol: "₹" },
    Currency { code: "PKR", name: "Pakistani Rupee", symbol: "₨" },
    Currency { code: "CNY", name: "Chinese Yuan", symbol: "¥" },
];

pub const COUNTRIES: &[Country] = &[
    Country { code: "AE", name: "United Arab Emirates", currency: "AED" },
    Country { code: "SA", name: "Saudi Arabia", currency: "SAR" },
    Country { code: "QA", name: "Qatar", currency: "QAR" },
    Country { code: "OM", name: "Oman", currency: "OMR" },
    Country { code: "KW", name: "Kuwait", currency: "KWD" },
    Country { code: "BH", name: "Bahrain", currency: "BHD" },
    Country { code: "US", name: "United States", currency: "USD" },
    Country { code: "DE", name: "Germany", currency: "EUR" },
    Country { code: "FR", name: "France", currency: "EUR" },
    Country { code: "GB", name: "United Kingdom", currency: "GBP" },
    Country { code: "IN", name: "India", currency: "INR" },
    Country { code: "PK", name: "Pakistan", currency: "PKR" },
    Country { code: "CN", name: "China", currency: "CNY" },
];

pub fn find_currency(code: &str) -> Option<&'static Currency> {
    let code = code.trim();
    CURRENCIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Look a country up by ISO code or by full name, case-insensitively.
pub fn find_country(key: &str) -> Option<&'static Country> {
    let key = key.trim();
    COUNTRIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(key) || c.name.eq_ignore_ascii_case(key))
}

pub fn currency_for_country(key: &str) -> Option<&'static Currency> {
    find_country(key).and_then(|country| find_currency(country.currency))
}
