pub mod client;
pub mod delivery_order;
pub mod invoice;
pub mod lookup;
pub mod packaging;
pub mod quotation;
pub mod settings;

pub use client::Client;
pub use delivery_order::DeliveryOrder;
pub use invoice::{
    BilledClient, Invoice, InvoiceStatus, LineItem, LineItemInput, SalesDocumentInput, Totals,
};
pub use packaging::{
    summarize_all, AggregateSummary, CartonDetail, CartonField, CartonSize, DeliveryItem,
    DeliveryItemRecord, ItemSummary, Packaging, PackagingType,
};
pub use quotation::{Quotation, QuotationStatus};
pub use settings::{CompanySettings, SettingsInput};
