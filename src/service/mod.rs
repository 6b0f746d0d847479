pub mod client;
pub mod delivery_order;
pub mod drafts;
pub mod invoice;
pub mod quotation;
pub mod settings;
pub mod wizard;

pub use client::{ClientService, ImportReport};
pub use delivery_order::DeliveryOrderService;
pub use drafts::DraftRegistry;
pub use invoice::InvoiceService;
pub use quotation::QuotationService;
pub use settings::SettingsService;
pub use wizard::{DeliveryOrderWizard, WizardStep, WizardView};

use crate::db::{Document, DocumentStore, Record};
use crate::error::{ServiceError, ServiceResult, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Every domain service, wired to one store at the application root
#[derive(Clone)]
pub struct Services {
    pub clients: ClientService,
    pub invoices: InvoiceService,
    pub quotations: QuotationService,
    pub delivery_orders: DeliveryOrderService,
    pub settings: SettingsService,
    pub drafts: Arc<DraftRegistry>,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let settings = SettingsService::new(store.clone());
        let clients = ClientService::new(store.clone());
        let invoices = InvoiceService::new(store.clone(), clients.clone(), settings.clone());
        let quotations = QuotationService::new(
            store.clone(),
            clients.clone(),
            settings.clone(),
            invoices.clone(),
        );
        let delivery_orders = DeliveryOrderService::new(store, invoices.clone());
        let drafts = Arc::new(DraftRegistry::new(delivery_orders.clone()));

        Self {
            clients,
            invoices,
            quotations,
            delivery_orders,
            settings,
            drafts,
        }
    }
}

pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> ServiceResult<Vec<Record<T>>> {
    docs.iter()
        .map(|d| d.decode::<T>().map_err(ServiceError::from))
        .collect()
}

/// Load one typed record or fail with `NotFound`.
pub(crate) async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    kind: &'static str,
    id: &str,
) -> ServiceResult<Record<T>> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(doc.decode::<T>()?),
        None => Err(ServiceError::not_found(kind, id)),
    }
}

/// Next `PREFIX-NNNN` number for a collection: one past the highest in use.
pub(crate) async fn next_number(
    store: &dyn DocumentStore,
    collection: &str,
    field: &str,
    prefix: &str,
) -> ServiceResult<String> {
    let docs = store.list(collection, None, None).await?;
    let highest = docs
        .iter()
        .filter_map(|d| d.data.get(field).and_then(Value::as_str))
        .filter_map(|n| n.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    Ok(format!("{}-{:04}", prefix, highest + 1))
}
