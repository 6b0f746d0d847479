use super::{decode_all, fetch, next_number, to_body, ClientService, SettingsService};
use crate::db::{collections, DocumentStore, Filter, OrderBy, Record};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    BilledClient, Client, Invoice, InvoiceStatus, LineItem, SalesDocumentInput, Totals,
};
use crate::validation::{validate_sales_document, ValidationErrors};
use chrono::{Local, NaiveDate};
use serde_json::json;
use std::sync::Arc;

const INVOICE_PREFIX: &str = "INV";

/// A validated invoice/quotation body, before numbering
#[derive(Debug, Clone)]
pub(crate) struct PreparedDocument {
    pub client: BilledClient,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub notes: String,
}

impl From<&Record<Client>> for BilledClient {
    fn from(record: &Record<Client>) -> Self {
        BilledClient {
            client_id: record.id.clone(),
            client_name: record.data.company_name.clone(),
            client_email: record.data.email.clone(),
            client_address: record.data.address.clone(),
            client_trn: record.data.trn_number.clone(),
        }
    }
}

/// Validate a submitted document, resolve its client and price its lines.
pub(crate) async fn prepare_sales_document(
    clients: &ClientService,
    settings: &SettingsService,
    input: &SalesDocumentInput,
) -> ServiceResult<PreparedDocument> {
    let profile = settings.get().await?;
    let items = validate_sales_document(input, &profile.default_vat)?;

    let client = match clients.find(input.client_id.trim()).await? {
        Some(client) => client,
        None => {
            let mut errors = ValidationErrors::new();
            errors.add("clientId", "Selected client does not exist");
            return Err(errors.into());
        }
    };

    let currency = input
        .currency
        .as_deref()
        .map(|c| c.trim().to_ascii_uppercase())
        .unwrap_or(profile.currency);

    Ok(PreparedDocument {
        client: BilledClient::from(&client),
        issue_date: input
            .issue_date
            .unwrap_or_else(|| Local::now().date_naive()),
        due_date: input.due_date,
        currency,
        totals: Totals::of(&items),
        items,
        notes: input.notes.trim().to_string(),
    })
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn DocumentStore>,
    clients: ClientService,
    settings: SettingsService,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clients: ClientService,
        settings: SettingsService,
    ) -> Self {
        Self {
            store,
            clients,
            settings,
        }
    }

    pub async fn create(&self, input: SalesDocumentInput) -> ServiceResult<Record<Invoice>> {
        let prepared = prepare_sales_document(&self.clients, &self.settings, &input).await?;
        self.insert(prepared, None).await
    }

    /// Number and store a prepared invoice
    pub(crate) async fn insert(
        &self,
        prepared: PreparedDocument,
        quotation_id: Option<String>,
    ) -> ServiceResult<Record<Invoice>> {
        let invoice_number = next_number(
            self.store.as_ref(),
            collections::INVOICES,
            "invoiceNumber",
            INVOICE_PREFIX,
        )
        .await?;

        let invoice = Invoice {
            invoice_number,
            client: prepared.client,
            issue_date: prepared.issue_date,
            due_date: prepared.due_date,
            currency: prepared.currency,
            items: prepared.items,
            totals: prepared.totals,
            status: InvoiceStatus::Pending,
            notes: prepared.notes,
            quotation_id,
        };

        let id = self
            .store
            .create(collections::INVOICES, to_body(&invoice)?)
            .await?;
        tracing::info!(
            "Invoice {} ({}) created for {}, total {}",
            invoice.invoice_number,
            id,
            invoice.client.client_name,
            invoice.totals.total
        );
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Record<Invoice>> {
        fetch(self.store.as_ref(), collections::INVOICES, "invoice", id).await
    }

    /// Newest first, optionally for one client
    pub async fn list(&self, client_id: Option<&str>) -> ServiceResult<Vec<Record<Invoice>>> {
        let filter = client_id.map(|id| Filter::new().eq("clientId", id));
        let docs = self
            .store
            .list(
                collections::INVOICES,
                filter.as_ref(),
                Some(&OrderBy::newest_first()),
            )
            .await?;
        decode_all(&docs)
    }

    /// Replace client, dates and lines; number, status and origin are kept.
    pub async fn update(
        &self,
        id: &str,
        input: SalesDocumentInput,
    ) -> ServiceResult<Record<Invoice>> {
        let existing = self.get(id).await?;
        if existing.data.status == InvoiceStatus::Cancelled {
            return Err(ServiceError::Conflict(format!(
                "invoice {} is cancelled",
                existing.data.invoice_number
            )));
        }
        let prepared = prepare_sales_document(&self.clients, &self.settings, &input).await?;

        let invoice = Invoice {
            client: prepared.client,
            issue_date: prepared.issue_date,
            due_date: prepared.due_date,
            currency: prepared.currency,
            items: prepared.items,
            totals: prepared.totals,
            notes: prepared.notes,
            ..existing.data
        };
        self.store
            .update(collections::INVOICES, id, to_body(&invoice)?)
            .await?;
        tracing::info!("Invoice {} updated", invoice.invoice_number);
        self.get(id).await
    }

    pub async fn set_status(&self, id: &str, status: InvoiceStatus) -> ServiceResult<Record<Invoice>> {
        self.get(id).await?;
        self.store
            .update(collections::INVOICES, id, json!({ "status": status }))
            .await?;
        tracing::info!("Invoice {} marked {}", id, status.as_str());
        self.get(id).await
    }
}
