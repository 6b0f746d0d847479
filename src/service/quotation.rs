use super::invoice::{prepare_sales_document, PreparedDocument};
use super::{decode_all, fetch, next_number, to_body, ClientService, InvoiceService, SettingsService};
use crate::db::{collections, DocumentStore, Filter, OrderBy, Record};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Invoice, Quotation, QuotationStatus, SalesDocumentInput};
use chrono::Local;
use serde_json::json;
use std::sync::Arc;

const QUOTATION_PREFIX: &str = "QUO";

#[derive(Clone)]
pub struct QuotationService {
    store: Arc<dyn DocumentStore>,
    clients: ClientService,
    settings: SettingsService,
    invoices: InvoiceService,
}

impl QuotationService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clients: ClientService,
        settings: SettingsService,
        invoices: InvoiceService,
    ) -> Self {
        Self {
            store,
            clients,
            settings,
            invoices,
        }
    }

    pub async fn create(&self, input: SalesDocumentInput) -> ServiceResult<Record<Quotation>> {
        let prepared = prepare_sales_document(&self.clients, &self.settings, &input).await?;
        let quotation_number = next_number(
            self.store.as_ref(),
            collections::QUOTATIONS,
            "quotationNumber",
            QUOTATION_PREFIX,
        )
        .await?;

        let quotation = Quotation {
            quotation_number,
            client: prepared.client,
            issue_date: prepared.issue_date,
            valid_until: prepared.due_date,
            currency: prepared.currency,
            items: prepared.items,
            totals: prepared.totals,
            status: QuotationStatus::Draft,
            notes: prepared.notes,
            converted_invoice_id: None,
        };

        let id = self
            .store
            .create(collections::QUOTATIONS, to_body(&quotation)?)
            .await?;
        tracing::info!(
            "Quotation {} ({}) created for {}",
            quotation.quotation_number,
            id,
            quotation.client.client_name
        );
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Record<Quotation>> {
        fetch(self.store.as_ref(), collections::QUOTATIONS, "quotation", id).await
    }

    pub async fn list(&self, client_id: Option<&str>) -> ServiceResult<Vec<Record<Quotation>>> {
        let filter = client_id.map(|id| Filter::new().eq("clientId", id));
        let docs = self
            .store
            .list(
                collections::QUOTATIONS,
                filter.as_ref(),
                Some(&OrderBy::newest_first()),
            )
            .await?;
        decode_all(&docs)
    }

    pub async fn update(
        &self,
        id: &str,
        input: SalesDocumentInput,
    ) -> ServiceResult<Record<Quotation>> {
        let existing = self.get(id).await?;
        if existing.data.is_converted() {
            return Err(ServiceError::Conflict(format!(
                "quotation {} has already been converted",
                existing.data.quotation_number
            )));
        }
        let prepared = prepare_sales_document(&self.clients, &self.settings, &input).await?;

        let quotation = Quotation {
            client: prepared.client,
            issue_date: prepared.issue_date,
            valid_until: prepared.due_date,
            currency: prepared.currency,
            items: prepared.items,
            totals: prepared.totals,
            notes: prepared.notes,
            ..existing.data
        };
        self.store
            .update(collections::QUOTATIONS, id, to_body(&quotation)?)
            .await?;
        tracing::info!("Quotation {} updated", quotation.quotation_number);
        self.get(id).await
    }

    /// `converted` is reserved for [`QuotationService::convert_to_invoice`].
    pub async fn set_status(
        &self,
        id: &str,
        status: QuotationStatus,
    ) -> ServiceResult<Record<Quotation>> {
        let existing = self.get(id).await?;
        if status == QuotationStatus::Converted || existing.data.is_converted() {
            return Err(ServiceError::Conflict(
                "conversion status can only change through conversion".to_string(),
            ));
        }
        self.store
            .update(collections::QUOTATIONS, id, json!({ "status": status }))
            .await?;
        self.get(id).await
    }

    /// Raise an invoice from the quotation's client and lines, then mark the
    /// quotation converted. A quotation converts once.
    pub async fn convert_to_invoice(&self, id: &str) -> ServiceResult<Record<Invoice>> {
        let quotation = self.get(id).await?;
        if let Some(invoice_id) = &quotation.data.converted_invoice_id {
            return Err(ServiceError::Conflict(format!(
                "quotation {} was already converted to invoice {}",
                quotation.data.quotation_number, invoice_id
            )));
        }

        let data = quotation.data;
        let prepared = PreparedDocument {
            client: data.client,
            issue_date: Local::now().date_naive(),
            due_date: None,
            currency: data.currency,
            items: data.items,
            totals: data.totals,
            notes: data.notes,
        };
        let invoice = self.invoices.insert(prepared, Some(id.to_string())).await?;

        self.store
            .update(
                collections::QUOTATIONS,
                id,
                json!({
                    "status": QuotationStatus::Converted,
                    "convertedInvoiceId": invoice.id,
                }),
            )
            .await?;
        tracing::info!(
            "Quotation {} converted to invoice {}",
            data.quotation_number,
            invoice.data.invoice_number
        );
        Ok(invoice)
    }
}
