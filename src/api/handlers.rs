use super::response::{ok, ApiError, ApiResponse, ApiResult};
use crate::db::Record;
use crate::models::lookup::{Country, Currency, COUNTRIES, CURRENCIES};
use crate::models::{
    Client, CompanySettings, DeliveryOrder, Invoice, InvoiceStatus, Quotation, QuotationStatus,
    SalesDocumentInput, SettingsInput,
};
use crate::service::{
    ClientService, DeliveryOrderService, ImportReport, InvoiceService, QuotationService,
    SettingsService,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn created<T: serde::Serialize>(message: String, data: T) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, data)),
    ))
}

/// List filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub client_id: Option<String>,
    pub invoice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

// ---- clients ----

pub async fn list_clients(State(clients): State<ClientService>) -> ApiResult<Vec<Record<Client>>> {
    ok(clients.list().await?)
}

pub async fn create_client(
    State(clients): State<ClientService>,
    Json(client): Json<Client>,
) -> Created<Record<Client>> {
    let record = clients.create(client).await?;
    created(format!("Client {} created", record.data.company_name), record)
}

pub async fn get_client(
    State(clients): State<ClientService>,
    Path(id): Path<String>,
) -> ApiResult<Record<Client>> {
    ok(clients.get(&id).await?)
}

pub async fn update_client(
    State(clients): State<ClientService>,
    Path(id): Path<String>,
    Json(client): Json<Client>,
) -> ApiResult<Record<Client>> {
    ok(clients.update(&id, client).await?)
}

pub async fn export_clients(State(clients): State<ClientService>) -> Result<Response, ApiError> {
    let csv = clients.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"clients.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

pub async fn import_clients(
    State(clients): State<ClientService>,
    body: String,
) -> ApiResult<ImportReport> {
    if body.trim().is_empty() {
        return Err(ApiError::bad_request("CSV body is empty"));
    }
    let report = clients.import_csv(&body).await?;
    Ok(Json(ApiResponse::with_message(
        format!(
            "Imported {} clients, skipped {}",
            report.imported,
            report.skipped.len()
        ),
        report,
    )))
}

// ---- invoices ----

pub async fn list_invoices(
    State(invoices): State<InvoiceService>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Record<Invoice>>> {
    ok(invoices.list(query.client_id.as_deref()).await?)
}

pub async fn create_invoice(
    State(invoices): State<InvoiceService>,
    Json(input): Json<SalesDocumentInput>,
) -> Created<Record<Invoice>> {
    let record = invoices.create(input).await?;
    created(format!("Invoice {} created", record.data.invoice_number), record)
}

pub async fn get_invoice(
    State(invoices): State<InvoiceService>,
    Path(id): Path<String>,
) -> ApiResult<Record<Invoice>> {
    ok(invoices.get(&id).await?)
}

pub async fn update_invoice(
    State(invoices): State<InvoiceService>,
    Path(id): Path<String>,
    Json(input): Json<SalesDocumentInput>,
) -> ApiResult<Record<Invoice>> {
    ok(invoices.update(&id, input).await?)
}

pub async fn set_invoice_status(
    State(invoices): State<InvoiceService>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest<InvoiceStatus>>,
) -> ApiResult<Record<Invoice>> {
    ok(invoices.set_status(&id, req.status).await?)
}

// ---- quotations ----

pub async fn list_quotations(
    State(quotations): State<QuotationService>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Record<Quotation>>> {
    ok(quotations.list(query.client_id.as_deref()).await?)
}

pub async fn create_quotation(
    State(quotations): State<QuotationService>,
    Json(input): Json<SalesDocumentInput>,
) -> Created<Record<Quotation>> {
    let record = quotations.create(input).await?;
    created(
        format!("Quotation {} created", record.data.quotation_number),
        record,
    )
}

pub async fn get_quotation(
    State(quotations): State<QuotationService>,
    Path(id): Path<String>,
) -> ApiResult<Record<Quotation>> {
    ok(quotations.get(&id).await?)
}

pub async fn update_quotation(
    State(quotations): State<QuotationService>,
    Path(id): Path<String>,
    Json(input): Json<SalesDocumentInput>,
) -> ApiResult<Record<Quotation>> {
    ok(quotations.update(&id, input).await?)
}

pub async fn set_quotation_status(
    State(quotations): State<QuotationService>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest<QuotationStatus>>,
) -> ApiResult<Record<Quotation>> {
    ok(quotations.set_status(&id, req.status).await?)
}

pub async fn convert_quotation(
    State(quotations): State<QuotationService>,
    Path(id): Path<String>,
) -> Created<Record<Invoice>> {
    let invoice = quotations.convert_to_invoice(&id).await?;
    created(
        format!("Converted to invoice {}", invoice.data.invoice_number),
        invoice,
    )
}

// ---- delivery orders ----

pub async fn list_delivery_orders(
    State(orders): State<DeliveryOrderService>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Record<DeliveryOrder>>> {
    ok(orders.list(query.invoice_id.as_deref()).await?)
}

pub async fn get_delivery_order(
    State(orders): State<DeliveryOrderService>,
    Path(id): Path<String>,
) -> ApiResult<Record<DeliveryOrder>> {
    ok(orders.get(&id).await?)
}

// ---- settings & lookups ----

pub async fn get_settings(State(settings): State<SettingsService>) -> ApiResult<CompanySettings> {
    ok(settings.get().await?)
}

pub async fn update_settings(
    State(settings): State<SettingsService>,
    Json(input): Json<SettingsInput>,
) -> ApiResult<CompanySettings> {
    ok(settings.update(input).await?)
}

pub async fn list_currencies() -> ApiResult<&'static [Currency]> {
    ok(CURRENCIES)
}

pub async fn list_countries() -> ApiResult<&'static [Country]> {
    ok(COUNTRIES)
}
