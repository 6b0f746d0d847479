//! Delivery-order wizard sessions over HTTP.

use super::response::{ok, ApiError, ApiResponse, ApiResult};
use crate::db::Record;
use crate::models::invoice::string_or_number;
use crate::models::{CartonField, DeliveryOrder, PackagingType};
use crate::service::{DraftRegistry, WizardView};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

type Drafts = State<Arc<DraftRegistry>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub draft_id: Uuid,
    #[serde(flatten)]
    pub view: WizardView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDraftRequest {
    /// Reopen an existing order instead of starting a new one
    pub delivery_order_id: Option<String>,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectInvoiceRequest {
    pub invoice_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsRequest {
    pub delivery_date: Option<NaiveDate>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingRequest {
    pub packaging_type: PackagingType,
}

/// Raw form value; numbers and strings are both accepted
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CartonEditRequest {
    pub field: CartonField,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

fn draft(draft_id: Uuid, view: WizardView) -> ApiResult<DraftResponse> {
    ok(DraftResponse { draft_id, view })
}

pub async fn open_draft(
    State(drafts): Drafts,
    body: Option<Json<OpenDraftRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<DraftResponse>>), ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let (draft_id, view) = match &req.delivery_order_id {
        Some(order_id) => drafts.open_edit(order_id).await?,
        None => drafts.open(req.delivery_date),
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Draft opened",
            DraftResponse { draft_id, view },
        )),
    ))
}

pub async fn get_draft(State(drafts): Drafts, Path(id): Path<Uuid>) -> ApiResult<DraftResponse> {
    draft(id, drafts.view(id)?)
}

pub async fn close_draft(State(drafts): Drafts, Path(id): Path<Uuid>) -> ApiResult<()> {
    drafts.close(id)?;
    ok(())
}

pub async fn select_invoice(
    State(drafts): Drafts,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectInvoiceRequest>,
) -> ApiResult<DraftResponse> {
    draft(id, drafts.select_invoice(id, &req.invoice_id).await?)
}

pub async fn next_step(State(drafts): Drafts, Path(id): Path<Uuid>) -> ApiResult<DraftResponse> {
    draft(id, drafts.apply(id, |w| w.next().map(|_| ()))?)
}

pub async fn previous_step(
    State(drafts): Drafts,
    Path(id): Path<Uuid>,
) -> ApiResult<DraftResponse> {
    draft(id, drafts.apply(id, |w| w.back().map(|_| ()))?)
}

pub async fn set_details(
    State(drafts): Drafts,
    Path(id): Path<Uuid>,
    Json(req): Json<DetailsRequest>,
) -> ApiResult<DraftResponse> {
    let view = drafts.apply(id, |w| {
        w.set_details(
            req.delivery_date,
            req.delivery_address.as_deref(),
            req.notes.as_deref(),
        )
    })?;
    draft(id, view)
}

pub async fn set_packaging(
    State(drafts): Drafts,
    Path((id, item)): Path<(Uuid, usize)>,
    Json(req): Json<PackagingRequest>,
) -> ApiResult<DraftResponse> {
    draft(
        id,
        drafts.apply(id, |w| w.set_packaging_type(item, req.packaging_type))?,
    )
}

pub async fn set_pieces(
    State(drafts): Drafts,
    Path((id, item)): Path<(Uuid, usize)>,
    Json(req): Json<ValueRequest>,
) -> ApiResult<DraftResponse> {
    draft(
        id,
        drafts.apply(id, |w| w.set_delivery_pieces(item, &req.value).map(|_| ()))?,
    )
}

pub async fn add_carton(
    State(drafts): Drafts,
    Path((id, item)): Path<(Uuid, usize)>,
) -> ApiResult<DraftResponse> {
    draft(id, drafts.apply(id, |w| w.add_carton_row(item).map(|_| ()))?)
}

pub async fn remove_carton(
    State(drafts): Drafts,
    Path((id, item, row)): Path<(Uuid, usize, usize)>,
) -> ApiResult<DraftResponse> {
    draft(
        id,
        drafts.apply(id, |w| w.remove_carton_row(item, row).map(|_| ()))?,
    )
}

pub async fn update_carton(
    State(drafts): Drafts,
    Path((id, item, row)): Path<(Uuid, usize, usize)>,
    Json(req): Json<CartonEditRequest>,
) -> ApiResult<DraftResponse> {
    draft(
        id,
        drafts.apply(id, |w| {
            w.update_carton_row(item, row, req.field, &req.value)
                .map(|_| ())
        })?,
    )
}

pub async fn submit_draft(
    State(drafts): Drafts,
    Path(id): Path<Uuid>,
) -> ApiResult<Record<DeliveryOrder>> {
    let saved = drafts.submit(id).await?;
    Ok(Json(ApiResponse::with_message(
        format!("Delivery order {} saved", saved.data.delivery_number),
        saved,
    )))
}
