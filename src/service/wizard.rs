//! Step wizard for creating or editing a delivery order.
//!
//! `SelectInvoice → Packaging → Review → Closed`. Item edits live on the
//! wizard rather than on a step, so moving back and forth keeps them.
//! Store round-trips are split in two halves (`begin_*` / `finish_*`) so a
//! caller can release the wizard while awaiting; the in-flight flags reject
//! a second operation of the same kind meanwhile.

use crate::db::Record;
use crate::error::{ServiceError, WizardError};
use crate::models::{
    summarize_all, AggregateSummary, CartonField, DeliveryItem, DeliveryItemRecord,
    DeliveryOrder, Invoice, ItemSummary, PackagingType,
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    SelectInvoice,
    Packaging,
    Review,
    Closed,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::SelectInvoice => 1,
            WizardStep::Packaging => 2,
            WizardStep::Review => 3,
            WizardStep::Closed => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WizardStep::SelectInvoice => "select invoice",
            WizardStep::Packaging => "packaging",
            WizardStep::Review => "review",
            WizardStep::Closed => "closed",
        }
    }
}

/// The invoice a delivery order ships against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInvoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_id: String,
    pub client_name: String,
    pub client_address: String,
}

impl From<&Record<Invoice>> for SourceInvoice {
    fn from(invoice: &Record<Invoice>) -> Self {
        SourceInvoice {
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.data.invoice_number.clone(),
            client_id: invoice.data.client.client_id.clone(),
            client_name: invoice.data.client.client_name.clone(),
            client_address: invoice.data.client.client_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Create,
    Edit { order_id: String },
}

/// What to persist when a submit begins
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// `Some` when editing an existing order
    pub order_id: Option<String>,
    pub order: DeliveryOrder,
}

#[derive(Debug, Clone)]
pub struct DeliveryOrderWizard {
    step: WizardStep,
    mode: Mode,
    selected_invoice: Option<String>,
    source: Option<SourceInvoice>,
    items: Vec<DeliveryItem>,
    delivery_date: NaiveDate,
    delivery_address: String,
    notes: String,
    fetching: bool,
    submitting: bool,
    error: Option<String>,
    saved_id: Option<String>,
}

impl DeliveryOrderWizard {
    pub fn new(delivery_date: NaiveDate) -> Self {
        Self {
            step: WizardStep::SelectInvoice,
            mode: Mode::Create,
            selected_invoice: None,
            source: None,
            items: Vec::new(),
            delivery_date,
            delivery_address: String::new(),
            notes: String::new(),
            fetching: false,
            submitting: false,
            error: None,
            saved_id: None,
        }
    }

    /// Reopen a stored order at the packaging step. Its invoice is fixed.
    pub fn edit(order: &Record<DeliveryOrder>) -> Self {
        let data = &order.data;
        Self {
            step: WizardStep::Packaging,
            mode: Mode::Edit {
                order_id: order.id.clone(),
            },
            selected_invoice: Some(data.invoice_id.clone()),
            source: Some(SourceInvoice {
                invoice_id: data.invoice_id.clone(),
                invoice_number: data.invoice_number.clone(),
                client_id: data.client_id.clone(),
                client_name: data.client_name.clone(),
                client_address: data.delivery_address.clone(),
            }),
            items: data.items.iter().map(DeliveryItem::from_record).collect(),
            delivery_date: data.delivery_date,
            delivery_address: data.delivery_address.clone(),
            notes: data.notes.clone(),
            fetching: false,
            submitting: false,
            error: None,
            saved_id: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn items(&self) -> &[DeliveryItem] {
        &self.items
    }

    pub fn source(&self) -> Option<&SourceInvoice> {
        self.source.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.step == WizardStep::Closed
    }

    /// An invoice fetch or a submit is in flight
    pub fn is_busy(&self) -> bool {
        self.fetching || self.submitting
    }

    pub fn aggregate(&self) -> AggregateSummary {
        summarize_all(&self.items)
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_closed() {
            return Err(WizardError::Closed);
        }
        Ok(())
    }

    fn ensure_step(&self, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.step != step {
            return Err(WizardError::InvalidTransition {
                action,
                step: self.step.name(),
            });
        }
        Ok(())
    }

    fn is_loaded(&self, invoice_id: &str) -> bool {
        self.source
            .as_ref()
            .is_some_and(|s| s.invoice_id == invoice_id)
    }

    /// Choose the source invoice. Only on step 1 of a new order.
    pub fn select_invoice(&mut self, invoice_id: &str) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::SelectInvoice, "select an invoice")?;
        if matches!(self.mode, Mode::Edit { .. }) {
            return Err(WizardError::InvoiceLocked);
        }
        let invoice_id = invoice_id.trim();
        self.selected_invoice = (!invoice_id.is_empty()).then(|| invoice_id.to_string());
        Ok(())
    }

    /// Start loading the selected invoice; returns the id to fetch.
    pub fn begin_fetch(&mut self) -> Result<String, WizardError> {
        self.ensure_step(WizardStep::SelectInvoice, "load an invoice")?;
        if self.fetching {
            return Err(WizardError::Busy("invoice fetch"));
        }
        let invoice_id = self
            .selected_invoice
            .clone()
            .ok_or(WizardError::NoInvoiceSelected)?;
        self.fetching = true;
        self.error = None;
        Ok(invoice_id)
    }

    /// Apply a fetch result. Success moves to the packaging step; a
    /// different invoice than the one already loaded starts fresh items.
    /// A result for an invoice that is no longer selected is dropped.
    pub fn finish_fetch(&mut self, invoice_id: &str, outcome: Result<Record<Invoice>, String>) {
        self.fetching = false;
        if self.selected_invoice.as_deref() != Some(invoice_id)
            || self.step != WizardStep::SelectInvoice
        {
            tracing::debug!("Discarding stale fetch of invoice {}", invoice_id);
            return;
        }
        match outcome {
            Ok(invoice) => {
                if !self.is_loaded(&invoice.id) || self.items.is_empty() {
                    self.items = invoice
                        .data
                        .items
                        .iter()
                        .map(DeliveryItem::from_line_item)
                        .collect();
                    self.delivery_address = invoice.data.client.client_address.clone();
                }
                self.source = Some(SourceInvoice::from(&invoice));
                self.error = None;
                self.step = WizardStep::Packaging;
            }
            Err(message) => {
                tracing::warn!("Loading invoice {} failed: {}", invoice_id, message);
                self.error = Some(message);
            }
        }
    }

    /// Advance one step. Leaving step 1 needs the selected invoice loaded.
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        self.step = match self.step {
            WizardStep::SelectInvoice => {
                let selected = self
                    .selected_invoice
                    .as_deref()
                    .ok_or(WizardError::NoInvoiceSelected)?;
                if !self.is_loaded(selected) {
                    return Err(WizardError::InvoiceNotLoaded);
                }
                WizardStep::Packaging
            }
            WizardStep::Packaging => WizardStep::Review,
            WizardStep::Review | WizardStep::Closed => {
                return Err(WizardError::InvalidTransition {
                    action: "advance",
                    step: self.step.name(),
                });
            }
        };
        Ok(self.step)
    }

    /// Go back one step; a no-op on step 1. Never discards edits.
    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;
        self.step = match self.step {
            WizardStep::SelectInvoice | WizardStep::Packaging => WizardStep::SelectInvoice,
            WizardStep::Review => WizardStep::Packaging,
            WizardStep::Closed => WizardStep::Closed,
        };
        Ok(self.step)
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut DeliveryItem, WizardError> {
        self.ensure_step(WizardStep::Packaging, "edit packaging")?;
        self.items
            .get_mut(index)
            .ok_or(WizardError::ItemOutOfRange(index))
    }

    pub fn set_packaging_type(
        &mut self,
        index: usize,
        packaging_type: PackagingType,
    ) -> Result<(), WizardError> {
        self.item_mut(index)?.set_packaging_type(packaging_type);
        Ok(())
    }

    pub fn set_delivery_pieces(&mut self, index: usize, input: &str) -> Result<bool, WizardError> {
        Ok(self.item_mut(index)?.set_delivery_pieces(input))
    }

    pub fn add_carton_row(&mut self, index: usize) -> Result<bool, WizardError> {
        Ok(self.item_mut(index)?.add_carton_row())
    }

    pub fn remove_carton_row(&mut self, index: usize, row: usize) -> Result<bool, WizardError> {
        Ok(self.item_mut(index)?.remove_carton_row(row))
    }

    pub fn update_carton_row(
        &mut self,
        index: usize,
        row: usize,
        field: CartonField,
        value: &str,
    ) -> Result<bool, WizardError> {
        Ok(self.item_mut(index)?.update_carton_row(row, field, value))
    }

    /// Delivery date, address and notes. `None` leaves a value unchanged.
    pub fn set_details(
        &mut self,
        delivery_date: Option<NaiveDate>,
        delivery_address: Option<&str>,
        notes: Option<&str>,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;
        if let Some(date) = delivery_date {
            self.delivery_date = date;
        }
        if let Some(address) = delivery_address {
            self.delivery_address = address.trim().to_string();
        }
        if let Some(notes) = notes {
            self.notes = notes.trim().to_string();
        }
        Ok(())
    }

    /// Flatten the session into a plain delivery order and mark a submit in flight.
    pub fn begin_submit(&mut self) -> Result<Submission, WizardError> {
        self.ensure_step(WizardStep::Review, "submit")?;
        if self.submitting {
            return Err(WizardError::Busy("submit"));
        }
        let source = self.source.clone().ok_or(WizardError::InvoiceNotLoaded)?;

        let order = DeliveryOrder {
            delivery_number: String::new(),
            invoice_id: source.invoice_id,
            invoice_number: source.invoice_number,
            client_id: source.client_id,
            client_name: source.client_name,
            delivery_address: self.delivery_address.clone(),
            delivery_date: self.delivery_date,
            items: self.items.iter().map(DeliveryItem::to_record).collect(),
            summary: self.aggregate(),
            notes: self.notes.clone(),
        };
        let order_id = match &self.mode {
            Mode::Create => None,
            Mode::Edit { order_id } => Some(order_id.clone()),
        };

        self.submitting = true;
        self.error = None;
        Ok(Submission { order_id, order })
    }

    /// Close on success; on failure keep every edit and remember the message.
    pub fn finish_submit(&mut self, outcome: &Result<Record<DeliveryOrder>, ServiceError>) {
        self.submitting = false;
        match outcome {
            Ok(saved) => {
                self.saved_id = Some(saved.id.clone());
                self.error = None;
                self.step = WizardStep::Closed;
            }
            Err(e) => {
                tracing::warn!("Saving delivery order failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.step,
            step_number: self.step.number(),
            editing: matches!(self.mode, Mode::Edit { .. }),
            selected_invoice: self.selected_invoice.clone(),
            invoice: self.source.clone(),
            delivery_date: self.delivery_date,
            delivery_address: self.delivery_address.clone(),
            notes: self.notes.clone(),
            items: self
                .items
                .iter()
                .map(|item| ItemView {
                    over_delivered: item.is_over_delivered(),
                    summary: item.summarize(),
                    record: item.to_record(),
                })
                .collect(),
            summary: self.aggregate(),
            is_loading: self.fetching || self.submitting,
            error: self.error.clone(),
            saved_id: self.saved_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub record: DeliveryItemRecord,
    pub summary: ItemSummary,
    pub over_delivered: bool,
}

/// Serializable snapshot of a wizard session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: WizardStep,
    pub step_number: u8,
    pub editing: bool,
    pub selected_invoice: Option<String>,
    pub invoice: Option<SourceInvoice>,
    pub delivery_date: NaiveDate,
    pub delivery_address: String,
    pub notes: String,
    pub items: Vec<ItemView>,
    pub summary: AggregateSummary,
    pub is_loading: bool,
    pub error: Option<String>,
    pub saved_id: Option<String>,
}
