use crate::validation::ValidationErrors;
use thiserror::Error;

/// Failures raised by a document store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Delivery-order wizard misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("another {0} is already in progress")]
    Busy(&'static str),
    #[error("no invoice selected")]
    NoInvoiceSelected,
    #[error("invoice has not been loaded")]
    InvoiceNotLoaded,
    #[error("cannot {action} from the {step} step")]
    InvalidTransition { action: &'static str, step: &'static str },
    #[error("the wizard is closed")]
    Closed,
    #[error("item index {0} is out of range")]
    ItemOutOfRange(usize),
    #[error("the invoice of an existing delivery order cannot be changed")]
    InvoiceLocked,
}

/// Service-level errors surfaced to callers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
