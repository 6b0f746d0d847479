pub mod api;
pub mod config;
pub mod csv_io;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod validation;

pub use api::router;
pub use config::{AppConfig, StoreBackend};
pub use db::{create_pool, ensure_schema, DocumentStore, MemoryDocumentStore, PgDocumentStore};
pub use error::{ServiceError, StoreError, WizardError};
pub use service::Services;
