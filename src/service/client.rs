use super::{decode_all, fetch, to_body};
use crate::csv_io::{self, SkippedRow};
use crate::db::{collections, DocumentStore, OrderBy, Record};
use crate::error::ServiceResult;
use crate::models::Client;
use crate::validation::validate_client;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn DocumentStore>,
}

impl ClientService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, client: Client) -> ServiceResult<Record<Client>> {
        let client = client.normalized();
        validate_client(&client)?;

        let id = self
            .store
            .create(collections::CLIENTS, to_body(&client)?)
            .await?;
        tracing::info!("Client {} created: {}", id, client.company_name);
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Record<Client>> {
        fetch(self.store.as_ref(), collections::CLIENTS, "client", id).await
    }

    pub async fn find(&self, id: &str) -> ServiceResult<Option<Record<Client>>> {
        match self.store.get(collections::CLIENTS, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// All clients by company name
    pub async fn list(&self) -> ServiceResult<Vec<Record<Client>>> {
        let docs = self
            .store
            .list(collections::CLIENTS, None, Some(&OrderBy::asc("companyName")))
            .await?;
        decode_all(&docs)
    }

    pub async fn update(&self, id: &str, client: Client) -> ServiceResult<Record<Client>> {
        let client = client.normalized();
        validate_client(&client)?;
        self.get(id).await?;

        self.store
            .update(collections::CLIENTS, id, to_body(&client)?)
            .await?;
        tracing::info!("Client {} updated", id);
        self.get(id).await
    }

    pub async fn export_csv(&self) -> ServiceResult<String> {
        let clients = self.list().await?;
        let csv = csv_io::export_clients(clients.iter().map(|r| &r.data))?;
        tracing::info!("Exported {} clients", clients.len());
        Ok(csv)
    }

    /// Create a client per usable row. Rows without a company name or
    /// email, or failing validation, are reported as skipped.
    pub async fn import_csv(&self, input: &str) -> ServiceResult<ImportReport> {
        let parsed = csv_io::parse_clients(input)?;
        let mut report = ImportReport {
            imported: 0,
            skipped: parsed.skipped,
        };

        for client in parsed.clients {
            let client = client.normalized();
            if let Err(errors) = validate_client(&client) {
                tracing::warn!("Skipping imported client {}: {}", client.company_name, errors);
                report.skipped.push(SkippedRow {
                    line: 0,
                    reason: format!("{}: {}", client.company_name, errors),
                });
                continue;
            }
            self.store
                .create(collections::CLIENTS, to_body(&client)?)
                .await?;
            report.imported += 1;
        }

        tracing::info!(
            "CSV import finished: {} imported, {} skipped",
            report.imported,
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::error::ServiceError;

    fn service() -> (Arc<MemoryDocumentStore>, ClientService) {
        let store = Arc::new(MemoryDocumentStore::new());
        (store.clone(), ClientService::new(store))
    }

    #[tokio::test]
    async fn create_trims_and_persists() {
        let (_, clients) = service();
        let rec = clients
            .create(Client::new(" Acme ", "ops@acme.test"))
            .await
            .unwrap();
        assert_eq!(rec.data.company_name, "Acme");
        assert_eq!(clients.get(&rec.id).await.unwrap(), rec);
    }

    #[tokio::test]
    async fn invalid_client_never_reaches_the_store() {
        let (store, clients) = service();
        let err = clients.create(Client::new("", "bad")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.is_empty(collections::CLIENTS));
    }

    #[tokio::test]
    async fn update_of_unknown_client_is_not_found() {
        let (_, clients) = service();
        let err = clients
            .update("nope", Client::new("Acme", "ops@acme.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "client", .. }));
    }

    #[tokio::test]
    async fn list_is_sorted_by_company_name() {
        let (_, clients) = service();
        for name in ["Zeta", "Alpha", "Mid"] {
            clients
                .create(Client::new(name, "a@b.test"))
                .await
                .unwrap();
        }
        let names: Vec<_> = clients
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.data.company_name)
            .collect();
        assert_eq!(names, ["Alpha", "Mid", "Zeta"]);
    }

    #[tokio::test]
    async fn import_keeps_only_complete_rows() {
        let (store, clients) = service();
        let csv = "companyName,email,phone\n\
                   Acme,ops@acme.test,1\n\
                   Broken,,2\n\
                   Globex,sales@globex.test,3\n";
        let report = clients.import_csv(csv).await.unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(store.len(collections::CLIENTS), 2);

        let exported = clients.export_csv().await.unwrap();
        assert_eq!(exported.lines().count(), 3);
        assert!(exported.contains("Globex,sales@globex.test,3,,,"));
    }

    #[tokio::test]
    async fn import_skips_malformed_email() {
        let (_, clients) = service();
        let report = clients
            .import_csv("companyName,email\nAcme,not-an-email\n")
            .await
            .unwrap();
        assert_eq!(report.imported, 0);
        assert!(report.skipped[0].reason.contains("Email address is invalid"));
    }
}
