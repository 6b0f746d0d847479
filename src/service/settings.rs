use super::to_body;
use crate::db::{collections, DocumentStore};
use crate::error::ServiceResult;
use crate::models::{CompanySettings, SettingsInput};
use crate::validation::validate_settings;
use std::sync::Arc;

/// The company profile is a single document in the settings collection.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn DocumentStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn current_id(&self) -> ServiceResult<Option<String>> {
        let docs = self.store.list(collections::SETTINGS, None, None).await?;
        Ok(docs.into_iter().next().map(|d| d.id))
    }

    /// Stored profile, or the defaults when none has been saved yet
    pub async fn get(&self) -> ServiceResult<CompanySettings> {
        let docs = self.store.list(collections::SETTINGS, None, None).await?;
        match docs.first() {
            Some(doc) => Ok(doc.decode::<CompanySettings>()?.data),
            None => Ok(CompanySettings::default()),
        }
    }

    pub async fn update(&self, input: SettingsInput) -> ServiceResult<CompanySettings> {
        let settings = validate_settings(&input)?;
        let body = to_body(&settings)?;

        match self.current_id().await? {
            Some(id) => self.store.update(collections::SETTINGS, &id, body).await?,
            None => {
                self.store.create(collections::SETTINGS, body).await?;
            }
        }
        tracing::info!("Company settings saved for {}", settings.company_name);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn defaults_until_saved_then_single_document() {
        let store = Arc::new(MemoryDocumentStore::new());
        let settings = SettingsService::new(store.clone());
        assert_eq!(settings.get().await.unwrap(), CompanySettings::default());

        let input = SettingsInput {
            company_name: "Acme Trading".into(),
            currency: "aed".into(),
            default_vat: "5".into(),
            ..Default::default()
        };
        settings.update(input.clone()).await.unwrap();
        settings
            .update(SettingsInput {
                default_vat: "10".into(),
                ..input
            })
            .await
            .unwrap();

        assert_eq!(store.len(collections::SETTINGS), 1);
        let saved = settings.get().await.unwrap();
        assert_eq!(saved.currency, "AED");
        assert_eq!(saved.default_vat, BigDecimal::from(10));
    }
}
