use super::wizard::{DeliveryOrderWizard, WizardView};
use super::DeliveryOrderService;
use crate::db::Record;
use crate::error::{ServiceError, ServiceResult, WizardError};
use crate::models::DeliveryOrder;
use chrono::{Local, NaiveDate};
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Drafts untouched for this long are dropped when the next one opens
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

struct Draft {
    wizard: DeliveryOrderWizard,
    touched: Instant,
}

/// Open delivery-order wizard sessions.
///
/// A session is only borrowed for synchronous steps; store calls run with
/// the session released, and the wizard's own in-flight flags reject a
/// second fetch or submit on the same draft meanwhile. Abandoned sessions
/// are evicted once idle past the registry's timeout.
pub struct DraftRegistry {
    drafts: DashMap<Uuid, Draft>,
    orders: DeliveryOrderService,
    idle_timeout: Duration,
}

impl DraftRegistry {
    pub fn new(orders: DeliveryOrderService) -> Self {
        Self::with_idle_timeout(orders, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(orders: DeliveryOrderService, idle_timeout: Duration) -> Self {
        Self {
            drafts: DashMap::new(),
            orders,
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Drop drafts idle past the timeout. Drafts with a fetch or submit in
    /// flight are kept. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let before = self.drafts.len();
        self.drafts
            .retain(|_, d| d.wizard.is_busy() || d.touched.elapsed() < self.idle_timeout);
        let evicted = before.saturating_sub(self.drafts.len());
        if evicted > 0 {
            tracing::info!("Evicted {} idle delivery order drafts", evicted);
        }
        evicted
    }

    fn insert(&self, wizard: DeliveryOrderWizard) -> (Uuid, WizardView) {
        self.evict_idle();
        let id = Uuid::new_v4();
        let view = wizard.view();
        self.drafts.insert(
            id,
            Draft {
                wizard,
                touched: Instant::now(),
            },
        );
        (id, view)
    }

    pub fn open(&self, delivery_date: Option<NaiveDate>) -> (Uuid, WizardView) {
        let date = delivery_date.unwrap_or_else(|| Local::now().date_naive());
        let (id, view) = self.insert(DeliveryOrderWizard::new(date));
        tracing::info!("Delivery order draft {} opened", id);
        (id, view)
    }

    /// Open an edit session on a stored delivery order.
    pub async fn open_edit(&self, order_id: &str) -> ServiceResult<(Uuid, WizardView)> {
        let order = self.orders.get(order_id).await?;
        let (id, view) = self.insert(DeliveryOrderWizard::edit(&order));
        tracing::info!("Delivery order draft {} opened for {}", id, order_id);
        Ok((id, view))
    }

    pub fn close(&self, id: Uuid) -> ServiceResult<()> {
        self.drafts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("draft", id.to_string()))
    }

    /// Run a synchronous step against a session and return its new view.
    pub fn apply<F>(&self, id: Uuid, step: F) -> ServiceResult<WizardView>
    where
        F: FnOnce(&mut DeliveryOrderWizard) -> Result<(), WizardError>,
    {
        let mut draft = self
            .drafts
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found("draft", id.to_string()))?;
        draft.touched = Instant::now();
        step(&mut draft.wizard)?;
        Ok(draft.wizard.view())
    }

    pub fn view(&self, id: Uuid) -> ServiceResult<WizardView> {
        self.apply(id, |_| Ok(()))
    }

    /// Select an invoice and load it; success lands on the packaging step.
    pub async fn select_invoice(&self, id: Uuid, invoice_id: &str) -> ServiceResult<WizardView> {
        let mut fetch_id = String::new();
        self.apply(id, |w| {
            w.select_invoice(invoice_id)?;
            fetch_id = w.begin_fetch()?;
            Ok(())
        })?;

        let result = self.orders.fetch_invoice(&fetch_id).await;
        let outcome = match &result {
            Ok(invoice) => Ok(invoice.clone()),
            Err(e) => Err(e.to_string()),
        };
        let view = self.apply(id, |w| {
            w.finish_fetch(&fetch_id, outcome);
            Ok(())
        });

        match (result, view) {
            (Err(e), _) => Err(e),
            (Ok(_), view) => view,
        }
    }

    /// Persist the session. A saved draft is closed and removed.
    pub async fn submit(&self, id: Uuid) -> ServiceResult<Record<DeliveryOrder>> {
        let mut submission = None;
        self.apply(id, |w| {
            submission = Some(w.begin_submit()?);
            Ok(())
        })?;
        let Some(submission) = submission else {
            return Err(ServiceError::not_found("draft", id.to_string()));
        };

        let result = match &submission.order_id {
            Some(order_id) => self.orders.update(order_id, submission.order).await,
            None => self.orders.create(submission.order).await,
        };

        // The draft may have been closed while the save was in flight
        if let Err(e) = self.apply(id, |w| {
            w.finish_submit(&result);
            Ok(())
        }) {
            tracing::debug!("Draft {} gone before submit finished: {}", id, e);
        }

        if result.is_ok() {
            self.drafts.remove(&id);
            tracing::info!("Delivery order draft {} submitted", id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartonField, PackagingType};
    use crate::service::invoice::tests::{fixture, input};
    use crate::service::WizardStep;

    #[tokio::test]
    async fn draft_flow_creates_then_edits_an_order() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let registry = DraftRegistry::new(orders.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 100, "1", "5")]))
            .await
            .unwrap();

        let (draft, view) = registry.open(None);
        assert_eq!(view.step, WizardStep::SelectInvoice);

        let view = registry.select_invoice(draft, &invoice.id).await.unwrap();
        assert_eq!(view.step, WizardStep::Packaging);
        assert_eq!(view.items[0].record.delivery_pieces, 100);

        registry
            .apply(draft, |w| w.set_packaging_type(0, PackagingType::Carton))
            .unwrap();
        let view = registry
            .apply(draft, |w| {
                w.update_carton_row(0, 0, CartonField::PiecesPerCarton, "60")?;
                w.next().map(|_| ())
            })
            .unwrap();
        assert_eq!(view.step, WizardStep::Review);
        assert_eq!(view.summary.total_undelivered_pieces, 40);

        let saved = registry.submit(draft).await.unwrap();
        assert_eq!(saved.data.delivery_number, "DO-0001");
        assert!(registry.is_empty());

        let (edit, view) = registry.open_edit(&saved.id).await.unwrap();
        assert!(view.editing);
        registry
            .apply(edit, |w| {
                w.update_carton_row(0, 0, CartonField::Count, "2")?;
                w.next().map(|_| ())
            })
            .unwrap();
        let updated = registry.submit(edit).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.data.items[0].total_pieces_delivered, 120);
        assert_eq!(orders.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_invoice_leaves_draft_on_step_one() {
        let fx = fixture().await;
        let registry = DraftRegistry::new(DeliveryOrderService::new(
            fx.store.clone(),
            fx.invoices.clone(),
        ));
        let (draft, _) = registry.open(None);
        let err = registry.select_invoice(draft, "missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "invoice", .. }));

        let view = registry.view(draft).unwrap();
        assert_eq!(view.step, WizardStep::SelectInvoice);
        assert!(view.error.is_some());
        assert!(!view.is_loading);

        registry.close(draft).unwrap();
        assert!(registry.view(draft).is_err());
    }

    #[tokio::test]
    async fn idle_drafts_are_evicted_when_the_next_opens() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());

        let registry = DraftRegistry::new(orders.clone());
        let (kept, _) = registry.open(None);
        assert_eq!(registry.evict_idle(), 0);
        assert!(registry.view(kept).is_ok());

        let registry = DraftRegistry::with_idle_timeout(orders, Duration::ZERO);
        let (stale, _) = registry.open(None);
        let (fresh, _) = registry.open(None);
        assert!(matches!(
            registry.view(stale).unwrap_err(),
            ServiceError::NotFound { kind: "draft", .. }
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.view(fresh).is_err());
    }

    #[tokio::test]
    async fn busy_drafts_survive_eviction() {
        let fx = fixture().await;
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 5, "1", "5")]))
            .await
            .unwrap();
        let registry = DraftRegistry::with_idle_timeout(
            DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone()),
            Duration::ZERO,
        );
        let (draft, _) = registry.open(None);
        registry
            .apply(draft, |w| {
                w.select_invoice(&invoice.id)?;
                w.begin_fetch().map(|_| ())
            })
            .unwrap();

        assert_eq!(registry.evict_idle(), 0);
        assert!(registry.view(draft).unwrap().is_loading);
    }
}
