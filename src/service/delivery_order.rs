use super::{decode_all, fetch, next_number, to_body, InvoiceService};
use crate::db::{collections, DocumentStore, Filter, OrderBy, Record};
use crate::error::ServiceResult;
use crate::models::{summarize_all, DeliveryItem, DeliveryOrder, Invoice};
use crate::validation::validate_delivery_order;
use std::sync::Arc;

const DELIVERY_PREFIX: &str = "DO";

#[derive(Clone)]
pub struct DeliveryOrderService {
    store: Arc<dyn DocumentStore>,
    invoices: InvoiceService,
}

impl DeliveryOrderService {
    pub fn new(store: Arc<dyn DocumentStore>, invoices: InvoiceService) -> Self {
        Self { store, invoices }
    }

    /// Source invoice for a new delivery order
    pub async fn fetch_invoice(&self, invoice_id: &str) -> ServiceResult<Record<Invoice>> {
        self.invoices.get(invoice_id).await
    }

    /// Store a new delivery order, assigning its number.
    pub async fn create(&self, order: DeliveryOrder) -> ServiceResult<Record<DeliveryOrder>> {
        validate_delivery_order(&order)?;
        let mut order = recompute_figures(order);
        order.delivery_number = next_number(
            self.store.as_ref(),
            collections::DELIVERY_ORDERS,
            "deliveryNumber",
            DELIVERY_PREFIX,
        )
        .await?;

        let id = self
            .store
            .create(collections::DELIVERY_ORDERS, to_body(&order)?)
            .await?;
        tracing::info!(
            "Delivery order {} ({}) created for invoice {}: {} of {} pieces",
            order.delivery_number,
            id,
            order.invoice_number,
            order.summary.total_pieces_delivered,
            order.summary.total_quantity
        );
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Record<DeliveryOrder>> {
        fetch(
            self.store.as_ref(),
            collections::DELIVERY_ORDERS,
            "delivery order",
            id,
        )
        .await
    }

    /// Newest first, optionally for one invoice
    pub async fn list(&self, invoice_id: Option<&str>) -> ServiceResult<Vec<Record<DeliveryOrder>>> {
        let filter = invoice_id.map(|id| Filter::new().eq("invoiceId", id));
        let docs = self
            .store
            .list(
                collections::DELIVERY_ORDERS,
                filter.as_ref(),
                Some(&OrderBy::newest_first()),
            )
            .await?;
        decode_all(&docs)
    }

    /// Replace an order's contents. Number and invoice reference are kept.
    pub async fn update(
        &self,
        id: &str,
        order: DeliveryOrder,
    ) -> ServiceResult<Record<DeliveryOrder>> {
        let existing = self.get(id).await?;
        let order = DeliveryOrder {
            delivery_number: existing.data.delivery_number,
            invoice_id: existing.data.invoice_id,
            invoice_number: existing.data.invoice_number,
            ..order
        };
        validate_delivery_order(&order)?;
        let order = recompute_figures(order);

        self.store
            .update(collections::DELIVERY_ORDERS, id, to_body(&order)?)
            .await?;
        tracing::info!("Delivery order {} updated", order.delivery_number);
        self.get(id).await
    }
}

/// Derive every item figure and the summary from the packaging rows, so
/// stored counts always agree with `deliveryPieces` and `cartonDetails`.
fn recompute_figures(order: DeliveryOrder) -> DeliveryOrder {
    let items: Vec<DeliveryItem> = order.items.iter().map(DeliveryItem::from_record).collect();
    let records: Vec<_> = items.iter().map(DeliveryItem::to_record).collect();
    if records != order.items {
        tracing::warn!(
            "Delivery order for invoice {} carried stale item figures; recomputed",
            order.invoice_number
        );
    }
    DeliveryOrder {
        summary: summarize_all(&items),
        items: records,
        ..order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::models::{AggregateSummary, CartonDetail, CartonSize, PackagingType};
    use crate::service::invoice::tests::{fixture, input};
    use chrono::NaiveDate;

    fn order_for(invoice: &Record<Invoice>) -> DeliveryOrder {
        let items: Vec<DeliveryItem> = invoice
            .data
            .items
            .iter()
            .map(DeliveryItem::from_line_item)
            .collect();
        DeliveryOrder {
            delivery_number: String::new(),
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.data.invoice_number.clone(),
            client_id: invoice.data.client.client_id.clone(),
            client_name: invoice.data.client.client_name.clone(),
            delivery_address: String::new(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            summary: summarize_all(&items),
            items: items.iter().map(DeliveryItem::to_record).collect(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_numbers_orders_and_lists_by_invoice() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 100, "1", "5")]))
            .await
            .unwrap();

        let first = orders.create(order_for(&invoice)).await.unwrap();
        let second = orders.create(order_for(&invoice)).await.unwrap();
        assert_eq!(first.data.delivery_number, "DO-0001");
        assert_eq!(second.data.delivery_number, "DO-0002");
        assert_eq!(first.data.summary.total_pieces_delivered, 100);

        assert_eq!(orders.list(Some(&invoice.id)).await.unwrap().len(), 2);
        assert!(orders.list(Some("other")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_number_and_invoice_reference() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 10, "1", "5")]))
            .await
            .unwrap();
        let created = orders.create(order_for(&invoice)).await.unwrap();

        let mut changed = order_for(&invoice);
        changed.invoice_id = "tampered".to_string();
        changed.notes = "left at gate".to_string();
        let updated = orders.update(&created.id, changed).await.unwrap();
        assert_eq!(updated.data.delivery_number, "DO-0001");
        assert_eq!(updated.data.invoice_id, invoice.id);
        assert_eq!(updated.data.notes, "left at gate");
    }

    #[tokio::test]
    async fn stored_figures_are_rederived_from_packaging() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 100, "1", "5")]))
            .await
            .unwrap();

        let mut order = order_for(&invoice);
        let item = &mut order.items[0];
        item.total_pieces_delivered = 7;
        item.undelivered_pieces = 999;
        item.cartons = 42;
        item.average_pieces_per_carton = 3.5;
        order.summary = AggregateSummary {
            total_quantity: 1,
            total_pieces_delivered: 2,
            total_undelivered_pieces: 3,
            total_cartons: 4,
        };

        let created = orders.create(order).await.unwrap();
        let stored = &created.data.items[0];
        assert_eq!(stored.delivery_pieces, 100);
        assert_eq!(stored.total_pieces_delivered, 100);
        assert_eq!(stored.undelivered_pieces, 0);
        assert_eq!(stored.cartons, 0);
        assert_eq!(stored.average_pieces_per_carton, 0.0);
        assert_eq!(created.data.summary.total_quantity, 100);
        assert_eq!(created.data.summary.total_pieces_delivered, 100);
        assert_eq!(created.data.summary.total_cartons, 0);

        // Carton rows win over whatever totals accompany them on update
        let mut changed = order_for(&invoice);
        let item = &mut changed.items[0];
        item.packaging_type = PackagingType::Carton;
        item.delivery_pieces = 100;
        item.carton_details = vec![
            CartonDetail::new(CartonSize::Large, 3, 24),
            CartonDetail::new(CartonSize::Medium, 2, 12),
        ];
        let updated = orders.update(&created.id, changed).await.unwrap();
        let stored = &updated.data.items[0];
        assert_eq!(stored.delivery_pieces, 0);
        assert_eq!(stored.cartons, 5);
        assert_eq!(stored.total_pieces_delivered, 96);
        assert_eq!(stored.undelivered_pieces, 4);
        assert_eq!(updated.data.summary.total_undelivered_pieces, 4);
        assert_eq!(updated.data.summary.total_cartons, 5);
    }

    #[tokio::test]
    async fn oversized_item_quantity_is_rejected() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 10, "1", "5")]))
            .await
            .unwrap();
        let mut order = order_for(&invoice);
        order.items[0].quantity = u64::MAX;
        match orders.create(order).await.unwrap_err() {
            ServiceError::Validation(errors) => {
                assert!(errors.get("items[0].quantity").is_some())
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.store.is_empty(collections::DELIVERY_ORDERS));
    }

    #[tokio::test]
    async fn empty_order_is_rejected() {
        let fx = fixture().await;
        let orders = DeliveryOrderService::new(fx.store.clone(), fx.invoices.clone());
        let invoice = fx
            .invoices
            .create(input(&fx.client_id, &[("Bolt", 10, "1", "5")]))
            .await
            .unwrap();
        let mut order = order_for(&invoice);
        order.items.clear();
        let err = orders.create(order).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(matches!(
            orders.fetch_invoice("missing").await.unwrap_err(),
            ServiceError::NotFound { kind: "invoice", .. }
        ));
    }
}
