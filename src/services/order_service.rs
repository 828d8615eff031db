// services/order_service.rs
use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::cart::LineItem;
use crate::models::checkout::PaymentOutcome;
use crate::models::order::{OrderRecord, OrderStatus, ShippingAddress};
use crate::services::summary::{build_summary, TaxBreakdown};

pub const PAYMENT_METHOD: &str = "mercadopago";

/// Per-owner order storage. Records are append-only apart from `status`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, owner: &str, record: &OrderRecord) -> Result<String>;
    async fn update_status(&self, owner: &str, order_id: &str, status: OrderStatus) -> Result<()>;
    async fn orders_for(&self, owner: &str) -> Result<Vec<OrderRecord>>;
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Vec<OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, owner: &str, record: &OrderRecord) -> Result<String> {
        let id = ObjectId::new();
        let mut stored = record.clone();
        stored.id = Some(id);

        let mut orders = self.orders.write().await;
        orders.entry(owner.to_string()).or_default().push(stored);
        Ok(id.to_hex())
    }

    async fn update_status(&self, owner: &str, order_id: &str, status: OrderStatus) -> Result<()> {
        let mut orders = self.orders.write().await;
        let record = orders
            .get_mut(owner)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|record| record.id.map(|id| id.to_hex()).as_deref() == Some(order_id))
            })
            .ok_or_else(|| AppError::persistence(format!("order {} not found", order_id)))?;
        record.status = status;
        Ok(())
    }

    async fn orders_for(&self, owner: &str) -> Result<Vec<OrderRecord>> {
        let orders = self.orders.read().await;
        Ok(orders.get(owner).cloned().unwrap_or_default())
    }
}

/// Extra fields the UI may attach to an order.
#[derive(Debug, Clone, Default)]
pub struct OrderExtras {
    pub shipping_address: Option<ShippingAddress>,
    pub notes: String,
    pub order_number: Option<String>,
}

pub fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase();
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

pub fn generate_tracking_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..10].to_ascii_uppercase();
    format!("TRK{}", suffix)
}

#[derive(Clone)]
pub struct OrderWriter {
    store: Arc<dyn OrderStore>,
    tax_rate: Decimal,
    shipping_cost: Decimal,
}

impl OrderWriter {
    pub fn new(store: Arc<dyn OrderStore>, tax_rate: Decimal, shipping_cost: Decimal) -> Self {
        OrderWriter {
            store,
            tax_rate,
            shipping_cost,
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Builds the record from the amount the preference charged: the summary total
    /// (net lines plus the tax line) plus shipping. Tax is backed out of the summary total.
    pub fn build_record(
        &self,
        owner: &str,
        items: &[LineItem],
        outcome: PaymentOutcome,
        payment_id: &str,
        extras: OrderExtras,
    ) -> Result<OrderRecord> {
        if items.is_empty() {
            return Err(AppError::invalid_data("cannot record an order without items"));
        }

        let charged = build_summary(items, self.tax_rate).total;
        let breakdown = TaxBreakdown::backed_out_of(charged, self.tax_rate);

        Ok(OrderRecord {
            id: None,
            owner_id: owner.to_string(),
            items: items.to_vec(),
            subtotal: breakdown.net,
            tax: breakdown.tax,
            shipping: self.shipping_cost,
            total: breakdown.gross + self.shipping_cost,
            total_item_count: items.iter().map(|item| item.quantity).sum(),
            payment_method: PAYMENT_METHOD.to_string(),
            payment_id: payment_id.to_string(),
            payment_status: outcome,
            order_number: extras.order_number.unwrap_or_else(generate_order_number),
            tracking_number: generate_tracking_number(),
            status: OrderStatus::Processing,
            purchase_timestamp: Utc::now(),
            shipping_address: extras.shipping_address,
            notes: extras.notes,
        })
    }

    /// One write, no retries. Returns the stored order id.
    pub async fn record_order(
        &self,
        owner: &str,
        items: &[LineItem],
        outcome: PaymentOutcome,
        payment_id: &str,
    ) -> Result<String> {
        self.record_order_with(owner, items, outcome, payment_id, OrderExtras::default())
            .await
    }

    pub async fn record_order_with(
        &self,
        owner: &str,
        items: &[LineItem],
        outcome: PaymentOutcome,
        payment_id: &str,
        extras: OrderExtras,
    ) -> Result<String> {
        let record = self.build_record(owner, items, outcome, payment_id, extras)?;

        match self.store.insert(owner, &record).await {
            Ok(order_id) => {
                info!("Order {} saved as {} for {}", record.order_number, order_id, owner);
                Ok(order_id)
            }
            Err(e) => {
                error!("Failed to save order {} for {}: {}", record.order_number, owner, e);
                Err(match e {
                    AppError::MongoDB(err) => AppError::persistence(err.to_string()),
                    other => other,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn writer(store: Arc<dyn OrderStore>) -> OrderWriter {
        OrderWriter::new(store, dec!(0.19), Decimal::ZERO)
    }

    struct FailingStore;

    #[async_trait]
    impl OrderStore for FailingStore {
        async fn insert(&self, _owner: &str, _record: &OrderRecord) -> Result<String> {
            Err(AppError::persistence("backend unavailable"))
        }

        async fn update_status(&self, _owner: &str, _order_id: &str, _status: OrderStatus) -> Result<()> {
            Err(AppError::persistence("backend unavailable"))
        }

        async fn orders_for(&self, _owner: &str) -> Result<Vec<OrderRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn record_backs_tax_out_of_charged_total() {
        let writer = writer(Arc::new(InMemoryOrderStore::new()));
        let items = vec![LineItem::new("a", "Oil", dec!(100), 1)];
        let record = writer
            .build_record("user-1", &items, PaymentOutcome::Approved, "pay-1", OrderExtras::default())
            .unwrap();

        assert_eq!(record.total, dec!(119.00));
        assert_eq!(record.tax, dec!(19.00));
        assert_eq!(record.subtotal, dec!(100.00));
        assert_eq!(record.total_item_count, 1);
        assert_eq!(record.status, OrderStatus::Processing);
        assert!(record.order_number.starts_with("ORD-"));
        assert!(record.tracking_number.starts_with("TRK"));
    }

    #[test]
    fn shipping_is_added_to_total() {
        let writer = OrderWriter::new(Arc::new(InMemoryOrderStore::new()), dec!(0.19), dec!(5));
        let items = vec![LineItem::new("a", "Oil", dec!(100), 1)];
        let record = writer
            .build_record("user-1", &items, PaymentOutcome::Approved, "pay-1", OrderExtras::default())
            .unwrap();
        assert_eq!(record.total, dec!(124.00));
    }

    #[test]
    fn serialized_record_uses_camel_case() {
        let writer = writer(Arc::new(InMemoryOrderStore::new()));
        let items = vec![LineItem::new("a", "Oil", dec!(10), 2)];
        let record = writer
            .build_record("user-1", &items, PaymentOutcome::Approved, "pay-1", OrderExtras::default())
            .unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["paymentStatus"], "approved");
        assert_eq!(json["totalItemCount"], 2);
        assert!(json.get("orderNumber").is_some());
        assert!(json.get("purchaseTimestamp").is_some());
        assert!(json.get("_id").is_none());
        assert!(json.get("shippingAddress").is_none());
    }

    #[tokio::test]
    async fn record_order_writes_once_per_owner() {
        let store = Arc::new(InMemoryOrderStore::new());
        let writer = writer(store.clone());
        let items = vec![LineItem::new("a", "Oil", dec!(10), 2)];

        let order_id = writer
            .record_order("user-1", &items, PaymentOutcome::Approved, "pay-9")
            .await
            .unwrap();

        let orders = store.orders_for("user-1").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.unwrap().to_hex(), order_id);
        assert_eq!(orders[0].payment_id, "pay-9");
        assert!(store.orders_for("user-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_is_the_only_update() {
        let store = Arc::new(InMemoryOrderStore::new());
        let writer = writer(store.clone());
        let items = vec![LineItem::new("a", "Oil", dec!(10), 1)];
        let order_id = writer
            .record_order("user-1", &items, PaymentOutcome::Approved, "pay-1")
            .await
            .unwrap();

        store.update_status("user-1", &order_id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(store.orders_for("user-1").await.unwrap()[0].status, OrderStatus::Shipped);
        assert!(store.update_status("user-1", "missing", OrderStatus::Shipped).await.is_err());
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let writer = writer(Arc::new(FailingStore));
        let items = vec![LineItem::new("a", "Oil", dec!(10), 1)];
        let err = writer
            .record_order("user-1", &items, PaymentOutcome::Approved, "pay-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }

    #[tokio::test]
    async fn extras_are_carried_into_the_record() {
        let store = Arc::new(InMemoryOrderStore::new());
        let writer = writer(store.clone());
        let items = vec![LineItem::new("a", "Oil", dec!(10), 1)];
        let extras = OrderExtras {
            shipping_address: Some(ShippingAddress {
                recipient: "Ana".to_string(),
                street: "Calle 1".to_string(),
                city: "Bogota".to_string(),
                postal_code: None,
                phone_number: None,
            }),
            notes: "leave at the door".to_string(),
            order_number: Some("ORD-FIXED".to_string()),
        };

        writer
            .record_order_with("user-1", &items, PaymentOutcome::Approved, "pay-1", extras)
            .await
            .unwrap();

        let order = &store.orders_for("user-1").await.unwrap()[0];
        assert_eq!(order.order_number, "ORD-FIXED");
        assert_eq!(order.notes, "leave at the door");
        assert_eq!(order.shipping_address.as_ref().map(|a| a.city.as_str()), Some("Bogota"));
    }

    #[tokio::test]
    async fn empty_items_are_rejected() {
        let writer = writer(Arc::new(InMemoryOrderStore::new()));
        let err = writer
            .record_order("user-1", &[], PaymentOutcome::Approved, "pay-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
