use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::{Collection, Database};

use crate::errors::{AppError, Result};
use crate::models::order::{OrderRecord, OrderStatus};
use crate::services::order_service::OrderStore;

/// Orders live in one collection per owner: `users.<owner>.orders`.
#[derive(Clone)]
pub struct MongoOrderStore {
    db: Database,
}

impl MongoOrderStore {
    pub fn new(db: Database) -> Self {
        MongoOrderStore { db }
    }

    pub fn collection_name(owner: &str) -> String {
        format!("users.{}.orders", owner)
    }

    fn orders(&self, owner: &str) -> Collection<OrderRecord> {
        self.db.collection(&Self::collection_name(owner))
    }
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn insert(&self, owner: &str, record: &OrderRecord) -> Result<String> {
        let result = self.orders(owner).insert_one(record).await?;
        result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| AppError::persistence("insert returned a non-ObjectId id"))
    }

    async fn update_status(&self, owner: &str, order_id: &str, status: OrderStatus) -> Result<()> {
        let id = ObjectId::parse_str(order_id)
            .map_err(|e| AppError::invalid_data(format!("invalid order id {}: {}", order_id, e)))?;
        let status = to_bson(&status).map_err(|e| AppError::persistence(e.to_string()))?;

        let result = self
            .orders(owner)
            .update_one(doc! { "_id": id }, doc! { "$set": { "status": status } })
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::persistence(format!("order {} not found", order_id)));
        }
        Ok(())
    }

    async fn orders_for(&self, owner: &str) -> Result<Vec<OrderRecord>> {
        let cursor = self
            .orders(owner)
            .find(doc! {})
            .sort(doc! { "purchaseTimestamp": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_is_scoped_per_owner() {
        assert_eq!(MongoOrderStore::collection_name("u-42"), "users.u-42.orders");
    }
}
