use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::database::connection::get_db_client;
use crate::database::order_store::MongoOrderStore;
use crate::errors::Result;
use crate::services::order_service::{InMemoryOrderStore, OrderStore, OrderWriter};
use crate::services::payment_service::PaymentClient;

#[derive(Clone)]
pub struct AppState {
    pub config: CheckoutConfig,
    pub payments: Arc<PaymentClient>,
    pub orders: OrderWriter,
}

impl AppState {
    /// Orders are kept in memory until a store is attached with [`AppState::with_order_store`].
    pub fn new(config: CheckoutConfig) -> Result<Self> {
        let payments = Arc::new(PaymentClient::new(config.clone())?);
        let orders = OrderWriter::new(
            Arc::new(InMemoryOrderStore::new()),
            config.tax_rate,
            config.shipping_cost,
        );

        Ok(AppState {
            config,
            payments,
            orders,
        })
    }

    pub fn with_order_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.orders = OrderWriter::new(store, self.config.tax_rate, self.config.shipping_cost);
        self
    }

    /// Connects to MongoDB when `DATABASE_URL` is configured.
    pub async fn connect(config: CheckoutConfig) -> Result<Self> {
        let state = AppState::new(config)?;
        if state.config.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            return Ok(state);
        }

        let db = get_db_client(&state.config).await?;
        Ok(state.with_order_store(Arc::new(MongoOrderStore::new(db))))
    }
}
