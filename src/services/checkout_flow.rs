// services/checkout_flow.rs
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::Result;
use crate::models::cart::LineItem;
use crate::models::checkout::{CheckoutSession, PaymentOutcome, Settlement};
use crate::models::order::OrderSummary;
use crate::models::product::StockLevels;
use crate::services::order_service::{generate_order_number, OrderExtras};
use crate::services::reconciler::{CheckoutReconciler, EmbeddedBrowser, ReconcileOptions};
use crate::services::summary::build_summary;
use crate::services::validation::validate_cart;
use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub owner: String,
    pub items: Vec<LineItem>,
    pub stock: Option<StockLevels>,
    pub extras: OrderExtras,
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub outcome: PaymentOutcome,
    pub summary: OrderSummary,
    pub session: Option<CheckoutSession>,
    pub settlement: Option<Settlement>,
    pub order_id: Option<String>,
}

impl CheckoutReceipt {
    fn cancelled(summary: OrderSummary) -> Self {
        CheckoutReceipt {
            outcome: PaymentOutcome::Cancelled,
            summary,
            session: None,
            settlement: None,
            order_id: None,
        }
    }
}

/// Drives one checkout attempt from cart to stored order.
#[derive(Clone)]
pub struct CheckoutFlow {
    state: AppState,
}

impl CheckoutFlow {
    pub fn new(state: AppState) -> Self {
        CheckoutFlow { state }
    }

    /// Fresh reconciler; hand its `events()` to the browser adapter before calling `run`.
    pub fn reconciler(&self) -> CheckoutReconciler {
        CheckoutReconciler::new(ReconcileOptions::from(&self.state.config))
    }

    pub fn summarize(&self, items: &[LineItem]) -> OrderSummary {
        build_summary(items, self.state.config.tax_rate)
    }

    /// Cancelling `cancel` tears the attempt down: a preference that arrives
    /// afterwards is discarded and the reconciler settles as cancelled.
    pub async fn run(
        &self,
        request: CheckoutRequest,
        browser: Arc<dyn EmbeddedBrowser>,
        reconciler: CheckoutReconciler,
        cancel: CancellationToken,
    ) -> Result<CheckoutReceipt> {
        let CheckoutRequest {
            owner,
            items,
            stock,
            mut extras,
        } = request;

        validate_cart(&items, stock.as_ref())?;
        let summary = self.summarize(&items);
        let order_number = extras
            .order_number
            .get_or_insert_with(generate_order_number)
            .clone();

        info!("Checkout {} for {}: total {}", order_number, owner, summary.total);

        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Checkout {} torn down while creating preference", order_number);
                return Ok(CheckoutReceipt::cancelled(summary.clone()));
            }
            session = self.state.payments.create_checkout_session(&summary, Some(&order_number)) => session?,
        };

        if cancel.is_cancelled() {
            info!("Discarding late preference {} for {}", session.preference_id, order_number);
            return Ok(CheckoutReceipt::cancelled(summary));
        }

        let settlement = reconciler.run(&session, browser, cancel).await;

        let order_id = match settlement.outcome {
            PaymentOutcome::Approved => {
                let payment_id = settlement
                    .payment_id
                    .clone()
                    .unwrap_or_else(|| session.preference_id.clone());
                let order_id = self
                    .state
                    .orders
                    .record_order_with(&owner, &items, PaymentOutcome::Approved, &payment_id, extras)
                    .await?;
                Some(order_id)
            }
            other => {
                info!("Checkout {} ended {}, no order recorded", order_number, other.as_str());
                None
            }
        };

        Ok(CheckoutReceipt {
            outcome: settlement.outcome,
            summary,
            session: Some(session),
            settlement: Some(settlement),
            order_id,
        })
    }
}
