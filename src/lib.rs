pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use config::{CheckoutConfig, ProviderEnvironment};
pub use errors::{AppError, ErrorInfo, Result};
pub use models::{Cart, CheckoutSession, LineItem, OrderRecord, OrderSummary, PaymentOutcome, Settlement};
pub use services::checkout_flow::{CheckoutFlow, CheckoutReceipt, CheckoutRequest};
pub use services::reconciler::{BrowserEvent, BrowserEvents, CheckoutReconciler, EmbeddedBrowser, ReconcileOptions};
pub use state::AppState;
