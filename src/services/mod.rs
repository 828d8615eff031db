pub mod checkout_flow;
pub mod order_service;
pub mod payment_service;
pub mod reconciler;
pub mod summary;
pub mod validation;
