pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;

pub use cart::{Cart, LineItem};
pub use checkout::{CheckoutSession, PaymentOutcome, Settlement};
pub use order::{OrderRecord, OrderStatus, OrderSummary, ShippingAddress};
pub use product::{ProductStock, StockLevels};
