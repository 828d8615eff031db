pub mod connection;
pub mod order_store;
