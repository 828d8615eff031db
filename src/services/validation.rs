// services/validation.rs
use tracing::warn;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::cart::LineItem;
use crate::models::product::StockLevels;

/// Checks a cart before any money is requested. Stock is only checked when a snapshot is given.
pub fn validate_cart(items: &[LineItem], stock: Option<&StockLevels>) -> Result<()> {
    if items.is_empty() {
        return Err(AppError::invalid_data("cart is empty"));
    }

    for item in items {
        item.validate()?;

        let Some(stock) = stock else {
            continue;
        };

        match stock.get(&item.id) {
            Some(level) if !level.available => {
                warn!("Item {} is no longer available", item.id);
                return Err(AppError::invalid_data(format!("item {} is unavailable", item.title)));
            }
            Some(level) if level.stock < item.quantity => {
                warn!("Item {}: requested {} but only {} in stock", item.id, item.quantity, level.stock);
                return Err(AppError::invalid_data(format!(
                    "insufficient stock for {}: requested {}, available {}",
                    item.title, item.quantity, level.stock
                )));
            }
            Some(_) => {}
            None => {
                warn!("Item {} missing from stock snapshot", item.id);
                return Err(AppError::invalid_data(format!("item {} is unavailable", item.title)));
            }
        }
    }

    Ok(())
}
