// models/cart.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::order::OrderSummary;
use crate::services::summary::build_summary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[validate(length(min = 1, message = "item id must not be empty"))]
    pub id: String,

    #[validate(length(min = 1, message = "item title must not be empty"))]
    pub title: String,

    #[validate(custom(function = "non_negative_price"))]
    pub unit_price: Decimal,

    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

impl LineItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        LineItem {
            id: id.into(),
            title: title.into(),
            unit_price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Items in the order they were first added. An item never sits at quantity 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCart")]
pub struct Cart {
    items: Vec<LineItem>,
}

#[derive(Deserialize)]
struct StoredCart {
    items: Vec<LineItem>,
}

impl From<StoredCart> for Cart {
    fn from(stored: StoredCart) -> Self {
        let mut cart = Cart::new();
        for item in stored.items {
            cart.add(item);
        }
        cart
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Adds an item, merging quantities when the id is already in the cart.
    pub fn add(&mut self, item: LineItem) {
        if item.quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }

    /// Returns false when the id is not in the cart.
    pub fn set_quantity(&mut self, id: &str, quantity: u32) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if quantity == 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = quantity;
        }
        true
    }

    pub fn increment(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                let quantity = self.items[index].quantity.saturating_add(1);
                self.set_quantity(id, quantity)
            }
            None => false,
        }
    }

    pub fn decrement(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                let quantity = self.items[index].quantity.saturating_sub(1);
                self.set_quantity(id, quantity)
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<LineItem> {
        self.position(id).map(|index| self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn summary(&self, tax_rate: Decimal) -> OrderSummary {
        build_summary(&self.items, tax_rate)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}
