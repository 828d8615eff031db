use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    pub available: bool,
    pub stock: u32,
}

/// Stock snapshot keyed by product id, taken right before checkout.
#[derive(Debug, Clone, Default)]
pub struct StockLevels {
    levels: HashMap<String, ProductStock>,
}

impl StockLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, available: bool, stock: u32) -> Self {
        self.insert(id, ProductStock { available, stock });
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, level: ProductStock) {
        self.levels.insert(id.into(), level);
    }

    pub fn get(&self, id: &str) -> Option<&ProductStock> {
        self.levels.get(id)
    }
}
