// services/summary.rs
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::cart::LineItem;
use crate::models::order::OrderSummary;

/// Rounds a derived amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Catalog prices are net. Tax goes on top of the subtotal.
pub fn build_summary(items: &[LineItem], tax_rate: Decimal) -> OrderSummary {
    if items.is_empty() {
        return OrderSummary::empty();
    }

    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();
    let breakdown = TaxBreakdown::added_to(subtotal, tax_rate);

    OrderSummary {
        items: items.to_vec(),
        subtotal: breakdown.net,
        tax: breakdown.tax,
        total: breakdown.gross,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxBreakdown {
    pub net: Decimal,
    pub tax: Decimal,
    pub gross: Decimal,
}

impl TaxBreakdown {
    pub fn added_to(net: Decimal, rate: Decimal) -> Self {
        let net = round_money(net);
        let tax = round_money(net * rate);
        TaxBreakdown {
            net,
            tax,
            gross: net + tax,
        }
    }

    /// Splits an amount that already includes tax: `tax = gross * rate / (1 + rate)`.
    pub fn backed_out_of(gross: Decimal, rate: Decimal) -> Self {
        let gross = round_money(gross);
        let tax = round_money(gross * rate / (Decimal::ONE + rate));
        TaxBreakdown {
            net: gross - tax,
            tax,
            gross,
        }
    }
}
