// services/payment_service.rs
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::CheckoutConfig;
use crate::errors::{AppError, Result};
use crate::models::checkout::CheckoutSession;
use crate::models::order::OrderSummary;

pub const DEEP_LINK_SUCCESS: &str = "payment-success";
pub const DEEP_LINK_FAILURE: &str = "payment-failure";
pub const DEEP_LINK_PENDING: &str = "payment-pending";
pub const TAX_LINE_TITLE: &str = "Tax";
pub const SHIPPING_LINE_TITLE: &str = "Shipping";

#[derive(Debug, Serialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub auto_return: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_urls: Option<BackUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

impl PreferenceRequest {
    /// What the provider will charge for this preference.
    pub fn charged_total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum()
    }
}

#[derive(Debug, Deserialize)]
pub struct PreferenceResponse {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentClient {
    config: CheckoutConfig,
    client: Client,
}

impl PaymentClient {
    pub fn new(config: CheckoutConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(PaymentClient { config, client })
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    fn back_urls(&self) -> BackUrls {
        match &self.config.return_url {
            Some(return_url) => BackUrls {
                success: return_url.clone(),
                failure: return_url.clone(),
                pending: return_url.clone(),
            },
            None => BackUrls {
                success: self.config.deep_link(DEEP_LINK_SUCCESS),
                failure: self.config.deep_link(DEEP_LINK_FAILURE),
                pending: self.config.deep_link(DEEP_LINK_PENDING),
            },
        }
    }

    /// Cart lines go out at their net prices; tax and shipping are their own lines,
    /// so the charged amount is exactly `summary.total + shipping_cost`.
    pub fn build_request(&self, summary: &OrderSummary, external_reference: Option<&str>) -> PreferenceRequest {
        let mut items: Vec<PreferenceItem> = summary
            .items
            .iter()
            .map(|item| PreferenceItem {
                title: item.title.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                currency_id: None,
            })
            .collect();

        let extras = [
            (TAX_LINE_TITLE, summary.tax),
            (SHIPPING_LINE_TITLE, self.config.shipping_cost),
        ];
        for (title, amount) in extras {
            if amount > Decimal::ZERO {
                items.push(PreferenceItem {
                    title: title.to_string(),
                    quantity: 1,
                    unit_price: amount,
                    currency_id: None,
                });
            }
        }

        PreferenceRequest {
            items,
            auto_return: "approved".to_string(),
            back_urls: Some(self.back_urls()),
            external_reference: external_reference.map(str::to_string),
        }
    }

    /// One POST to the provider, no retries.
    pub async fn create_checkout_session(
        &self,
        summary: &OrderSummary,
        external_reference: Option<&str>,
    ) -> Result<CheckoutSession> {
        if summary.items.is_empty() {
            return Err(AppError::invalid_data("cart is empty"));
        }

        info!(
            "Creating checkout preference: {} items, total {}",
            summary.items.len(),
            summary.total
        );

        let request = self.build_request(summary, external_reference);

        let response = self
            .client
            .post(self.config.preferences_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Preference creation failed: {} - {}", status, body);
            return Err(AppError::network(format!("provider returned {}", status)));
        }

        let preference: PreferenceResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Unparseable preference response: {}", e);
            AppError::parse(format!("malformed preference response: {}", e))
        })?;

        if preference.id.trim().is_empty() || preference.init_point.trim().is_empty() {
            error!("Preference response missing id or init_point");
            return Err(AppError::parse("preference response missing id or init_point"));
        }

        info!("Checkout preference created: {}", preference.id);

        Ok(CheckoutSession {
            preference_id: preference.id,
            checkout_url: preference.init_point,
            sandbox_url: preference.sandbox_init_point.filter(|url| !url.is_empty()),
        })
    }
}
