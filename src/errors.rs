// src/errors.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error value handed to the UI layer for display.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Network(_) | AppError::Parse(_) => "PAYMENT_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::MongoDB(_) | AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        let (message, details) = match self {
            AppError::Network(detail) => ("Could not reach the payment provider", Some(detail.clone())),
            AppError::Parse(detail) => ("The payment provider sent an unexpected response", Some(detail.clone())),
            AppError::Validation(detail) => ("The cart cannot be checked out", Some(detail.clone())),
            AppError::MongoDB(err) => ("The order could not be saved", Some(err.to_string())),
            AppError::Persistence(detail) => ("The order could not be saved", Some(detail.clone())),
            AppError::Configuration(detail) => ("Checkout is not configured", Some(detail.clone())),
        };

        ErrorInfo {
            code: self.code(),
            message: message.to_string(),
            details,
            timestamp: Utc::now(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(format!("HTTP request failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(err: rust_decimal::Error) -> Self {
        AppError::Configuration(format!("Decimal parsing error: {}", err))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::Configuration(format!("Integer parsing error: {}", err))
    }
}

// Helper conversion functions
impl AppError {
    pub fn network(msg: impl Into<String>) -> Self {
        AppError::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        AppError::Parse(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        AppError::Persistence(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
