//! Shared fixtures: a scripted embedded browser and a mocked payment provider.

#![allow(dead_code)]

use async_trait::async_trait;
use checkout::{CheckoutConfig, EmbeddedBrowser, Result};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "TEST-ACCESS-TOKEN";

/// Browser whose displayed URL the test moves by hand.
#[derive(Default)]
pub struct ScriptedBrowser {
    opened: Mutex<Vec<String>>,
    current: Mutex<Option<String>>,
    polls: AtomicUsize,
    fail_open: bool,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        ScriptedBrowser {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn navigate(&self, url: &str) {
        *self.current.lock().unwrap() = Some(url.to_string());
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// How many times the displayed URL has been read.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddedBrowser for ScriptedBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        if self.fail_open {
            return Err(checkout::AppError::network("net::ERR_INTERNET_DISCONNECTED"));
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Option<String> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }
}

pub fn test_config(base_url: &str) -> CheckoutConfig {
    checkout::logging::init_tracing(tracing::Level::DEBUG);
    let mut config = CheckoutConfig::new(base_url, TOKEN);
    config.poll_interval = Duration::from_millis(10);
    config.session_timeout = Some(Duration::from_secs(5));
    config
}

pub async fn provider_returning(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preferences"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;
    server
}

pub async fn provider_ok() -> MockServer {
    provider_returning(
        201,
        json!({
            "id": "pref-123",
            "init_point": "https://pay.example/checkout?pref_id=pref-123",
            "sandbox_init_point": "https://sandbox.pay.example/checkout?pref_id=pref-123",
        }),
    )
    .await
}
