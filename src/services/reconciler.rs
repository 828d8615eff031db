// services/reconciler.rs
//! Reconciles the outcome of a hosted checkout page back into the app.
//!
//! The embedded browser pushes what it observes into one event channel. A
//! poller task adds the browser's current URL to the same channel, for
//! redirects the browser never reports. [`StatusMachine`] consumes those
//! events and settles exactly once.

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CheckoutConfig, ProviderEnvironment};
use crate::errors::Result;
use crate::models::checkout::{CheckoutSession, PaymentOutcome, Settlement};
use crate::services::payment_service::{DEEP_LINK_FAILURE, DEEP_LINK_PENDING, DEEP_LINK_SUCCESS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    PageStarted(String),
    PageFinished(String),
    /// Reported before a resource loads.
    NavigationIntercepted(String),
    UrlPolled(String),
    LoadFailed { url: String, reason: String },
    /// The user left the checkout page.
    Closed,
}

impl BrowserEvent {
    fn url(&self) -> Option<&str> {
        match self {
            BrowserEvent::PageStarted(url)
            | BrowserEvent::PageFinished(url)
            | BrowserEvent::NavigationIntercepted(url)
            | BrowserEvent::UrlPolled(url) => Some(url),
            BrowserEvent::LoadFailed { .. } | BrowserEvent::Closed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Loading { url: String },
    Settled(Settlement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The machine had already settled.
    Ignored,
    Continue,
    Settled(Settlement),
}

fn deep_link_target<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let (url_scheme, rest) = url.split_once("://")?;
    if !url_scheme.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/').rsplit('/').next()
}

/// Maps an observed URL to a payment outcome. First match wins.
pub fn classify_url(url: &str, deep_link_scheme: &str) -> Option<PaymentOutcome> {
    match deep_link_target(url, deep_link_scheme) {
        Some(DEEP_LINK_SUCCESS) => return Some(PaymentOutcome::Approved),
        Some(DEEP_LINK_FAILURE) => return Some(PaymentOutcome::Rejected),
        Some(DEEP_LINK_PENDING) => return Some(PaymentOutcome::Pending),
        _ => {}
    }

    const BY_STATUS: [(&str, PaymentOutcome); 3] = [
        ("approved", PaymentOutcome::Approved),
        ("rejected", PaymentOutcome::Rejected),
        ("pending", PaymentOutcome::Pending),
    ];

    if let Ok(parsed) = Url::parse(url) {
        let statuses: Vec<String> = parsed
            .query_pairs()
            .filter(|(key, _)| key == "status" || key == "collection_status")
            .map(|(_, value)| value.to_ascii_lowercase())
            .collect();

        for (status, outcome) in BY_STATUS {
            if statuses.iter().any(|value| value == status) {
                return Some(outcome);
            }
        }
    }

    // Statuses the query parser misses (fragments, unparseable URLs) still show up as plain text.
    let lowered = url.to_ascii_lowercase();
    BY_STATUS
        .into_iter()
        .find(|(status, _)| lowered.contains(&format!("status={}", status)))
        .map(|(_, outcome)| outcome)
}

/// Provider payment id carried by a return URL, if any.
pub fn payment_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    ["payment_id", "collection_id"].into_iter().find_map(|key| {
        parsed
            .query_pairs()
            .find(|(name, value)| name == key && !value.is_empty() && value != "null")
            .map(|(_, value)| value.into_owned())
    })
}

/// Deep links into the app are handled here, never loaded by the browser.
pub fn navigation_decision(url: &str, deep_link_scheme: &str) -> NavigationDecision {
    match url.split_once("://") {
        Some((scheme, _)) if scheme.eq_ignore_ascii_case(deep_link_scheme) => NavigationDecision::Block,
        _ => NavigationDecision::Allow,
    }
}

/// `Idle -> Loading(url) -> Settled(outcome)`. Nothing leaves `Settled`.
#[derive(Debug)]
pub struct StatusMachine {
    deep_link_scheme: String,
    state: ReconcilerState,
}

impl StatusMachine {
    pub fn new(deep_link_scheme: impl Into<String>) -> Self {
        StatusMachine {
            deep_link_scheme: deep_link_scheme.into(),
            state: ReconcilerState::Idle,
        }
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, ReconcilerState::Settled(_))
    }

    pub fn start(&mut self, url: &str) -> Transition {
        match self.state {
            ReconcilerState::Idle => self.observe(url),
            ReconcilerState::Loading { .. } => Transition::Continue,
            ReconcilerState::Settled(_) => Transition::Ignored,
        }
    }

    pub fn handle(&mut self, event: BrowserEvent) -> Transition {
        if self.is_settled() {
            debug!("Ignoring {:?}: payment already processed", event);
            return Transition::Ignored;
        }

        match event {
            BrowserEvent::LoadFailed { url, reason } => {
                warn!("Checkout page failed to load {}: {}", url, reason);
                Transition::Continue
            }
            BrowserEvent::Closed => self.settle(Settlement::without_url(PaymentOutcome::Cancelled)),
            other => match other.url() {
                Some(url) => self.observe(url),
                None => Transition::Continue,
            },
        }
    }

    /// Settles with `outcome` unless already settled; returns the final settlement either way.
    pub fn abandon(&mut self, outcome: PaymentOutcome) -> Settlement {
        if let ReconcilerState::Settled(settlement) = &self.state {
            return settlement.clone();
        }
        let settlement = Settlement::without_url(outcome);
        self.state = ReconcilerState::Settled(settlement.clone());
        settlement
    }

    fn observe(&mut self, url: &str) -> Transition {
        match classify_url(url, &self.deep_link_scheme) {
            Some(outcome) => self.settle(Settlement {
                outcome,
                payment_id: payment_id_from_url(url),
                url: Some(url.to_string()),
            }),
            None => {
                self.state = ReconcilerState::Loading { url: url.to_string() };
                Transition::Continue
            }
        }
    }

    fn settle(&mut self, settlement: Settlement) -> Transition {
        info!("Checkout settled: {}", settlement.outcome.as_str());
        self.state = ReconcilerState::Settled(settlement.clone());
        Transition::Settled(settlement)
    }
}

/// The host's embedded browser widget.
#[async_trait]
pub trait EmbeddedBrowser: Send + Sync {
    async fn open(&self, url: &str) -> Result<()>;

    /// URL currently displayed, polled as a fallback source of navigations.
    async fn current_url(&self) -> Option<String>;
}

/// Sender half handed to the browser adapter. Cheap to clone.
///
/// The queue is unbounded. Nothing is dropped while the session is alive.
#[derive(Debug, Clone)]
pub struct BrowserEvents {
    tx: mpsc::UnboundedSender<BrowserEvent>,
    deep_link_scheme: String,
}

impl BrowserEvents {
    /// Non-blocking, for synchronous browser callbacks. Returns false once the session is gone.
    pub fn emit(&self, event: BrowserEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!("Checkout session gone, dropping {:?}", event);
                false
            }
        }
    }

    pub fn page_started(&self, url: &str) -> bool {
        self.emit(BrowserEvent::PageStarted(url.to_string()))
    }

    pub fn page_finished(&self, url: &str) -> bool {
        self.emit(BrowserEvent::PageFinished(url.to_string()))
    }

    pub fn load_failed(&self, url: &str, reason: &str) -> bool {
        self.emit(BrowserEvent::LoadFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        })
    }

    pub fn closed(&self) -> bool {
        self.emit(BrowserEvent::Closed)
    }

    /// Records the navigation and tells the browser whether to load it.
    ///
    /// A deep link is only blocked once it has been queued; if the session is
    /// already gone the browser is left to handle it.
    pub fn intercept(&self, url: &str) -> NavigationDecision {
        let queued = self.emit(BrowserEvent::NavigationIntercepted(url.to_string()));
        match navigation_decision(url, &self.deep_link_scheme) {
            NavigationDecision::Block if queued => NavigationDecision::Block,
            _ => NavigationDecision::Allow,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub deep_link_scheme: String,
    pub environment: ProviderEnvironment,
    pub poll_interval: Duration,
    pub session_timeout: Option<Duration>,
}

impl From<&CheckoutConfig> for ReconcileOptions {
    fn from(config: &CheckoutConfig) -> Self {
        ReconcileOptions {
            deep_link_scheme: config.deep_link_scheme.clone(),
            environment: config.environment,
            poll_interval: config.poll_interval,
            session_timeout: config.session_timeout,
        }
    }
}

/// One reconciliation per checkout attempt; `run` consumes it.
pub struct CheckoutReconciler {
    machine: StatusMachine,
    options: ReconcileOptions,
    events_tx: mpsc::UnboundedSender<BrowserEvent>,
    events_rx: mpsc::UnboundedReceiver<BrowserEvent>,
}

impl CheckoutReconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        CheckoutReconciler {
            machine: StatusMachine::new(options.deep_link_scheme.clone()),
            options,
            events_tx,
            events_rx,
        }
    }

    pub fn events(&self) -> BrowserEvents {
        BrowserEvents {
            tx: self.events_tx.clone(),
            deep_link_scheme: self.options.deep_link_scheme.clone(),
        }
    }

    /// Opens the hosted page and waits for its outcome.
    ///
    /// Ends with `Cancelled` when `cancel` fires or the browser reports
    /// `Closed`, and with `Unknown` when the session times out.
    pub async fn run(
        self,
        session: &CheckoutSession,
        browser: Arc<dyn EmbeddedBrowser>,
        cancel: CancellationToken,
    ) -> Settlement {
        let CheckoutReconciler {
            mut machine,
            options,
            events_tx,
            mut events_rx,
        } = self;

        let url = session.entry_url(options.environment).to_string();
        info!("Opening checkout {} for preference {}", url, session.preference_id);

        if let Transition::Settled(settlement) = machine.start(&url) {
            return settlement;
        }
        if let Err(e) = browser.open(&url).await {
            warn!("Failed to open checkout page: {}", e);
        }

        let poll_cancel = cancel.child_token();
        let poller = tokio::spawn(poll_current_url(
            browser,
            events_tx,
            options.poll_interval,
            poll_cancel.clone(),
        ));

        let timeout = async {
            match options.session_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout);

        let settlement = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Checkout torn down before settling");
                    break machine.abandon(PaymentOutcome::Cancelled);
                }
                event = events_rx.recv() => match event {
                    Some(event) => {
                        if let Transition::Settled(settlement) = machine.handle(event) {
                            break settlement;
                        }
                    }
                    None => {
                        warn!("Browser event channel closed without an outcome");
                        break machine.abandon(PaymentOutcome::Unknown);
                    }
                },
                _ = &mut timeout => {
                    warn!("Checkout session timed out");
                    break machine.abandon(PaymentOutcome::Unknown);
                }
            }
        };

        poll_cancel.cancel();
        if let Err(e) = poller.await {
            warn!("URL poller ended abnormally: {}", e);
        }

        settlement
    }
}

async fn poll_current_url(
    browser: Arc<dyn EmbeddedBrowser>,
    events: mpsc::UnboundedSender<BrowserEvent>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_seen: Option<String> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(url) = browser.current_url().await else {
                    continue;
                };
                if last_seen.as_deref() == Some(url.as_str()) {
                    continue;
                }
                last_seen = Some(url.clone());
                if events.send(BrowserEvent::UrlPolled(url)).is_err() {
                    break;
                }
            }
        }
    }

    debug!("URL poller stopped");
}
