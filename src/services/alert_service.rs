use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::utils::time::Clock;

#[derive(Debug, Default)]
struct GateState {
    last_sent: Option<DateTime<Utc>>,
    in_flight: bool,
}

/// Cooldown gate for operational alerts. A caller reserves the gate before
/// sending; the cooldown starts only when the send is recorded, and a
/// released reservation leaves the gate open.
pub struct AlertRateLimiter {
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    state: Mutex<GateState>,
}

impl AlertRateLimiter {
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            clock,
            cooldown,
            state: Mutex::new(GateState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cooled_down(&self, state: &GateState) -> bool {
        match state.last_sent {
            None => true,
            Some(at) => self.clock.now() - at >= self.cooldown,
        }
    }

    pub fn allows(&self) -> bool {
        let state = self.state();
        !state.in_flight && self.cooled_down(&state)
    }

    /// Claims the gate for one send. Returns false while another send is in
    /// flight or the cooldown is running.
    pub fn try_reserve(&self) -> bool {
        let mut state = self.state();
        if state.in_flight || !self.cooled_down(&state) {
            return false;
        }
        state.in_flight = true;
        true
    }

    /// Gives back a reservation whose send failed.
    pub fn release(&self) {
        self.state().in_flight = false;
    }

    pub fn record_sent(&self) {
        let mut state = self.state();
        state.in_flight = false;
        state.last_sent = Some(self.clock.now());
    }

    pub fn remaining(&self) -> Option<Duration> {
        let last = self.state().last_sent?;
        let left = self.cooldown - (self.clock.now() - last);
        (left > Duration::zero()).then_some(left)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, payload: JsonValue) -> Result<()>;
}

/// Posts alerts as JSON to a webhook.
#[derive(Clone)]
pub struct WebhookAlertSender {
    client: Client,
    url: String,
}

impl WebhookAlertSender {
    pub fn new(url: String, client: Client) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AlertSender for WebhookAlertSender {
    async fn send(&self, payload: JsonValue) -> Result<()> {
        let res = self.client.post(&self.url).json(&payload).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("Alert webhook {}: {}", status, body)));
        }
        Ok(())
    }
}

pub struct AlertService {
    limiter: AlertRateLimiter,
    sender: Option<Arc<dyn AlertSender>>,
}

impl AlertService {
    pub fn new(limiter: AlertRateLimiter, sender: Option<Arc<dyn AlertSender>>) -> Self {
        Self { limiter, sender }
    }

    /// Tells the operator an upstream API ran out of quota. Returns whether
    /// an alert went out; never fails the caller.
    pub async fn quota_exhausted(&self, service: &str, details: &str) -> bool {
        let Some(sender) = &self.sender else {
            warn!(service, "Quota exhausted; no alert channel configured");
            return false;
        };
        if !self.limiter.try_reserve() {
            info!(
                service,
                remaining_secs = self.limiter.remaining().map(|d| d.num_seconds()).unwrap_or(0),
                "Quota alert suppressed (cooldown active or send in flight)"
            );
            return false;
        }

        let payload = json!({
            "event": "quota_exhausted",
            "service": service,
            "message": format!("API ALERT: {} is out of credits", service),
            "details": details,
        });
        match sender.send(payload).await {
            Ok(()) => {
                self.limiter.record_sent();
                info!(service, "Quota alert sent");
                true
            }
            Err(e) => {
                self.limiter.release();
                error!(service, error = %e, "Failed to send quota alert");
                false
            }
        }
    }
}
