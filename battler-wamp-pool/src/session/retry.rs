use std::{
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use log::{
    info,
    warn,
};
use rand::Rng;
use tokio::sync::{
    broadcast,
    oneshot,
};

use crate::session::{
    provider::{
        CloseDetails,
        CloseReason,
        Connection,
        ConnectionEvent,
        ConnectionEventSender,
        SessionConfig,
        SessionProvider,
    },
    session::Session,
};

/// A session established by a single [`Connector`] attempt.
pub struct EstablishedSession {
    /// The open session.
    pub session: Arc<dyn Session>,
    /// Resolves when the session ends, with a message describing why.
    ///
    /// A dropped sender also means the session ended.
    pub finished_rx: oneshot::Receiver<String>,
}

/// Makes a single attempt at reaching a router and joining a realm.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to the router and joins the realm described by the config.
    async fn connect(&self, config: &SessionConfig) -> Result<EstablishedSession>;
}

#[async_trait]
impl<C> Connector for Arc<C>
where
    C: Connector,
{
    async fn connect(&self, config: &SessionConfig) -> Result<EstablishedSession> {
        self.as_ref().connect(config).await
    }
}

/// How delays between connect attempts grow.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// The delay before the first retry.
    pub initial_retry_delay: Duration,
    /// The factor the delay grows by on every consecutive retry.
    pub retry_delay_growth: f64,
    /// The relative random deviation applied to every delay.
    ///
    /// Non-finite values disable jitter.
    pub retry_delay_jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_retry_delay: Duration::from_millis(1500),
            retry_delay_growth: 1.5,
            retry_delay_jitter: 0.1,
        }
    }
}

/// Exponential backoff between connect attempts, capped at a maximum delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    max_delay: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy, max_delay: Duration) -> Self {
        Self {
            policy,
            max_delay,
            attempt: 0,
        }
    }

    /// Starts over from the initial delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// The delay for the current attempt, without jitter.
    pub fn base_delay(&self) -> Duration {
        let exponent = self.attempt.min(1024) as i32;
        let delay = self.policy.initial_retry_delay.as_secs_f64()
            * self.policy.retry_delay_growth.powi(exponent);
        self.clamp(delay)
    }

    /// The delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay();
        self.attempt = self.attempt.saturating_add(1);
        let jitter = self.policy.retry_delay_jitter.abs();
        if !jitter.is_finite() || jitter == 0.0 {
            return base;
        }
        let factor = 1.0 + rand::rng().random_range(-jitter..=jitter);
        self.clamp(base.as_secs_f64() * factor)
    }

    fn clamp(&self, seconds: f64) -> Duration {
        if !seconds.is_finite() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(seconds.max(0.0))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

struct RetryingConnection {
    cancel_tx: broadcast::Sender<()>,
}

impl Connection for RetryingConnection {
    fn close(&self) {
        self.cancel_tx.send(()).ok();
    }
}

/// A [`SessionProvider`] that keeps a session open by retrying a [`Connector`].
///
/// Failed attempts are retried after an exponentially growing delay, capped at
/// [`SessionConfig::max_retry_delay`]. Lost sessions are reestablished the same way. Every failed
/// attempt and lost session is reported as a [`ConnectionEvent::Closed`] that will be retried,
/// until the connection is closed or [`SessionConfig::max_retries`] consecutive attempts fail.
pub struct RetryingSessionProvider<C> {
    connector: Arc<C>,
    policy: RetryPolicy,
}

impl<C> RetryingSessionProvider<C>
where
    C: Connector,
{
    /// Creates a new provider over a connector, with the default retry policy.
    pub fn new(connector: C) -> Self {
        Self::with_policy(connector, RetryPolicy::default())
    }

    /// Creates a new provider over a connector.
    pub fn with_policy(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector: Arc::new(connector),
            policy,
        }
    }

    async fn run(
        connector: Arc<C>,
        config: SessionConfig,
        policy: RetryPolicy,
        events_tx: ConnectionEventSender,
        mut cancel_rx: broadcast::Receiver<()>,
    ) {
        let mut backoff = Backoff::new(policy, config.max_retry_delay);
        let mut failures: u32 = 0;
        loop {
            let result = tokio::select! {
                result = connector.connect(&config) => result,
                _ = cancel_rx.recv() => return,
            };

            match result {
                Ok(established) => {
                    info!(
                        "Session {} established with {} in realm {}",
                        established.session.id(),
                        config.transport_url,
                        config.realm
                    );
                    failures = 0;
                    backoff.reset();
                    events_tx
                        .send(ConnectionEvent::Opened(established.session.clone()))
                        .ok();

                    tokio::select! {
                        message = established.finished_rx => {
                            let message = message.unwrap_or_else(|_| "session dropped".to_owned());
                            warn!("Session with {} lost: {message}", config.transport_url);
                            events_tx
                                .send(ConnectionEvent::Closed(
                                    CloseDetails::new(CloseReason::Lost, true).with_message(message),
                                ))
                                .ok();
                        }
                        _ = cancel_rx.recv() => {
                            if let Err(err) = established.session.leave().await {
                                warn!("Failed to leave realm {} cleanly: {err}", config.realm);
                            }
                            events_tx
                                .send(ConnectionEvent::Closed(CloseDetails::new(CloseReason::Closed, false)))
                                .ok();
                            return;
                        }
                    }
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let give_up = !config.retry_if_unreachable
                        || config.max_retries.is_some_and(|max| failures > max);
                    warn!(
                        "Failed to connect to {} (attempt {failures}): {err}",
                        config.transport_url
                    );
                    events_tx
                        .send(ConnectionEvent::Closed(
                            CloseDetails::new(CloseReason::Unreachable, !give_up)
                                .with_message(err.to_string()),
                        ))
                        .ok();
                    if give_up {
                        return;
                    }
                }
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => (),
                _ = cancel_rx.recv() => return,
            }
        }
    }
}

impl<C> SessionProvider for RetryingSessionProvider<C>
where
    C: Connector,
{
    fn open(
        &self,
        config: SessionConfig,
        events_tx: ConnectionEventSender,
    ) -> Box<dyn Connection> {
        let (cancel_tx, cancel_rx) = broadcast::channel(1);
        tokio::spawn(Self::run(
            self.connector.clone(),
            config,
            self.policy.clone(),
            events_tx,
            cancel_rx,
        ));
        Box::new(RetryingConnection { cancel_tx })
    }
}
