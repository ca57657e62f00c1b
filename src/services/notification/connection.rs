use crate::config::ReconnectConfig;
use crate::domain::subscriber::SubscriberId;
use crate::services::notification::transport::TransportHandle;
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Sleep;

/// Reconnect delay law: starts at the floor, grows by a fixed factor after
/// every failure, never exceeds the ceiling, never runs out.
pub struct RetryDelay {
    backoff: ExponentialBackoff,
    floor: Duration,
    ceiling: Duration,
    factor: f32,
}

impl RetryDelay {
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration, factor: f32) -> Self {
        let ceiling = ceiling.max(floor);
        Self { backoff: Self::build(floor, ceiling, factor), floor, ceiling, factor }
    }

    fn build(floor: Duration, ceiling: Duration, factor: f32) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(floor)
            .with_max_delay(ceiling)
            .with_factor(factor)
            .without_max_times()
            .build()
    }

    #[must_use]
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(config.min_backoff(), config.max_backoff(), config.backoff_factor)
    }

    /// Returns the delay to wait before the next reconnect and grows the
    /// delay for the one after.
    pub fn next_delay(&mut self) -> Duration {
        self.backoff.next().unwrap_or(self.ceiling)
    }

    pub fn reset(&mut self) {
        self.backoff = Self::build(self.floor, self.ceiling, self.factor);
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDelay")
            .field("floor", &self.floor)
            .field("ceiling", &self.ceiling)
            .field("factor", &self.factor)
            .finish_non_exhaustive()
    }
}

/// State of the push connection, owned exclusively by the client supervisor.
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) subscriber: Option<SubscriberId>,
    pub(crate) transport: Option<TransportHandle>,
    pub(crate) retry: RetryDelay,
    pub(crate) pending_reconnect: Option<Pin<Box<Sleep>>>,
    /// Set between the live transport's open and its close.
    pub(crate) established: bool,
    generation: u64,
}

impl Connection {
    pub(crate) fn new(retry: RetryDelay) -> Self {
        Self {
            subscriber: None,
            transport: None,
            retry,
            pending_reconnect: None,
            established: false,
            generation: 0,
        }
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether an event tagged with `generation` belongs to the live transport.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.transport.as_ref().is_some_and(|t| t.generation() == generation)
    }

    /// Arms the reconnect timer with the current delay and grows the delay.
    /// Replaces any timer already pending.
    pub(crate) fn schedule_reconnect(&mut self) -> Duration {
        let delay = self.retry.next_delay();
        self.pending_reconnect = Some(Box::pin(tokio::time::sleep(delay)));
        delay
    }

    pub(crate) fn cancel_reconnect(&mut self) -> bool {
        self.pending_reconnect.take().is_some()
    }
}

/// Resolves when the pending reconnect timer fires; never resolves if none is
/// pending.
pub(crate) async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
