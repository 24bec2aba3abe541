use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use crate::clients::OrderClient;
use crate::domain::{OrderId, OrderStatus, RecordedStatus};
use crate::order_actor::OrderError;

/// Where the tracker reads an order's status from.
#[async_trait]
pub trait StatusSource: Clone + Send + Sync + 'static {
    /// `Ok(None)` means the order row does not exist.
    async fn current_status(&self, id: OrderId) -> Result<Option<RecordedStatus>, OrderError>;
}

#[async_trait]
impl StatusSource for OrderClient {
    async fn current_status(&self, id: OrderId) -> Result<Option<RecordedStatus>, OrderError> {
        self.order_status(id).await
    }
}

/// What the tracked order looked like at the last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingState {
    /// No read has happened yet.
    Checking,
    Status(OrderStatus),
    /// The row is missing or holds a status outside the lifecycle. Polling continues.
    Unknown,
    Completed,
    Failed(String),
}

impl TrackingState {
    /// Completed and Failed end the polling loop.
    pub fn is_final(&self) -> bool {
        matches!(self, TrackingState::Completed | TrackingState::Failed(_))
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::Checking => f.write_str("Checking..."),
            TrackingState::Status(status) => write!(f, "Status: {}", status),
            TrackingState::Unknown => f.write_str("Status: UNKNOWN"),
            TrackingState::Completed => write!(f, "Status: {}", OrderStatus::Completed),
            TrackingState::Failed(reason) => write!(f, "Tracking failed: {}", reason),
        }
    }
}

/// Cleared under its lock when the slot is released; the loop publishes only while it is set.
type Liveness = Arc<Mutex<bool>>;

struct ActiveTracking {
    order_id: OrderId,
    live: Liveness,
    task: JoinHandle<()>,
}

/// Polls one order at a time. Tracking another order replaces the running loop,
/// and dropping the tracker stops it.
pub struct OrderTracker<S: StatusSource> {
    source: S,
    period: Duration,
    active: Option<ActiveTracking>,
}

impl<S: StatusSource> OrderTracker<S> {
    pub fn new(source: S, period: Duration) -> Self {
        Self {
            source,
            period,
            active: None,
        }
    }

    /// Starts polling `order_id`, cancelling any loop already running.
    ///
    /// The receiver starts at [`TrackingState::Checking`]; the first read happens
    /// one period later. The channel closes once the loop ends.
    #[instrument(skip(self))]
    pub fn track(&mut self, order_id: OrderId) -> watch::Receiver<TrackingState> {
        self.stop();

        let (tx, rx) = watch::channel(TrackingState::Checking);
        let live = Arc::new(Mutex::new(true));
        let task = tokio::spawn(
            poll_status(self.source.clone(), order_id, self.period, live.clone(), tx)
                .instrument(info_span!("order_tracking", order_id)),
        );
        self.active = Some(ActiveTracking { order_id, live, task });
        info!(period_ms = self.period.as_millis() as u64, "Tracking started");
        rx
    }

    /// Once this returns the released loop publishes nothing more, even if a read
    /// was already in flight.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            *active.live.lock().unwrap_or_else(PoisonError::into_inner) = false;
            active.task.abort();
            debug!(order_id = active.order_id, "Tracking stopped");
        }
    }

    /// The order whose loop is still running, if any.
    pub fn tracked_order(&self) -> Option<OrderId> {
        self.active
            .as_ref()
            .filter(|active| !active.task.is_finished())
            .map(|active| active.order_id)
    }

    pub fn is_tracking(&self) -> bool {
        self.tracked_order().is_some()
    }
}

impl<S: StatusSource> Drop for OrderTracker<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_status<S: StatusSource>(
    source: S,
    order_id: OrderId,
    period: Duration,
    live: Liveness,
    tx: watch::Sender<TrackingState>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => {
                debug!("No observers left");
                return;
            }
        }

        let state = match source.current_status(order_id).await {
            Ok(Some(RecordedStatus::Known(status))) if status.is_terminal() => TrackingState::Completed,
            Ok(Some(RecordedStatus::Known(status))) => TrackingState::Status(status),
            Ok(Some(RecordedStatus::Unrecognized(raw))) => {
                debug!(raw = %raw, "Unrecognized status");
                TrackingState::Unknown
            }
            Ok(None) => TrackingState::Unknown,
            Err(e) => {
                warn!(error = %e, "Status read failed");
                TrackingState::Failed(e.to_string())
            }
        };
        debug!(state = %state, "Status read");

        let finished = state.is_final();
        let published = {
            let live = live.lock().unwrap_or_else(PoisonError::into_inner);
            *live && tx.send(state).is_ok()
        };
        if !published {
            debug!("Slot released or no observers left");
            return;
        }
        if finished {
            info!("Tracking finished");
            return;
        }
    }
}
