//! One-second countdown ticker for running exams.
//!
//! A [`Countdown`] spawns a task that sends one tick per period into an event
//! channel. Dropping the handle cancels the task, so the ticker is released on
//! every path out of the `taking` step. Each countdown has its own id; ticks
//! from a cancelled countdown that were already queued can be told apart from
//! ticks of its successor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Granularity of the exam countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

static NEXT_COUNTDOWN_ID: AtomicU64 = AtomicU64::new(1);

/// One elapsed period of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Id of the countdown that produced the tick.
    pub countdown_id: u64,
}

/// Handle to a running ticker task. Dropping it stops the ticker.
#[derive(Debug)]
pub struct Countdown {
    id: u64,
    _guard: DropGuard,
}

impl Countdown {
    /// Starts ticking every `period`, first tick one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<E>(period: Duration, events: mpsc::UnboundedSender<E>) -> Self
    where
        E: From<CountdownTick> + Send + 'static,
    {
        let id = NEXT_COUNTDOWN_ID.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(countdown_id = id, "Countdown started");

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if events.send(E::from(CountdownTick { countdown_id: id })).is_err() {
                            break;
                        }
                    }
                }
            }

            debug!(countdown_id = id, "Countdown stopped");
        });

        Self {
            id,
            _guard: token.drop_guard(),
        }
    }

    /// Id carried by this countdown's ticks.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}
