use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::reporting::ReportDispatcher;

use super::controller::{SessionController, TickOutcome};
use super::events::SessionEvent;

/// Controller shared between the learner-facing handle and its timer.
pub type SharedController = Arc<Mutex<SessionController>>;

const TICK_PERIOD: Duration = Duration::from_secs(1);

pub(crate) fn lock(controller: &SharedController) -> MutexGuard<'_, SessionController> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-second countdown bound to a single session generation.
///
/// The task stops on its own once the controller reports a stale tick or a
/// timeout; dropping or cancelling the timer aborts it immediately.
#[derive(Debug)]
pub struct SessionTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl SessionTimer {
    /// Spawn the countdown. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        controller: SharedController,
        generation: u64,
        events: UnboundedSender<SessionEvent>,
        dispatcher: ReportDispatcher,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = lock(&controller).tick(generation);
                match outcome {
                    TickOutcome::Stale => {
                        debug!(generation, "stale tick; timer stopping");
                        break;
                    }
                    TickOutcome::Ticked { remaining_secs } => {
                        let _ = events.send(SessionEvent::Tick { remaining_secs });
                    }
                    TickOutcome::Warning { remaining_secs } => {
                        info!(generation, remaining_secs, "low time warning");
                        let _ = events.send(SessionEvent::Tick { remaining_secs });
                        let _ = events.send(SessionEvent::TimeWarning { remaining_secs });
                    }
                    TickOutcome::TimedOut(completion) => {
                        info!(
                            generation,
                            score_percent = completion.result.score_percent(),
                            "session timed out"
                        );
                        let report = dispatcher.dispatch_completion(&completion);
                        let _ = events.send(SessionEvent::Tick { remaining_secs: 0 });
                        let _ = events.send(SessionEvent::Completed { completion, report });
                        break;
                    }
                }
            }
        });
        Self { generation, handle }
    }

    pub fn cancel(&self) {
        debug!(generation = self.generation, "timer cancelled");
        self.handle.abort();
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
