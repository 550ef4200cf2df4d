//! Deferred push of registry contents into the map's route source.
//!
//! After every registry mutation the push is scheduled a short, fixed delay
//! in the future. When the push finds the source not yet attached it is
//! re-armed after a retry delay, up to a fixed number of attempts. There is
//! no cancellation beyond coalescing: scheduling again while a push is
//! pending just moves the deadline.

use super::source::{RouteSource, SourceError};
use crate::routes::{routes_to_feature_collection, RouteRegistry};
use std::time::Duration;
use web_time::Instant;

/// Timing for [`SourceSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Delay between a mutation and the push
    pub update_delay: Duration,
    /// Delay before retrying a push the source refused
    pub retry_delay: Duration,
    /// Retries before giving up until the next mutation
    pub max_retries: u32,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            update_delay: Duration::from_millis(100),
            retry_delay: Duration::from_millis(500),
            max_retries: 10,
        }
    }
}

/// Outcome of a single [`SourceSync::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing scheduled
    Idle,
    /// A push is scheduled but not due yet
    Waiting,
    /// Data was pushed to the source
    Pushed { features: usize },
    /// Source not attached; retry scheduled
    Retrying { attempt: u32 },
    /// Retries exhausted; the push was dropped
    GaveUp,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Instant,
    attempts: u32,
}

/// Schedules and retries pushes from the registry to the route source.
#[derive(Debug, Default)]
pub struct SourceSync {
    timing: SyncTiming,
    pending: Option<Pending>,
}

impl SourceSync {
    pub fn new(timing: SyncTiming) -> Self {
        Self {
            timing,
            pending: None,
        }
    }

    /// Schedules a push `update_delay` after `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.pending = Some(Pending {
            due: now + self.timing.update_delay,
            attempts: 0,
        });
    }

    #[allow(dead_code)] // Used by tests
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the next push attempt is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Performs the push if it is due.
    pub fn poll(
        &mut self,
        now: Instant,
        registry: &RouteRegistry,
        source: &mut RouteSource,
    ) -> SyncOutcome {
        let Some(pending) = self.pending else {
            return SyncOutcome::Idle;
        };

        if now < pending.due {
            return SyncOutcome::Waiting;
        }

        let data = routes_to_feature_collection(registry.routes());
        let features = data.features.len();

        match source.set_data(data, registry.revision()) {
            Ok(()) => {
                self.pending = None;
                log::debug!(
                    "Pushed {} route feature(s) to the map (revision {})",
                    features,
                    registry.revision()
                );
                SyncOutcome::Pushed { features }
            }
            Err(SourceError::NotAttached) => {
                let attempt = pending.attempts + 1;
                if attempt > self.timing.max_retries {
                    self.pending = None;
                    log::error!(
                        "Route source still not attached after {} retries, dropping update",
                        self.timing.max_retries
                    );
                    return SyncOutcome::GaveUp;
                }

                log::warn!(
                    "Route source not attached, retrying in {:?} (attempt {})",
                    self.timing.retry_delay,
                    attempt
                );
                self.pending = Some(Pending {
                    due: now + self.timing.retry_delay,
                    attempts: attempt,
                });
                SyncOutcome::Retrying { attempt }
            }
        }
    }
}
