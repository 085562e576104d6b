// src/switcher/observer.rs
//! Decision audit trail
//!
//! Components report what they computed and decided as [`SwitchEvent`]s to
//! a [`SwitchObserver`] handed to them, instead of writing to a global
//! logger. [`LogObserver`] renders events through the `log` facade;
//! [`RecordingObserver`] keeps them in memory.

use crate::network::rig::RestartOutcome;
use crate::profit::rating::RatingBreakdown;
use crate::switcher::control::LoopState;
use std::sync::{Arc, Mutex};

/// Currency position in a cycle's ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    /// Currency tag
    pub id: String,
    /// Display name
    pub name: String,
    /// Final rating
    pub rating: f64,
    /// Unpenalized USD per day
    pub usd_per_day: f64,
}

/// Something the switcher computed, decided or ran into
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchEvent {
    /// The control loop moved between states
    StateChanged {
        /// State left
        from: LoopState,
        /// State entered
        to: LoopState,
    },
    /// The rig answered the status query
    RigStatus {
        /// Miner software version
        miner: String,
        /// Hash rate used for this cycle, H/s
        hash_rate: f64,
        /// Network difficulty of the coin being mined, if reported
        network_difficulty: Option<f64>,
    },
    /// The rig could not be queried; an older hash rate is used instead
    HashRateFallback {
        /// Hash rate used for this cycle, H/s
        hash_rate: f64,
        /// Why the rig's own figure was not used
        reason: String,
    },
    /// A live pool has a URL missing from the currency table
    UnknownPool {
        /// Pool URL
        url: String,
    },
    /// A currency was rated
    Rated(RatingBreakdown),
    /// All currencies of the cycle, best first
    Ranked(Vec<RankEntry>),
    /// No pool is visible, nothing to reorder
    NoPools,
    /// No pool is active yet; the ranking is applied as is
    Priming {
        /// Currency placed first
        top: String,
    },
    /// The best currency does not beat the active one by enough
    Held {
        /// Currently mined currency
        active: String,
        /// Best ranked currency
        candidate: String,
        /// Candidate rating over active rating
        ratio: f64,
        /// Configured switch threshold
        threshold: f64,
    },
    /// The best currency beats the active one by at least the threshold
    Switching {
        /// Currently mined currency
        active: String,
        /// Best ranked currency
        candidate: String,
        /// Candidate rating over active rating
        ratio: f64,
        /// Configured switch threshold
        threshold: f64,
    },
    /// A priority change was decided but changes are disabled
    PriorityChangeSkipped {
        /// Pool numbers that would have been submitted
        pool_indices: Vec<usize>,
    },
    /// The rig accepted a new pool order
    PriorityApplied {
        /// Pool numbers submitted, highest priority first
        pool_indices: Vec<usize>,
        /// Rig's status message
        message: String,
    },
    /// Restart requested before a pool change
    RigRestarting,
    /// The rig answers again after a restart
    RigRestarted {
        /// What the restart call reported
        outcome: RestartOutcome,
        /// Liveness probes sent before it answered
        attempts: u32,
    },
    /// A cycle was aborted
    CycleFailed {
        /// State in which the error was raised
        phase: LoopState,
        /// Rendered error
        error: String,
    },
}

/// Receiver of switcher events
pub trait SwitchObserver {
    /// Handles one event
    fn notify(&self, event: SwitchEvent);
}

impl<T: SwitchObserver + ?Sized> SwitchObserver for &T {
    fn notify(&self, event: SwitchEvent) {
        (**self).notify(event)
    }
}

impl<T: SwitchObserver + ?Sized> SwitchObserver for Arc<T> {
    fn notify(&self, event: SwitchEvent) {
        (**self).notify(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SwitchObserver for NullObserver {
    fn notify(&self, _event: SwitchEvent) {}
}

/// Keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SwitchEvent>>,
}

impl RecordingObserver {
    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<SwitchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl SwitchObserver for RecordingObserver {
    fn notify(&self, event: SwitchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SwitchObserver for LogObserver {
    fn notify(&self, event: SwitchEvent) {
        match event {
            SwitchEvent::StateChanged { from, to } => log::trace!("{:?} -> {:?}", from, to),
            SwitchEvent::RigStatus {
                miner,
                hash_rate,
                network_difficulty,
            } => {
                log::info!("Connected to miner v{}, hash rate {:.0} H/s", miner, hash_rate);
                if let Some(difficulty) = network_difficulty {
                    log::debug!("Active coin network difficulty {}", difficulty);
                }
            }
            SwitchEvent::HashRateFallback { hash_rate, reason } => {
                log::warn!("Rig status unavailable ({}), using hash rate {:.0} H/s", reason, hash_rate)
            }
            SwitchEvent::UnknownPool { url } => log::warn!("Unknown currency for pool {}", url),
            SwitchEvent::Rated(breakdown) => {
                log::debug!("{} original rating is {:.6}", breakdown.name, breakdown.base);
                for step in &breakdown.steps {
                    log::debug!(
                        "{} rating changed by {} by {:.2}% to {:.6}",
                        breakdown.name,
                        step.factor,
                        step.change * 100.0,
                        step.rating
                    );
                }
            }
            SwitchEvent::Ranked(entries) => {
                for (position, entry) in entries.iter().enumerate() {
                    log::info!(
                        "#{} {} ({}): rating {:.4}, {:.4} USD/day",
                        position + 1,
                        entry.name,
                        entry.id,
                        entry.rating,
                        entry.usd_per_day
                    );
                }
            }
            SwitchEvent::NoPools => log::error!("No live pools with a known currency"),
            SwitchEvent::Priming { top } => {
                log::info!("No active pool, applying ranking with {} first", top)
            }
            SwitchEvent::Held {
                active,
                candidate,
                ratio,
                threshold,
            } => log::info!(
                "Keeping {}: {} is only {:.3}x better (threshold {:.3})",
                active,
                candidate,
                ratio,
                threshold
            ),
            SwitchEvent::Switching {
                active,
                candidate,
                ratio,
                threshold,
            } => log::info!(
                "Switching from {} to {}: {:.3}x better (threshold {:.3})",
                active,
                candidate,
                ratio,
                threshold
            ),
            SwitchEvent::PriorityChangeSkipped { pool_indices } => {
                log::info!("Priority changes disabled, not submitting {:?}", pool_indices)
            }
            SwitchEvent::PriorityApplied {
                pool_indices,
                message,
            } => log::info!("Pool priority set to {:?}: {}", pool_indices, message),
            SwitchEvent::RigRestarting => log::info!("Restarting rig..."),
            SwitchEvent::RigRestarted { outcome, attempts } => {
                log::info!("Rig restarted ({:?}, {} probes)", outcome, attempts)
            }
            SwitchEvent::CycleFailed { phase, error } => {
                log::error!("Cycle failed in {:?}: {}", phase, error)
            }
        }
    }
}
