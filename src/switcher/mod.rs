// src/switcher/mod.rs
//! Pool switching
//!
//! - [`policy`]: ranking and the hysteresis rule deciding on a pool order
//! - [`control`]: the cycle driving feeds, rating, policy and rig
//! - [`observer`]: audit trail of everything the switcher decides

/// Switch decision policy
pub mod policy;

/// Control loop
pub mod control;

/// Decision observers
pub mod observer;

pub use control::{ControlLoop, CycleReport, LoopOptions, LoopState, RigStatus, fetch_ranking};
pub use observer::{LogObserver, NullObserver, RecordingObserver, SwitchEvent, SwitchObserver};
pub use policy::{Decision, KeepReason, SwitchPolicy, rank};
