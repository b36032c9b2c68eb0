//! Zone engine
//!
//! Line lifecycle, relay switching, settings reconciliation and the
//! controller that ties them together.

mod controller;
mod lines;
mod ready;
mod reconcile;
mod switcher;

pub use controller::{Controller, ShutdownOutcome};
pub use lines::{LineHandle, LineManager, ReleaseReport};
pub use ready::ReadySignal;
pub use reconcile::{reconcile, Reconciled};
pub use switcher::{drive_level, sweep, SkipReason, SwitchReport, SwitchWrite};
