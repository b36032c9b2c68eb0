//! Pinzone Core Library
//!
//! Maps irrigation zones onto the relays wired to a 40-pin GPIO header.
//!
//! # Features
//!
//! - **Pin Table**: Fixed 40-pin header layout with GPIO capability per pin
//! - **Zone Orders**: Each GPIO pin gets a 1-based zone slot, gaps filled automatically
//! - **Persistence**: Atomic JSON storage that keeps fields it does not know about
//! - **Line Lifecycle**: Request, drive and release lines through a pluggable backend
//! - **Settings**: Form validation and a diff that decides when lines must be re-requested
//!
//! # Module Structure
//!
//! - `data/` - Data types, pin table, orders, persistence, form validation
//! - `hw/` - Line clients (GPIO daemon, sysfs, in-memory) and pin mapping
//! - `engine/` - Line manager, relay switcher, reconciler, controller
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pz_core::{Controller, LineManager, MemoryLineClient, ParamStore, PinMap};
//!
//! let lines = LineManager::new(MemoryLineClient::new());
//! let store = ParamStore::new("/tmp/40pin.json");
//! let controller = Arc::new(Controller::new(lines, store, PinMap::default()));
//! controller.load().unwrap();
//! controller.init_lines().unwrap();
//! controller.zone_change(vec![true, false]);
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;

// Re-export data types
pub use data::{
    assign_missing_orders, capability, duplicate_orders, gpio_pin_count, gpio_pins,
    is_gpio_capable, sort_by_order, Level, ParamStore, Params, PinCapability, PinConfig, Polarity,
    Submission, PIN_TABLE,
};

// Re-export error types
pub use error::{PinzoneError, Result};

// Re-export engine types
pub use engine::{
    drive_level, reconcile, sweep, Controller, LineHandle, LineManager, ReadySignal, Reconciled,
    ReleaseReport, ShutdownOutcome, SkipReason, SwitchReport, SwitchWrite,
};

// Re-export hardware types
pub use hw::{
    BackendConfig, BackendKind, Direction, GpioBackend, GpioDaemonClient, LineClient, LineOp,
    MemoryLineClient, PinMap, SysfsGpio,
};
