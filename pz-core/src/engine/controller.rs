//! Zone controller
//!
//! Single owner of the params, the held lines and the last zone-state
//! vector. Every public operation takes the one lock for its whole critical
//! section; the only blocking outside the lock is waiting for startup to
//! finish.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use pz_protocol::{DaemonStatus, PinRow, SettingsView, UpdateOutcome};

use crate::data::{ParamStore, Params, Submission, PIN_TABLE};
use crate::error::Result;
use crate::hw::{LineClient, PinMap};

use super::lines::{LineManager, ReleaseReport};
use super::ready::ReadySignal;
use super::reconcile::reconcile;
use super::switcher::{sweep, SwitchReport};

struct Inner<C: LineClient> {
    params: Params,
    lines: LineManager<C>,
    stations: Vec<bool>,
}

/// Result of the shutdown finalizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Release finished within the grace period
    Released(ReleaseReport),
    /// Release still running when the grace period ran out
    TimedOut,
    /// The finalizer had already run
    AlreadyFinalized,
}

pub struct Controller<C: LineClient> {
    inner: Mutex<Inner<C>>,
    store: ParamStore,
    pin_map: PinMap,
    config_ready: ReadySignal,
    lines_ready: ReadySignal,
    finalized: AtomicBool,
}

impl<C: LineClient + 'static> Controller<C> {
    pub fn new(lines: LineManager<C>, store: ParamStore, pin_map: PinMap) -> Self {
        Self {
            inner: Mutex::new(Inner {
                params: Params::default(),
                lines,
                stations: Vec::new(),
            }),
            store,
            pin_map,
            config_ready: ReadySignal::new(),
            lines_ready: ReadySignal::new(),
            finalized: AtomicBool::new(false),
        }
    }

    /// Load params from disk and mark the config ready
    pub fn load(&self) -> Result<()> {
        let params = self.store.load()?;
        let mut inner = self.inner.lock();
        inner.params = params;
        drop(inner);

        self.config_ready.set();
        Ok(())
    }

    /// Request lines for every enabled pin and mark the lines ready
    pub fn init_lines(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let Inner { params, lines, .. } = &mut *inner;
        lines.init_all(params, &self.pin_map)?;
        drop(inner);

        self.lines_ready.set();
        Ok(())
    }

    pub fn params(&self) -> Params {
        self.inner.lock().params.clone()
    }

    pub fn stations(&self) -> Vec<bool> {
        self.inner.lock().stations.clone()
    }

    /// Apply a new zone-state vector
    ///
    /// Blocks until both the first load and the first line init have
    /// happened.
    pub fn zone_change(&self, stations: Vec<bool>) -> SwitchReport {
        self.config_ready.wait();
        self.lines_ready.wait();

        let mut inner = self.inner.lock();
        let Inner { params, lines, stations: current } = &mut *inner;
        *current = stations;

        let report = sweep(current, params, &self.pin_map, lines);
        debug!(
            "Zone change: {} written, {} skipped, {} failed",
            report.writes.len(),
            report.skips.len(),
            report.failures.len()
        );
        report
    }

    /// All 40 header rows as shown on the settings page
    pub fn settings_view(&self) -> SettingsView {
        let inner = self.inner.lock();
        let pins = PIN_TABLE
            .iter()
            .map(|cap| {
                let cfg = inner.params.pin(cap.physical);
                PinRow {
                    pin: cap.physical,
                    label: cap.label.to_string(),
                    gpio_capable: cap.gpio_capable,
                    line: self.pin_map.line(cap.physical),
                    notes: cfg.map(|c| c.notes.clone()).unwrap_or_default(),
                    enabled: cfg.map(|c| c.enabled).unwrap_or(false),
                    order: cfg.and_then(|c| c.order),
                }
            })
            .collect();

        SettingsView {
            active: inner.params.active.to_string(),
            pins,
        }
    }

    /// Validate and apply a settings form
    ///
    /// Validation errors leave everything untouched. When a reinit is
    /// needed and fails, the new params stay in memory but are not saved.
    pub fn apply_settings(&self, form: &BTreeMap<String, String>) -> Result<UpdateOutcome> {
        let submission = Submission::from_form(form)?;

        let mut inner = self.inner.lock();
        let reconciled = reconcile(&inner.params, submission);
        let outcome = reconciled.outcome;
        info!("Settings update: changed={}, reinit={}", outcome.changed, outcome.reinit);

        if !outcome.changed {
            return Ok(outcome);
        }

        inner.params = reconciled.params;

        if outcome.reinit {
            let Inner { params, lines, .. } = &mut *inner;
            if let Err(e) = lines.init_all(params, &self.pin_map) {
                error!("Line init after settings change failed: {}", e);
                return Err(e);
            }
            self.lines_ready.set();
        }

        self.store.save(&inner.params)?;
        Ok(outcome)
    }

    pub fn status(&self) -> DaemonStatus {
        let inner = self.inner.lock();
        DaemonStatus {
            config_loaded: self.config_ready.is_set(),
            lines_ready: self.lines_ready.is_set(),
            held_lines: inner.lines.held_lines(),
            backend: inner.lines.backend_name().to_string(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    /// Release every held line, waiting at most `grace`
    ///
    /// Runs at most once; later calls return `AlreadyFinalized`. If the grace
    /// period runs out the release keeps going on its helper thread.
    pub fn shutdown(self: &Arc<Self>, grace: Duration) -> ShutdownOutcome {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return ShutdownOutcome::AlreadyFinalized;
        }

        info!("Releasing all GPIO lines (grace {:?})", grace);
        let (tx, rx) = mpsc::channel();
        let controller = Arc::clone(self);

        let spawned = thread::Builder::new()
            .name("pz-release".into())
            .spawn(move || {
                let report = controller.inner.lock().lines.release_all();
                let _ = tx.send(report);
            });

        if let Err(e) = spawned {
            // No helper thread; release inline instead of leaking lines
            warn!("Could not spawn release thread ({}), releasing inline", e);
            return ShutdownOutcome::Released(self.inner.lock().lines.release_all());
        }

        match rx.recv_timeout(grace) {
            Ok(report) => {
                info!(
                    "Released {} line(s), {} failure(s)",
                    report.released.len(),
                    report.failed.len()
                );
                ShutdownOutcome::Released(report)
            }
            Err(_) => {
                warn!("Line release did not finish within {:?}, giving up", grace);
                ShutdownOutcome::TimedOut
            }
        }
    }
}
