//! Line lifecycle
//!
//! Tracks which hardware lines this process holds. Lines are only ever
//! requested by `init_all` and only ever given back by `release_all` (or on
//! drop), so the held table always matches what the backend thinks we own.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::timing::LINE_REQUEST_SETTLE;
use crate::data::{gpio_pins, Level, Params};
use crate::error::{PinzoneError, Result};
use crate::hw::{Direction, LineClient, PinMap};

/// A line currently requested as an output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHandle {
    pub line: u32,
    pub physical: u8,
}

/// Outcome of releasing every held line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub released: Vec<u32>,
    pub failed: Vec<(u32, String)>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the line client and the table of held lines
pub struct LineManager<C: LineClient> {
    client: C,
    held: BTreeMap<u32, LineHandle>,
    settle: Duration,
}

impl<C: LineClient> LineManager<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            held: BTreeMap::new(),
            settle: LINE_REQUEST_SETTLE,
        }
    }

    /// Pause after each request (zero disables it)
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.client.name()
    }

    pub fn held_lines(&self) -> Vec<u32> {
        self.held.keys().copied().collect()
    }

    pub fn is_held(&self, line: u32) -> bool {
        self.held.contains_key(&line)
    }

    pub fn handle(&self, line: u32) -> Option<LineHandle> {
        self.held.get(&line).copied()
    }

    /// Release every held line
    ///
    /// Keeps going past failures; every line leaves the table either way.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        let held = std::mem::take(&mut self.held);

        for (line, handle) in held {
            match self.client.release_line(line) {
                Ok(()) => {
                    debug!("Released GPIO{} (pin {})", line, handle.physical);
                    report.released.push(line);
                }
                Err(e) => {
                    warn!("Failed to release GPIO{} (pin {}): {}", line, handle.physical, e);
                    report.failed.push((line, e.to_string()));
                }
            }
        }

        if !report.released.is_empty() || !report.failed.is_empty() {
            info!(
                "Released {} line(s), {} failure(s)",
                report.released.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Release everything, then request every enabled GPIO-capable pin
    ///
    /// Pins are walked in header order. A pin with no hardware line is
    /// skipped; the first request failure stops the walk and is returned.
    pub fn init_all(&mut self, params: &Params, pin_map: &PinMap) -> Result<()> {
        self.release_all();

        for cap in gpio_pins() {
            if !params.is_enabled(cap.physical) {
                continue;
            }

            let Some(line) = pin_map.line(cap.physical) else {
                warn!("Pin {} ({}) has no hardware line, skipping", cap.physical, cap.label);
                continue;
            };

            self.client.request_line(line, Direction::Out)?;
            self.held.insert(line, LineHandle { line, physical: cap.physical });
            debug!("Requested GPIO{} for pin {}", line, cap.physical);

            if !self.settle.is_zero() {
                thread::sleep(self.settle);
            }
        }

        info!("Holding {} line(s) via {} backend", self.held.len(), self.client.name());
        Ok(())
    }

    /// Drive a held line
    pub fn write(&mut self, line: u32, level: Level) -> Result<()> {
        if !self.held.contains_key(&line) {
            return Err(PinzoneError::LineWrite {
                line,
                reason: "line is not held".into(),
            });
        }
        self.client.write_line(line, level)
    }
}

impl<C: LineClient> Drop for LineManager<C> {
    fn drop(&mut self) {
        if !self.held.is_empty() {
            debug!("Line manager dropped with {} held line(s), releasing", self.held.len());
            self.release_all();
        }
    }
}
