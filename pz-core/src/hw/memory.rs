//! In-process line backend
//!
//! Records every operation instead of touching hardware. Used for dry runs of
//! the daemon and as the hardware stand-in for scenario tests; faults can be
//! injected per line.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::data::Level;
use crate::error::{PinzoneError, Result};

use super::client::{Direction, LineClient};

/// One recorded backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    Request(u32),
    Release(u32),
    Write(u32, Level),
}

#[derive(Debug, Default)]
struct MemoryState {
    ops: Vec<LineOp>,
    held: BTreeSet<u32>,
    levels: BTreeMap<u32, Level>,
    fail_request: BTreeSet<u32>,
    fail_release: BTreeSet<u32>,
    fail_write: BTreeSet<u32>,
    release_delay: Option<Duration>,
}

/// Recording backend; clones share state so a test can keep a handle
#[derive(Debug, Clone, Default)]
pub struct MemoryLineClient {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLineClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_request(&self, line: u32) {
        self.state.lock().fail_request.insert(line);
    }

    pub fn fail_release(&self, line: u32) {
        self.state.lock().fail_release.insert(line);
    }

    pub fn fail_write(&self, line: u32) {
        self.state.lock().fail_write.insert(line);
    }

    /// Make every release block for `delay` (simulates a stuck backend)
    pub fn set_release_delay(&self, delay: Duration) {
        self.state.lock().release_delay = Some(delay);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.fail_request.clear();
        state.fail_release.clear();
        state.fail_write.clear();
        state.release_delay = None;
    }

    pub fn ops(&self) -> Vec<LineOp> {
        self.state.lock().ops.clone()
    }

    pub fn take_ops(&self) -> Vec<LineOp> {
        std::mem::take(&mut self.state.lock().ops)
    }

    pub fn writes(&self) -> Vec<(u32, Level)> {
        self.state
            .lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                LineOp::Write(line, level) => Some((*line, *level)),
                _ => None,
            })
            .collect()
    }

    pub fn held(&self) -> Vec<u32> {
        self.state.lock().held.iter().copied().collect()
    }

    /// Last level written to a line
    pub fn level(&self, line: u32) -> Option<Level> {
        self.state.lock().levels.get(&line).copied()
    }
}

impl LineClient for MemoryLineClient {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn request_line(&mut self, line: u32, direction: Direction) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(LineOp::Request(line));

        if state.fail_request.contains(&line) {
            return Err(PinzoneError::LineRequest { line, reason: "injected failure".into() });
        }
        if !state.held.insert(line) {
            return Err(PinzoneError::LineRequest {
                line,
                reason: "Device or resource busy".into(),
            });
        }

        debug!("memory: requested GPIO{} as {:?}", line, direction);
        Ok(())
    }

    fn release_line(&mut self, line: u32) -> Result<()> {
        let delay = {
            let mut state = self.state.lock();
            state.ops.push(LineOp::Release(line));
            state.release_delay
        };

        // Sleep without holding the lock so tests can still inspect state
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.fail_release.contains(&line) {
            return Err(PinzoneError::LineRelease { line, reason: "injected failure".into() });
        }
        state.held.remove(&line);
        state.levels.remove(&line);
        Ok(())
    }

    fn write_line(&mut self, line: u32, level: Level) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(LineOp::Write(line, level));

        if state.fail_write.contains(&line) {
            return Err(PinzoneError::LineWrite { line, reason: "injected failure".into() });
        }
        if !state.held.contains(&line) {
            return Err(PinzoneError::LineWrite { line, reason: "line not requested".into() });
        }

        state.levels.insert(line, level);
        Ok(())
    }
}
