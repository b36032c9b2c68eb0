//! Relay switching
//!
//! Turns a zone-state vector into line writes. Slot `s` of the vector drives
//! the pin whose order is `s + 1`.

use std::fmt;
use tracing::{debug, warn};

use pz_protocol::SwitchSummary;

use crate::data::{Level, Params, Polarity};
use crate::hw::{LineClient, PinMap};

use super::lines::LineManager;

/// Level that puts a relay in the commanded state
///
/// Low-active boards invert: on+low -> LOW, off+low -> HIGH.
pub fn drive_level(on: bool, active: Polarity) -> Level {
    Level::from_high(on ^ (active == Polarity::Low))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No pin carries this slot's order
    NoPin,
    /// The pin has no hardware line on this platform
    Unmapped,
    Disabled,
    /// Enabled but never requested (init failed or has not run)
    NotHeld,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoPin => "no pin for slot",
            SkipReason::Unmapped => "no hardware line",
            SkipReason::Disabled => "disabled",
            SkipReason::NotHeld => "line not held",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchWrite {
    pub slot: usize,
    pub physical: u8,
    pub line: u32,
    pub level: Level,
}

/// What one sweep did, slot by slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchReport {
    pub writes: Vec<SwitchWrite>,
    pub skips: Vec<(usize, SkipReason)>,
    pub failures: Vec<(u32, String)>,
}

impl SwitchReport {
    pub fn summary(&self) -> SwitchSummary {
        SwitchSummary {
            written: self.writes.len(),
            skipped: self.skips.len(),
            failed: self.failures.len(),
        }
    }
}

/// Apply a zone-state vector to the held lines
///
/// A write failure is logged and the sweep moves on to the next slot.
pub fn sweep<C: LineClient>(
    stations: &[bool],
    params: &Params,
    pin_map: &PinMap,
    lines: &mut LineManager<C>,
) -> SwitchReport {
    let mut report = SwitchReport::default();

    for (slot, &on) in stations.iter().enumerate() {
        let Some(pin) = params.pin_with_order(slot as u32 + 1) else {
            report.skips.push((slot, SkipReason::NoPin));
            continue;
        };

        let Some(line) = pin_map.line(pin.pin) else {
            report.skips.push((slot, SkipReason::Unmapped));
            continue;
        };

        if !pin.enabled {
            report.skips.push((slot, SkipReason::Disabled));
            continue;
        }

        if !lines.is_held(line) {
            warn!("Zone {} -> pin {}: GPIO{} is not held, skipping", slot + 1, pin.pin, line);
            report.skips.push((slot, SkipReason::NotHeld));
            continue;
        }

        let level = drive_level(on, params.active);
        match lines.write(line, level) {
            Ok(()) => {
                let state = if on { "on" } else { "off" };
                debug!("Zone {} {} -> pin {} GPIO{} {}", slot + 1, state, pin.pin, line, level);
                report.writes.push(SwitchWrite { slot, physical: pin.pin, line, level });
            }
            Err(e) => {
                warn!("Zone {} -> GPIO{} write failed: {}", slot + 1, line, e);
                report.failures.push((line, e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PinConfig;
    use crate::hw::{MemoryLineClient, MockLineClient};
    use mockall::predicate::eq;
    use std::time::Duration;

    #[test]
    fn test_truth_table() {
        assert_eq!(drive_level(true, Polarity::Low), Level::Low);
        assert_eq!(drive_level(true, Polarity::High), Level::High);
        assert_eq!(drive_level(false, Polarity::Low), Level::High);
        assert_eq!(drive_level(false, Polarity::High), Level::Low);
    }

    fn two_zone_params(active: Polarity) -> Params {
        Params::new(
            active,
            vec![
                PinConfig::new(11).with_order(Some(1)).enabled(true),
                PinConfig::new(13).with_order(Some(2)).enabled(false),
            ],
        )
    }

    #[test]
    fn test_sweep_writes_enabled_and_skips_disabled() {
        let mut client = MockLineClient::new();
        client.expect_name().return_const("mock");
        client
            .expect_request_line()
            .with(eq(17), eq(crate::hw::Direction::Out))
            .times(1)
            .returning(|_, _| Ok(()));
        client
            .expect_write_line()
            .with(eq(17), eq(Level::Low))
            .times(1)
            .returning(|_, _| Ok(()));
        client.expect_release_line().returning(|_| Ok(()));

        let params = two_zone_params(Polarity::Low);
        let map = PinMap::default();
        let mut lines = LineManager::new(client).with_settle_delay(Duration::ZERO);
        lines.init_all(&params, &map).unwrap();

        let report = sweep(&[true, false], &params, &map, &mut lines);
        assert_eq!(report.writes.len(), 1);
        assert_eq!(report.skips, vec![(1, SkipReason::Disabled)]);
    }

    #[test]
    fn test_sweep_high_polarity() {
        let client = MemoryLineClient::new();
        let params = two_zone_params(Polarity::High);
        let map = PinMap::default();
        let mut lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);
        lines.init_all(&params, &map).unwrap();

        sweep(&[true], &params, &map, &mut lines);
        sweep(&[false], &params, &map, &mut lines);
        assert_eq!(client.writes(), vec![(17, Level::High), (17, Level::Low)]);
    }

    #[test]
    fn test_sweep_skips_missing_slots_and_unheld_lines() {
        let client = MemoryLineClient::new();
        let params = two_zone_params(Polarity::Low);
        let map = PinMap::default();
        // never initialized, so nothing is held
        let mut lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);

        let report = sweep(&[true, true, true], &params, &map, &mut lines);
        assert_eq!(
            report.skips,
            vec![(0, SkipReason::NotHeld), (1, SkipReason::Disabled), (2, SkipReason::NoPin)]
        );
        assert!(client.writes().is_empty());
        assert_eq!(report.summary(), SwitchSummary { written: 0, skipped: 3, failed: 0 });
    }

    #[test]
    fn test_sweep_skips_pin_without_hardware_line() {
        let client = MemoryLineClient::new();
        let params = two_zone_params(Polarity::Low);
        // Board where pin 11 is not wired to any line
        let map = PinMap::from_pairs([(13, 27)]);
        let mut lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);
        lines.init_all(&params, &map).unwrap();

        let report = sweep(&[true], &params, &map, &mut lines);
        assert_eq!(report.skips, vec![(0, SkipReason::Unmapped)]);
        assert!(report.writes.is_empty());
        assert!(client.writes().is_empty());
        assert!(client.held().is_empty());
    }

    #[test]
    fn test_sweep_continues_after_write_failure() {
        let client = MemoryLineClient::new();
        let params = Params::new(
            Polarity::Low,
            vec![
                PinConfig::new(11).with_order(Some(1)).enabled(true),
                PinConfig::new(13).with_order(Some(2)).enabled(true),
            ],
        );
        let map = PinMap::default();
        let mut lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);
        lines.init_all(&params, &map).unwrap();
        client.fail_write(17);

        let report = sweep(&[true, true], &params, &map, &mut lines);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 17);
        assert_eq!(client.level(27), Some(Level::Low));
    }
}
