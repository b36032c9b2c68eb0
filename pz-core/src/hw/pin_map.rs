//! Physical header pin to hardware line mapping

use std::collections::BTreeMap;

use crate::constants::pins::LINE_UNAVAILABLE;
use crate::data::PIN_TABLE;

/// Lookup from physical header number to platform line number
///
/// A missing entry or line `0` means the pin has no usable line here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMap {
    lines: BTreeMap<u8, u32>,
}

impl PinMap {
    /// Map derived from the header labels (`GPIOn` -> `base + n`)
    ///
    /// Kernels that number SoC lines from a non-zero base (e.g. 512) need
    /// that base passed in.
    pub fn from_labels(base: u32) -> Self {
        let lines = PIN_TABLE
            .iter()
            .filter_map(|cap| Some((cap.physical, cap.soc_line()?.checked_add(base)?)))
            .collect();
        Self { lines }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u8, u32)>) -> Self {
        Self { lines: pairs.into_iter().collect() }
    }

    /// Hardware line for a physical pin
    pub fn line(&self, physical: u8) -> Option<u32> {
        self.lines
            .get(&physical)
            .copied()
            .filter(|line| *line != LINE_UNAVAILABLE)
    }

    /// Physical pin driving a hardware line
    pub fn physical(&self, line: u32) -> Option<u8> {
        if line == LINE_UNAVAILABLE {
            return None;
        }
        self.lines.iter().find(|(_, l)| **l == line).map(|(p, _)| *p)
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::from_labels(0)
    }
}
