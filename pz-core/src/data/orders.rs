//! Order slot assignment
//!
//! Every GPIO-capable pin owns a 1-based "order" slot linking it to a zone.
//! Gaps are filled from the smallest unused slot; existing assignments never move.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::pin_table::is_gpio_capable;
use super::types::PinConfig;

/// Fill missing orders for GPIO-capable pins
///
/// The free pool is `1..=N` (N = GPIO-capable pins in `pins`) minus the orders
/// already in use, consumed in ascending order while walking `pins` in their
/// given sequence. Power and ground pins are left untouched.
pub fn assign_missing_orders(mut pins: Vec<PinConfig>) -> Vec<PinConfig> {
    let capable = pins.iter().filter(|p| is_gpio_capable(p.pin)).count() as u32;
    let used: BTreeSet<u32> = pins.iter().filter_map(|p| p.order).collect();
    let mut available = (1..=capable).filter(|o| !used.contains(o));

    for pin in pins.iter_mut() {
        if pin.order.is_some() || !is_gpio_capable(pin.pin) {
            continue;
        }
        match available.next() {
            Some(order) => {
                debug!("Assigned order {} to pin {}", order, pin.pin);
                pin.order = Some(order);
            }
            None => {
                // Only reachable when stored orders fall outside 1..=N
                warn!("No free order slot left for pin {}", pin.pin);
            }
        }
    }

    pins
}

/// Sort pins by order, unassigned last
pub fn sort_by_order(pins: &mut [PinConfig]) {
    pins.sort_by_key(|p| (p.order.is_none(), p.order));
}

/// Order values used by more than one pin, ascending
pub fn duplicate_orders(pins: &[PinConfig]) -> Vec<u32> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for order in pins.iter().filter_map(|p| p.order) {
        *counts.entry(order).or_default() += 1;
    }

    let mut duplicates: Vec<u32> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(order, _)| order)
        .collect();
    duplicates.sort_unstable();
    duplicates
}
