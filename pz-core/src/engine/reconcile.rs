//! Settings diff
//!
//! Decides what a validated submission changes relative to the stored
//! params and whether the held lines must be re-requested.

use pz_protocol::UpdateOutcome;

use crate::data::{assign_missing_orders, sort_by_order, Params, Submission};

/// Params to adopt plus what changed
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub params: Params,
    pub outcome: UpdateOutcome,
}

/// Diff a submission against the stored params
///
/// Pins are matched by physical number. Order or enable changes need a
/// reinit; notes alone do not. A polarity change disables every pin so
/// nothing is driven until the user re-enables zones for the new wiring.
pub fn reconcile(stored: &Params, submission: Submission) -> Reconciled {
    let mut pins = assign_missing_orders(submission.pins);
    sort_by_order(&mut pins);

    let mut outcome = UpdateOutcome::default();

    if pins.len() != stored.pins.len() {
        outcome.changed = true;
        outcome.reinit = true;
    } else {
        for old in &stored.pins {
            match pins.iter().find(|p| p.pin == old.pin) {
                None => {
                    outcome.changed = true;
                    outcome.reinit = true;
                }
                Some(new) => {
                    if new.order != old.order || new.enabled != old.enabled {
                        outcome.changed = true;
                        outcome.reinit = true;
                    } else if new.notes != old.notes {
                        outcome.changed = true;
                    }
                }
            }
        }
    }

    if submission.active != stored.active {
        outcome.changed = true;
        outcome.reinit = true;
        for pin in &mut pins {
            pin.enabled = false;
        }
    }

    // Carry unknown fields over from the stored record
    for pin in &mut pins {
        if let Some(old) = stored.pin(pin.pin) {
            pin.extra = old.extra.clone();
        }
    }

    let params = Params {
        active: submission.active,
        pins,
        extra: stored.extra.clone(),
    };

    Reconciled { params, outcome }
}
