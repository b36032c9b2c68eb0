//! Settings form parsing and validation
//!
//! The settings page posts `notes_i`, `enable_i`, `order_i` for each header
//! position `i` in 1-40 plus a single `active` field. This turns that flat map
//! into a candidate pin list, rejecting anything that must not reach storage.

use std::collections::BTreeMap;

use crate::error::{PinzoneError, Result};

use super::orders::duplicate_orders;
use super::pin_table::{gpio_pin_count, PIN_TABLE};
use super::types::{PinConfig, Polarity};

/// A validated form submission
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub active: Polarity,
    /// One entry per GPIO-capable pin, in header order
    pub pins: Vec<PinConfig>,
}

impl Submission {
    /// Parse and validate a raw settings form
    ///
    /// Fails on a missing/unknown `active`, malformed or out-of-range orders,
    /// orders on power/ground pins, and duplicate orders (all duplicated values
    /// are reported). Nothing is mutated on failure.
    pub fn from_form(form: &BTreeMap<String, String>) -> Result<Self> {
        let active_raw = form
            .get("active")
            .ok_or_else(|| PinzoneError::form_field("active", "missing"))?;
        let active = Polarity::parse(active_raw)
            .ok_or_else(|| {
                PinzoneError::form_field(
                    "active",
                    format!("expected high or low, got '{}'", active_raw),
                )
            })?;

        let max_order = gpio_pin_count() as u32;
        let mut pins = Vec::with_capacity(max_order as usize);

        for cap in PIN_TABLE.iter() {
            let i = cap.physical;
            let order = parse_order(form, i, max_order)?;

            if !cap.gpio_capable {
                if order.is_some() {
                    return Err(PinzoneError::form_field(
                        format!("order_{}", i),
                        format!("pin {} is {} and cannot drive a zone", i, cap.label),
                    ));
                }
                continue;
            }

            pins.push(PinConfig {
                pin: i,
                notes: form.get(&format!("notes_{}", i)).cloned().unwrap_or_default(),
                enabled: form.get(&format!("enable_{}", i)).map(|v| v == "on").unwrap_or(false),
                order,
                extra: Default::default(),
            });
        }

        let duplicates = duplicate_orders(&pins);
        if !duplicates.is_empty() {
            return Err(PinzoneError::DuplicateOrder { values: duplicates });
        }

        Ok(Self { active, pins })
    }
}

fn parse_order(form: &BTreeMap<String, String>, pin: u8, max_order: u32) -> Result<Option<u32>> {
    let field = format!("order_{}", pin);
    let raw = match form.get(&field).map(|v| v.trim()) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let order: u32 = raw
        .parse()
        .map_err(|_| PinzoneError::form_field(&field, format!("'{}' is not a whole number", raw)))?;

    if order == 0 || order > max_order {
        return Err(PinzoneError::form_field(
            &field,
            format!("{} is outside 1-{}", order, max_order),
        ));
    }

    Ok(Some(order))
}
