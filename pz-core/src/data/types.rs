//! Core data types for pinzone
//!
//! These mirror the persisted JSON record:
//! `{ "active": "high"|"low", "pins": [ { "pin", "notes", "enabled", "order" } ] }`.
//! Unknown fields are kept in `extra` so a load/save cycle never drops them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Electrical level that means "zone on"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Relay energizes when the line is driven high
    High,
    /// Relay energizes when the line is driven low (most opto-isolated boards)
    #[default]
    Low,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::High => "high",
            Polarity::Low => "low",
        }
    }

    /// Parse the form/JSON spelling ("high" / "low")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "high" => Some(Polarity::High),
            "low" => Some(Polarity::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Electrical level written to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_high(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }

    /// Wire value (0 or 1)
    pub fn as_u8(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "LOW",
            Level::High => "HIGH",
        })
    }
}

/// User configuration for one physical header pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Physical header number (1-40)
    pub pin: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub enabled: bool,
    /// 1-based zone slot; zone index `s` drives the pin with `order == s + 1`
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PinConfig {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            notes: String::new(),
            enabled: false,
            order: None,
            extra: Map::new(),
        }
    }

    pub fn with_order(mut self, order: Option<u32>) -> Self {
        self.order = order;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Persisted plugin parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub active: Polarity,
    /// Sorted by order, unassigned last
    #[serde(default)]
    pub pins: Vec<PinConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Params {
    pub fn new(active: Polarity, pins: Vec<PinConfig>) -> Self {
        Self {
            active,
            pins,
            extra: Map::new(),
        }
    }

    /// Config for a physical pin
    pub fn pin(&self, physical: u8) -> Option<&PinConfig> {
        self.pins.iter().find(|p| p.pin == physical)
    }

    /// Pin bound to a 1-based zone slot
    pub fn pin_with_order(&self, order: u32) -> Option<&PinConfig> {
        self.pins.iter().find(|p| p.order == Some(order))
    }

    /// Whether a physical pin is marked enabled (unknown pins are not)
    pub fn is_enabled(&self, physical: u8) -> bool {
        self.pin(physical).map(|p| p.enabled).unwrap_or(false)
    }

    pub fn enabled_pins(&self) -> impl Iterator<Item = &PinConfig> {
        self.pins.iter().filter(|p| p.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_parse() {
        assert_eq!(Polarity::parse("high"), Some(Polarity::High));
        assert_eq!(Polarity::parse(" low "), Some(Polarity::Low));
        assert_eq!(Polarity::parse("HIGH"), None);
        assert_eq!(Polarity::default(), Polarity::Low);
    }

    #[test]
    fn test_pin_config_null_order() {
        let pin: PinConfig =
            serde_json::from_str(r#"{"pin":7,"notes":"","enabled":true,"order":null}"#).unwrap();
        assert_eq!(pin.order, None);
        assert!(pin.enabled);

        let json = serde_json::to_value(&pin).unwrap();
        assert!(json["order"].is_null());
    }

    #[test]
    fn test_params_keeps_unknown_fields() {
        let raw = r#"{"active":"high","pins":[{"pin":11,"notes":"front","enabled":false,"order":2,"wire":"red"}],"relays":8}"#;
        let params: Params = serde_json::from_str(raw).unwrap();
        assert_eq!(params.active, Polarity::High);
        assert_eq!(params.extra.get("relays"), Some(&Value::from(8)));
        assert_eq!(params.pins[0].extra.get("wire"), Some(&Value::from("red")));

        let back: Value = serde_json::to_value(&params).unwrap();
        assert_eq!(back, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn test_params_lookup() {
        let params = Params::new(
            Polarity::Low,
            vec![
                PinConfig::new(11).with_order(Some(1)).enabled(true),
                PinConfig::new(13).with_order(Some(2)),
            ],
        );
        assert_eq!(params.pin_with_order(2).map(|p| p.pin), Some(13));
        assert!(params.pin_with_order(3).is_none());
        assert!(params.is_enabled(11));
        assert!(!params.is_enabled(13));
        assert!(!params.is_enabled(40));
    }
}
