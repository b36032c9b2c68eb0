//! Physical header layout of the 40-pin Raspberry Pi connector
//!
//! Single source of truth for which header positions carry a general-purpose
//! line. Power and ground positions can never be given an order.

use crate::constants::pins::GPIO_LABEL_PREFIX;

/// Static capability of one header position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinCapability {
    pub physical: u8,
    pub gpio_capable: bool,
    pub label: &'static str,
}

impl PinCapability {
    /// SoC line number encoded in the label (`GPIO17` -> 17)
    pub fn soc_line(&self) -> Option<u32> {
        if !self.gpio_capable {
            return None;
        }
        self.label.strip_prefix(GPIO_LABEL_PREFIX)?.parse().ok()
    }
}

const fn pin(physical: u8, gpio_capable: bool, label: &'static str) -> PinCapability {
    PinCapability { physical, gpio_capable, label }
}

pub static PIN_TABLE: [PinCapability; 40] = [
    pin(1, false, "3.3V"),
    pin(2, false, "5V"),
    pin(3, true, "GPIO2"),
    pin(4, false, "5V"),
    pin(5, true, "GPIO3"),
    pin(6, false, "GND"),
    pin(7, true, "GPIO4"),
    pin(8, true, "GPIO14"),
    pin(9, false, "GND"),
    pin(10, true, "GPIO15"),
    pin(11, true, "GPIO17"),
    pin(12, true, "GPIO18"),
    pin(13, true, "GPIO27"),
    pin(14, false, "GND"),
    pin(15, true, "GPIO22"),
    pin(16, true, "GPIO23"),
    pin(17, false, "3.3V"),
    pin(18, true, "GPIO24"),
    pin(19, true, "GPIO10"),
    pin(20, false, "GND"),
    pin(21, true, "GPIO9"),
    pin(22, true, "GPIO25"),
    pin(23, true, "GPIO11"),
    pin(24, true, "GPIO8"),
    pin(25, false, "GND"),
    pin(26, true, "GPIO7"),
    pin(27, true, "GPIO0"),
    pin(28, true, "GPIO1"),
    pin(29, true, "GPIO5"),
    pin(30, false, "GND"),
    pin(31, true, "GPIO6"),
    pin(32, true, "GPIO12"),
    pin(33, true, "GPIO13"),
    pin(34, false, "GND"),
    pin(35, true, "GPIO19"),
    pin(36, true, "GPIO16"),
    pin(37, true, "GPIO26"),
    pin(38, true, "GPIO20"),
    pin(39, false, "GND"),
    pin(40, true, "GPIO21"),
];

/// Capability of a physical pin, `None` outside 1-40
pub fn capability(physical: u8) -> Option<&'static PinCapability> {
    PIN_TABLE.get(usize::from(physical).checked_sub(1)?)
}

pub fn is_gpio_capable(physical: u8) -> bool {
    capability(physical).map(|c| c.gpio_capable).unwrap_or(false)
}

/// GPIO-capable pins in header order
pub fn gpio_pins() -> impl Iterator<Item = &'static PinCapability> {
    PIN_TABLE.iter().filter(|c| c.gpio_capable)
}

pub fn gpio_pin_count() -> usize {
    gpio_pins().count()
}
