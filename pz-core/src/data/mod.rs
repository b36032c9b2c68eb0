//! Data types, pin layout, persistence and form validation

mod form;
mod orders;
mod persistence;
mod pin_table;
mod types;

pub use form::Submission;
pub use orders::{assign_missing_orders, duplicate_orders, sort_by_order};
pub use persistence::ParamStore;
pub use pin_table::{
    capability, gpio_pin_count, gpio_pins, is_gpio_capable, PinCapability, PIN_TABLE,
};
pub use types::{Level, Params, PinConfig, Polarity};
