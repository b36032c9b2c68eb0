//! Line client abstraction
//!
//! Everything above this trait talks about hardware line numbers only; how a
//! line is claimed and driven is up to the backend chosen at startup.

use crate::data::Level;
use crate::error::Result;

pub use pz_protocol::Direction;

/// Request, release and drive hardware lines
///
/// Implementations report a refused operation (busy line, daemon said no) as
/// an error carrying the backend's message.
#[cfg_attr(test, mockall::automock)]
pub trait LineClient: Send {
    /// Short backend name for logs and status
    fn name(&self) -> &'static str;

    /// Claim exclusive ownership of a line
    fn request_line(&mut self, line: u32, direction: Direction) -> Result<()>;

    /// Give up ownership of a line
    fn release_line(&mut self, line: u32) -> Result<()>;

    /// Drive a previously requested output line
    fn write_line(&mut self, line: u32, level: Level) -> Result<()>;
}
