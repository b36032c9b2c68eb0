//! Backend selection
//!
//! The line backend is picked once at startup and never changes while the
//! daemon runs.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{client::DEFAULT_CLIENT_ID, paths};
use crate::data::Level;
use crate::error::{PinzoneError, Result};

use super::client::{Direction, LineClient};
use super::memory::MemoryLineClient;
use super::remote::GpioDaemonClient;
use super::sysfs::SysfsGpio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Separate GPIO line daemon over a Unix socket
    #[default]
    Remote,
    /// Kernel `/sys/class/gpio` interface
    Sysfs,
    /// In-process recorder, touches no hardware
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Remote => "remote",
            BackendKind::Sysfs => "sysfs",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = PinzoneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(BackendKind::Remote),
            "sysfs" => Ok(BackendKind::Sysfs),
            "memory" => Ok(BackendKind::Memory),
            other => Err(PinzoneError::config(format!(
                "unknown backend '{}' (expected remote, sysfs or memory)",
                other
            ))),
        }
    }
}

/// Everything needed to build a backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub gpio_socket: PathBuf,
    pub sysfs_root: PathBuf,
    pub client_id: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            gpio_socket: PathBuf::from(paths::GPIO_DAEMON_SOCKET),
            sysfs_root: PathBuf::from(paths::SYSFS_GPIO_ROOT),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

/// The concrete line client in use
pub enum GpioBackend {
    Remote(GpioDaemonClient),
    Sysfs(SysfsGpio),
    Memory(MemoryLineClient),
}

impl GpioBackend {
    pub fn from_config(config: &BackendConfig) -> Self {
        match config.kind {
            BackendKind::Remote => {
                let client = GpioDaemonClient::new(&config.gpio_socket, config.client_id.as_str());
                GpioBackend::Remote(client)
            }
            BackendKind::Sysfs => GpioBackend::Sysfs(SysfsGpio::new(&config.sysfs_root)),
            BackendKind::Memory => GpioBackend::Memory(MemoryLineClient::new()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            GpioBackend::Remote(_) => BackendKind::Remote,
            GpioBackend::Sysfs(_) => BackendKind::Sysfs,
            GpioBackend::Memory(_) => BackendKind::Memory,
        }
    }

    fn inner(&mut self) -> &mut dyn LineClient {
        match self {
            GpioBackend::Remote(c) => c,
            GpioBackend::Sysfs(c) => c,
            GpioBackend::Memory(c) => c,
        }
    }
}

impl LineClient for GpioBackend {
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn request_line(&mut self, line: u32, direction: Direction) -> Result<()> {
        self.inner().request_line(line, direction)
    }

    fn release_line(&mut self, line: u32) -> Result<()> {
        self.inner().release_line(line)
    }

    fn write_line(&mut self, line: u32, level: Level) -> Result<()> {
        self.inner().write_line(line, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!("remote".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert_eq!("SYSFS".parse::<BackendKind>().unwrap(), BackendKind::Sysfs);
        assert_eq!(" memory ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("gpiod".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_from_config_picks_variant() {
        let config = BackendConfig { kind: BackendKind::Memory, ..BackendConfig::default() };
        let mut backend = GpioBackend::from_config(&config);
        assert_eq!(backend.name(), "memory");

        backend.request_line(17, Direction::Out).unwrap();
        backend.write_line(17, Level::High).unwrap();
        match &backend {
            GpioBackend::Memory(mem) => assert_eq!(mem.level(17), Some(Level::High)),
            _ => panic!("expected memory backend"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.kind, BackendKind::Remote);
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(GpioBackend::from_config(&config).name(), "remote");
    }
}
