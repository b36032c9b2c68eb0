//! Constants and configuration values for pinzone
//!
//! Centralizes paths, timing and pin-related defaults so the daemon and
//! the library agree on them.

use std::time::Duration;

/// System paths
pub mod paths {
    use std::path::PathBuf;

    /// Data directory used when running as root
    pub const SYSTEM_DATA_DIR: &str = "/var/lib/pinzone";

    /// Persisted pin configuration file name
    pub const DATA_FILE: &str = "40pin.json";

    /// Control socket served by pinzoned
    pub const CONTROL_SOCKET: &str = "/run/pinzone.sock";

    /// Socket of the GPIO line daemon used by the remote backend
    pub const GPIO_DAEMON_SOCKET: &str = "/run/gpio-server.sock";

    /// Linux legacy GPIO sysfs class directory
    pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

    /// Default location of the persisted pin configuration
    ///
    /// Root uses the system data directory; other users get their XDG data dir
    /// so a dry run never needs privileges.
    pub fn default_data_file() -> PathBuf {
        // SAFETY: geteuid is always safe - it just returns the effective user ID of the process.
        let is_root = unsafe { libc::geteuid() } == 0;

        let dir = if is_root {
            PathBuf::from(SYSTEM_DATA_DIR)
        } else {
            dirs::data_local_dir()
                .map(|d| d.join("pinzone"))
                .unwrap_or_else(|| PathBuf::from(".").join("data"))
        };

        dir.join(DATA_FILE)
    }
}

/// Header pin layout
pub mod pins {
    /// Label prefix that marks a pin as GPIO-capable
    pub const GPIO_LABEL_PREFIX: &str = "GPIO";

    /// Marker for "no hardware line on this platform"
    pub const LINE_UNAVAILABLE: u32 = 0;
}

/// Identity presented to the GPIO line daemon
pub mod client {
    pub const DEFAULT_CLIENT_ID: &str = "pinzone.40pin";
}

/// Timing
pub mod timing {
    use super::Duration;

    /// Pause after each line request so relay boards settle between pins
    pub const LINE_REQUEST_SETTLE: Duration = Duration::from_millis(100);

    /// Upper bound on releasing lines during shutdown
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

    /// Socket read/write timeout for the GPIO daemon client
    pub const GPIO_CLIENT_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Delay between startup init attempts in the daemon
    pub const INIT_RETRY_DELAY: Duration = Duration::from_secs(2);
}

/// Daemon defaults
pub mod daemon {
    /// Startup `init_all` attempts before the daemon gives up
    pub const DEFAULT_INIT_ATTEMPTS: u32 = 3;

    /// Maximum concurrent control connections
    pub const MAX_CONNECTIONS: usize = 16;

    /// Control socket permissions (owner and group read/write)
    pub const SOCKET_MODE: u32 = 0o660;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_file_name() {
        let path = paths::default_data_file();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(paths::DATA_FILE));
    }

    #[test]
    fn test_shutdown_grace_is_bounded() {
        assert!(timing::SHUTDOWN_GRACE <= Duration::from_secs(10));
        assert!(timing::SHUTDOWN_GRACE > timing::LINE_REQUEST_SETTLE);
    }
}
