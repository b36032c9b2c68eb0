//! Command Line Interface

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pz_core::constants::{client, daemon, paths, timing};
use pz_core::{BackendConfig, BackendKind};

#[derive(Parser, Debug)]
#[command(name = "pinzoned")]
#[command(version)]
#[command(about = "pinzone - relay switching for irrigation zones on a 40-pin GPIO header")]
#[command(long_about = "pinzone - relay switching for irrigation zones on a 40-pin GPIO header

Keeps the header pins configured on the settings page requested as outputs
and switches them whenever a zone_change request arrives on the control socket.

EXAMPLES:
    pinzoned                                   Use the GPIO line daemon (default)
    pinzoned --backend sysfs --line-offset 512 Drive /sys/class/gpio directly
    pinzoned --backend memory --socket /tmp/pinzone.sock
                                               Dry run, no hardware touched

ENVIRONMENT VARIABLES:
    PINZONE_LOG=debug      Log filter (trace, debug, info, warn, error)

FILES:
    /var/lib/pinzone/40pin.json    Pin configuration (when run as root)")]
pub struct Cli {
    /// Pin configuration file
    #[arg(long, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// Control socket to listen on
    #[arg(long, value_name = "PATH", default_value = paths::CONTROL_SOCKET)]
    pub socket: PathBuf,

    /// Line backend: remote, sysfs or memory
    #[arg(long, default_value = "remote")]
    pub backend: BackendKind,

    /// Socket of the GPIO line daemon (remote backend)
    #[arg(long, value_name = "PATH", default_value = paths::GPIO_DAEMON_SOCKET)]
    pub gpio_socket: PathBuf,

    /// GPIO sysfs root (sysfs backend)
    #[arg(long, value_name = "PATH", default_value = paths::SYSFS_GPIO_ROOT)]
    pub sysfs_root: PathBuf,

    /// Added to every GPIOn label to get the hardware line number
    #[arg(long, default_value_t = 0)]
    pub line_offset: u32,

    /// Client id presented to the GPIO line daemon
    #[arg(long, default_value = client::DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Upper bound on releasing lines at shutdown, in milliseconds
    #[arg(long, default_value_t = timing::SHUTDOWN_GRACE.as_millis() as u64)]
    pub shutdown_grace_ms: u64,

    /// Line init attempts at startup
    #[arg(long, default_value_t = daemon::DEFAULT_INIT_ATTEMPTS)]
    pub init_retries: u32,
}

impl Cli {
    pub fn data_file(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(paths::default_data_file)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.backend,
            gpio_socket: self.gpio_socket.clone(),
            sysfs_root: self.sysfs_root.clone(),
            client_id: self.client_id.clone(),
        }
    }
}
