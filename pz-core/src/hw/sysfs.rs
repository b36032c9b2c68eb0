//! Linux GPIO sysfs backend
//!
//! Drives lines through the legacy `/sys/class/gpio` interface:
//! - `export` / `unexport` claim and give up a line
//! - `gpioN/direction` takes `in` or `out`
//! - `gpioN/value` takes `0` or `1`

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::paths::SYSFS_GPIO_ROOT;
use crate::data::Level;
use crate::error::{PinzoneError, Result};

use super::client::{Direction, LineClient};

#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{}", line))
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(SYSFS_GPIO_ROOT)
    }
}

impl LineClient for SysfsGpio {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn request_line(&mut self, line: u32, direction: Direction) -> Result<()> {
        let dir = self.line_dir(line);

        if dir.exists() {
            // Exported by someone else, or left behind by a run that did not clean up
            warn!("sysfs: GPIO{} already exported, taking it over", line);
        } else {
            fs::write(self.root.join("export"), line.to_string())
                .map_err(|e| PinzoneError::LineRequest {
                    line,
                    reason: format!("export failed: {}", e),
                })?;
        }

        let direction = match direction {
            Direction::In => "in",
            Direction::Out => "out",
        };
        fs::write(dir.join("direction"), direction)
            .map_err(|e| PinzoneError::LineRequest {
                line,
                reason: format!("setting direction failed: {}", e),
            })
    }

    fn release_line(&mut self, line: u32) -> Result<()> {
        fs::write(self.root.join("unexport"), line.to_string())
            .map_err(|e| PinzoneError::LineRelease {
                line,
                reason: format!("unexport failed: {}", e),
            })
    }

    fn write_line(&mut self, line: u32, level: Level) -> Result<()> {
        fs::write(self.line_dir(line).join("value"), level.as_u8().to_string())
            .map_err(|e| PinzoneError::LineWrite { line, reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_request_exports_and_sets_direction() {
        let root = TempDir::new().unwrap();
        // The kernel creates gpioN on export; emulate that up front
        fs::create_dir(root.path().join("gpio17")).unwrap();

        let mut gpio = SysfsGpio::new(root.path());
        gpio.request_line(17, Direction::Out).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio17/direction")).unwrap(), "out");
        // Already exported: taken over, not exported twice
        assert!(!root.path().join("export").exists());

        gpio.write_line(17, Level::Low).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio17/value")).unwrap(), "0");
        gpio.write_line(17, Level::High).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio17/value")).unwrap(), "1");

        gpio.release_line(17).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("unexport")).unwrap(), "17");
    }

    #[test]
    fn test_request_writes_export_when_missing() {
        let root = TempDir::new().unwrap();
        let mut gpio = SysfsGpio::new(root.path());

        // export succeeds but gpio22/ never appears, so direction fails
        let err = gpio.request_line(22, Direction::Out).unwrap_err();
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "22");
        assert!(matches!(err, PinzoneError::LineRequest { line: 22, .. }));
    }

    #[test]
    fn test_write_to_unexported_line_fails() {
        let root = TempDir::new().unwrap();
        let mut gpio = SysfsGpio::new(root.path());
        assert!(matches!(
            gpio.write_line(9, Level::High),
            Err(PinzoneError::LineWrite { line: 9, .. })
        ));
    }
}
