//! JSON persistence for pin parameters
//!
//! Loads the plugin record, seeding a default file on first start, and saves
//! it with an atomic temp-file + rename so readers never see a partial write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use pz_protocol::MAX_PHYSICAL_PIN;

use crate::error::{PinzoneError, Result};

use super::orders::{assign_missing_orders, sort_by_order};
use super::types::Params;

/// File-backed store for [`Params`]
#[derive(Debug, Clone)]
pub struct ParamStore {
    path: PathBuf,
}

impl ParamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load params, writing the default record if the file does not exist yet
    ///
    /// Orders are normalized and pins sorted by order (unassigned last) before
    /// returning. A file that exists but cannot be parsed is an error; it is
    /// never overwritten.
    pub fn load(&self) -> Result<Params> {
        if !self.path.exists() {
            let params = Params::default();
            info!(
                "No pin configuration at {:?}, writing defaults (active={})",
                self.path, params.active
            );
            self.save(&params)?;
            return Ok(params);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| PinzoneError::FileRead { path: self.path.clone(), source: e })?;

        let mut params: Params = serde_json::from_str(&contents)?;
        if let Some(bad) = params.pins.iter().find(|p| !(1..=MAX_PHYSICAL_PIN).contains(&p.pin)) {
            return Err(PinzoneError::InvalidPin(bad.pin));
        }
        params.pins = assign_missing_orders(std::mem::take(&mut params.pins));
        sort_by_order(&mut params.pins);

        info!(
            "Loaded {} pins from {:?} (active={}, enabled={})",
            params.pins.len(),
            self.path,
            params.active,
            params.enabled_pins().count()
        );
        Ok(params)
    }

    /// Save params to disk atomically
    pub fn save(&self, params: &Params) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PinzoneError::FileWrite {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }
        }

        let json = serde_json::to_string_pretty(params)?;

        // Atomic write - write to temp file then rename
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .map_err(|e| PinzoneError::FileWrite { path: temp_path.clone(), source: e })?;

        file.write_all(json.as_bytes())
            .map_err(|e| PinzoneError::FileWrite { path: temp_path.clone(), source: e })?;

        file.sync_all()
            .map_err(|e| PinzoneError::FileWrite { path: temp_path.clone(), source: e })?;

        drop(file);

        fs::rename(&temp_path, &self.path)
            .map_err(|e| PinzoneError::FileWrite { path: self.path.clone(), source: e })?;

        debug!("Saved {} pins to {:?}", params.pins.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{PinConfig, Polarity};
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_pin_off_the_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("40pin.json");
        let raw = r#"{"active":"low","pins":[{"pin":41,"notes":"","enabled":true,"order":1}]}"#;
        fs::write(&path, raw).unwrap();

        let err = ParamStore::new(&path).load().unwrap_err();
        assert!(matches!(err, PinzoneError::InvalidPin(41)));
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn test_missing_file_writes_default() {
        let dir = TempDir::new().unwrap();
        let store = ParamStore::new(dir.path().join("data").join("40pin.json"));

        let params = store.load().unwrap();
        assert_eq!(params.active, Polarity::Low);
        assert!(params.pins.is_empty());
        assert!(store.path().exists());

        // Second load reads the seeded file instead of recreating it
        let again = store.load().unwrap();
        assert_eq!(again, params);
    }

    #[test]
    fn test_load_assigns_and_sorts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("40pin.json");
        fs::write(
            &path,
            r#"{"active":"high","pins":[
                {"pin":1,"notes":"3v3","enabled":false,"order":null},
                {"pin":11,"notes":"","enabled":true,"order":null},
                {"pin":13,"notes":"","enabled":true,"order":1}
            ]}"#,
        )
        .unwrap();

        let params = ParamStore::new(&path).load().unwrap();
        let summary: Vec<_> = params.pins.iter().map(|p| (p.pin, p.order)).collect();
        assert_eq!(summary, vec![(13, Some(1)), (11, Some(2)), (1, None)]);
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("40pin.json");
        let raw = r#"{"active":"low","pins":[{"pin":11,"notes":"lawn","enabled":true,"order":1,"valve":"A"}],"version":2}"#;
        fs::write(&path, raw).unwrap();

        let store = ParamStore::new(&path);
        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let original: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(written, original);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("40pin.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ParamStore::new(&path).load().unwrap_err();
        assert!(matches!(err, PinzoneError::JsonParse(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_replaces_whole_record() {
        let dir = TempDir::new().unwrap();
        let store = ParamStore::new(dir.path().join("40pin.json"));
        store.load().unwrap();

        let params = Params::new(
            Polarity::High,
            vec![PinConfig::new(12).with_order(Some(1)).enabled(true).with_notes("drip")],
        );
        store.save(&params).unwrap();
        assert_eq!(store.load().unwrap(), params);
    }
}
