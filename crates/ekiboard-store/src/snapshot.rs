use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ekiboard_core::config::StorageConfig;
use ekiboard_core::{DepartureSnapshot, FirstLastSnapshot, OperationSnapshot, WeatherSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// The snapshot files the feeder maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Operation,
    Departure,
    FirstLast,
    Weather,
    /// Verbatim upstream forecast document, kept for diagnostics.
    WeatherRaw,
}

impl SnapshotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operation => "operation",
            Self::Departure => "departure",
            Self::FirstLast => "first_last",
            Self::Weather => "weather",
            Self::WeatherRaw => "weather_raw",
        }
    }
}

/// Atomic JSON snapshot files under one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    config: StorageConfig,
}

impl SnapshotStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            config: config.clone(),
        }
    }

    /// Store rooted at `dir` with the default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config = StorageConfig {
            dir: dir.into(),
            ..StorageConfig::default()
        };
        Self::new(&config)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the snapshot directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))
    }

    pub fn path(&self, kind: SnapshotKind) -> PathBuf {
        let name = match kind {
            SnapshotKind::Operation => &self.config.operation_file,
            SnapshotKind::Departure => &self.config.departure_file,
            SnapshotKind::FirstLast => &self.config.first_last_file,
            SnapshotKind::Weather => &self.config.weather_file,
            SnapshotKind::WeatherRaw => &self.config.weather_raw_file,
        };
        self.dir.join(name)
    }

    /// Hidden sibling of the target, so the rename never crosses filesystems.
    fn temp_path(&self, kind: SnapshotKind) -> PathBuf {
        let target = self.path(kind);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.as_str().to_string());
        target.with_file_name(format!(".{name}.tmp"))
    }

    // -----------------------------------------------------------------------
    // Generic read / write
    // -----------------------------------------------------------------------

    /// Serialize `value` and atomically replace the snapshot file.
    pub fn write<T: Serialize + ?Sized>(&self, kind: SnapshotKind, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.replace(kind, &bytes)
    }

    /// Replace the snapshot with an explicit JSON `null`.
    pub fn write_null(&self, kind: SnapshotKind) -> Result<()> {
        self.write(kind, &Value::Null)
    }

    fn replace(&self, kind: SnapshotKind, bytes: &[u8]) -> Result<()> {
        let target = self.path(kind);
        let tmp = self.temp_path(kind);

        let written = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.write_all(b"\n")?;
            file.sync_all()
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&target, e));
        }
        debug!(kind = kind.as_str(), path = %target.display(), "snapshot written");
        Ok(())
    }

    /// Read a snapshot.
    ///
    /// Missing file, JSON `null` and malformed content all read as `None`;
    /// malformed content is logged since it means something else wrote there.
    pub fn read<T: DeserializeOwned>(&self, kind: SnapshotKind) -> Option<T> {
        let path = self.path(kind);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(kind = kind.as_str(), path = %path.display(), "no snapshot yet");
                return None;
            }
            Err(e) => {
                warn!(kind = kind.as_str(), path = %path.display(), "snapshot unreadable: {e}");
                return None;
            }
        };
        match serde_json::from_slice::<Option<T>>(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(kind = kind.as_str(), path = %path.display(), "malformed snapshot: {e}");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn read_departure(&self) -> Option<DepartureSnapshot> {
        self.read(SnapshotKind::Departure)
    }

    /// `None` writes the explicit failure record.
    pub fn write_departure(&self, snapshot: Option<&DepartureSnapshot>) -> Result<()> {
        self.write(SnapshotKind::Departure, &snapshot)
    }

    pub fn read_first_last(&self) -> Option<FirstLastSnapshot> {
        self.read(SnapshotKind::FirstLast)
    }

    pub fn write_first_last(&self, snapshot: &FirstLastSnapshot) -> Result<()> {
        self.write(SnapshotKind::FirstLast, snapshot)
    }

    pub fn read_operation(&self) -> Option<OperationSnapshot> {
        self.read(SnapshotKind::Operation)
    }

    /// `None` writes the explicit failure record.
    pub fn write_operation(&self, snapshot: Option<&OperationSnapshot>) -> Result<()> {
        self.write(SnapshotKind::Operation, &snapshot)
    }

    pub fn read_weather(&self) -> Option<WeatherSnapshot> {
        self.read(SnapshotKind::Weather)
    }

    pub fn write_weather(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.write(SnapshotKind::Weather, snapshot)
    }

    pub fn write_weather_raw(&self, document: &Value) -> Result<()> {
        self.write(SnapshotKind::WeatherRaw, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekiboard_core::{FirstLastInfo, OperationStatus, TrainTimes};
    use tempfile::TempDir;

    fn store() -> (TempDir, SnapshotStore) {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::in_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_file_reads_none() {
        let (_dir, store) = store();
        assert!(store.read_departure().is_none());
        assert!(store.read_weather().is_none());
    }

    #[test]
    fn null_reads_none() {
        let (_dir, store) = store();
        store.write_departure(None).unwrap();
        let raw = fs::read_to_string(store.path(SnapshotKind::Departure)).unwrap();
        assert_eq!(raw.trim(), "null");
        assert!(store.read_departure().is_none());
    }

    #[test]
    fn malformed_reads_none() {
        let (_dir, store) = store();
        fs::write(store.path(SnapshotKind::Departure), "{\"新宿\": {trunc").unwrap();
        assert!(store.read_departure().is_none());
    }

    #[test]
    fn first_last_survives_write_and_read() {
        let (_dir, store) = store();
        let mut snap = FirstLastSnapshot::new();
        snap.insert(
            "新宿",
            FirstLastInfo {
                first_train: Some(TrainTimes {
                    departure: "05:02".into(),
                    arrival: "05:25".into(),
                }),
                last_train: None,
            },
        );
        store.write_first_last(&snap).unwrap();
        let back = store.read_first_last().unwrap();
        assert_eq!(back, snap);

        let json: Value =
            serde_json::from_slice(&fs::read(store.path(SnapshotKind::FirstLast)).unwrap())
                .unwrap();
        assert!(json["新宿"]["last_train"].is_null());
    }

    #[test]
    fn operation_none_is_null_and_some_is_flat() {
        let (_dir, store) = store();
        store.write_operation(None).unwrap();
        assert!(store.read_operation().is_none());

        let snap = OperationSnapshot {
            status: OperationStatus::default(),
            last_updated: "2025-11-07T06:00:00.000000".into(),
        };
        store.write_operation(Some(&snap)).unwrap();
        assert_eq!(store.read_operation(), Some(snap));
    }

    #[test]
    fn write_leaves_no_temp_file() {
        let (dir, store) = store();
        store.write_weather_raw(&serde_json::json!([{"a": 1}])).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["jma_forecast_raw.json".to_string()]);
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::in_dir(dir.path().join("a/b"));
        store.ensure_dir().unwrap();
        store.write_null(SnapshotKind::Operation).unwrap();
        assert!(store.path(SnapshotKind::Operation).exists());
    }

    #[test]
    fn write_into_missing_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::in_dir(dir.path().join("missing"));
        assert!(matches!(
            store.write_null(SnapshotKind::Weather),
            Err(StoreError::Io { .. })
        ));
    }
}
