//! JSON file-backed sensor store.
//!
//! The whole [`StoreDocument`] lives in memory and is rewritten on every
//! change. Writes go to a sibling temp file that is then renamed over the
//! target, so a crash mid-write leaves the previous document intact.
//!
//! All functions in this module perform blocking file I/O.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use catpoint_core::{
    AlarmStatus, ArmingStatus, Sensor, SensorId, SensorStore, StoreError, StoreWrite, SystemState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Current on-disk format version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alarm_status: AlarmStatus,
    #[serde(default)]
    pub arming_status: ArmingStatus,
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_FORMAT_VERSION,
            saved_at: None,
            alarm_status: AlarmStatus::default(),
            arming_status: ArmingStatus::default(),
            sensors: Vec::new(),
        }
    }
}

impl StoreDocument {
    fn to_state(&self) -> SystemState {
        SystemState::new(
            self.sensors.iter().cloned(),
            self.alarm_status,
            self.arming_status,
        )
    }

    fn from_state(state: &SystemState) -> Self {
        Self {
            version: STORE_FORMAT_VERSION,
            saved_at: Some(Utc::now()),
            alarm_status: state.alarm_status,
            arming_status: state.arming_status,
            sensors: state.sorted_sensors(),
        }
    }
}

/// Durable [`SensorStore`] backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: SystemState,
}

impl JsonFileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file yields the default state (nothing is written until the
    /// first change). A file that exists but cannot be decoded is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match fs::read_to_string(&path) {
            Ok(content) => {
                let document: StoreDocument = serde_json::from_str(&content).map_err(|e| {
                    StoreError::Corrupted(format!("{}: {e}", path.display()))
                })?;
                if document.version > STORE_FORMAT_VERSION {
                    return Err(StoreError::Corrupted(format!(
                        "{}: unsupported format version {}",
                        path.display(),
                        document.version
                    )));
                }
                info!(
                    path = %path.display(),
                    sensors = document.sensors.len(),
                    "Loaded security state"
                );
                document.to_state()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No stored state, starting from defaults");
                SystemState::default()
            }
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };

        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the state, persists it, then swaps it in.
    fn commit(&mut self, change: impl FnOnce(&mut SystemState)) -> Result<(), StoreError> {
        let mut next = self.state.clone();
        change(&mut next);
        write_document(&self.path, &StoreDocument::from_state(&next))?;
        self.state = next;
        Ok(())
    }
}

impl SensorStore for JsonFileStore {
    fn add_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        if self.state.sensors.contains_key(&sensor.id) {
            return Ok(());
        }
        self.commit(|state| {
            state.sensors.insert(sensor.id, sensor);
        })
    }

    fn remove_sensor(&mut self, sensor_id: &SensorId) -> Result<(), StoreError> {
        self.commit(|state| {
            state.sensors.remove(sensor_id);
        })
    }

    fn update_sensor(&mut self, sensor: Sensor) -> Result<(), StoreError> {
        self.commit(|state| {
            state.sensors.insert(sensor.id, sensor);
        })
    }

    fn sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        Ok(self.state.sorted_sensors())
    }

    fn alarm_status(&self) -> Result<AlarmStatus, StoreError> {
        Ok(self.state.alarm_status)
    }

    fn set_alarm_status(&mut self, status: AlarmStatus) -> Result<(), StoreError> {
        self.commit(|state| state.alarm_status = status)
    }

    fn arming_status(&self) -> Result<ArmingStatus, StoreError> {
        Ok(self.state.arming_status)
    }

    fn set_arming_status(&mut self, status: ArmingStatus) -> Result<(), StoreError> {
        self.commit(|state| state.arming_status = status)
    }

    fn snapshot(&self) -> Result<SystemState, StoreError> {
        Ok(self.state.clone())
    }

    /// One file write for the whole batch.
    fn apply(&mut self, writes: &[StoreWrite]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        self.commit(|state| {
            for write in writes {
                match write {
                    StoreWrite::UpsertSensor(sensor) => {
                        state.sensors.insert(sensor.id, sensor.clone());
                    }
                    StoreWrite::RemoveSensor(id) => {
                        state.sensors.remove(id);
                    }
                    StoreWrite::AlarmStatus(status) => state.alarm_status = *status,
                    StoreWrite::ArmingStatus(status) => state.arming_status = *status,
                }
            }
        })
    }
}

/// Writes the document next to `path` and renames it into place.
fn write_document(path: &Path, document: &StoreDocument) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io(format!("{}: {e}", path.display()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let content = serde_json::to_string_pretty(document)
        .map_err(|e| StoreError::Io(format!("serialize: {e}")))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    if let Err(e) = replace_with(&tmp_path, path, content.as_bytes()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }

    debug!(path = %path.display(), sensors = document.sensors.len(), "Security state saved");
    Ok(())
}

fn replace_with(tmp_path: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    fs::rename(tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catpoint_core::SensorType;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::open(dir.path().join("state.json")).unwrap()
    }

    #[test]
    fn test_missing_file_starts_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.alarm_status().unwrap(), AlarmStatus::NoAlarm);
        assert_eq!(store.arming_status().unwrap(), ArmingStatus::Disarmed);
        assert!(store.sensors().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = Sensor::new("Front door", SensorType::Door);
        let id = sensor.id;

        {
            let mut store = store_in(&dir);
            store.add_sensor(sensor).unwrap();
            store
                .apply(&[
                    StoreWrite::AlarmStatus(AlarmStatus::PendingAlarm),
                    StoreWrite::ArmingStatus(ArmingStatus::ArmedAway),
                ])
                .unwrap();
        }

        let reopened = store_in(&dir);
        let snapshot = reopened.snapshot().unwrap();
        assert_eq!(snapshot.alarm_status, AlarmStatus::PendingAlarm);
        assert_eq!(snapshot.arming_status, ArmingStatus::ArmedAway);
        assert!(snapshot.sensors.contains_key(&id));
    }

    #[test]
    fn test_document_uses_status_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set_arming_status(ArmingStatus::ArmedHome).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\"arming_status\": \"ARMED_HOME\""));
        assert!(content.contains("\"version\": 1"));
    }

    #[test]
    fn test_corrupted_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(_)));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"version": 99, "saved_at": null}"#).unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corrupted(_))
        ));
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("state");
        let mut store = JsonFileStore::open(parent.join("state.json")).unwrap();
        // parent "directory" becomes a regular file, so every write fails
        fs::write(&parent, "").unwrap();

        let err = store
            .apply(&[StoreWrite::AlarmStatus(AlarmStatus::Alarm)])
            .unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.alarm_status().unwrap(), AlarmStatus::NoAlarm);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        // a non-empty directory at the target makes the rename fail
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();

        let err = store.set_alarm_status(AlarmStatus::Alarm).unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert!(!dir.path().join("state.json.tmp").exists());
        assert_eq!(store.alarm_status().unwrap(), AlarmStatus::NoAlarm);
    }

    #[test]
    fn test_add_existing_sensor_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let sensor = Sensor::new("Hall", SensorType::Motion);
        let id = sensor.id;
        store.add_sensor(sensor).unwrap();
        store
            .add_sensor(Sensor::with_id(id, "Renamed", SensorType::Motion))
            .unwrap();

        let sensors = store.sensors().unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].name, "Hall");
    }
}
