//! Directory-backed remote authority.
//!
//! `<dir>/schedule.json` holds the authoritative snapshot. An `offline` file
//! in the same directory makes every call fail as a network error.

use chrono::NaiveDate;
use stagetrack_kernel::{StageCatalog, StageStatus};
use stagetrack_store::{RemoteError, RemoteSchedule, RemoteSnapshot, RemoteStage};
use std::fs;
use std::path::PathBuf;

pub const SCHEDULE_FILE: &str = "schedule.json";
pub const OFFLINE_MARKER: &str = "offline";

pub struct FileRemote {
    dir: PathBuf,
    catalog: StageCatalog,
}

impl FileRemote {
    pub fn new(dir: impl Into<PathBuf>, catalog: StageCatalog) -> Self {
        Self {
            dir: dir.into(),
            catalog,
        }
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.dir.join(OFFLINE_MARKER).exists() {
            return Err(RemoteError::Transient(format!(
                "{} is marked offline",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn read(&self) -> Result<Option<RemoteSnapshot>, RemoteError> {
        let path = self.dir.join(SCHEDULE_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RemoteError::Transient(format!("{}: {err}", path.display())));
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RemoteError::Malformed(format!("{}: {e}", path.display())))
    }

    fn write(&self, snapshot: &RemoteSnapshot) -> Result<(), RemoteError> {
        let path = self.dir.join(SCHEDULE_FILE);
        let raw = serde_json::to_string_pretty(snapshot)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&path, raw))
            .map_err(|e| RemoteError::Transient(format!("{}: {e}", path.display())))
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RemoteSnapshot) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        self.ensure_online()?;
        let mut snapshot = self.read()?.ok_or(RemoteError::NotFound)?;
        let out = f(&mut snapshot)?;
        self.write(&snapshot)?;
        Ok(out)
    }
}

impl RemoteSchedule for FileRemote {
    fn fetch_schedule(&mut self) -> Result<RemoteSnapshot, RemoteError> {
        self.ensure_online()?;
        self.read()?.ok_or(RemoteError::NotFound)
    }

    fn set_start_date(&mut self, date: NaiveDate) -> Result<(), RemoteError> {
        self.ensure_online()?;
        self.write(&RemoteSnapshot::started(&self.catalog, date))
    }

    fn update_stage_status(
        &mut self,
        stage_id: &str,
        status: StageStatus,
    ) -> Result<RemoteStage, RemoteError> {
        self.mutate(|snapshot| snapshot.apply_status(stage_id, status))
    }

    fn calibrate_stage_end(
        &mut self,
        stage_id: &str,
        end_date: NaiveDate,
    ) -> Result<RemoteStage, RemoteError> {
        self.mutate(|snapshot| snapshot.apply_calibration(stage_id, end_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stagetrack-remote-{prefix}-{}-{unique}",
            std::process::id()
        ))
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_dir_all(path);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn start_then_update_persists_to_directory() {
        let dir = temp_dir("persist");
        let mut remote = FileRemote::new(&dir, StageCatalog::standard());

        assert_eq!(remote.fetch_schedule(), Err(RemoteError::NotFound));
        assert_eq!(
            remote.update_stage_status("S00", StageStatus::Completed),
            Err(RemoteError::NotFound)
        );

        remote
            .set_start_date(date(2026, 3, 1))
            .expect("start date written");
        let ack = remote
            .update_stage_status("S00", StageStatus::Completed)
            .expect("status written");
        assert_eq!(ack.status, StageStatus::Completed);

        let mut reopened = FileRemote::new(&dir, StageCatalog::standard());
        let snapshot = reopened.fetch_schedule().expect("snapshot readable");
        assert_eq!(snapshot.start_date, Some(date(2026, 3, 1)));
        assert_eq!(snapshot.stages["S00"].status, StageStatus::Completed);

        cleanup(&dir);
    }

    #[test]
    fn offline_marker_and_garbage_payload() {
        let dir = temp_dir("offline");
        fs::create_dir_all(&dir).expect("dir created");
        fs::write(dir.join(OFFLINE_MARKER), "").expect("marker written");
        let mut remote = FileRemote::new(&dir, StageCatalog::standard());
        assert!(matches!(
            remote.set_start_date(date(2026, 3, 1)),
            Err(RemoteError::Transient(_))
        ));

        fs::remove_file(dir.join(OFFLINE_MARKER)).expect("marker removed");
        fs::write(dir.join(SCHEDULE_FILE), "{not json").expect("garbage written");
        assert!(matches!(
            remote.fetch_schedule(),
            Err(RemoteError::Malformed(_))
        ));

        cleanup(&dir);
    }
}
