//! Cross-session lock persistence, keyed by application name. External
//! storage concern: the lock manager only ever calls `load` and `save`.

use std::collections::HashMap;
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use super::lock::LockedPosition;

pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self, application: &str) -> Result<Option<LockedPosition>> {
        Ok(self.read_all()?.remove(application))
    }

    pub fn save(&self, application: &str, lock: &LockedPosition) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(application.to_string(), lock.clone());
        let serialized = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write locks to {}", self.path.display()))
    }

    fn read_all(&self) -> Result<HashMap<String, LockedPosition>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read locks from {}", self.path.display()))?;
        // A corrupt file should not brick locking; start over.
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CursorPoint, WindowInfo};
    use crate::position::lock::RelativeOffset;
    use chrono::Utc;

    fn sample_lock(application: &str) -> LockedPosition {
        let now = Utc::now();
        LockedPosition {
            absolute: CursorPoint { x: 500, y: 300 },
            application: application.to_string(),
            window: WindowInfo {
                title: "Report".into(),
                application_name: application.to_string(),
                x: 100,
                y: 100,
                width: 1280,
                height: 800,
            },
            relative: RelativeOffset {
                dx: 400,
                dy: 200,
                captured_at: now,
            },
            locked_at: now,
        }
    }

    #[test]
    fn save_then_load_round_trips_per_application() {
        let dir = std::env::temp_dir().join("scrivo-lock-store");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let store = LockStore::new(dir.join("locks.json"));

        store.save("ris.exe", &sample_lock("ris.exe")).unwrap();
        store.save("word.exe", &sample_lock("word.exe")).unwrap();

        let loaded = store.load("ris.exe").unwrap().unwrap();
        assert_eq!(loaded.application, "ris.exe");
        assert_eq!(loaded.relative.dx, 400);
        assert!(store.load("pacs.exe").unwrap().is_none());
    }
}
