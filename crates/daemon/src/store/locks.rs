// Per-path async locks serializing read-modify-write cycles on one file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default, Clone)]
pub struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Held for as long as a save owns its file. Dropping it releases the path
/// and forgets the lock once nobody else is waiting on it.
#[derive(Debug)]
pub struct PathGuard {
    guard: Option<OwnedMutexGuard<()>>,
    path: PathBuf,
    locks: PathLocks,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> PathGuard {
        let mutex = self.table().entry(path.to_path_buf()).or_default().clone();
        let guard = mutex.lock_owned().await;
        PathGuard { guard: Some(guard), path: path.to_path_buf(), locks: self.clone() }
    }

    /// Number of paths currently locked or waited on.
    pub fn tracked_paths(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.locks.table();
        if table.get(&self.path).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
            table.remove(&self.path);
        }
    }
}
