// Story file persistence: async read and atomic write-back.

pub mod locks;

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;

pub use locks::{PathGuard, PathLocks};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reads story files into memory and writes serialized contents back.
pub trait StoryStore: Send + Sync + 'static {
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    fn write(&self, path: &Path, contents: &str) -> impl Future<Output = io::Result<()>> + Send;
}

/// Filesystem-backed store. Writes go to a sibling temporary file that is then
/// renamed over the target, so a failed write leaves the original intact.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStoryStore;

impl StoryStore for FsStoryStore {
    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let temp_path = temp_sibling(path)?;
        if let Err(error) = write_then_rename(path, &temp_path, contents).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(error);
        }
        Ok(())
    }
}

async fn write_then_rename(path: &Path, temp_path: &Path, contents: &str) -> io::Result<()> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    // Keep the mode of the file being replaced.
    if let Ok(metadata) = tokio::fs::metadata(path).await {
        tokio::fs::set_permissions(temp_path, metadata.permissions()).await?;
    }
    tokio::fs::rename(temp_path, path).await
}

/// `dir/.Button.stories.tsx.<pid>-<n>.tmp`
fn temp_sibling(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("`{}` has no file name", path.display()))
    })?;
    let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(path.with_file_name(format!(
        ".{}.{}-{sequence}.tmp",
        file_name.to_string_lossy(),
        std::process::id()
    )))
}
