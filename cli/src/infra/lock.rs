//! Infrastructure implementation of the `AllocationLock` port.
//!
//! An advisory `flock` on a well-known file. The kernel drops the lock when
//! the holder exits, so a crashed run never leaves it stuck.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::application::ports::AllocationLock;
use crate::domain::error::LifecycleError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Held lock. Unlocks on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Cross-process lock on a file such as `/opt/turboship/turboship.lock`.
pub struct FileAllocationLock {
    path: PathBuf,
    wait: Duration,
}

impl FileAllocationLock {
    /// `wait` bounds how long `acquire` polls before giving up.
    #[must_use]
    pub fn new(path: PathBuf, wait: Duration) -> Self {
        Self { path, wait }
    }

    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening lock file {}", path.display()))
    }

    fn holder(&self) -> String {
        std::fs::read_to_string(&self.path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

impl AllocationLock for FileAllocationLock {
    type Guard = LockGuard;

    async fn acquire(&self) -> Result<LockGuard> {
        let path = self.path.clone();
        let mut file = tokio::task::spawn_blocking(move || Self::open(&path))
            .await
            .context("lock task panicked")??;

        let deadline = Instant::now() + self.wait;
        let mut announced = false;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(e) if Instant::now() < deadline => {
                    if !announced {
                        tracing::info!(
                            path = %self.path.display(),
                            holder = %self.holder(),
                            error = %e,
                            "waiting for another turboship run to finish"
                        );
                        announced = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "lock wait exhausted");
                    let holder = self.holder();
                    let path = if holder.is_empty() {
                        self.path.display().to_string()
                    } else {
                        format!("{} (held by pid {holder})", self.path.display())
                    };
                    return Err(LifecycleError::LockUnavailable { path }.into());
                }
            }
        }

        // PID is for diagnostics only.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        tracing::debug!(path = %self.path.display(), "allocation lock acquired");
        Ok(LockGuard { file })
    }
}
