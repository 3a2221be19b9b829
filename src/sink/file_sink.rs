//! File-backed audit sink.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use tracing::{debug, info, warn};

use super::AuditSink;
use crate::domain::AuditRecord;
use crate::error::{InitError, WriteError};

/// Mode applied to the audit file so unprivileged tooling can read it.
#[cfg(unix)]
const AUDIT_FILE_MODE: u32 = 0o666;

const LOADED_BANNER: &str = "Relay hook loaded";
const UNLOADED_BANNER: &str = "Relay hook unloaded";

/// Appends rendered records to a line-oriented file.
///
/// Appends are serialized by a mutex within the process and by `flock`
/// across processes sharing the same file. After [`AuditSink::on_stop`] the
/// file is closed and further appends fail with [`WriteError::Closed`].
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileAuditSink {
    /// Open (or create) `path` in append mode. A newly created file is made
    /// world read/write.
    pub fn start(path: impl AsRef<Path>) -> Result<Self, InitError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source: std::io::Error| InitError::Open {
            path: path.clone(),
            source,
        };

        let (mut file, created) = match OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => (file, true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .map_err(open_error)?;
                (file, false)
            }
            Err(e) => return Err(open_error(e)),
        };

        if created {
            if let Err(e) = set_world_writable(&path) {
                warn!("Could not set permissions on audit file {:?}: {}", path, e);
            }
        }

        writeln!(file, "{}", LOADED_BANNER)
            .and_then(|_| file.flush())
            .map_err(open_error)?;

        info!("Audit sink opened at {:?}", path);

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        // A panic mid-write leaves at worst a partial record; keep appending.
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_locked(&self, file: &mut File, text: &str) -> Result<(), WriteError> {
        lock_file_exclusive(file)?;
        let written = file
            .write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(WriteError::from);
        settle_write(&self.path, written, unlock_file(file))
    }
}

/// Outcome of a locked write. An unlock failure after a good write is only
/// logged: the bytes are already in the file.
fn settle_write(
    path: &Path,
    written: Result<(), WriteError>,
    unlocked: Result<(), WriteError>,
) -> Result<(), WriteError> {
    if let Err(e) = unlocked {
        warn!("Failed to unlock audit file {:?}: {}", path, e);
    }
    written
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), WriteError> {
        let text = record.to_string();
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or(WriteError::Closed)?;
        self.write_locked(file, &text)?;
        debug!(
            "Appended {} record for xid {:#010x}",
            record.stage, record.transaction_id
        );
        Ok(())
    }

    fn on_stop(&self) {
        let mut guard = self.lock();
        let Some(mut file) = guard.take() else {
            debug!("Audit sink at {:?} already closed", self.path);
            return;
        };
        let banner = format!("{}\n", UNLOADED_BANNER);
        if let Err(e) = self.write_locked(&mut file, &banner) {
            warn!("Failed to finalize audit file {:?}: {}", self.path, e);
        }
        info!("Audit sink closed at {:?}", self.path);
    }
}

#[cfg(unix)]
fn set_world_writable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(AUDIT_FILE_MODE))
}

#[cfg(not(unix))]
fn set_world_writable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Acquire an exclusive lock on a file (Unix only)
#[cfg(unix)]
fn lock_file_exclusive(file: &File) -> Result<(), WriteError> {
    use libc::{flock, LOCK_EX};
    let fd = file.as_raw_fd();
    let result = unsafe { flock(fd, LOCK_EX) };
    if result != 0 {
        return Err(WriteError::Lock);
    }
    Ok(())
}

/// Release a file lock (Unix only)
#[cfg(unix)]
fn unlock_file(file: &File) -> Result<(), WriteError> {
    use libc::{flock, LOCK_UN};
    let fd = file.as_raw_fd();
    let result = unsafe { flock(fd, LOCK_UN) };
    if result != 0 {
        return Err(WriteError::Lock);
    }
    Ok(())
}

/// No-op lock for non-Unix platforms
#[cfg(not(unix))]
fn lock_file_exclusive(_file: &File) -> Result<(), WriteError> {
    Ok(())
}

/// No-op unlock for non-Unix platforms
#[cfg(not(unix))]
fn unlock_file(_file: &File) -> Result<(), WriteError> {
    Ok(())
}
