//! Resctrl gateway (component B).
//!
//! Thin wrapper around the resource-control pseudo-filesystem: create or
//! remove a per-tier group directory, write its schemata, and move task
//! IDs into it.

use crate::error::{CacheLimitError, Result};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SCHEMATA_FILE: &str = "schemata";
pub const TASKS_FILE: &str = "tasks";

/// Handle to a resctrl group: its absolute directory path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    dir: PathBuf,
}

impl GroupHandle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn schemata_path(&self) -> PathBuf {
        self.dir.join(SCHEMATA_FILE)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }
}

/// Liveness check: a resctrl root is usable only if it has a `schemata`
/// file (component F step 2 / component B's create_group precondition).
pub fn check_root_usable(root: &Path) -> Result<()> {
    let schemata = root.join(SCHEMATA_FILE);
    if !schemata.is_file() {
        return Err(CacheLimitError::ResctrlUnavailable {
            path: root.to_path_buf(),
            reason: "schemata file missing under resctrl root".to_string(),
        });
    }
    Ok(())
}

/// Create (or reuse, if it already exists) a subdirectory of `root` named
/// `name`, returning its handle. Fails with `ResctrlUnavailable` if the
/// root itself does not expose a `schemata` file — used as a liveness
/// check that the caller is pointed at a real resctrl mount.
pub fn create_group(root: &Path, name: &str) -> Result<GroupHandle> {
    check_root_usable(root)?;
    let dir = root.join(name);
    if !dir.exists() {
        fs::create_dir(&dir).map_err(|e| CacheLimitError::ResctrlUnavailable {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(GroupHandle { dir })
}

/// Write the schemata payload atomically (single write syscall) to the
/// group's `schemata` file.
pub fn write_schemata(handle: &GroupHandle, text: &str) -> Result<()> {
    let path = handle.schemata_path();
    let mut file = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| CacheLimitError::SchemataWriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    let bytes = text.as_bytes();
    let written = file
        .write(bytes)
        .map_err(|e| CacheLimitError::SchemataWriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    if written != bytes.len() {
        return Err(CacheLimitError::SchemataWriteFailed {
            path,
            reason: format!("partial write: {written} of {} bytes", bytes.len()),
        });
    }
    Ok(())
}

/// Move a single task (PID) into the group by writing its decimal form
/// to the group's `tasks` file. Resctrl accepts one PID per write; moving
/// several tasks means calling this once per PID.
pub fn attach_task(handle: &GroupHandle, pid: u32) -> Result<()> {
    let path = handle.tasks_path();
    let mut file = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| CacheLimitError::Io {
            path: path.clone(),
            source: e,
        })?;
    file.write_all(pid.to_string().as_bytes())
        .map_err(|e| CacheLimitError::Io { path, source: e })?;
    Ok(())
}

/// Remove a group directory. Idempotent: missing directories are not an
/// error. Best-effort — removal failures are not escalated to the caller
/// beyond the `Result`; directory removal at shutdown is best-effort.
pub fn remove_group(handle: &GroupHandle) -> Result<()> {
    match fs::remove_dir(&handle.dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheLimitError::Io {
            path: handle.dir.clone(),
            source: e,
        }),
    }
}
