//! Filesystem operations for staging and removing service files.
//!
//! Writes go through a sibling temp file and a rename so readers never see
//! a truncated file. Removals are no-ops when the target is already gone.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{chown, User};

use crate::domain::{AppError, Result};

/// Mode for the staged executable and service directories.
const EXEC_MODE: u32 = 0o755;

/// Mode for the unit descriptor.
pub const UNIT_MODE: u32 = 0o644;

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "staging".into(), |n| n.to_string_lossy().to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write file atomically: temp file, fsync, rename.
pub fn write_file_atomic(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    let temp_path = temp_path_for(path);

    {
        let mut file = fs::File::create(&temp_path).map_err(|e| {
            AppError::io(format!("Failed to create {}", temp_path.display()), e)
        })?;

        file.write_all(content)
            .map_err(|e| AppError::io(format!("Failed to write {}", temp_path.display()), e))?;

        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| AppError::io("Failed to set temp file permissions", e))?;

        file.sync_all()
            .map_err(|e| AppError::io(format!("Failed to sync {}", temp_path.display()), e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        AppError::io(format!("Failed to publish {}", path.display()), e)
    })?;

    Ok(())
}

/// Copy `source` to `dest`, mark it executable and confirm the bits stuck.
pub fn stage_executable(source: &Path, dest: &Path) -> Result<()> {
    let content = fs::read(source)
        .map_err(|e| AppError::io(format!("Failed to read {}", source.display()), e))?;

    write_file_atomic(dest, &content, EXEC_MODE)?;

    fs::set_permissions(dest, fs::Permissions::from_mode(EXEC_MODE))
        .map_err(|e| AppError::io(format!("Failed to chmod {}", dest.display()), e))?;

    if !is_executable(dest) {
        return Err(AppError::Integrity {
            message: format!(
                "{} is not executable after chmod (noexec or restrictive mount?)",
                dest.display()
            ),
        });
    }

    tracing::info!(path = %dest.display(), "Executable staged");
    Ok(())
}

/// Copy a plain file atomically, keeping it world-readable.
pub fn copy_file_atomic(source: &Path, dest: &Path) -> Result<()> {
    let content = fs::read(source)
        .map_err(|e| AppError::io(format!("Failed to read {}", source.display()), e))?;
    write_file_atomic(dest, &content, UNIT_MODE)
}

/// Whether every execute bit is set on `path`.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 == 0o111)
        .unwrap_or(false)
}

/// Look up the system account the agent runs as.
pub fn resolve_account(user: &str) -> Result<User> {
    User::from_name(user)
        .map_err(|e| AppError::io(format!("Failed to look up account {user}"), e.into()))?
        .ok_or_else(|| AppError::Config {
            message: format!("System account '{user}' does not exist"),
        })
}

/// Hand the directories to the service account and make them traversable.
pub fn apply_ownership(dirs: &[&Path], account: &User) -> Result<()> {
    for dir in dirs {
        chown(*dir, Some(account.uid), Some(account.gid))
            .map_err(|e| AppError::io(format!("Failed to chown {}", dir.display()), e.into()))?;

        fs::set_permissions(dir, fs::Permissions::from_mode(EXEC_MODE))
            .map_err(|e| AppError::io(format!("Failed to chmod {}", dir.display()), e))?;
    }

    tracing::info!(user = %account.name, "Ownership applied");
    Ok(())
}

/// Remove a file; returns whether anything was removed.
pub fn remove_file_if_present(path: &Path) -> Result<bool> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Already absent");
        return Ok(false);
    }

    fs::remove_file(path)
        .map_err(|e| AppError::io(format!("Failed to remove {}", path.display()), e))?;
    tracing::info!(path = %path.display(), "Removed");
    Ok(true)
}

/// Remove a directory tree; returns whether anything was removed.
pub fn remove_dir_if_present(path: &Path) -> Result<bool> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Already absent");
        return Ok(false);
    }

    fs::remove_dir_all(path)
        .map_err(|e| AppError::io(format!("Failed to remove {}", path.display()), e))?;
    tracing::info!(path = %path.display(), "Removed directory tree");
    Ok(true)
}
