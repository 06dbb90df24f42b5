//! Privilege check for mutating operations.
//!
//! Runs before anything is touched so a refused install leaves no trace.

use std::path::Path;

use nix::unistd::{access, AccessFlags, Uid};

use crate::domain::{AppError, Result};

/// Closest existing directory at or above `path`.
fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.exists())
}

/// Fail with `Permission` unless every target (or its nearest existing
/// ancestor) is writable by the caller.
pub fn ensure_writable(targets: &[&Path]) -> Result<()> {
    if Uid::effective().is_root() {
        return Ok(());
    }

    for target in targets {
        let Some(existing) = nearest_existing(target) else {
            return Err(AppError::Permission {
                message: format!("no existing parent for {}", target.display()),
            });
        };

        if access(existing, AccessFlags::W_OK).is_err() {
            return Err(AppError::Permission {
                message: format!(
                    "cannot write to {} (run with sudo)",
                    existing.display()
                ),
            });
        }
    }

    tracing::debug!("Write access confirmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn test_nearest_existing_walks_up() {
        let dir = tempdir().unwrap();
        let deep = dir.path().join("a/b/c");
        assert_eq!(nearest_existing(&deep), Some(dir.path()));
    }

    #[test]
    fn test_writable_tempdir_passes() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("opt/probe");
        ensure_writable(&[root.as_path(), dir.path()]).unwrap();
    }

    #[test]
    fn test_read_only_dir_is_refused() {
        if Uid::effective().is_root() {
            return;
        }
        let dir = tempdir().unwrap();
        let units = dir.path().join("units");
        fs::create_dir(&units).unwrap();
        fs::set_permissions(&units, fs::Permissions::from_mode(0o555)).unwrap();

        let root = dir.path().join("opt/agent");
        let result = ensure_writable(&[root.as_path(), units.join("agent.service").as_path()]);
        fs::set_permissions(&units, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Permission { .. }));
        assert!(err.to_string().contains("units"));
    }
}
