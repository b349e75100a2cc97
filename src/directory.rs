//! Picks the directory a temporary file is created in.

use crate::errors::{DirectoryIssue, Error};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Namespace of the per-user data directory used as a late fallback.
pub const DATA_DIR_NAMESPACE: &str = "tempfile-registry";

/// Name of the directory created below the working directory as the last resort.
const LOCAL_TEMP_DIR: &str = "temp";

/// Determines whether the current process may write to `path`.
#[cfg(unix)]
pub(crate) fn is_writable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};
    access(path, AccessFlags::W_OK).is_ok()
}

/// Determines whether the current process may write to `path`.
#[cfg(not(unix))]
pub(crate) fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

fn is_usable(dir: &Path) -> bool {
    dir.is_dir() && is_writable(dir)
}

/// Validates a directory requested by the caller and makes it absolute.
pub(crate) fn check_directory(dir: &Path) -> Result<PathBuf, Error> {
    if !dir.is_dir() {
        return Err(Error::InvalidDirectory {
            path: dir.to_path_buf(),
            issue: DirectoryIssue::Missing,
        });
    }
    if !is_writable(dir) {
        return Err(Error::InvalidDirectory {
            path: dir.to_path_buf(),
            issue: DirectoryIssue::NotWritable,
        });
    }
    Ok(std::path::absolute(dir)?)
}

/// The ordered list of places to look for a temporary directory.
///
/// Candidates are tried in this order:
///
/// 1. the system temporary directory,
/// 2. the well-known fallbacks (`/tmp`, then `/var/tmp`),
/// 3. the per-user data directory, namespaced with [`DATA_DIR_NAMESPACE`],
/// 4. a `temp` directory below the working directory, created on demand.
///
/// The first candidate that is a writable directory wins.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    system: Option<PathBuf>,
    fallbacks: Vec<PathBuf>,
    data_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl DirectoryResolver {
    /// A resolver built from the process environment.
    pub fn from_env() -> Self {
        Self {
            system: Some(std::env::temp_dir()),
            fallbacks: vec![PathBuf::from("/tmp"), PathBuf::from("/var/tmp")],
            data_dir: dirs::data_local_dir().map(|dir| dir.join(DATA_DIR_NAMESPACE)),
            working_dir: std::env::current_dir().ok(),
        }
    }

    /// A resolver without any candidates.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_system_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.system = Some(dir.into());
        self
    }

    pub fn with_fallback<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.fallbacks.push(dir.into());
        self
    }

    /// Sets the data directory; it is created if missing.
    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the working directory below which `temp` is created as a last resort.
    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Returns the first usable candidate as an absolute path.
    pub fn resolve(&self) -> Result<PathBuf, Error> {
        if let Some(dir) = self.system.as_deref().filter(|dir| is_usable(dir)) {
            trace!("Using system temporary directory {}", dir.display());
            return Ok(std::path::absolute(dir)?);
        }

        if let Some(dir) = self.fallbacks.iter().find(|dir| is_usable(dir)) {
            trace!("Using fallback temporary directory {}", dir.display());
            return Ok(std::path::absolute(dir)?);
        }

        if let Some(dir) = &self.data_dir {
            if std::fs::create_dir_all(dir).is_ok() && is_usable(dir) {
                trace!("Using data directory {}", dir.display());
                return Ok(std::path::absolute(dir)?);
            }
        }

        if let Some(cwd) = self.working_dir.as_deref().filter(|dir| is_usable(dir)) {
            let local = cwd.join(LOCAL_TEMP_DIR);
            if !local.exists() {
                let _ = std::fs::create_dir(&local);
            }
            if is_usable(&local) {
                trace!("Using local temporary directory {}", local.display());
                return Ok(std::path::absolute(local)?);
            }
        }

        Err(Error::NoTempDirectory)
    }
}
