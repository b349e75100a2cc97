//! Bookkeeping of every temporary file path handed out, used as a fallback
//! when a [`TempFile`](crate::TempFile) never gets to delete its own file.
//!
//! The process-wide registry is reached through [`Registry::global`]. With the
//! `exit-hook` feature (enabled by default) it sweeps its remaining entries when
//! the process exits normally. Isolated registries built with [`Registry::new`]
//! sweep their entries when dropped.

use crate::directory::is_writable;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tracing::debug;

/// The shared registry used by [`TempFile`](crate::TempFile) unless another one is injected.
static GLOBAL_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    Arc::new(Registry {
        paths: Mutex::new(Vec::new()),
        exit_hook_installed: AtomicBool::new(false),
        is_global: true,
    })
});

/// Tracks the paths of live temporary files.
pub struct Registry {
    paths: Mutex<Vec<PathBuf>>,

    /// Set at most once, when the exit hook has been installed.
    exit_hook_installed: AtomicBool,

    /// Only the global registry is reachable from the exit hook.
    is_global: bool,
}

impl Registry {
    /// Creates an isolated registry. Its remaining entries are swept when it is dropped.
    pub fn new() -> Self {
        Self {
            paths: Mutex::new(Vec::new()),
            exit_hook_installed: AtomicBool::new(false),
            is_global: false,
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<Registry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Whether this is the process-wide registry.
    pub fn is_global(&self) -> bool {
        self.is_global
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        // Entries are plain paths; a panic while holding the lock cannot leave them torn.
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `path` and, for the global registry, makes sure the exit hook is installed.
    pub fn register<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        debug!("Registering temporary file {}", path.display());
        self.lock().push(path);

        if self.is_global {
            self.ensure_exit_hook();
        }
    }

    /// Removes the first entry equal to `path`. Returns whether one was found.
    pub fn unregister<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let mut paths = self.lock();
        match paths.iter().position(|p| p == path) {
            Some(index) => {
                paths.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        self.lock().iter().any(|p| p == path)
    }

    /// A snapshot of the registered paths, in registration order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deletes every registered file that still exists and is writable.
    ///
    /// Deleted entries and entries whose file is already gone are removed.
    /// Files that are not writable, or that fail to delete, stay registered.
    /// Never fails; returns the number of files deleted.
    pub fn cleanup(&self) -> usize {
        sweep(&mut self.lock())
    }

    /// Whether the exit hook has been installed for this registry.
    pub fn exit_hook_installed(&self) -> bool {
        self.exit_hook_installed.load(Ordering::Acquire)
    }

    /// Returns a guard that sweeps this registry when dropped.
    ///
    /// Useful at the top of `main` when the `exit-hook` feature is disabled,
    /// or to scope cleanup of an isolated registry.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tempfile_registry::Registry;
    /// # use std::sync::Arc;
    /// let registry = Arc::new(Registry::new());
    /// let path = std::env::temp_dir().join("guarded.tmp");
    /// {
    ///     let _guard = registry.cleanup_guard();
    ///     std::fs::write(&path, b"x")?;
    ///     registry.register(&path);
    /// }
    ///
    /// // The guard swept the registry.
    /// assert!(!path.exists());
    /// assert!(registry.is_empty());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn cleanup_guard(self: &Arc<Self>) -> CleanupGuard {
        CleanupGuard {
            registry: self.clone(),
        }
    }

    fn ensure_exit_hook(&self) {
        if self
            .exit_hook_installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if install_exit_hook() {
            debug!("Installed temporary file exit hook");
        } else {
            self.exit_hook_installed.store(false, Ordering::Release);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("paths", &*self.lock())
            .field("is_global", &self.is_global)
            .finish()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        sweep(&mut self.lock());
    }
}

/// Sweeps a [`Registry`] when dropped.
#[must_use = "the registry is swept when the guard is dropped"]
#[derive(Debug)]
pub struct CleanupGuard {
    registry: Arc<Registry>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.registry.cleanup();
    }
}

fn sweep(paths: &mut Vec<PathBuf>) -> usize {
    let mut deleted = 0;
    paths.retain(|path| {
        if !path.exists() {
            return false;
        }
        if !is_writable(path) {
            return true;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                deleted += 1;
                false
            }
            Err(_) => path.exists(),
        }
    });
    deleted
}

#[cfg(feature = "exit-hook")]
fn install_exit_hook() -> bool {
    use std::sync::TryLockError;

    extern "C" fn cleanup_at_exit() {
        // Unwinding out of an `extern "C"` function aborts; swallow everything.
        let _ = std::panic::catch_unwind(|| {
            let registry = &*GLOBAL_REGISTRY;
            // Another thread may still hold the lock while the process exits.
            let mut paths = match registry.paths.try_lock() {
                Ok(paths) => paths,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            sweep(&mut paths);
        });
    }

    // SAFETY: `cleanup_at_exit` is a plain function without arguments that never unwinds.
    unsafe { libc::atexit(cleanup_at_exit) == 0 }
}

#[cfg(not(feature = "exit-hook"))]
fn install_exit_hook() -> bool {
    false
}
