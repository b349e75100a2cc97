use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tracing::{debug, warn};

use crate::directory::{check_directory, is_writable, DirectoryResolver};
use crate::errors::{DeletionWarning, Error};
use crate::options::Options;
use crate::random_name::compose;
use crate::registry::Registry;

/// The lifecycle state of a [`TempFile`].
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum State {
    /// The file was created and is owned by the instance.
    Created,
    /// The instance was released; it will not touch the file again.
    Deleted,
}

/// A named temporary file that is deleted when the instance is released or
/// dropped, or at the latest when the process exits.
pub struct TempFile {
    /// The sanitized file name, without directory.
    filename: String,

    /// The absolute path of the file.
    path: PathBuf,

    /// The registry the path is recorded in until the file is deleted.
    registry: Arc<Registry>,

    state: State,
}

impl TempFile {
    /// Creates a new temporary file with a random name in the default location.
    /// When the instance goes out of scope, the file will be deleted.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tempfile_registry::{TempFile, Error};
    /// # use tokio::fs;
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::new().await?;
    /// assert!(file.filename().ends_with(".tmp"));
    ///
    /// // The file exists.
    /// let file_path = file.file_path().clone();
    /// assert!(fs::metadata(file_path.clone()).await.is_ok());
    ///
    /// // Deletes the file.
    /// drop(file);
    ///
    /// // The file was removed.
    /// assert!(fs::metadata(file_path).await.is_err());
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn new() -> Result<Self, Error> {
        Self::with_options(Options::default()).await
    }

    /// Creates a new temporary file as described by `options`.
    /// When the instance goes out of scope, the file will be deleted.
    ///
    /// ## Arguments
    ///
    /// * `options` - How to name the file and where to place it.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tempfile_registry::{Options, TempFile, Error};
    /// # use tokio::fs;
    /// # let _ = tokio_test::block_on(async {
    /// let options = Options::new().filename("report").extension("txt");
    /// let file = TempFile::with_options(options).await?;
    /// assert_eq!(file.filename(), "report.txt");
    ///
    /// fs::write(file.file_path(), "Hello, world!").await?;
    /// assert_eq!(fs::metadata(file.file_path()).await?.len(), 13);
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn with_options(options: Options) -> Result<Self, Error> {
        Self::with_registry(options, Registry::global()).await
    }

    /// Creates a new temporary file as described by `options`, recording it in `registry`
    /// instead of the process-wide one.
    ///
    /// ## Arguments
    ///
    /// * `options` - How to name the file and where to place it.
    /// * `registry` - The registry that keeps track of the file until it is deleted.
    pub async fn with_registry(options: Options, registry: Arc<Registry>) -> Result<Self, Error> {
        options.validate()?;
        let filename = compose(&options)?;
        let dir = match options.directory_path() {
            Some(dir) => check_directory(dir)?,
            None => DirectoryResolver::from_env().resolve()?,
        };
        let path = dir.join(&filename);
        Self::new_internal(filename, path, registry).await
    }

    async fn new_internal(
        filename: String,
        path: PathBuf,
        registry: Arc<Registry>,
    ) -> Result<Self, Error> {
        // An existing file of the same name is adopted, not truncated.
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .await
            .map_err(|e| Error::CreationFailed {
                path: path.clone(),
                source: Some(e),
            })?;

        if !is_writable(&path) {
            return Err(Error::CreationFailed { path, source: None });
        }

        debug!("Created temporary file {}", path.display());
        registry.register(&path);

        Ok(Self {
            filename,
            path,
            registry,
            state: State::Created,
        })
    }

    /// Returns the sanitized file name, e.g. `a1B2c3D4.tmp`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the absolute path of the underlying temporary file.
    pub fn file_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the registry this file is recorded in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Opens the file in read-write mode.
    pub async fn open_rw(&self) -> Result<File, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await?;
        Ok(file)
    }

    /// Opens the file in read-only mode.
    pub async fn open_ro(&self) -> Result<File, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(false)
            .open(&self.path)
            .await?;
        Ok(file)
    }

    /// Deletes the file and removes it from the registry.
    ///
    /// Only the first call has an effect. If the file is already gone, nothing
    /// is deleted and its registry entry is dropped as well. If it is not writable
    /// or cannot be removed, it is left on disk and stays registered for the
    /// exit-time sweep; the returned warning is also logged. The instance counts
    /// as released either way.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tempfile_registry::{State, TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let mut file = TempFile::new().await?;
    /// let path = file.file_path().clone();
    ///
    /// assert!(file.release().is_none());
    /// assert_eq!(file.state(), State::Deleted);
    /// assert!(!path.exists());
    ///
    /// // Releasing again does nothing.
    /// assert!(file.release().is_none());
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub fn release(&mut self) -> Option<DeletionWarning> {
        if self.state == State::Deleted {
            return None;
        }
        self.state = State::Deleted;

        if !self.path.exists() {
            self.registry.unregister(&self.path);
            return None;
        }

        if !is_writable(&self.path) {
            let warning = DeletionWarning::not_writable(self.path.clone());
            warn!("{warning}");
            return Some(warning);
        }

        // Blocks the calling thread; removing a single file is quick.
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Deleted temporary file {}", self.path.display());
                self.registry.unregister(&self.path);
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.registry.unregister(&self.path);
                None
            }
            Err(e) => {
                let warning = DeletionWarning::failed(self.path.clone(), e);
                warn!("{warning}");
                Some(warning)
            }
        }
    }

    /// Releases the file, consuming the instance.
    pub fn close(mut self) -> Option<DeletionWarning> {
        self.release()
    }
}

/// Ensures that the underlying file is deleted when the instance goes out of scope.
impl Drop for TempFile {
    fn drop(&mut self) {
        // The warning was already logged.
        let _ = self.release();
    }
}

impl Debug for TempFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

/// Formats as the file path, so the instance can stand in for it.
impl Display for TempFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.path.display(), f)
    }
}

impl AsRef<Path> for TempFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
