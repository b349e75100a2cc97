use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// An option was unknown or carried an unusable value.
    InvalidConfiguration {
        key: String,
        issue: ConfigurationIssue,
    },
    /// The requested directory cannot hold temporary files.
    InvalidDirectory { path: PathBuf, issue: DirectoryIssue },
    /// None of the automatic temporary directory candidates was usable.
    NoTempDirectory,
    /// The file name was empty or reserved after sanitization.
    InvalidName(String),
    /// The file could not be created, or was not writable after creation.
    CreationFailed {
        path: PathBuf,
        source: Option<std::io::Error>,
    },
    /// An I/O error occurred.
    Io(std::io::Error),
}

/// Why an option was rejected.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ConfigurationIssue {
    /// The key is not one of the recognized options.
    UnknownKey,
    /// The value is neither a string nor an integer; carries the actual type.
    UnsupportedType(&'static str),
    /// The value must be greater than zero.
    NotPositive,
    /// The value must be an integer.
    NotAnInteger,
    /// The value exceeds the carried maximum.
    TooLong(usize),
}

/// Why a requested directory was rejected.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DirectoryIssue {
    /// The path does not exist or is not a directory.
    Missing,
    /// The directory exists but is not writable.
    NotWritable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration { key, issue } => match issue {
                ConfigurationIssue::UnknownKey => write!(f, "Unknown option `{key}`"),
                ConfigurationIssue::UnsupportedType(actual) => write!(
                    f,
                    "Option `{key}` must be a string or an integer, got {actual}"
                ),
                ConfigurationIssue::NotPositive => {
                    write!(f, "Option `{key}` must be greater than zero")
                }
                ConfigurationIssue::NotAnInteger => write!(f, "Option `{key}` must be an integer"),
                ConfigurationIssue::TooLong(max) => {
                    write!(f, "Option `{key}` must not be greater than {max}")
                }
            },
            Self::InvalidDirectory { path, issue } => match issue {
                DirectoryIssue::Missing => {
                    write!(f, "The directory {} does not exist", path.display())
                }
                DirectoryIssue::NotWritable => {
                    write!(f, "The directory {} is not writable", path.display())
                }
            },
            Self::NoTempDirectory => write!(f, "Unable to find a suitable temporary directory"),
            Self::InvalidName(name) => write!(f, "Invalid temporary file name {name:?}"),
            Self::CreationFailed { path, source } => match source {
                Some(e) => write!(
                    f,
                    "Unable to create temporary file {}: {e}",
                    path.display()
                ),
                None => write!(f, "Unable to create temporary file {}", path.display()),
            },
            Self::Io(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreationFailed {
                source: Some(e), ..
            } => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reported when a released temporary file could not be deleted.
///
/// This is not fatal: the file stays on disk and remains registered,
/// so the exit-time sweep gets another chance at it.
#[derive(Debug)]
pub struct DeletionWarning {
    path: PathBuf,
    source: Option<std::io::Error>,
}

impl DeletionWarning {
    pub(crate) fn not_writable(path: PathBuf) -> Self {
        Self { path, source: None }
    }

    pub(crate) fn failed(path: PathBuf, source: std::io::Error) -> Self {
        Self {
            path,
            source: Some(source),
        }
    }

    /// The path of the file that was left behind.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Display for DeletionWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(e) => write!(
                f,
                "Unable to delete temporary file {}: {e}",
                self.path.display()
            ),
            None => write!(f, "Unable to delete temporary file {}", self.path.display()),
        }
    }
}

impl std::error::Error for DeletionWarning {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
