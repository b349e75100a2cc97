use crate::errors::{ConfigurationIssue, Error};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The extension used when none is given.
pub const DEFAULT_EXTENSION: &str = "tmp";

/// The length of the random stem used when no file name is given.
pub const DEFAULT_RANDOM_LENGTH: usize = 8;

/// The longest random stem accepted; common file systems limit names to 255 bytes.
pub const MAX_RANDOM_LENGTH: usize = 255;

/// The recognized option keys.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum OptionKey {
    Extension,
    Filename,
    Prefix,
    Suffix,
    RandomLength,
    Directory,
}

impl OptionKey {
    /// Every recognized key, in documentation order.
    pub const ALL: [OptionKey; 6] = [
        OptionKey::Extension,
        OptionKey::Filename,
        OptionKey::Prefix,
        OptionKey::Suffix,
        OptionKey::RandomLength,
        OptionKey::Directory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Filename => "filename",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::RandomLength => "random_length",
            Self::Directory => "directory",
        }
    }
}

impl Display for OptionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidConfiguration {
                key: s.to_string(),
                issue: ConfigurationIssue::UnknownKey,
            })
    }
}

/// Describes how a temporary file is named and where it is placed.
///
/// ## Example
///
/// ```
/// # use tempfile_registry::Options;
/// let options = Options::new()
///     .prefix("report_")
///     .filename("draft")
///     .extension(".txt");
/// assert_eq!(options.extension_str(), "txt");
/// assert_eq!(options.filename_str(), Some("draft"));
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Options {
    extension: String,
    filename: Option<String>,
    prefix: Option<String>,
    suffix: Option<String>,
    random_length: usize,
    directory: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            filename: None,
            prefix: None,
            suffix: None,
            random_length: DEFAULT_RANDOM_LENGTH,
            directory: None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file extension. Leading dots are stripped.
    pub fn extension<S: AsRef<str>>(mut self, extension: S) -> Self {
        self.extension = extension.as_ref().trim_start_matches('.').to_string();
        self
    }

    /// Uses `filename` as the stem instead of a random one.
    pub fn filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the text placed between the stem and the extension.
    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Sets the length of the random stem. Ignored when a file name is given.
    pub fn random_length(mut self, length: usize) -> Self {
        self.random_length = length;
        self
    }

    /// Places the file in `directory` instead of resolving one automatically.
    pub fn directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn extension_str(&self) -> &str {
        &self.extension
    }

    pub fn filename_str(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn prefix_str(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix_str(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn random_len(&self) -> usize {
        self.random_length
    }

    pub fn directory_path(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Builds options from loosely typed key/value pairs.
    ///
    /// Every key must be one of [`OptionKey::ALL`] and every value must be a
    /// string or an integer. Keys that are absent keep their defaults.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tempfile_registry::{Error, Options};
    /// # use serde_json::json;
    /// let options = Options::from_map([
    ///     ("extension", json!("txt")),
    ///     ("random_length", json!(5)),
    /// ])?;
    /// assert_eq!(options.random_len(), 5);
    ///
    /// let err = Options::from_map([("bogus", json!("x"))]).unwrap_err();
    /// assert!(matches!(err, Error::InvalidConfiguration { .. }));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn from_map<I, K>(entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in entries {
            let key: OptionKey = key.as_ref().parse()?;
            options = match key {
                OptionKey::Extension => options.extension(string_value(key, &value)?),
                OptionKey::Filename => options.filename(string_value(key, &value)?),
                OptionKey::Prefix => options.prefix(string_value(key, &value)?),
                OptionKey::Suffix => options.suffix(string_value(key, &value)?),
                OptionKey::RandomLength => options.random_length(length_value(key, &value)?),
                OptionKey::Directory => options.directory(string_value(key, &value)?),
            };
        }
        options.validate()?;
        Ok(options)
    }

    /// Checks the invariants the builder cannot enforce on its own.
    pub fn validate(&self) -> Result<(), Error> {
        if self.random_length == 0 {
            return Err(invalid(OptionKey::RandomLength, ConfigurationIssue::NotPositive));
        }
        if self.random_length > MAX_RANDOM_LENGTH {
            return Err(invalid(
                OptionKey::RandomLength,
                ConfigurationIssue::TooLong(MAX_RANDOM_LENGTH),
            ));
        }
        Ok(())
    }
}

impl TryFrom<Map<String, Value>> for Options {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

fn invalid(key: OptionKey, issue: ConfigurationIssue) -> Error {
    Error::InvalidConfiguration {
        key: key.to_string(),
        issue,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts strings as-is and renders integers in decimal.
fn string_value(key: OptionKey, value: &Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if !n.is_f64() => Ok(n.to_string()),
        other => Err(invalid(
            key,
            ConfigurationIssue::UnsupportedType(type_name(other)),
        )),
    }
}

fn length_value(key: OptionKey, value: &Value) -> Result<usize, Error> {
    let length = match value {
        Value::Number(n) if n.is_u64() => n.as_u64(),
        Value::Number(n) if n.is_i64() => {
            return Err(invalid(key, ConfigurationIssue::NotPositive));
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) if n <= 0 => return Err(invalid(key, ConfigurationIssue::NotPositive)),
            Ok(n) => Some(n as u64),
            Err(_) => return Err(invalid(key, ConfigurationIssue::NotAnInteger)),
        },
        other => {
            return Err(invalid(
                key,
                ConfigurationIssue::UnsupportedType(type_name(other)),
            ))
        }
    };

    length
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(key, ConfigurationIssue::NotAnInteger))
}
