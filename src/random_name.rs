use crate::errors::Error;
use crate::options::Options;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Represents a randomly generated file name stem.
///
/// The stem is drawn uniformly from `[A-Za-z0-9]`. It only needs to avoid
/// collisions, so the thread-local generator is good enough.
pub(crate) struct RandomName {
    name: String,
}

impl RandomName {
    pub fn new(length: usize) -> Self {
        let name = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        Self { name }
    }
}

impl AsRef<str> for RandomName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Builds the final file name: `prefix + stem + suffix + "." + extension`, sanitized.
pub(crate) fn compose(options: &Options) -> Result<String, Error> {
    let random;
    let stem = match options.filename_str() {
        Some(name) => name,
        None => {
            random = RandomName::new(options.random_len());
            random.as_ref()
        }
    };

    let name = format!(
        "{}{}{}.{}",
        options.prefix_str().unwrap_or_default(),
        stem,
        options.suffix_str().unwrap_or_default(),
        options.extension_str()
    );

    let sanitized = sanitize(&name);
    match sanitized.as_str() {
        "" | "." | ".." => Err(Error::InvalidName(name)),
        _ => Ok(sanitized),
    }
}

/// Drops every character outside `[A-Za-z0-9.\-_]`.
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}
