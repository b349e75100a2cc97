//! # tempfile-registry
//!
//! Provides the [`TempFile`] struct, a uniquely named temporary file that is deleted
//! when the instance is released or dropped. Every file is also recorded in a
//! [`Registry`]; files whose instances never got to clean up (e.g. because they were
//! leaked or the process called [`std::process::exit`]) are swept when the process exits.
//!
//! ```
//! use tempfile_registry::{Options, TempFile};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = Options::new().filename("test").extension("txt");
//!     let file = TempFile::with_options(options).await.unwrap();
//!     assert_eq!(file.filename(), "test.txt");
//!
//!     tokio::fs::write(file.file_path(), "Hello, world!").await.unwrap();
//!     let path = file.file_path().clone();
//!
//!     // Dropping the instance deletes the file.
//!     drop(file);
//!     assert!(!path.exists());
//! }
//! ```
//!
//! ## Naming
//!
//! File names are composed as `prefix + stem + suffix + "." + extension`. The stem is
//! the given file name or a random alphanumeric string. Every character outside
//! `[A-Za-z0-9.-_]` is removed from the result.
//!
//! ## Features
//!
//! * `exit-hook` - (Default) Sweeps the global [`Registry`] when the process exits normally.
//!   Without it, hold a [`CleanupGuard`] from [`Registry::cleanup_guard`] in `main`.

// Document crate features on docs.rs.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod directory;
mod errors;
mod options;
mod random_name;
mod registry;
mod tempfile;

pub use directory::{DirectoryResolver, DATA_DIR_NAMESPACE};
pub use errors::{ConfigurationIssue, DeletionWarning, DirectoryIssue, Error};
pub use options::{
    OptionKey, Options, DEFAULT_EXTENSION, DEFAULT_RANDOM_LENGTH, MAX_RANDOM_LENGTH,
};
pub use registry::{CleanupGuard, Registry};
pub use tempfile::{State, TempFile};
