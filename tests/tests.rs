use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile_registry::{
    ConfigurationIssue, DirectoryIssue, Error, Options, Registry, State, TempFile,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Whether the current user can write to `path`, e.g. because tests run as root.
fn can_write(path: &Path) -> bool {
    let probe = path.join(".tempfile-registry-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(probe);
            true
        }
        Err(_) => false,
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "tempfile-registry-it-{name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn file_is_deleted_when_dropping() {
    let path = {
        let file = TempFile::new().await.unwrap();
        assert!(file.file_path().is_file());
        file.file_path().clone()
    };

    // File is now deleted.
    assert!(!path.is_file());
    assert!(!Registry::global().contains(&path));
}

#[tokio::test]
async fn default_file_is_empty_and_named_randomly() {
    let file = TempFile::new().await.unwrap();
    assert_eq!(std::fs::metadata(file.file_path()).unwrap().len(), 0);
    assert!(file.file_path().is_absolute());

    let (stem, extension) = file.filename().split_once('.').unwrap();
    assert_eq!(extension, "tmp");
    assert_eq!(stem.len(), 8);
    assert!(stem.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(file.file_path().file_name().unwrap(), file.filename());
}

#[tokio::test]
async fn write_then_release() {
    let options = Options::new().extension("txt").filename("test");
    let mut file = TempFile::with_options(options).await.unwrap();
    assert_eq!(file.filename(), "test.txt");

    tokio::fs::write(file.file_path(), "Hello, world!").await.unwrap();
    assert_eq!(std::fs::metadata(file.file_path()).unwrap().len(), 13);

    assert!(file.release().is_none());
    assert!(!file.file_path().exists());
    assert!(!Registry::global().contains(file.file_path()));
}

#[tokio::test]
async fn custom_options_are_applied() {
    let dir = scratch_dir("custom");
    let options = Options::new()
        .extension("txt")
        .filename("testfile")
        .prefix("prefix_")
        .suffix("_suffix")
        .random_length(5)
        .directory(&dir);
    let file = TempFile::with_options(options).await.unwrap();

    assert_eq!(file.filename(), "prefix_testfile_suffix.txt");
    assert_eq!(file.file_path().parent().unwrap(), dir);

    drop(file);
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn map_options_are_applied() {
    let dir = scratch_dir("map");
    let options = Options::from_map([
        ("prefix", json!("a_")),
        ("filename", json!("../evil name!")),
        ("suffix", json!("_b")),
        ("extension", json!(".tmp")),
        ("directory", json!(dir.to_str().unwrap())),
    ])
    .unwrap();
    let file = TempFile::with_options(options).await.unwrap();

    assert_eq!(file.filename(), "a_..evilname_b.tmp");
    assert_eq!(file.file_path(), &dir.join("a_..evilname_b.tmp"));

    drop(file);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn invalid_configuration_is_rejected() {
    let err = Options::from_map([("prefix", json!([]))]).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfiguration {
            issue: ConfigurationIssue::UnsupportedType("array"),
            ..
        }
    ));

    let err = Options::from_map([("invalid_option", json!("value"))]).unwrap_err();
    match err {
        Error::InvalidConfiguration { key, issue } => {
            assert_eq!(key, "invalid_option");
            assert_eq!(issue, ConfigurationIssue::UnknownKey);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_directory_is_rejected() {
    let registry = Arc::new(Registry::new());
    let options = Options::new().directory("/nonexistent/directory");
    let err = TempFile::with_registry(options, registry.clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidDirectory {
            issue: DirectoryIssue::Missing,
            ..
        }
    ));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn blocked_path_fails_creation_and_registers_nothing() {
    let dir = scratch_dir("blocked");
    std::fs::create_dir(dir.join("x.tmp")).unwrap();

    let registry = Arc::new(Registry::new());
    let options = Options::new().filename("x").directory(&dir);
    let err = TempFile::with_registry(options, registry.clone())
        .await
        .unwrap_err();
    match err {
        Error::CreationFailed { path, .. } => assert_eq!(path, dir.join("x.tmp")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(registry.is_empty());

    // The directory in the way is left untouched.
    assert!(dir.join("x.tmp").is_dir());
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn readonly_directory_is_rejected() {
    let root = Path::new("/");
    if can_write(root) {
        // Running with elevated privileges; the root directory is writable.
        return;
    }

    let options = Options::new().directory(root);
    let err = TempFile::with_options(options).await.unwrap_err();
    match err {
        Error::InvalidDirectory { path, issue } => {
            assert_eq!(path, root);
            assert_eq!(issue, DirectoryIssue::NotWritable);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn created_file_is_writable() {
    let options = Options::new().directory(std::env::temp_dir());
    let file = TempFile::with_options(options).await.unwrap();
    let metadata = std::fs::metadata(file.file_path()).unwrap();
    assert!(!metadata.permissions().readonly());
}

#[tokio::test]
async fn release_twice_is_harmless() {
    let registry = Arc::new(Registry::new());
    let mut file = TempFile::with_registry(Options::default(), registry.clone())
        .await
        .unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(file.state(), State::Created);

    assert!(file.release().is_none());
    assert!(file.release().is_none());
    assert_eq!(file.state(), State::Deleted);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn close_consumes_and_deletes() {
    let file = TempFile::new().await.unwrap();
    let path = file.file_path().clone();
    assert!(file.close().is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn read_and_write_through_handles() {
    let file = TempFile::new().await.unwrap();
    {
        let mut writer = file.open_rw().await.unwrap();
        writer.write_all(b"payload").await.unwrap();
        writer.flush().await.unwrap();
    }

    let mut reader = file.open_ro().await.unwrap();
    let mut contents = String::new();
    reader.read_to_string(&mut contents).await.unwrap();
    assert_eq!(contents, "payload");

    // Open handles do not keep the instance alive.
    drop(reader);
    let path = file.file_path().clone();
    drop(file);
    assert!(!path.exists());
}

#[tokio::test]
async fn existing_file_is_adopted() {
    let dir = scratch_dir("adopt");
    std::fs::write(dir.join("keep.tmp"), b"old").unwrap();

    let options = Options::new().filename("keep").directory(&dir);
    let file = TempFile::with_options(options).await.unwrap();
    assert_eq!(std::fs::read(file.file_path()).unwrap(), b"old");

    drop(file);
    assert!(!dir.join("keep.tmp").exists());
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn files_in_isolated_registry_are_tracked() {
    let registry = Arc::new(Registry::new());
    let first = TempFile::with_registry(Options::default(), registry.clone())
        .await
        .unwrap();
    let second = TempFile::with_registry(Options::default(), registry.clone())
        .await
        .unwrap();

    assert_ne!(first.file_path(), second.file_path());
    assert_eq!(
        registry.paths(),
        vec![first.file_path().clone(), second.file_path().clone()]
    );

    drop(first);
    assert_eq!(registry.paths(), vec![second.file_path().clone()]);
}

#[tokio::test]
async fn leaked_file_is_swept_by_registry() {
    let registry = Arc::new(Registry::new());
    let file = TempFile::with_registry(Options::default(), registry.clone())
        .await
        .unwrap();
    let path = file.file_path().clone();

    // Skip the instance's own cleanup.
    std::mem::forget(file);
    assert!(path.exists());

    assert_eq!(registry.cleanup(), 1);
    assert!(!path.exists());
    assert!(registry.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn readonly_file_stays_registered_after_release() {
    use std::os::unix::fs::PermissionsExt;

    let dir = scratch_dir("readonly");
    let registry = Arc::new(Registry::new());
    let options = Options::new().filename("locked").directory(&dir);
    let mut file = TempFile::with_registry(options, registry.clone())
        .await
        .unwrap();
    let path = file.file_path().clone();

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();
    if std::fs::OpenOptions::new().write(true).open(&path).is_ok() {
        // Running with elevated privileges; permissions are not enforced.
        drop(file);
        std::fs::remove_dir_all(dir).unwrap();
        return;
    }

    let warning = file.release().expect("release should report the locked file");
    assert_eq!(warning.path(), &path);
    assert_eq!(file.state(), State::Deleted);
    assert!(path.exists());
    assert!(registry.contains(&path));

    // The sweep leaves non-writable files alone as well.
    assert_eq!(registry.cleanup(), 0);
    assert!(registry.contains(&path));

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(registry.cleanup(), 1);
    assert!(!path.exists());
    std::fs::remove_dir_all(dir).unwrap();
}
