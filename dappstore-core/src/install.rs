// dappstore-core/src/install.rs
use std::fs::{self, File};
use std::io::{self, Read, Seek};
#[cfg(unix)]
use std::os::unix::fs as unix_fs;
use std::path::{Component, Path, PathBuf};

use dappstore_common::config::{Config, MANIFEST_FILE_NAME};
use dappstore_common::error::{Result, StoreError};
use dappstore_common::model::manifest::{parse_manifest, AppManifest, UrlResolution};
use tracing::{debug, error, warn};
use zip::read::ZipArchive;

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstalledApp {
    pub guid: String,
    pub name: String,
    pub path: PathBuf,
}

/// Scans a zip archive for its embedded manifest and validates it.
///
/// The scan runs over every entry; when more than one entry is literally
/// named `manifest.json`, the last one provides the app identity. Returns
/// `InvalidArchive` when no manifest entry exists.
pub fn read_archive_manifest<R: Read + Seek>(source: R) -> Result<AppManifest> {
    let mut archive =
        ZipArchive::new(source).map_err(|e| StoreError::ArchiveOpen(e.to_string()))?;
    scan_manifest(&mut archive)
}

fn scan_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<AppManifest> {
    let mut manifest: Option<AppManifest> = None;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| StoreError::ArchiveOpen(e.to_string()))?;
        if entry.name() != MANIFEST_FILE_NAME {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| StoreError::ArchiveOpen(e.to_string()))?;

        // No install folder exists yet, so local references root at nothing.
        let resolution = UrlResolution::File {
            base_folder: Path::new(""),
        };
        manifest = Some(parse_manifest(&content, &resolution)?);
    }

    manifest.ok_or(StoreError::InvalidArchive)
}

/// Installs a zip archive into the local store.
///
/// The target directory is `<apps_root>/<guid>`; a prior install of the same
/// guid is removed wholesale before extraction, so the new payload fully
/// replaces the old one. A deletion failure aborts the install with
/// `InstallPrepare`. When `expected_name` is given, a mismatch against the
/// manifest name is logged but does not fail the install.
pub fn install_from_reader<R: Read + Seek>(
    source: R,
    config: &Config,
    expected_name: Option<&str>,
) -> Result<InstalledApp> {
    let mut archive =
        ZipArchive::new(source).map_err(|e| StoreError::ArchiveOpen(e.to_string()))?;

    let manifest = scan_manifest(&mut archive)?;
    validate_guid(&manifest.guid)?;

    if let Some(expected) = expected_name {
        if expected != manifest.name {
            warn!(
                "Mismatched dapp names, expected - {}, resulting - {}",
                expected, manifest.name
            );
        }
    }

    let app_dir = config.app_dir(&manifest.guid);
    if app_dir.exists() {
        fs::remove_dir_all(&app_dir).map_err(|e| {
            StoreError::InstallPrepare(app_dir.display().to_string(), e.to_string())
        })?;
    }
    fs::create_dir_all(&app_dir).map_err(|e| {
        StoreError::InstallPrepare(app_dir.display().to_string(), e.to_string())
    })?;

    let extracted = extract_zip_archive(&mut archive, &app_dir)?;
    if extracted == 0 {
        return Err(StoreError::ExtractFailed(app_dir.display().to_string()));
    }

    debug!(
        "Installed dapp {} ({}) into {}",
        manifest.name,
        manifest.guid,
        app_dir.display()
    );
    Ok(InstalledApp {
        guid: manifest.guid,
        name: manifest.name,
        path: app_dir,
    })
}

// The guid names the install directory, so it must be a single normal path
// component.
fn validate_guid(guid: &str) -> Result<()> {
    let mut components = Path::new(guid).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StoreError::ManifestField("guid")),
    }
}

/// Extracts every archive entry into `target_dir`, returning the number of
/// regular files written. Entry paths are sanitized against traversal out of
/// the target directory.
fn extract_zip_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    target_dir: &Path,
) -> Result<usize> {
    debug!("Starting ZIP extraction into {}", target_dir.display());
    let mut files_written = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| StoreError::ArchiveOpen(e.to_string()))?;

        let entry_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                debug!("Skipping unsafe ZIP entry name {}", entry.name());
                continue;
            }
        };
        if entry_path.components().next().is_none() {
            continue;
        }

        let mut target_path = target_dir.to_path_buf();
        for comp in entry_path.components() {
            match comp {
                Component::Normal(p) => target_path.push(p),
                Component::CurDir => {}
                _ => {
                    error!(
                        "Disallowed component {:?} in ZIP path {}",
                        comp,
                        entry_path.display()
                    );
                    return Err(StoreError::ExtractFailed(format!(
                        "disallowed component in ZIP path {}",
                        entry_path.display()
                    )));
                }
            }
        }
        if !target_path.starts_with(target_dir) {
            error!(
                "ZIP path traversal detected: {} -> {}",
                entry_path.display(),
                target_path.display()
            );
            return Err(StoreError::ExtractFailed(format!(
                "ZIP path traversal detected for {}",
                entry_path.display()
            )));
        }

        if let Some(parent) = target_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        if entry.is_dir() {
            if !target_path.exists() {
                fs::create_dir_all(&target_path)?;
            }
        } else if entry.is_symlink() {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            let link_target = PathBuf::from(String::from_utf8_lossy(&buf).to_string());

            #[cfg(unix)]
            {
                if target_path.symlink_metadata().is_ok() {
                    let _ = fs::remove_file(&target_path);
                }
                unix_fs::symlink(&link_target, &target_path)
                    .map_err(|e| StoreError::Io(std::sync::Arc::new(e)))?;
            }
            #[cfg(not(unix))]
            {
                warn!(
                    "Cannot create symlink on non-unix system: {} -> {}",
                    target_path.display(),
                    link_target.display()
                );
            }
        } else {
            let mut out_file = File::create(&target_path)?;
            io::copy(&mut entry, &mut out_file)?;
            files_written += 1;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                if !entry.is_symlink() && target_path.is_file() {
                    fs::set_permissions(&target_path, fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }

    debug!(
        "Finished ZIP extraction into {} ({} files)",
        target_dir.display(),
        files_written
    );
    Ok(files_written)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use super::*;
    use crate::testutil::{make_zip, test_config};

    #[test]
    fn rejects_non_zip_input() {
        let (_tmp, config) = test_config();
        let result = install_from_reader(Cursor::new(b"definitely not a zip".to_vec()), &config, None);
        assert!(matches!(result, Err(StoreError::ArchiveOpen(_))));
    }

    #[test]
    fn archive_without_manifest_creates_nothing() {
        let (_tmp, config) = test_config();
        fs::create_dir_all(config.apps_root()).unwrap();
        let data = make_zip(&[("index.html", "<html></html>")]);

        let result = install_from_reader(Cursor::new(data), &config, None);
        assert!(matches!(result, Err(StoreError::InvalidArchive)));
        assert_eq!(fs::read_dir(config.apps_root()).unwrap().count(), 0);
    }

    #[test]
    fn installs_archive_into_guid_directory() {
        let (_tmp, config) = test_config();
        let manifest =
            r#"{"guid":"a1","description":"d","name":"Calc","url":"localapp/index.html"}"#;
        let data = make_zip(&[
            (MANIFEST_FILE_NAME, manifest),
            ("index.html", "<html></html>"),
            ("assets/app.js", "void 0;"),
        ]);

        let installed = install_from_reader(Cursor::new(data), &config, Some("Calc")).unwrap();
        assert_eq!(installed.guid, "a1");
        assert_eq!(installed.name, "Calc");
        assert!(config.app_manifest_path("a1").is_file());
        assert!(config.app_dir("a1").join("assets/app.js").is_file());
    }

    #[test]
    fn reinstall_replaces_the_whole_directory() {
        let (_tmp, config) = test_config();
        let manifest =
            r#"{"guid":"a1","description":"d","name":"Calc","url":"localapp/index.html"}"#;

        let first = make_zip(&[(MANIFEST_FILE_NAME, manifest), ("old.txt", "old")]);
        install_from_reader(Cursor::new(first), &config, None).unwrap();
        assert!(config.app_dir("a1").join("old.txt").is_file());

        let second = make_zip(&[(MANIFEST_FILE_NAME, manifest), ("new.txt", "new")]);
        install_from_reader(Cursor::new(second), &config, None).unwrap();
        assert!(config.app_dir("a1").join("new.txt").is_file());
        assert!(!config.app_dir("a1").join("old.txt").exists());
    }

    #[test]
    fn name_mismatch_does_not_fail_the_install() {
        let (_tmp, config) = test_config();
        let manifest =
            r#"{"guid":"a1","description":"d","name":"Calc","url":"localapp/index.html"}"#;
        let data = make_zip(&[(MANIFEST_FILE_NAME, manifest)]);

        let installed = install_from_reader(Cursor::new(data), &config, Some("Other")).unwrap();
        assert_eq!(installed.name, "Calc");
    }

    #[test]
    fn last_manifest_entry_wins() {
        let (_tmp, config) = test_config();
        let first =
            r#"{"guid":"a1","description":"d","name":"First","url":"localapp/index.html"}"#;
        let second =
            r#"{"guid":"a2","description":"d","name":"Second","url":"localapp/index.html"}"#;
        let data = make_zip(&[(MANIFEST_FILE_NAME, first), (MANIFEST_FILE_NAME, second)]);

        let installed = install_from_reader(Cursor::new(data), &config, None).unwrap();
        assert_eq!(installed.guid, "a2");
        assert_eq!(installed.name, "Second");
        assert!(config.app_dir("a2").is_dir());
    }

    #[test]
    fn rejects_guid_that_escapes_the_store_root() {
        let (_tmp, config) = test_config();
        let manifest =
            r#"{"guid":"../evil","description":"d","name":"Calc","url":"localapp/index.html"}"#;
        let data = make_zip(&[(MANIFEST_FILE_NAME, manifest)]);

        let result = install_from_reader(Cursor::new(data), &config, None);
        assert!(matches!(result, Err(StoreError::ManifestField("guid"))));
    }

    #[test]
    fn nested_manifest_entries_are_not_identity() {
        let (_tmp, config) = test_config();
        let data = make_zip(&[("sub/manifest.json", r#"{"guid":"x"}"#)]);
        let result = install_from_reader(Cursor::new(data), &config, None);
        assert!(matches!(result, Err(StoreError::InvalidArchive)));
    }
}
