// dappstore-core/src/store.rs
use std::collections::HashSet;
use std::fs;

use dappstore_common::config::{Config, MANIFEST_FILE_NAME};
use dappstore_common::error::Result;
use dappstore_common::model::manifest::{parse_manifest, AppManifest, UrlResolution};
use tracing::{debug, warn};

/// Read side of the on-disk app layout: one directory per installed app,
/// named by its guid, holding a manifest file plus the app payload. Lookups
/// read the manifest fresh each time; there is no persistent index.
#[derive(Debug, Clone)]
pub struct LocalAppStore {
    config: Config,
}

impl LocalAppStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the manifest of the installed app `guid`, or `None` when the
    /// app is not installed. A present but unreadable or corrupt install is
    /// logged and also reported as not installed.
    pub fn lookup(&self, guid: &str) -> Option<AppManifest> {
        let app_dir = self.config.app_dir(guid);
        if !app_dir.is_dir() {
            return None;
        }

        let manifest_path = app_dir.join(MANIFEST_FILE_NAME);
        let content = match fs::read_to_string(&manifest_path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "Error while reading local app from {}, {}",
                    manifest_path.display(),
                    err
                );
                return None;
            }
        };

        let resolution = UrlResolution::Server {
            server_addr: self.config.server_addr(),
            app_folder: guid,
            base_folder: &app_dir,
        };
        match parse_manifest(&content, &resolution) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!(
                    "Error while reading local app from {}, {}",
                    manifest_path.display(),
                    err
                );
                None
            }
        }
    }

    /// Enumerates the guids of all installed apps by listing the store root.
    /// A missing root means nothing is installed.
    pub fn installed_ids(&self) -> Result<HashSet<String>> {
        let root = self.config.apps_root();
        if !root.is_dir() {
            debug!("Apps root {} does not exist yet", root.display());
            return Ok(HashSet::new());
        }

        let mut ids = HashSet::new();
        for entry in fs::read_dir(root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error reading entry in {}: {}", root.display(), err);
                    continue;
                }
            };
            if entry.path().is_dir() {
                ids.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(ids)
    }
}
