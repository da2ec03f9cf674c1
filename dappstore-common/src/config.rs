// dappstore-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

/// File name of the manifest inside every installed app directory and every
/// distributable archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:34700";
const DEFAULT_STORE_CID: &str =
    "c7bfd39e04ab9ff2f21615e52d973867f9c70b43ffb4f6f7f086b5ba1de08567";
const APPS_ROOT_DIR_NAME: &str = ".dappstore/apps";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory under which each installed app owns one subdirectory
    /// keyed by its guid.
    pub apps_root: PathBuf,
    /// Address of the local server that serves installed apps over HTTP.
    pub server_addr: String,
    /// Contract id of the dapp store directory.
    pub store_cid: String,
}

impl Config {
    pub fn load() -> Self {
        debug!("Loading dapp store configuration");

        let apps_root = env::var("DAPPSTORE_APPS_ROOT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::home_dir().join(APPS_ROOT_DIR_NAME));

        let server_addr = env::var("DAPPSTORE_SERVER_ADDR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        let store_cid = env::var("DAPPSTORE_CID")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_CID.to_string());

        debug!("Effective apps root set to: {}", apps_root.display());
        Self {
            apps_root,
            server_addr,
            store_cid,
        }
    }

    pub fn apps_root(&self) -> &Path {
        &self.apps_root
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn store_cid(&self) -> &str {
        &self.store_cid
    }

    pub fn app_dir(&self, guid: &str) -> PathBuf {
        self.apps_root.join(guid)
    }

    pub fn app_manifest_path(&self, guid: &str) -> PathBuf {
        self.app_dir(guid).join(MANIFEST_FILE_NAME)
    }

    fn home_dir() -> PathBuf {
        UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::load()
    }
}
