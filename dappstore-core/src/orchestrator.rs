// dappstore-core/src/orchestrator.rs
use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dappstore_common::config::Config;
use dappstore_common::error::{Result, StoreError};
use tracing::{debug, error};

use crate::engine::{ContentStore, ContractInvoker};
use crate::install::{install_from_reader, InstalledApp};
use crate::publish::PublishFlow;
use crate::registry::RegistryClient;
use crate::store::LocalAppStore;

/// Top-level facade wiring the registry, the local store, the publish flow
/// and the content-addressed fetch/install path together. All collaborators
/// are injected at construction.
pub struct DappStore {
    config: Config,
    store: LocalAppStore,
    registry: RegistryClient,
    publish: PublishFlow,
    content_store: Arc<dyn ContentStore>,
    installs_in_flight: Mutex<HashSet<String>>,
}

impl DappStore {
    pub fn new(
        config: Config,
        invoker: Arc<dyn ContractInvoker>,
        content_store: Arc<dyn ContentStore>,
    ) -> Self {
        let store = LocalAppStore::new(config.clone());
        let registry = RegistryClient::new(Arc::clone(&invoker), store.clone());
        let publish = PublishFlow::new(invoker, Arc::clone(&content_store), config.clone());
        Self {
            config,
            store,
            registry,
            publish,
            content_store,
            installs_in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn local(&self) -> &LocalAppStore {
        &self.store
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn publish(&self) -> &PublishFlow {
        &self.publish
    }

    /// Fetches the app `guid` from the content-addressed store and installs
    /// it, returning the installed app's display name. The guid must come
    /// from the current registry list. At most one install per guid runs at
    /// a time; a second concurrent request fails fast.
    pub async fn install_by_id(&self, guid: &str) -> Result<String> {
        let record = self.registry.app(guid).ok_or_else(|| {
            StoreError::NotFound(format!("dapp {guid} is not in the current list"))
        })?;
        let _guard = self.begin_install(guid)?;

        debug!("Installing dapp {} from the content store", record.name);
        let data = self
            .content_store
            // Zero means the store-default timeout.
            .get(&record.content_id, Duration::ZERO)
            .await
            .map_err(|err| {
                error!("Failed to get app from the content store: {}", err);
                err
            })?;

        let installed = self
            .run_install(data, Some(record.name.clone()))
            .await
            .map_err(|err| {
                error!("Failed to install dapp: {}", err);
                err
            })?;
        Ok(installed.name)
    }

    /// Installs an app from a local archive file. Tolerates `file:` prefixes
    /// with a mangled number of leading slashes, as produced by some shells.
    pub async fn install_from_file(&self, raw_path: &str) -> Result<String> {
        let path = normalize_file_path(raw_path);
        debug!("Installing dapp from file {} | {}", raw_path, path.display());

        let data = tokio::fs::read(&path).await.map_err(|err| {
            error!("Failed to read dapp file {}: {}", path.display(), err);
            StoreError::ArchiveOpen(err.to_string())
        })?;

        let manifest = crate::install::read_archive_manifest(Cursor::new(&data[..]))?;
        let _guard = self.begin_install(&manifest.guid)?;

        let installed = self.run_install(data, None).await.map_err(|err| {
            error!("Failed to install dapp: {}", err);
            err
        })?;
        Ok(installed.name)
    }

    async fn run_install(
        &self,
        data: Vec<u8>,
        expected_name: Option<String>,
    ) -> Result<InstalledApp> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            install_from_reader(Cursor::new(data), &config, expected_name.as_deref())
        })
        .await
        .map_err(|err| StoreError::Generic(format!("install task failed: {err}")))?
    }

    fn begin_install(&self, guid: &str) -> Result<InstallGuard<'_>> {
        let mut in_flight = lock(&self.installs_in_flight);
        if !in_flight.insert(guid.to_string()) {
            return Err(StoreError::Generic(format!(
                "install of {guid} is already in progress"
            )));
        }
        Ok(InstallGuard {
            set: &self.installs_in_flight,
            guid: guid.to_string(),
        })
    }
}

struct InstallGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    guid: String,
}

impl Drop for InstallGuard<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.guid);
    }
}

fn lock<'a>(set: &'a Mutex<HashSet<String>>) -> MutexGuard<'a, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn normalize_file_path(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("file:") {
        let trimmed = rest.trim_start_matches('/');
        if cfg!(windows) {
            return PathBuf::from(trimmed);
        }
        return PathBuf::from(format!("/{trimmed}"));
    }
    PathBuf::from(raw)
}
