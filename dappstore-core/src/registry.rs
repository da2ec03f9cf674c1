// dappstore-core/src/registry.rs
use std::sync::{Arc, Mutex, MutexGuard};

use dappstore_common::error::{Result, StoreError};
use dappstore_common::model::dapp::{decode_dapps_response, version_newer, DappRecord};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::{ContractInvoker, ShaderArgs};
use crate::store::LocalAppStore;

/// Client for the contract-backed dapp directory.
///
/// Holds the last successfully fetched app list; `refresh_apps` replaces it
/// wholesale, so readers observe either the old list or the complete new one.
pub struct RegistryClient {
    invoker: Arc<dyn ContractInvoker>,
    store: LocalAppStore,
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    apps: Arc<Vec<DappRecord>>,
    generation: u64,
    publisher_key: Option<String>,
}

impl RegistryClient {
    pub fn new(invoker: Arc<dyn ContractInvoker>, store: LocalAppStore) -> Self {
        Self {
            invoker,
            store,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Snapshot of the cached app list.
    pub fn apps(&self) -> Arc<Vec<DappRecord>> {
        Arc::clone(&self.lock_state().apps)
    }

    /// Cached record for `guid`, if it is in the current list.
    pub fn app(&self, guid: &str) -> Option<DappRecord> {
        self.lock_state()
            .apps
            .iter()
            .find(|app| app.guid == guid)
            .cloned()
    }

    /// Fetches the published app list from the contract and merges it with
    /// local install state. One malformed entry discards the whole batch; any
    /// failure leaves the cached list untouched. Results of a refresh that
    /// was overtaken by a newer one are discarded.
    pub async fn refresh_apps(&self) -> Result<Arc<Vec<DappRecord>>> {
        let started_at = self.lock_state().generation;

        let args =
            ShaderArgs::manager("view_dapps", self.store.config().store_cid())?.finish();
        let out = self.invoker.call_shader(&args).await.map_err(|err| {
            warn!("Failed to load dapps list, {}", err);
            err
        })?;

        let records = decode_dapps_response(&out.output).map_err(|err| {
            warn!("Error while parsing app from contract, {}", err);
            err
        })?;
        let merged: Vec<DappRecord> = records
            .into_iter()
            .map(|record| self.merge_local_state(record))
            .collect();

        let mut state = self.lock_state();
        if state.generation != started_at {
            debug!("Discarding dapp list refresh overtaken by a newer one");
            return Ok(Arc::clone(&state.apps));
        }
        state.generation += 1;
        state.apps = Arc::new(merged);
        debug!("Dapp list refreshed, {} apps", state.apps.len());
        Ok(Arc::clone(&state.apps))
    }

    fn merge_local_state(&self, mut record: DappRecord) -> DappRecord {
        match self.store.lookup(&record.guid) {
            Some(local) => {
                record.installed = true;
                record.has_update = local
                    .api_version
                    .as_deref()
                    .map(|installed| version_newer(&record.api_version, installed))
                    .unwrap_or(false);
                record.local_app_id = Some(local.app_id);
            }
            None => {
                record.installed = false;
            }
        }
        record
    }

    /// Returns the store's publisher key, caching the first non-empty result.
    /// An empty key is returned but never cached, so it is retried on the
    /// next call.
    pub async fn publisher_key(&self) -> Result<String> {
        if let Some(key) = self.lock_state().publisher_key.clone() {
            return Ok(key);
        }

        let args = ShaderArgs::manager("get_pk", self.store.config().store_cid())?.finish();
        let out = self.invoker.call_shader(&args).await.map_err(|err| {
            warn!("Failed to get publisher key, {}", err);
            err
        })?;

        let json: Value = serde_json::from_str(&out.output)?;
        let key = json
            .as_object()
            .filter(|obj| !obj.is_empty())
            .and_then(|obj| obj.get("pk"))
            .and_then(|pk| pk.as_str())
            .ok_or(StoreError::Response("get_pk"))?
            .to_string();

        if key.is_empty() {
            warn!("Contract returned an empty publisher key");
        } else {
            self.lock_state().publisher_key = Some(key.clone());
        }
        Ok(key)
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
