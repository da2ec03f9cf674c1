// dappstore-core/src/publish.rs
use std::io::Cursor;
use std::sync::Arc;

use dappstore_common::config::Config;
use dappstore_common::error::{Result, StoreError};
use dappstore_common::model::manifest::AppManifest;
use tracing::{debug, error};

use crate::engine::{ContentStore, ContractInvoker, ShaderArgs};
use crate::install::read_archive_manifest;

/// Two-phase publish: store the app archive in the content-addressed store,
/// then register the returned content id with the directory contract. A
/// failed registration does not remove the stored blob; content addressing
/// makes the orphan harmless on retry.
pub struct PublishFlow {
    invoker: Arc<dyn ContractInvoker>,
    content_store: Arc<dyn ContentStore>,
    config: Config,
}

impl PublishFlow {
    pub fn new(
        invoker: Arc<dyn ContractInvoker>,
        content_store: Arc<dyn ContentStore>,
        config: Config,
    ) -> Self {
        Self {
            invoker,
            content_store,
            config,
        }
    }

    /// Validates the archive's embedded manifest, uploads the archive and
    /// registers it. Returns the content id on success.
    pub async fn upload_app(&self, archive: Vec<u8>) -> Result<String> {
        let manifest = read_archive_manifest(Cursor::new(&archive[..])).map_err(|err| {
            error!("Failed to upload dapp: {}", err);
            err
        })?;

        let content_id = self.content_store.put(archive).await.map_err(|err| {
            error!("Failed to add to the content store: {}", err);
            err
        })?;
        debug!("Archive stored, content id {}", content_id);

        self.register_app(&manifest, &content_id).await?;
        Ok(content_id)
    }

    async fn register_app(&self, manifest: &AppManifest, content_id: &str) -> Result<()> {
        let mut args = ShaderArgs::manager("add_dapp", self.config.store_cid())?;
        args.push("ipfs_id", content_id)?
            .push("name", &manifest.name)?
            .push("id", &manifest.guid)?
            .push("description", &manifest.description)?
            .push("api_ver", manifest.api_version.as_deref().unwrap_or(""))?
            .push(
                "min_api_ver",
                manifest.min_api_version.as_deref().unwrap_or(""),
            )?;

        let out = self
            .invoker
            .call_shader(&args.finish())
            .await
            .map_err(|err| {
                error!("Failed to publish app, {}", err);
                StoreError::Publish(err.to_string())
            })?;
        debug!("App {} added, tx {}", manifest.name, out.tx_id);
        Ok(())
    }

    /// Registers the caller as a publisher under `name`.
    pub async fn register_publisher(&self, name: &str) -> Result<()> {
        let mut args = ShaderArgs::manager("add_publisher", self.config.store_cid())?;
        args.push("name", name)?;

        let out = self
            .invoker
            .call_shader(&args.finish())
            .await
            .map_err(|err| {
                error!("Failed to add publisher, {}", err);
                StoreError::Publish(err.to_string())
            })?;
        debug!("Publisher registered, tx {}", out.tx_id);
        Ok(())
    }
}
