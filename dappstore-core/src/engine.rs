// dappstore-core/src/engine.rs
// Seams to the external wallet engine and the content-addressed store. Both
// are injected into the components that need them; nothing here is looked up
// globally.

use std::time::Duration;

use async_trait::async_trait;
use dappstore_common::error::{Result, StoreError};

/// Result of one contract invocation.
#[derive(Debug, Clone)]
pub struct ShaderOutput {
    /// JSON output produced by the contract method.
    pub output: String,
    /// Correlation id of the underlying transaction.
    pub tx_id: String,
}

/// Invokes the dapp store contract with a flat `key=value` argument string.
/// Transport failures surface as `StoreError::Contract`.
#[async_trait]
pub trait ContractInvoker: Send + Sync {
    async fn call_shader(&self, args: &str) -> Result<ShaderOutput>;
}

/// Content-addressed blob store (IPFS-like): objects are retrieved by a
/// digest of their content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores a blob and returns its content id.
    async fn put(&self, data: Vec<u8>) -> Result<String>;

    /// Fetches a blob by content id. A zero timeout means the store default.
    async fn get(&self, content_id: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Builder for contract argument strings of the form
/// `role=manager,action=view_dapps,cid=...,key=value`.
///
/// The wire format has no escaping, so values containing the separator
/// characters are rejected instead of producing an ambiguous string.
#[derive(Debug)]
pub struct ShaderArgs {
    buf: String,
}

impl ShaderArgs {
    pub fn manager(action: &'static str, cid: &str) -> Result<Self> {
        validate_value("cid", cid)?;
        Ok(Self {
            buf: format!("role=manager,action={action},cid={cid}"),
        })
    }

    pub fn push(&mut self, key: &'static str, value: &str) -> Result<&mut Self> {
        validate_value(key, value)?;
        self.buf.push(',');
        self.buf.push_str(key);
        self.buf.push('=');
        self.buf.push_str(value);
        Ok(self)
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

fn validate_value(key: &'static str, value: &str) -> Result<()> {
    if value.contains(',') || value.contains('=') {
        return Err(StoreError::InvalidArgument(format!(
            "value of '{key}' must not contain ',' or '='"
        )));
    }
    Ok(())
}
