// dappstore-core/src/testutil.rs
// Shared fixtures for the crate's unit tests: a throwaway store config,
// in-memory zip archives and scripted collaborator mocks.

use std::collections::VecDeque;
use std::fs;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dappstore_common::config::{Config, MANIFEST_FILE_NAME};
use dappstore_common::error::{Result, StoreError};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::engine::{ContentStore, ContractInvoker, ShaderOutput};

pub fn test_config() -> (TempDir, Config) {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config = Config {
        apps_root: tmp.path().join("apps"),
        server_addr: "127.0.0.1:34700".to_string(),
        store_cid: "testcid".to_string(),
    };
    (tmp, config)
}

pub fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    // Each entry is written as its own archive and merged in, because
    // `start_file` rejects repeated names while some tests need archives
    // containing duplicate entries.
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        let mut single = ZipWriter::new(Cursor::new(Vec::new()));
        single.start_file(*name, options).expect("zip entry");
        single.write_all(content.as_bytes()).expect("zip content");
        let archive = single.finish_into_readable().expect("zip entry finish");
        writer.merge_archive(archive).expect("zip merge");
    }
    writer.finish().expect("zip finish").into_inner()
}

pub fn write_installed_app(config: &Config, guid: &str, name: &str) {
    let app_dir = config.app_dir(guid);
    fs::create_dir_all(&app_dir).expect("app dir");
    let manifest = format!(
        r#"{{"guid":"{guid}","description":"d","name":"{name}","url":"localapp/index.html","api_version":"1.0"}}"#
    );
    fs::write(app_dir.join(MANIFEST_FILE_NAME), manifest).expect("manifest");
    fs::write(app_dir.join("index.html"), "<html></html>").expect("payload");
}

pub fn dapp_entry_json(guid: &str, name: &str, api_ver: &str) -> String {
    format!(
        r#"{{"id":"{guid}","publisher":"p1","description":"d","name":"{name}","ipfs_id":"cid123","api_ver":"{api_ver}","min_api_ver":"1.0"}}"#
    )
}

/// Contract invoker that replays scripted responses and records every
/// argument string it was called with.
pub struct MockInvoker {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockInvoker {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContractInvoker for MockInvoker {
    async fn call_shader(&self, args: &str) -> Result<ShaderOutput> {
        self.calls.lock().unwrap().push(args.to_string());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StoreError::Contract("no scripted response".to_string())));
        response.map(|output| ShaderOutput {
            output,
            tx_id: "tx0".to_string(),
        })
    }
}

/// Content store with fixed `put`/`get` outcomes; records stored blobs.
pub struct MockContentStore {
    put_result: Result<String>,
    get_result: Result<Vec<u8>>,
    puts: Mutex<Vec<Vec<u8>>>,
}

impl MockContentStore {
    pub fn new(put_result: Result<String>, get_result: Result<Vec<u8>>) -> Self {
        Self {
            put_result,
            get_result,
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn puts(&self) -> Vec<Vec<u8>> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn put(&self, data: Vec<u8>) -> Result<String> {
        self.puts.lock().unwrap().push(data);
        self.put_result.clone()
    }

    async fn get(&self, _content_id: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.get_result.clone()
    }
}
