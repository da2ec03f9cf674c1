// dappstore-common/src/model/manifest.rs
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Placeholder token inside manifest `url`/`icon` fields that is rewritten to
/// an absolute root at parse time.
const LOCAL_URL_TOKEN: &str = "localapp";

/// Selects how the `localapp` placeholder is expanded.
///
/// `Server` is used when the app is served by the local HTTP server: the
/// `url` field is rooted at the server origin while `icon` still resolves to
/// the app directory on disk. `File` roots everything at a directory.
#[derive(Debug, Clone)]
pub enum UrlResolution<'a> {
    Server {
        server_addr: &'a str,
        app_folder: &'a str,
        base_folder: &'a Path,
    },
    File {
        base_folder: &'a Path,
    },
}

impl UrlResolution<'_> {
    fn url_root(&self) -> String {
        match self {
            UrlResolution::Server {
                server_addr,
                app_folder,
                ..
            } => format!("http://{server_addr}/{app_folder}"),
            UrlResolution::File { base_folder } => format!("file://{}", base_folder.display()),
        }
    }

    fn file_root(&self) -> String {
        let base_folder = match self {
            UrlResolution::Server { base_folder, .. } => base_folder,
            UrlResolution::File { base_folder } => base_folder,
        };
        format!("file://{}", base_folder.display())
    }
}

/// Validated app manifest. `app_id` is always computed locally from
/// `(name, url)` and never read from the input, so a manifest cannot spoof
/// its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppManifest {
    pub guid: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub icon: Option<String>,
    pub api_version: Option<String>,
    pub min_api_version: Option<String>,
    pub app_id: String,
}

/// Deterministic app identity digest over the display name and resolved url.
pub fn generate_app_id(name: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parses and validates a manifest document.
///
/// Required fields `guid`, `description`, `name` and `url` must be present,
/// non-empty strings; each violation yields a `ManifestField` error naming
/// the offending field. The `localapp` placeholder in `url` is expanded per
/// `resolution`; `icon` always resolves against the file root.
pub fn parse_manifest(content: &str, resolution: &UrlResolution<'_>) -> Result<AppManifest> {
    if content.trim().is_empty() {
        return Err(StoreError::ManifestShape(
            "failed to read the manifest file".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(content)?;
    let obj = match value.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => {
            return Err(StoreError::ManifestShape(
                "manifest is not a JSON object".to_string(),
            ))
        }
    };

    let guid = required_str(obj, "guid")?;
    let description = required_str(obj, "description")?;
    let name = required_str(obj, "name")?;

    let raw_url = required_str(obj, "url")?;
    let url = raw_url.replace(LOCAL_URL_TOKEN, &resolution.url_root());

    let icon = optional_str(obj, "icon")?
        .map(|icon| icon.replace(LOCAL_URL_TOKEN, &resolution.file_root()));
    if let Some(icon) = &icon {
        debug!("App: {}, icon: {}", name, icon);
    }

    let api_version = optional_str(obj, "api_version")?;
    let min_api_version = optional_str(obj, "min_api_version")?;

    let app_id = generate_app_id(&name, &url);

    Ok(AppManifest {
        guid,
        name,
        description,
        url,
        icon,
        api_version,
        min_api_version,
        app_id,
    })
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(StoreError::ManifestField(field)),
    }
}

fn optional_str(obj: &Map<String, Value>, field: &'static str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        // An empty string carries no value and is treated as absent.
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(StoreError::ManifestField(field)),
    }
}
