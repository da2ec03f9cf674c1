// dappstore-common/src/model/dapp.rs
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// One published app as reported by the store contract, merged with local
/// install state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DappRecord {
    pub guid: String,
    pub publisher: String,
    pub description: String,
    pub name: String,
    pub content_id: String,
    pub api_version: String,
    pub min_api_version: String,
    pub installed: bool,
    pub has_update: bool,
    pub local_app_id: Option<String>,
}

impl DappRecord {
    /// Decodes one `view_dapps` entry. All wire fields are required strings;
    /// install state is filled in later by the registry client.
    pub fn from_wire(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or(StoreError::Response("view_dapps"))?;

        Ok(DappRecord {
            guid: wire_str(obj, "id")?,
            publisher: wire_str(obj, "publisher")?,
            description: wire_str(obj, "description")?,
            name: wire_str(obj, "name")?,
            content_id: wire_str(obj, "ipfs_id")?,
            api_version: wire_str(obj, "api_ver")?,
            min_api_version: wire_str(obj, "min_api_ver")?,
            installed: false,
            has_update: false,
            local_app_id: None,
        })
    }
}

fn wire_str(obj: &Map<String, Value>, field: &'static str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(StoreError::DappField(field)),
    }
}

/// Decodes the full `view_dapps` output. The `dapps` field is accepted both
/// as an array and as an index-keyed object map. One malformed entry fails
/// the whole batch.
pub fn decode_dapps_response(output: &str) -> Result<Vec<DappRecord>> {
    let json: Value = serde_json::from_str(output)?;
    let obj = json
        .as_object()
        .filter(|m| !m.is_empty())
        .ok_or(StoreError::Response("view_dapps"))?;

    let entries: Vec<&Value> = match obj.get("dapps") {
        Some(Value::Array(items)) if !items.is_empty() => items.iter().collect(),
        Some(Value::Object(map)) if !map.is_empty() => map.values().collect(),
        _ => return Err(StoreError::Response("view_dapps")),
    };

    entries.into_iter().map(DappRecord::from_wire).collect()
}

/// True when `remote` denotes a strictly newer version than `local`.
/// Versions that do not parse as dotted numeric triples compare as unknown
/// and yield `false`.
pub fn version_newer(remote: &str, local: &str) -> bool {
    match (lenient_version(remote), lenient_version(local)) {
        (Some(r), Some(l)) => r > l,
        _ => false,
    }
}

// Accepts "1", "1.2" and "1.2.3" by padding missing components with zeros.
fn lenient_version(s: &str) -> Option<semver::Version> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut parts = s.splitn(3, '.');
    let major = parts.next().unwrap_or("0");
    let minor = parts.next().unwrap_or("0");
    let patch = parts.next().unwrap_or("0");
    semver::Version::parse(&format!("{major}.{minor}.{patch}")).ok()
}
