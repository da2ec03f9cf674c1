// dappstore-common/src/model/mod.rs
// Declares the modules within the model directory.

pub mod dapp;
pub mod manifest;

// Re-export
pub use dapp::{decode_dapps_response, version_newer, DappRecord};
pub use manifest::{generate_app_id, parse_manifest, AppManifest, UrlResolution};
