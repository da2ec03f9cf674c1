// dappstore-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;

// Re-export key types
pub use config::Config;
pub use error::{Result, StoreError};
pub use model::{AppManifest, DappRecord};
