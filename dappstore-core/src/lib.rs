// dappstore-core/src/lib.rs

// Declare the top-level modules within the library crate
pub mod engine;
pub mod install;
pub mod orchestrator;
pub mod publish;
pub mod registry;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export key types for easier use by embedders
pub use engine::{ContentStore, ContractInvoker, ShaderArgs, ShaderOutput};
pub use install::{install_from_reader, read_archive_manifest, InstalledApp};
pub use orchestrator::DappStore;
pub use publish::PublishFlow;
pub use registry::RegistryClient;
pub use store::LocalAppStore;
