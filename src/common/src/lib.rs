//! Shared building blocks for mediasweep jobs: configuration, CLI plumbing
//! and the two store ports with their HTTP and in-memory adapters.

pub mod assetstore;
pub mod cli;
pub mod config;
pub mod docstore;

#[cfg(test)]
pub(crate) mod testing;

pub use assetstore::{AssetId, AssetStore};
pub use config::Configuration;
pub use docstore::DocumentStore;
