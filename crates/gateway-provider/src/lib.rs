//! Provider registry and model repository for the inference gateway.
//!
//! This crate answers two questions the router needs on every request:
//! which providers are currently healthy, and which models exist and are
//! visible to the requesting tenant. It does not decide which candidate
//! to route to — that's `gateway-router` — it only maintains the ground
//! truth those decisions are made against.
//!
//! # Examples
//!
//! ```
//! use gateway_provider::{ProviderRegistry, ProviderRegistryConfig};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let registry = Arc::new(ProviderRegistry::new(
//!     ProviderRegistryConfig::builder()
//!         .on_health_changed(|provider_id, from, to| {
//!             println!("{provider_id}: {from:?} -> {to:?}");
//!         })
//!         .build(),
//! ));
//!
//! registry.start_probing().await;
//! # }
//! ```

mod adapter;
mod config;
mod descriptor;
mod events;
mod health;
mod manifest;
mod registry;

pub use adapter::{ChunkStream, ProviderAdapter};
pub use config::{ProviderRegistryConfig, ProviderRegistryConfigBuilder};
pub use descriptor::{ProviderCapabilities, ProviderDescriptor, VendorTag};
pub use events::ProviderEvent;
pub use health::{HealthStatus, ProviderHealth};
pub use manifest::{
    ArtifactDescriptor, ArtifactFramework, InMemoryModelRepository, ModelCapabilities,
    ModelManifest, ModelRepository, ModelVisibility,
};
pub use registry::ProviderRegistry;

#[cfg(any(test, feature = "test-util"))]
pub use adapter::test_util;
