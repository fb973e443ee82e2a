//! Model manifests and the repository facade that looks them up.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_core::registry::Registry;
use gateway_core::tenant::TenantId;

/// On-disk/artifact format a provider loads a model from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactFramework {
    Gguf,
    Onnx,
    Safetensors,
    Other(String),
}

/// Where and how large a single artifact is. Providers consult this to
/// decide whether they can actually load the model they claim to serve.
#[derive(Debug, Clone)]
pub struct ArtifactDescriptor {
    pub framework: ArtifactFramework,
    pub location: String,
    pub size_bytes: Option<u64>,
}

/// Model-side capability flags, distinct from a provider's own
/// [`crate::descriptor::ProviderCapabilities`]: this is what the model
/// itself supports, independent of which provider happens to serve it.
#[derive(Debug, Clone, Default)]
pub struct ModelCapabilities {
    pub streaming: bool,
    pub function_calling: bool,
    pub multimodal: bool,
    pub embeddings: bool,
}

/// Which tenants may route to a model.
#[derive(Debug, Clone)]
pub enum ModelVisibility {
    Public,
    Restricted(Vec<TenantId>),
}

impl ModelVisibility {
    pub fn is_visible_to(&self, tenant_id: &TenantId) -> bool {
        match self {
            ModelVisibility::Public => true,
            ModelVisibility::Restricted(allowed) => allowed.contains(tenant_id),
        }
    }
}

/// Everything the gateway knows about a model independent of which
/// provider serves it: which artifact formats exist, who may see it, and
/// what it can do.
#[derive(Debug, Clone)]
pub struct ModelManifest {
    pub model_id: String,
    pub visibility: ModelVisibility,
    pub artifacts: HashMap<ArtifactFramework, ArtifactDescriptor>,
    pub capabilities: ModelCapabilities,
}

impl ModelManifest {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            visibility: ModelVisibility::Public,
            artifacts: HashMap::new(),
            capabilities: ModelCapabilities::default(),
        }
    }

    pub fn with_artifact(mut self, descriptor: ArtifactDescriptor) -> Self {
        self.artifacts.insert(descriptor.framework.clone(), descriptor);
        self
    }

    pub fn with_visibility(mut self, visibility: ModelVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Whether a provider offering artifacts in any of `frameworks` could
    /// actually load this model. A provider claiming a model via glob
    /// match alone is not enough; it must match at least one artifact.
    pub fn has_compatible_artifact(&self, frameworks: &[ArtifactFramework]) -> bool {
        frameworks.iter().any(|f| self.artifacts.contains_key(f))
    }
}

/// Facade over the set of known models. `gateway-router` consults this to
/// validate a requested model id exists and is visible to the requesting
/// tenant before resolving provider candidates.
pub trait ModelRepository: Send + Sync {
    fn get(&self, model_id: &str) -> Option<Arc<ModelManifest>>;
    fn list(&self) -> Vec<Arc<ModelManifest>>;
    fn register(&self, manifest: ModelManifest);
}

/// A [`ModelRepository`] backed by the shared copy-on-write registry.
/// Suitable as the production implementation when manifests are
/// maintained in-process (e.g. loaded from a config file at startup and
/// occasionally hot-reloaded) rather than fetched from an external model
/// catalog service.
#[derive(Default)]
pub struct InMemoryModelRepository {
    manifests: Registry<String, ModelManifest>,
}

impl InMemoryModelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRepository for InMemoryModelRepository {
    fn get(&self, model_id: &str) -> Option<Arc<ModelManifest>> {
        self.manifests.get(&model_id.to_string())
    }

    fn list(&self) -> Vec<Arc<ModelManifest>> {
        self.manifests.snapshot().values().cloned().collect()
    }

    fn register(&self, manifest: ModelManifest) {
        let model_id = manifest.model_id.clone();
        self.manifests.remove(&model_id);
        self.manifests.get_or_insert_with(model_id, || manifest.clone());
    }
}
