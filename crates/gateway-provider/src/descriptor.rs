//! Static description of a registered provider: what it can do, which
//! models it claims to serve, and an immutable identity.

use glob::Pattern;

/// Capability flags and limits a provider advertises at registration
/// time. These are immutable for the lifetime of the descriptor; a
/// provider whose capabilities change must be re-registered under the
/// same id (the registry replaces rather than mutates in place).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderCapabilities {
    pub streaming: bool,
    pub function_calling: bool,
    pub multimodal: bool,
    pub embeddings: bool,
    pub max_context: u32,
    pub max_output: u32,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            streaming: false,
            function_calling: false,
            multimodal: false,
            embeddings: false,
            max_context: 4096,
            max_output: 1024,
        }
    }
}

/// A tier used by cost-optimized routing. Local/free providers score
/// highest, cloud providers lowest, everything else in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VendorTag {
    Local,
    Cloud,
    Unknown,
}

/// Registered identity and capability set for one inference provider.
/// Constructed once at startup (or hot-reload) and never mutated
/// thereafter; the registry swaps the whole descriptor to change it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderDescriptor {
    pub provider_id: String,
    pub capabilities: ProviderCapabilities,
    /// Glob pattern (e.g. `"gpt-*"`, `"*"`) matched against a model id to
    /// decide whether this provider claims to serve it.
    pub model_glob: String,
    pub vendor_tag: VendorTag,
}

impl ProviderDescriptor {
    pub fn new(provider_id: impl Into<String>, model_glob: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            capabilities: ProviderCapabilities::default(),
            model_glob: model_glob.into(),
            vendor_tag: VendorTag::Unknown,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_vendor_tag(mut self, vendor_tag: VendorTag) -> Self {
        self.vendor_tag = vendor_tag;
        self
    }

    /// Returns whether this provider's model glob matches `model_id`. A
    /// malformed glob (should not happen for descriptors built through
    /// this type, but reachable if one is deserialized) is treated as
    /// matching nothing rather than panicking.
    pub fn supports_model(&self, model_id: &str) -> bool {
        Pattern::new(&self.model_glob)
            .map(|pattern| pattern.matches(model_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_prefix() {
        let descriptor = ProviderDescriptor::new("openai", "gpt-*");
        assert!(descriptor.supports_model("gpt-4"));
        assert!(descriptor.supports_model("gpt-4o-mini"));
        assert!(!descriptor.supports_model("claude-3"));
    }

    #[test]
    fn wildcard_glob_matches_everything() {
        let descriptor = ProviderDescriptor::new("catch-all", "*");
        assert!(descriptor.supports_model("anything"));
    }

    #[test]
    fn exact_glob_matches_only_itself() {
        let descriptor = ProviderDescriptor::new("local", "llama-3-8b");
        assert!(descriptor.supports_model("llama-3-8b"));
        assert!(!descriptor.supports_model("llama-3-70b"));
    }

    #[test]
    fn builder_methods_set_fields() {
        let descriptor = ProviderDescriptor::new("p1", "*")
            .with_capabilities(ProviderCapabilities {
                streaming: true,
                ..Default::default()
            })
            .with_vendor_tag(VendorTag::Local);

        assert!(descriptor.capabilities.streaming);
        assert_eq!(descriptor.vendor_tag, VendorTag::Local);
    }
}
