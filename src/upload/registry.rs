//! Lookup table from [`BackendId`] to adapter.

use std::sync::Arc;

use crate::core::config::BackendsConfig;
use crate::upload::{
    BackendId, GofileBackend, MixdropBackend, MultiupBackend, MuxBackend, UploadBackend, VikiBackend, VoeBackend,
};

/// Registered upload backends, shared by every job.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn UploadBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. A later registration for the same id wins.
    pub fn register(&mut self, backend: Arc<dyn UploadBackend>) {
        self.backends.retain(|b| b.id() != backend.id());
        self.backends.push(backend);
    }

    pub fn get(&self, id: BackendId) -> Option<Arc<dyn UploadBackend>> {
        self.backends.iter().find(|b| b.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    /// Builds the built-in adapters from their configuration sections.
    ///
    /// GoFile and VikingFile are always present. The others are left out
    /// while their credentials are missing, so jobs for them end as
    /// "backend not configured" without any download.
    pub fn from_config(config: BackendsConfig) -> Self {
        let mut registry = Self::new();
        if config.mixdrop.has_credentials() {
            registry.register(Arc::new(MixdropBackend::new(config.mixdrop)));
        }
        if config.multiup.has_credentials() {
            registry.register(Arc::new(MultiupBackend::new(config.multiup)));
        }
        registry.register(Arc::new(GofileBackend::new(config.gofile)));
        if config.voe.has_credentials() {
            registry.register(Arc::new(VoeBackend::new(config.voe)));
        }
        registry.register(Arc::new(VikiBackend::new(config.viki)));
        if config.mux.has_credentials() {
            registry.register(Arc::new(MuxBackend::new(config.mux)));
        }
        log::info!("Upload backends enabled: {:?}", registry.ids());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GofileConfig;
    use secrecy::SecretString;

    fn configured() -> BackendsConfig {
        let secret = |v: &str| SecretString::from(v.to_string());
        let mut cfg = BackendsConfig::default();
        cfg.mixdrop.email = "me@example.com".to_string();
        cfg.mixdrop.key = secret("key");
        cfg.multiup.username = "user".to_string();
        cfg.multiup.password = secret("pass");
        cfg.voe.api_key = secret("voe");
        cfg.mux.token_id = "tok".to_string();
        cfg.mux.token_secret = secret("sec");
        cfg
    }

    #[test]
    fn test_from_config_skips_backends_without_credentials() {
        let registry = BackendRegistry::from_config(BackendsConfig::default());
        assert_eq!(registry.ids(), vec![BackendId::Gofile, BackendId::Viki]);
        assert!(registry.get(BackendId::Mixdrop).is_none());
        assert!(registry.get(BackendId::Mux).is_none());
    }

    #[test]
    fn test_from_config_registers_configured_backends() {
        let registry = BackendRegistry::from_config(configured());
        for id in BackendId::MENU {
            assert!(registry.get(id).is_some(), "{} missing", id);
        }
        assert_eq!(registry.get(BackendId::Mux).map(|b| b.display_name()), Some("Mux"));
        assert_eq!(registry.ids().len(), 6);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(GofileBackend::new(GofileConfig::default())));
        registry.register(Arc::new(GofileBackend::new(GofileConfig::default())));
        assert_eq!(registry.ids(), vec![BackendId::Gofile]);
        assert!(registry.get(BackendId::Viki).is_none());
    }
}
