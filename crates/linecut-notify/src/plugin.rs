use crate::error::NotifyError;
use crate::PushDelivery;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for [`PushDelivery`] instances from JSON configuration.
///
/// Each plugin is registered in the [`DeliveryRegistry`] by its `name()`,
/// which is what the server's `push.provider` setting refers to.
pub trait DeliveryPlugin: Send + Sync {
    /// Returns the provider name (e.g., `"fcm"`).
    fn name(&self) -> &str;

    /// Validates a JSON config blob against this provider's expected schema.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured delivery from a validated JSON config.
    fn create_delivery(&self, config: &Value) -> Result<Arc<dyn PushDelivery>>;

    /// Returns a copy of `config` safe to log (credentials replaced with `"***"`).
    fn redact_config(&self, config: &Value) -> Value {
        config.clone()
    }
}

/// Registry of available [`DeliveryPlugin`]s.
///
/// # Examples
///
/// ```
/// use linecut_notify::plugin::DeliveryRegistry;
///
/// let registry = DeliveryRegistry::default();
/// assert!(registry.has_plugin("fcm"));
/// assert!(registry.has_plugin("log"));
/// assert!(!registry.has_plugin("sms"));
/// ```
pub struct DeliveryRegistry {
    plugins: HashMap<String, Box<dyn DeliveryPlugin>>,
}

impl DeliveryRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn DeliveryPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_delivery(&self, provider: &str, config: &Value) -> Result<Arc<dyn PushDelivery>> {
        let plugin = self
            .plugins
            .get(provider)
            .ok_or_else(|| NotifyError::UnknownProvider(provider.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_delivery(config)
    }

    pub fn redact_config(&self, provider: &str, config: &Value) -> Value {
        self.plugins
            .get(provider)
            .map(|p| p.redact_config(config))
            .unwrap_or_else(|| config.clone())
    }

    pub fn has_plugin(&self, provider: &str) -> bool {
        self.plugins.contains_key(provider)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for DeliveryRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::fcm::FcmPlugin));
        registry.register(Box::new(crate::channels::log::LogPlugin));
        registry
    }
}
