//! Renderer plugin registry
//!
//! Explicit registry of backend plugins. Callers share it through an `Arc`
//! and acquire reference-counted [`PluginHandle`]s; dropping the last handle
//! for a plugin releases it.

use crate::render::api::{RenderDelegate, RendererPlugin};
use crate::render::backends::software;
use crate::render::RenderResult;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct PluginEntry {
    plugin: Arc<dyn RendererPlugin>,
    ref_count: AtomicUsize,
}

/// Registry of renderer plugins keyed by id
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, PluginEntry>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in software backends
    pub fn with_builtin_plugins() -> Self {
        Self::new()
            .with_plugin(software::SoftwarePlugin::progressive())
            .with_plugin(software::SoftwarePlugin::preview())
    }

    /// Builder-style registration
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl RendererPlugin + 'static) -> Self {
        self.register(Arc::new(plugin));
        self
    }

    /// Register a plugin, replacing any plugin with the same id
    pub fn register(&mut self, plugin: Arc<dyn RendererPlugin>) {
        let id = plugin.id().to_string();
        log::debug!("Registering renderer plugin '{}' ({})", id, plugin.display_name());
        if self
            .plugins
            .insert(id.clone(), PluginEntry { plugin, ref_count: AtomicUsize::new(0) })
            .is_some()
        {
            log::warn!("Renderer plugin '{id}' registered twice; keeping the latest");
        }
    }

    /// Plugin ids ordered by descending priority, then id
    pub fn plugin_ids(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.plugins.values().map(|entry| &entry.plugin).collect();
        entries.sort_by(|a, b| b.priority().cmp(&a.priority()).then_with(|| a.id().cmp(b.id())));
        entries.into_iter().map(|plugin| plugin.id().to_string()).collect()
    }

    /// Display name of a plugin
    pub fn display_name(&self, id: &str) -> Option<String> {
        self.plugins.get(id).map(|entry| entry.plugin.display_name().to_string())
    }

    /// Whether a plugin with this id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// First supported plugin in listing order
    pub fn default_plugin_id(&self) -> Option<String> {
        self.plugin_ids()
            .into_iter()
            .find(|id| self.plugins.get(id).is_some_and(|entry| entry.plugin.is_supported()))
    }

    /// Acquire a counted handle to a plugin
    pub fn acquire(self: &Arc<Self>, id: &str) -> Option<PluginHandle> {
        let entry = self.plugins.get(id)?;
        let count = entry.ref_count.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("Acquired renderer plugin '{id}' (refs: {count})");
        Some(PluginHandle {
            registry: Arc::clone(self),
            id: id.to_string(),
            plugin: Arc::clone(&entry.plugin),
        })
    }

    /// Number of live handles for a plugin
    pub fn ref_count(&self, id: &str) -> usize {
        self.plugins.get(id).map_or(0, |entry| entry.ref_count.load(Ordering::Acquire))
    }

    fn release(&self, id: &str) {
        if let Some(entry) = self.plugins.get(id) {
            let previous = entry.ref_count.fetch_sub(1, Ordering::AcqRel);
            log::trace!("Released renderer plugin '{id}' (refs: {})", previous.saturating_sub(1));
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.plugin_ids()).finish()
    }
}

/// Counted ownership of an acquired plugin; dropping releases it
pub struct PluginHandle {
    registry: Arc<PluginRegistry>,
    id: String,
    plugin: Arc<dyn RendererPlugin>,
}

impl PluginHandle {
    /// Plugin id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Plugin display name
    pub fn display_name(&self) -> &str {
        self.plugin.display_name()
    }

    /// Whether the plugin can run on this host
    pub fn is_supported(&self) -> bool {
        self.plugin.is_supported()
    }

    /// Instantiate a render delegate
    pub fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>> {
        self.plugin.create_render_delegate()
    }
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_listing_order() {
        let registry = PluginRegistry::with_builtin_plugins();
        assert_eq!(
            registry.plugin_ids(),
            vec!["SoftwareProgressive".to_string(), "SoftwarePreview".to_string()]
        );
        assert_eq!(registry.default_plugin_id().as_deref(), Some("SoftwareProgressive"));
        assert_eq!(registry.display_name("SoftwarePreview").as_deref(), Some("Software Preview"));
        assert_eq!(registry.display_name("Missing"), None);
    }

    #[test]
    fn test_handles_are_reference_counted() {
        let registry = Arc::new(PluginRegistry::with_builtin_plugins());
        let first = registry.acquire("SoftwarePreview").unwrap();
        let second = registry.acquire("SoftwarePreview").unwrap();
        assert_eq!(registry.ref_count("SoftwarePreview"), 2);
        drop(first);
        assert_eq!(registry.ref_count("SoftwarePreview"), 1);
        drop(second);
        assert_eq!(registry.ref_count("SoftwarePreview"), 0);
        assert!(registry.acquire("Unknown").is_none());
    }

    #[test]
    fn test_handle_creates_delegate() {
        let registry = Arc::new(PluginRegistry::with_builtin_plugins());
        let handle = registry.acquire("SoftwareProgressive").unwrap();
        assert!(handle.is_supported());
        let delegate = handle.create_render_delegate().unwrap();
        assert!(delegate.supports_render_buffers());
    }
}
