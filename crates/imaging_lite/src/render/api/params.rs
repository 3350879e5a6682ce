//! Render task parameter blocks

use crate::core::{tokens, ScenePath};
use crate::render::api::{RenderBuffer, Viewport};
use crate::render::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Binding of an output channel to a render buffer in the scene index
///
/// The buffer handle is resolved lazily by the render task; equality only
/// considers the channel, buffer path and settings.
#[derive(Debug, Clone, Default)]
pub struct AovBinding {
    /// Output channel name (`color`, `depth`, ...)
    pub aov_name: String,
    /// Path of the render buffer bprim
    pub render_buffer_id: ScenePath,
    /// Resolved buffer handle
    pub render_buffer: Option<Arc<dyn RenderBuffer>>,
    /// Value the buffer is cleared to before accumulation
    pub clear_value: Value,
    /// Backend-specific settings
    pub aov_settings: BTreeMap<String, Value>,
}

impl PartialEq for AovBinding {
    fn eq(&self, other: &Self) -> bool {
        self.aov_name == other.aov_name
            && self.render_buffer_id == other.render_buffer_id
            && self.clear_value == other.clear_value
            && self.aov_settings == other.aov_settings
    }
}

/// Parameters consumed by a render task each cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderTaskParams {
    /// Output bindings in registration order
    pub aov_bindings: Vec<AovBinding>,
    /// Camera sprim the task renders through
    pub camera: Option<ScenePath>,
    /// Target viewport
    pub viewport: Viewport,
}

/// Selector of the drawables a render pass draws
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RprimCollection {
    /// Collection name; empty means the collection selects nothing
    pub name: String,
    /// Representation to draw
    pub repr: String,
    /// Subtrees included in the collection
    pub root_paths: Vec<ScenePath>,
    /// Subtrees excluded from the collection
    pub exclude_paths: Vec<ScenePath>,
}

impl RprimCollection {
    /// Collection over the whole scene
    pub fn new(name: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repr: repr.into(),
            root_paths: vec![ScenePath::absolute_root()],
            exclude_paths: Vec::new(),
        }
    }

    /// The default geometry collection drawn smooth shaded
    pub fn geometry() -> Self {
        Self::new(tokens::GEOMETRY, tokens::SMOOTH_HULL)
    }

    /// Replace the included roots with a single path
    pub fn with_root_path(mut self, root: ScenePath) -> Self {
        self.root_paths = vec![root];
        self
    }

    /// Exclude a subtree
    pub fn with_exclude_path(mut self, path: ScenePath) -> Self {
        self.exclude_paths.push(path);
        self
    }

    /// Whether the collection selects nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether a drawable at `path` belongs to the collection
    pub fn contains(&self, path: &ScenePath) -> bool {
        !self.is_empty()
            && self.root_paths.iter().any(|root| path.has_prefix(root))
            && !self.exclude_paths.iter().any(|excluded| path.has_prefix(excluded))
    }
}
