//! Engine facade
//!
//! Single entry point over the rendering framework: picks a backend, owns
//! the render session built for it, and forwards per-frame configuration
//! and render invocations. One `render` call runs one render cycle; hosts
//! loop on [`Engine::is_converged`] themselves.

use crate::core::{tokens, PathError, ScenePath};
use crate::foundation::math::Mat4;
use crate::foundation::time::TimeCode;
use crate::render::api::{Format, RenderTaskParams, RprimCollection, SettingControl, SettingWidget, Viewport};
use crate::render::camera::{compute_camera_to_frame_bounds, Camera};
use crate::render::index::RenderIndex;
use crate::render::plugin_registry::PluginRegistry;
use crate::render::value::Value;
use crate::render::RenderError;
use crate::render_params::RenderParams;
use crate::scene::{Purpose, Stage};
use crate::session::{RenderSession, SessionPaths};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Facade over one active rendering backend
#[derive(Debug)]
pub struct Engine {
    registry: Arc<PluginRegistry>,
    session: Option<RenderSession>,
}

impl Engine {
    /// Create an engine with no backend selected
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry, session: None }
    }

    /// Create an engine over the built-in backends with the default one
    /// selected
    pub fn with_builtin_backends() -> EngineResult<Self> {
        let mut engine = Self::new(Arc::new(PluginRegistry::with_builtin_plugins()));
        engine.select_backend("")?;
        Ok(engine)
    }

    /// Plugin registry the engine selects from
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    fn session(&self) -> EngineResult<&RenderSession> {
        self.session.as_ref().ok_or_else(|| {
            log::error!("No backend selected");
            EngineError::NoSession
        })
    }

    fn session_mut(&mut self) -> EngineResult<&mut RenderSession> {
        self.session.as_mut().ok_or_else(|| {
            log::error!("No backend selected");
            EngineError::NoSession
        })
    }

    // === Backends ===

    /// Registered backend ids, preferred first
    pub fn list_backends(&self) -> Vec<String> {
        self.registry.plugin_ids()
    }

    /// Display name of a backend
    pub fn backend_display_name(&self, id: &str) -> Option<String> {
        self.registry.display_name(id)
    }

    /// Id of the active backend
    pub fn current_backend(&self) -> Option<&str> {
        self.session.as_ref().map(RenderSession::plugin_id)
    }

    /// Switch to the backend `id`; an empty id selects the registry default
    ///
    /// On failure nothing changes. On success the previous session is torn
    /// down completely; only the root transform and root visibility carry
    /// over. Outputs, camera and viewport must be configured again.
    pub fn select_backend(&mut self, id: &str) -> EngineResult<()> {
        let actual_id = if id.is_empty() {
            self.registry.default_plugin_id().ok_or_else(|| {
                log::error!("No supported backend registered");
                EngineError::UnknownBackend(String::new())
            })?
        } else {
            id.to_string()
        };

        if self.current_backend() == Some(actual_id.as_str()) {
            log::debug!("Backend '{actual_id}' already active");
            return Ok(());
        }

        let plugin = self.registry.acquire(&actual_id).ok_or_else(|| {
            log::error!("Couldn't find plugin for id {actual_id}");
            EngineError::UnknownBackend(actual_id.clone())
        })?;
        if !plugin.is_supported() {
            log::warn!("Backend '{actual_id}' is not supported on this host");
            return Err(EngineError::UnsupportedBackend(actual_id));
        }
        let delegate = plugin.create_render_delegate().map_err(|err| {
            log::error!("Backend '{actual_id}' failed to create a render delegate: {err}");
            EngineError::DelegateCreationFailed { id: actual_id.clone(), source: err }
        })?;
        let paths = SessionPaths::new()?;

        let (root_transform, root_visible) = self
            .session
            .as_ref()
            .map_or((Mat4::identity(), true), |session| (session.root_transform(), session.root_visibility()));

        self.session = None;
        let mut session = RenderSession::new(plugin, delegate, paths);
        session.set_root_transform(root_transform);
        session.set_root_visibility(root_visible);
        self.session = Some(session);

        log::info!("Selected backend '{actual_id}'");
        Ok(())
    }

    // === Rendering ===

    /// Run one render cycle over the stage subtree at `root`
    ///
    /// The scene is populated on the first call of a session only; later
    /// calls reuse the populated index and just advance scene time.
    pub fn render(&mut self, stage: &Arc<Stage>, root: &ScenePath, params: &RenderParams) -> EngineResult<()> {
        let session = self.session_mut()?;
        session.set_render_setting(tokens::MAX_SAMPLES, Value::from(params.samples));
        session.set_render_setting(tokens::CLEAR_COLOR, Value::from(params.clear_color));

        session.populate(stage, root)?;
        session.set_time(params.frame);

        let collection = RprimCollection::geometry().with_root_path(session.populator().index_path(root));
        session.push_render_task(collection, params.render_tags());
        session.execute_render_task()?;
        Ok(())
    }

    /// Whether the last render produced a final image
    ///
    /// Fails if `render` has not run in the current session.
    pub fn is_converged(&self) -> EngineResult<bool> {
        self.session()?.is_converged().ok_or_else(|| {
            log::error!("Convergence queried before the first render");
            EngineError::RenderTaskMissing
        })
    }

    /// Viewport used from the next render on
    pub fn set_render_viewport(&mut self, viewport: Viewport) -> EngineResult<()> {
        self.session_mut()?.set_viewport(viewport);
        Ok(())
    }

    /// Render through a free camera with explicit matrices
    pub fn set_camera_state(&mut self, view: Mat4, projection: Mat4) -> EngineResult<()> {
        self.session_mut()?.set_free_camera(view, projection);
        Ok(())
    }

    /// Render through a camera prim of the stage
    pub fn set_camera_path(&mut self, stage_path: &ScenePath) -> EngineResult<()> {
        let session = self.session_mut()?;
        let index_path = session.populator().index_path(stage_path);
        log::debug!("Rendering through stage camera {stage_path} ({index_path})");
        session.set_camera(index_path);
        Ok(())
    }

    /// Camera framing the drawable bounds of `root` at `time`
    ///
    /// The active root transform, if any, is applied to the bounds.
    pub fn frame_stage(&self, stage: &Stage, root: &ScenePath, time: TimeCode) -> EngineResult<Camera> {
        let mut bounds = stage.compute_world_bound(root, time, &[Purpose::Default, Purpose::Render]);
        if let Some(session) = &self.session {
            bounds = bounds.transformed(&session.root_transform());
        }
        compute_camera_to_frame_bounds(&bounds, stage.up_axis()).ok_or_else(|| {
            log::warn!("Nothing to frame below {root}");
            EngineError::NothingToFrame(root.clone())
        })
    }

    // === Outputs ===

    /// Enable an output channel, sized to the current viewport
    ///
    /// Enabling a channel twice binds it twice; clear first to rebind.
    pub fn set_renderer_aov(&mut self, aov_name: &str) -> EngineResult<()> {
        self.session_mut()?.add_aov(aov_name)
    }

    /// Remove every output channel
    pub fn clear_renderer_aovs(&mut self) -> EngineResult<()> {
        self.session_mut()?.clear_aovs();
        Ok(())
    }

    /// Pixel format of an enabled output channel
    pub fn renderer_aov_format(&self, aov_name: &str) -> EngineResult<Format> {
        let session = self.session()?;
        let binding = session
            .aov_binding(aov_name)
            .ok_or_else(|| EngineError::AovNotBound(aov_name.to_string()))?;
        let buffer = session
            .index()
            .bprim(&binding.render_buffer_id)
            .ok_or_else(|| EngineError::AovNotBound(aov_name.to_string()))?;
        Ok(buffer.format())
    }

    /// Copy an output channel into `destination`
    ///
    /// Copies exactly `width * height * bytes_per_pixel` bytes and returns
    /// that count; the rest of `destination` is left untouched.
    pub fn get_renderer_aov(&self, aov_name: &str, destination: &mut [u8]) -> EngineResult<usize> {
        let session = self.session()?;
        let not_bound = || {
            log::error!("Output channel '{aov_name}' is not bound");
            EngineError::AovNotBound(aov_name.to_string())
        };
        let binding = session.aov_binding(aov_name).ok_or_else(not_bound)?;
        let buffer = session.index().bprim(&binding.render_buffer_id).ok_or_else(not_bound)?;

        let needed = buffer.width() as usize * buffer.height() as usize * buffer.format().bytes_per_pixel();
        if destination.len() < needed {
            log::error!(
                "Destination for '{aov_name}' holds {} bytes, {needed} needed",
                destination.len()
            );
            return Err(EngineError::DestinationTooSmall { needed, available: destination.len() });
        }

        let mapped = buffer.map();
        let source = mapped.get(..needed).ok_or_else(|| RenderError::BufferAllocationFailed {
            path: binding.render_buffer_id.clone(),
            reason: format!("mapped {} bytes, described {needed}", mapped.len()),
        })?;
        destination[..needed].copy_from_slice(source);
        Ok(needed)
    }

    // === Settings ===

    /// Current value of a backend setting
    pub fn renderer_setting(&self, key: &str) -> EngineResult<Option<Value>> {
        Ok(self.session()?.delegate().render_setting(key))
    }

    /// Set a backend setting; the value type is the backend's concern
    pub fn set_renderer_setting(&mut self, key: &str, value: impl Into<Value>) -> EngineResult<()> {
        self.session_mut()?.set_render_setting(key, value.into());
        Ok(())
    }

    /// Backend settings that can be presented as widgets
    ///
    /// Settings whose default value has no widget kind are skipped with a
    /// warning.
    pub fn renderer_setting_widgets(&self) -> EngineResult<Vec<SettingControl>> {
        let controls = self
            .session()?
            .delegate()
            .render_settings_descriptors()
            .into_iter()
            .filter_map(|descriptor| {
                let widget = SettingWidget::from_value(&descriptor.default_value);
                if let SettingWidget::Unsupported(type_name) = widget {
                    log::warn!("Setting '{}' has unsupported type {type_name}; skipping", descriptor.key);
                    return None;
                }
                Some(SettingControl { descriptor, widget })
            })
            .collect();
        Ok(controls)
    }

    // === Background control ===

    /// Whether the backend can pause
    pub fn is_pause_supported(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.delegate().is_pause_supported())
    }

    /// Pause background rendering
    pub fn pause_renderer(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.delegate().pause())
    }

    /// Resume background rendering
    pub fn resume_renderer(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.delegate().resume())
    }

    /// Stop background rendering
    pub fn stop_renderer(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.delegate().stop())
    }

    /// Restart background rendering from scratch
    pub fn restart_renderer(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.delegate().restart())
    }

    /// Backend statistics; empty without a backend
    pub fn render_stats(&self) -> BTreeMap<String, Value> {
        self.session
            .as_ref()
            .map(|session| session.delegate().render_stats())
            .unwrap_or_default()
    }

    // === Root placement ===

    /// Transform applied above the populated scene
    pub fn root_transform(&self) -> EngineResult<Mat4> {
        Ok(self.session()?.root_transform())
    }

    /// Replace the transform applied above the populated scene
    pub fn set_root_transform(&mut self, transform: Mat4) -> EngineResult<()> {
        self.session_mut()?.set_root_transform(transform);
        Ok(())
    }

    /// Visibility applied above the populated scene
    pub fn root_visibility(&self) -> EngineResult<bool> {
        Ok(self.session()?.root_visibility())
    }

    /// Replace the visibility applied above the populated scene
    pub fn set_root_visibility(&mut self, visible: bool) -> EngineResult<()> {
        self.session_mut()?.set_root_visibility(visible);
        Ok(())
    }

    // === Inspection ===

    /// Scene index of the active session
    pub fn render_index(&self) -> Option<&RenderIndex> {
        self.session.as_ref().map(RenderSession::index)
    }

    /// Render task parameters of the active session
    pub fn render_task_params(&self) -> Option<&RenderTaskParams> {
        self.session.as_ref().map(RenderSession::params)
    }

    /// Number of free cameras in the scene index
    pub fn free_camera_count(&self) -> usize {
        self.session.as_ref().map_or(0, RenderSession::free_camera_count)
    }

    /// Number of render buffers in the scene index
    pub fn render_buffer_count(&self) -> usize {
        self.render_index().map_or(0, RenderIndex::bprim_count)
    }
}

/// Errors raised by the engine facade
#[derive(Error, Debug)]
pub enum EngineError {
    /// No backend with this id is registered
    #[error("Unknown backend '{0}'")]
    UnknownBackend(String),

    /// The backend cannot run on this host
    #[error("Backend '{0}' is not supported on this host")]
    UnsupportedBackend(String),

    /// The backend failed to build a render delegate
    #[error("Backend '{id}' failed to create a render delegate")]
    DelegateCreationFailed {
        /// Backend id
        id: String,
        /// Backend failure
        #[source]
        source: RenderError,
    },

    /// The operation needs a selected backend
    #[error("No backend selected")]
    NoSession,

    /// The backend cannot allocate render buffers
    #[error("Backend '{0}' does not support render buffers")]
    RenderBuffersUnsupported(String),

    /// The backend does not produce this output channel
    #[error("Output channel '{0}' is not supported by the backend")]
    UnsupportedAov(String),

    /// The output channel was never enabled, or has been cleared
    #[error("Output channel '{0}' is not bound")]
    AovNotBound(String),

    /// A readback destination is smaller than the buffer
    #[error("Destination holds {available} bytes, {needed} needed")]
    DestinationTooSmall {
        /// Bytes the buffer holds
        needed: usize,
        /// Bytes the destination holds
        available: usize,
    },

    /// Convergence was queried before the first render
    #[error("No render task; call render first")]
    RenderTaskMissing,

    /// The framed subtree has no drawable bounds
    #[error("Nothing to frame below {0}")]
    NothingToFrame(ScenePath),

    /// An id does not form a valid scene path
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// Scene index, task or backend failure
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for facade operations
pub type EngineResult<T> = Result<T, EngineError>;
