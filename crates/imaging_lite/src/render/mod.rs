//! # Rendering Framework
//!
//! Backend-agnostic render execution: the scene index, change tracking, the
//! task data provider, the render task and the execution engine, together
//! with the interfaces a rendering backend implements.
//!
//! ## Architecture
//!
//! - **Plugin registry**: discovers backends by identifier and hands out
//!   reference-counted plugin handles
//! - **Render delegate**: backend object owning settings, passes and buffers
//! - **Scene index**: path-addressed cameras, lights, drawables, buffers and
//!   tasks, with dirty-bit change tracking
//! - **Task data provider**: key/value parameter store feeding tasks, free
//!   cameras and render buffers
//! - **Render task / execution engine**: one sync → prepare → execute cycle
//!   per invocation

pub mod api;
pub mod backends;
pub mod camera;
pub mod change_tracker;
pub mod execution;
pub mod index;
pub mod light;
pub mod plugin_registry;
pub mod rprim;
pub mod scene_delegate;
pub mod task;
pub mod task_data;
pub mod value;

pub use api::{
    AovBinding, AovDescriptor, Format, RenderBuffer, RenderBufferDescriptor, RenderDelegate,
    RenderPass, RenderPassState, RenderSettingDescriptor, RenderTaskParams, RendererPlugin,
    RprimCollection, SettingWidget, Viewport,
};
pub use camera::{Camera, WindowPolicy};
pub use change_tracker::{ChangeTracker, DirtyBits};
pub use execution::RenderEngine;
pub use index::RenderIndex;
pub use plugin_registry::{PluginHandle, PluginRegistry};
pub use scene_delegate::SceneDelegate;
pub use task::{RenderTask, Task};
pub use task_data::TaskDataDelegate;
pub use value::{FromValue, Value};

use crate::core::ScenePath;
use thiserror::Error;

/// Errors raised by the scene index, tasks and backends
#[derive(Error, Debug)]
pub enum RenderError {
    /// No prim of the requested kind exists at the path
    #[error("No {kind} at {path}")]
    MissingPrim {
        /// Prim kind (camera, render buffer, drawable, ...)
        kind: &'static str,
        /// Requested path
        path: ScenePath,
    },

    /// The render task references a camera that is not in the scene index
    #[error("Camera {0} not found in the scene index")]
    MissingCamera(ScenePath),

    /// The render task has a pass but no camera reference
    #[error("Render task {0} has no camera")]
    CameraNotSet(ScenePath),

    /// The render task has a pass but nothing to draw into
    #[error("Render task {0} has an empty viewport")]
    EmptyViewport(ScenePath),

    /// A prim type the backend or scene delegate cannot handle
    #[error("Unsupported prim type '{type_name}' at {path}")]
    UnsupportedPrimType {
        /// Prim path
        path: ScenePath,
        /// Offending type name
        type_name: String,
    },

    /// No scene delegate with the given id is registered for sync
    #[error("No scene delegate registered as {0}")]
    MissingSceneDelegate(ScenePath),

    /// A task data lookup failed
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Camera matrices could not be inverted
    #[error("Camera matrices for {0} are not invertible")]
    SingularCamera(ScenePath),

    /// Backend render delegate construction failed
    #[error("Render delegate creation failed: {0}")]
    DelegateCreationFailed(String),

    /// A render buffer could not be allocated
    #[error("Render buffer allocation failed for {path}: {reason}")]
    BufferAllocationFailed {
        /// Buffer path
        path: ScenePath,
        /// Failure detail
        reason: String,
    },

    /// A render pass failed during execution
    #[error("Render pass failed: {0}")]
    PassFailed(String),
}

/// Errors raised by the task data provider's strict parameter lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// Nothing stored for the (path, key) pair
    #[error("No parameter '{key}' set for {path}")]
    Missing {
        /// Object path
        path: ScenePath,
        /// Parameter name
        key: String,
    },

    /// The stored value holds a different type than requested
    #[error("Parameter '{key}' for {path} holds {found}, expected {expected}")]
    WrongType {
        /// Object path
        path: ScenePath,
        /// Parameter name
        key: String,
        /// Requested type
        expected: &'static str,
        /// Stored type
        found: &'static str,
    },
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
