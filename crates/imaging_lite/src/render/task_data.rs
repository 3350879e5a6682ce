//! Task data provider
//!
//! Scene delegate backed by a plain (path, key) → value store. The engine
//! uses it to inject the free camera, render buffer descriptors and render
//! task parameters into the scene index without a scene description.
//!
//! Lookups are strict: asking for a parameter that was never set is a
//! caller ordering bug, logged at error level and returned as an error.

use crate::core::{tokens, ScenePath};
use crate::foundation::math::Mat4;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::value::{FromValue, Value};
use crate::render::{ParameterError, RenderError, RenderResult};
use std::collections::{BTreeMap, HashMap};

/// Key/value scene delegate
#[derive(Debug)]
pub struct TaskDataDelegate {
    delegate_id: ScenePath,
    values: HashMap<ScenePath, BTreeMap<String, Value>>,
}

impl TaskDataDelegate {
    /// Create an empty store rooted at `delegate_id`
    pub fn new(delegate_id: ScenePath) -> Self {
        Self {
            delegate_id,
            values: HashMap::new(),
        }
    }

    /// Store a value, replacing any previous one
    pub fn set_parameter(&mut self, id: &ScenePath, key: &str, value: impl Into<Value>) {
        self.values
            .entry(id.clone())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Typed lookup
    pub fn parameter<T: FromValue>(&self, id: &ScenePath, key: &str) -> Result<T, ParameterError> {
        let result = self.raw(id, key).and_then(|value| value.extract(id, key));
        if let Err(err) = &result {
            log::error!("Task data lookup failed: {err}");
        }
        result
    }

    /// Whether a value is stored for (id, key)
    pub fn has_parameter(&self, id: &ScenePath, key: &str) -> bool {
        self.values.get(id).is_some_and(|cache| cache.contains_key(key))
    }

    /// Forget every value stored for `id`
    pub fn remove_parameters(&mut self, id: &ScenePath) -> bool {
        self.values.remove(id).is_some()
    }

    /// Number of objects with stored values
    pub fn object_count(&self) -> usize {
        self.values.len()
    }

    fn raw(&self, id: &ScenePath, key: &str) -> Result<&Value, ParameterError> {
        self.values
            .get(id)
            .and_then(|cache| cache.get(key))
            .ok_or_else(|| ParameterError::Missing {
                path: id.clone(),
                key: key.to_string(),
            })
    }
}

impl SceneDelegate for TaskDataDelegate {
    fn delegate_id(&self) -> &ScenePath {
        &self.delegate_id
    }

    fn get(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        match self.raw(id, key) {
            Ok(value) => Ok(value.clone()),
            Err(err) => {
                log::error!("{id}:{key} doesn't exist in the task data store");
                Err(err.into())
            }
        }
    }

    /// Only the free camera has a transform: the inverse of its view matrix
    fn transform(&self, id: &ScenePath) -> RenderResult<Mat4> {
        let view: Mat4 = self.parameter(id, tokens::WORLD_TO_VIEW_MATRIX)?;
        view.try_inverse().ok_or_else(|| {
            log::error!("Free camera {id} has a singular view matrix");
            RenderError::SingularCamera(id.clone())
        })
    }

    fn camera_param(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        match key {
            tokens::WORLD_TO_VIEW_MATRIX
            | tokens::PROJECTION_MATRIX
            | tokens::CLIP_PLANES
            | tokens::WINDOW_POLICY => self.get(id, key),
            _ => Ok(Value::Empty),
        }
    }

    fn render_buffer_descriptor(&self, id: &ScenePath) -> RenderResult<crate::render::RenderBufferDescriptor> {
        Ok(self.parameter(id, tokens::RENDER_BUFFER_DESCRIPTOR)?)
    }

    fn task_render_tags(&self, task_id: &ScenePath) -> RenderResult<Vec<String>> {
        if self.has_parameter(task_id, tokens::RENDER_TAGS) {
            Ok(self.parameter(task_id, tokens::RENDER_TAGS)?)
        } else {
            Ok(Vec::new())
        }
    }
}
