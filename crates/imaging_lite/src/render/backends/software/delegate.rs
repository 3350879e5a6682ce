use crate::core::{tokens, ScenePath};
use crate::foundation::math::Vec4;
use crate::render::api::{
    AovDescriptor, Format, RenderBuffer, RenderDelegate, RenderPass, RenderSettingDescriptor, RprimCollection,
};
use crate::render::value::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::render_buffer::SoftwareRenderBuffer;
use super::render_pass::SoftwareRenderPass;
use super::{AMBIENT, ENABLE_LIGHTING, LABEL, SAMPLES};

const DEFAULT_MAX_SAMPLES: i64 = 64;

/// State shared between a delegate and the passes it created
///
/// Control flags are atomics so pause and stop can be requested while a
/// pass is executing.
#[derive(Debug)]
pub(super) struct DelegateShared {
    progressive: bool,
    settings: RwLock<BTreeMap<String, Value>>,
    paused: AtomicBool,
    stopped: AtomicBool,
    epoch: AtomicU64,
    samples: AtomicU32,
    max_samples: AtomicU32,
}

impl DelegateShared {
    fn setting(&self, key: &str) -> Option<Value> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Sample budget per image
    pub(super) fn max_samples(&self) -> u32 {
        if !self.progressive {
            return 1;
        }
        let requested = self
            .setting(tokens::MAX_SAMPLES)
            .and_then(|value| value.as_f64())
            .unwrap_or(DEFAULT_MAX_SAMPLES as f64);
        requested.clamp(1.0, f64::from(u32::MAX)) as u32
    }

    pub(super) fn lighting_enabled(&self) -> bool {
        self.setting(ENABLE_LIGHTING).and_then(|value| value.get::<bool>()).unwrap_or(true)
    }

    pub(super) fn ambient(&self) -> f64 {
        self.setting(AMBIENT).and_then(|value| value.as_f64()).unwrap_or(0.1)
    }

    pub(super) fn clear_color(&self) -> Vec4 {
        self.setting(tokens::CLEAR_COLOR)
            .and_then(|value| value.get::<Vec4>())
            .unwrap_or_else(|| Vec4::new(0.0, 0.0, 0.0, 1.0))
    }

    pub(super) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(super) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Counter bumped by restarts and setting changes
    pub(super) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(super) fn report_progress(&self, samples: u32, max_samples: u32) {
        self.samples.store(samples, Ordering::Release);
        self.max_samples.store(max_samples, Ordering::Release);
    }
}

/// Render delegate of the software backend
#[derive(Debug)]
pub struct SoftwareDelegate {
    shared: Arc<DelegateShared>,
}

impl SoftwareDelegate {
    /// Create a delegate; `progressive` enables sample accumulation and
    /// background control
    pub fn new(progressive: bool) -> Self {
        let delegate = Self {
            shared: Arc::new(DelegateShared {
                progressive,
                settings: RwLock::new(BTreeMap::new()),
                paused: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                samples: AtomicU32::new(0),
                max_samples: AtomicU32::new(0),
            }),
        };
        {
            let mut settings = delegate.shared.settings.write().unwrap_or_else(PoisonError::into_inner);
            for descriptor in delegate.render_settings_descriptors() {
                settings.insert(descriptor.key, descriptor.default_value);
            }
        }
        delegate
    }

    pub(super) fn shared(&self) -> Arc<DelegateShared> {
        Arc::clone(&self.shared)
    }
}

impl RenderDelegate for SoftwareDelegate {
    fn render_settings_descriptors(&self) -> Vec<RenderSettingDescriptor> {
        let max_samples = if self.shared.progressive { DEFAULT_MAX_SAMPLES } else { 1 };
        vec![
            RenderSettingDescriptor::new("Max Samples", tokens::MAX_SAMPLES, max_samples),
            RenderSettingDescriptor::new("Enable Lighting", ENABLE_LIGHTING, true),
            RenderSettingDescriptor::new("Ambient", AMBIENT, 0.1),
            RenderSettingDescriptor::new("Clear Color", tokens::CLEAR_COLOR, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            RenderSettingDescriptor::new("Label", LABEL, ""),
        ]
    }

    fn render_setting(&self, key: &str) -> Option<Value> {
        self.shared.setting(key)
    }

    fn set_render_setting(&mut self, key: &str, value: Value) {
        let mut settings = self.shared.settings.write().unwrap_or_else(PoisonError::into_inner);
        if settings.get(key) == Some(&value) {
            return;
        }
        log::debug!("Render setting {key} = {value}");
        settings.insert(key.to_string(), value);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn default_aov_descriptor(&self, aov_name: &str) -> AovDescriptor {
        let (format, clear_value) = match aov_name {
            tokens::AOV_COLOR => (Format::Float32Vec4, Value::Vec4(self.shared.clear_color())),
            tokens::AOV_DEPTH => (Format::Float32, Value::Float(1.0)),
            tokens::AOV_NORMAL => (Format::Float32Vec3, Value::Vec4(Vec4::zeros())),
            tokens::AOV_PRIM_ID => (Format::Int32, Value::Int(-1)),
            _ => return AovDescriptor::invalid(),
        };
        AovDescriptor {
            format,
            multi_sampled: false,
            clear_value,
            aov_settings: BTreeMap::new(),
        }
    }

    fn supports_render_buffers(&self) -> bool {
        true
    }

    fn create_render_pass(&self, collection: &RprimCollection) -> Box<dyn RenderPass> {
        Box::new(SoftwareRenderPass::new(collection.clone(), self.shared()))
    }

    fn create_render_buffer(&self, id: &ScenePath) -> Option<Arc<dyn RenderBuffer>> {
        Some(Arc::new(SoftwareRenderBuffer::new(id.clone())))
    }

    fn is_pause_supported(&self) -> bool {
        self.shared.progressive
    }

    fn pause(&self) -> bool {
        if !self.shared.progressive {
            return false;
        }
        self.shared.paused.store(true, Ordering::Release);
        true
    }

    fn resume(&self) -> bool {
        if !self.shared.progressive {
            return false;
        }
        self.shared.paused.store(false, Ordering::Release);
        true
    }

    fn stop(&self) -> bool {
        if !self.shared.progressive {
            return false;
        }
        self.shared.stopped.store(true, Ordering::Release);
        true
    }

    fn restart(&self) -> bool {
        if !self.shared.progressive {
            return false;
        }
        self.shared.stopped.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn render_stats(&self) -> BTreeMap<String, Value> {
        let samples = self.shared.samples.load(Ordering::Acquire);
        let max_samples = self.shared.max_samples.load(Ordering::Acquire);
        let percent_done = if max_samples == 0 {
            0.0
        } else {
            100.0 * f64::from(samples.min(max_samples)) / f64::from(max_samples)
        };
        BTreeMap::from([
            (tokens::PERCENT_DONE.to_string(), Value::Float(percent_done)),
            (SAMPLES.to_string(), Value::from(samples)),
            (tokens::MAX_SAMPLES.to_string(), Value::from(max_samples)),
        ])
    }
}
