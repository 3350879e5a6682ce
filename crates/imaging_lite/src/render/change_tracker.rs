//! Dirty-bit change tracking for the scene index

use crate::core::ScenePath;
use bitflags::bitflags;
use std::collections::BTreeMap;

bitflags! {
    /// Change bits shared by tasks, sprims, bprims and rprims
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyBits: u32 {
        /// Task parameter block changed
        const PARAMS = 1 << 0;
        /// Task drawable collection changed
        const COLLECTION = 1 << 1;
        /// Task render tags changed
        const RENDER_TAGS = 1 << 2;

        /// Camera world-to-view matrix changed
        const VIEW_MATRIX = 1 << 3;
        /// Camera projection changed
        const PROJ_MATRIX = 1 << 4;
        /// Camera window policy changed
        const WINDOW_POLICY = 1 << 5;
        /// Camera clip planes changed
        const CLIP_PLANES = 1 << 6;

        /// Render buffer descriptor changed
        const DESCRIPTION = 1 << 7;

        /// Drawable transform changed
        const TRANSFORM = 1 << 8;
        /// Drawable visibility changed
        const VISIBILITY = 1 << 9;
        /// Drawable shape changed
        const GEOMETRY = 1 << 10;
        /// Drawable primvars (display color) changed
        const PRIMVAR = 1 << 11;
        /// Drawable render tag changed
        const RENDER_TAG = 1 << 12;

        /// Light parameters changed
        const LIGHT_PARAMS = 1 << 13;

        /// Every task bit
        const ALL_TASK = Self::PARAMS.bits() | Self::COLLECTION.bits() | Self::RENDER_TAGS.bits();
        /// Every camera bit
        const ALL_CAMERA = Self::VIEW_MATRIX.bits()
            | Self::PROJ_MATRIX.bits()
            | Self::WINDOW_POLICY.bits()
            | Self::CLIP_PLANES.bits();
        /// Every light bit
        const ALL_LIGHT = Self::TRANSFORM.bits() | Self::VISIBILITY.bits() | Self::LIGHT_PARAMS.bits();
        /// Every drawable bit
        const ALL_RPRIM = Self::TRANSFORM.bits()
            | Self::VISIBILITY.bits()
            | Self::GEOMETRY.bits()
            | Self::PRIMVAR.bits()
            | Self::RENDER_TAG.bits();
    }
}

/// Dirty state of one category of prims
#[derive(Debug, Default)]
struct DirtyMap(BTreeMap<ScenePath, DirtyBits>);

impl DirtyMap {
    fn insert(&mut self, path: ScenePath, initial: DirtyBits) {
        self.0.insert(path, initial);
    }

    fn remove(&mut self, path: &ScenePath) -> bool {
        self.0.remove(path).is_some()
    }

    fn mark(&mut self, path: &ScenePath, bits: DirtyBits) -> bool {
        match self.0.get_mut(path) {
            Some(state) => {
                *state |= bits;
                true
            }
            None => {
                log::debug!("Ignoring dirty bits {bits:?} for untracked prim {path}");
                false
            }
        }
    }

    fn bits(&self, path: &ScenePath) -> DirtyBits {
        self.0.get(path).copied().unwrap_or_default()
    }

    fn clean(&mut self, path: &ScenePath) {
        if let Some(state) = self.0.get_mut(path) {
            *state = DirtyBits::empty();
        }
    }

    fn dirty(&self) -> Vec<ScenePath> {
        self.0
            .iter()
            .filter(|(_, bits)| !bits.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

/// Per-prim dirty bits plus version counters downstream passes compare
/// against to detect changes
#[derive(Debug, Default)]
pub struct ChangeTracker {
    tasks: DirtyMap,
    sprims: DirtyMap,
    bprims: DirtyMap,
    rprims: DirtyMap,
    scene_version: u64,
    sprim_version: u64,
}

impl ChangeTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter bumped whenever a drawable is added, removed or changed
    pub const fn scene_version(&self) -> u64 {
        self.scene_version
    }

    /// Counter bumped whenever a camera or light is added, removed or changed
    pub const fn sprim_version(&self) -> u64 {
        self.sprim_version
    }

    /// Start tracking a task, fully dirty
    pub fn task_inserted(&mut self, path: ScenePath) {
        self.tasks.insert(path, DirtyBits::ALL_TASK);
    }

    /// Stop tracking a task
    pub fn task_removed(&mut self, path: &ScenePath) {
        self.tasks.remove(path);
    }

    /// Mark task state dirty
    pub fn mark_task_dirty(&mut self, path: &ScenePath, bits: DirtyBits) {
        self.tasks.mark(path, bits);
    }

    /// Pending task bits
    pub fn task_dirty_bits(&self, path: &ScenePath) -> DirtyBits {
        self.tasks.bits(path)
    }

    /// Record the task bits left after a sync
    pub fn set_task_dirty_bits(&mut self, path: &ScenePath, bits: DirtyBits) {
        self.tasks.clean(path);
        if !bits.is_empty() {
            self.tasks.mark(path, bits);
        }
    }

    /// Start tracking a camera or light, fully dirty
    pub fn sprim_inserted(&mut self, path: ScenePath, initial: DirtyBits) {
        self.sprims.insert(path, initial);
        self.sprim_version += 1;
    }

    /// Stop tracking a camera or light
    pub fn sprim_removed(&mut self, path: &ScenePath) {
        if self.sprims.remove(path) {
            self.sprim_version += 1;
        }
    }

    /// Mark camera or light state dirty
    pub fn mark_sprim_dirty(&mut self, path: &ScenePath, bits: DirtyBits) {
        if self.sprims.mark(path, bits) {
            self.sprim_version += 1;
        }
    }

    /// Pending camera or light bits
    pub fn sprim_dirty_bits(&self, path: &ScenePath) -> DirtyBits {
        self.sprims.bits(path)
    }

    /// Clear camera or light bits
    pub fn mark_sprim_clean(&mut self, path: &ScenePath) {
        self.sprims.clean(path);
    }

    /// Cameras and lights with pending bits
    pub fn dirty_sprims(&self) -> Vec<ScenePath> {
        self.sprims.dirty()
    }

    /// Start tracking a render buffer, fully dirty
    pub fn bprim_inserted(&mut self, path: ScenePath) {
        self.bprims.insert(path, DirtyBits::DESCRIPTION);
    }

    /// Stop tracking a render buffer
    pub fn bprim_removed(&mut self, path: &ScenePath) {
        self.bprims.remove(path);
    }

    /// Mark render buffer state dirty
    pub fn mark_bprim_dirty(&mut self, path: &ScenePath, bits: DirtyBits) {
        self.bprims.mark(path, bits);
    }

    /// Pending render buffer bits
    pub fn bprim_dirty_bits(&self, path: &ScenePath) -> DirtyBits {
        self.bprims.bits(path)
    }

    /// Clear render buffer bits
    pub fn mark_bprim_clean(&mut self, path: &ScenePath) {
        self.bprims.clean(path);
    }

    /// Render buffers with pending bits
    pub fn dirty_bprims(&self) -> Vec<ScenePath> {
        self.bprims.dirty()
    }

    /// Start tracking a drawable, fully dirty
    pub fn rprim_inserted(&mut self, path: ScenePath) {
        self.rprims.insert(path, DirtyBits::ALL_RPRIM);
        self.scene_version += 1;
    }

    /// Stop tracking a drawable
    pub fn rprim_removed(&mut self, path: &ScenePath) {
        if self.rprims.remove(path) {
            self.scene_version += 1;
        }
    }

    /// Mark drawable state dirty
    pub fn mark_rprim_dirty(&mut self, path: &ScenePath, bits: DirtyBits) {
        if self.rprims.mark(path, bits) {
            self.scene_version += 1;
        }
    }

    /// Pending drawable bits
    pub fn rprim_dirty_bits(&self, path: &ScenePath) -> DirtyBits {
        self.rprims.bits(path)
    }

    /// Clear drawable bits
    pub fn mark_rprim_clean(&mut self, path: &ScenePath) {
        self.rprims.clean(path);
    }

    /// Drawables with pending bits
    pub fn dirty_rprims(&self) -> Vec<ScenePath> {
        self.rprims.dirty()
    }
}
