//! Well-known names used as parameter keys, setting keys, render tags and
//! output channel identifiers.

/// Render task parameter block
pub const PARAMS: &str = "params";
/// Drawable collection consumed by a render task
pub const COLLECTION: &str = "collection";
/// Render tags consumed by a render task
pub const RENDER_TAGS: &str = "renderTags";
/// Render buffer descriptor parameter
pub const RENDER_BUFFER_DESCRIPTOR: &str = "renderBufferDescriptor";

/// Camera world-to-view matrix
pub const WORLD_TO_VIEW_MATRIX: &str = "worldToViewMatrix";
/// Camera projection matrix
pub const PROJECTION_MATRIX: &str = "projectionMatrix";
/// Camera clip planes
pub const CLIP_PLANES: &str = "clipPlanes";
/// Camera window conform policy
pub const WINDOW_POLICY: &str = "windowPolicy";

/// Light intensity
pub const INTENSITY: &str = "intensity";
/// Light color
pub const LIGHT_COLOR: &str = "color";

/// Default drawable collection name and render tag
pub const GEOMETRY: &str = "geometry";
/// Guide purpose render tag
pub const GUIDE: &str = "guide";
/// Proxy purpose render tag
pub const PROXY: &str = "proxy";
/// Render purpose render tag
pub const RENDER: &str = "render";
/// Smooth shaded surface representation
pub const SMOOTH_HULL: &str = "smoothHull";

/// Color output channel
pub const AOV_COLOR: &str = "color";
/// Depth output channel
pub const AOV_DEPTH: &str = "depth";
/// Normal output channel
pub const AOV_NORMAL: &str = "normal";
/// Primitive id output channel
pub const AOV_PRIM_ID: &str = "primId";

/// Sample budget setting consumed by progressive backends
pub const MAX_SAMPLES: &str = "maxSamples";
/// Background color setting
pub const CLEAR_COLOR: &str = "clearColor";
/// Render stats key reporting progress in percent
pub const PERCENT_DONE: &str = "percentDone";

/// Task data provider element under the absolute root
pub const TASK_DATA_DELEGATE: &str = "taskDataDelegate";
/// Scene populator element under the absolute root
pub const SCENE_DELEGATE: &str = "sceneDelegate";
/// Free camera element under the task data provider
pub const FREE_CAMERA: &str = "freeCamera";
/// Render task element under the task data provider
pub const RENDER_TASK: &str = "renderTask";
/// Prefix of render buffer elements under the task data provider
pub const AOV_PREFIX: &str = "aov_";
