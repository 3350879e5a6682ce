//! Core identifiers shared by every layer: scene paths and the well-known
//! parameter, setting and output-channel names.

pub mod path;
pub mod tokens;

pub use path::{PathError, ScenePath};
