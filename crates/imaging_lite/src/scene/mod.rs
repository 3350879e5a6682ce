//! Scene description and its bridge into the scene index

pub mod bounds;
pub mod populator;
pub mod stage;

pub use bounds::Aabb;
pub use populator::ScenePopulator;
pub use stage::{Prim, PrimKind, Purpose, Stage, UpAxis};
