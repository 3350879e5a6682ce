//! Backend implementations for the render module
//!
//! Only the CPU ray casting backend ships with the crate; other backends
//! register through [`PluginRegistry::register`](crate::render::PluginRegistry::register).

/// CPU ray casting backend
pub mod software;
