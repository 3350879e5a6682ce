//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Time codes and stopwatches
//! - Path-addressed collections
//! - Logging utilities

pub mod collections;
pub mod math;
pub mod time;
pub mod logging;
