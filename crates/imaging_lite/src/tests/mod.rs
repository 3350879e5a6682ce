//! Facade-level scenarios
//!
//! Exercise the engine the way a host application drives it: select a
//! backend, configure camera, viewport and outputs, render until converged
//! and read the outputs back.

mod aov_readback;
mod convergence;
mod support;
