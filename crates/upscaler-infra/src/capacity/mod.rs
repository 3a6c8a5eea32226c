//! Capacity gating
//!
//! This module provides the memory admission gate and the host memory sampler it reads.

pub use gate::{Admission, GateSettings, ResourceGate};
pub use sampler::SysinfoMemorySampler;

mod gate;
mod sampler;
