//! Upscaler Worker Library
//!
//! Runs upscale jobs in the background: [`UpscaleOrchestrator`] validates a
//! request, hands the work to the memory gate on a detached task and writes the
//! result back next to the source file. [`JobTracker`] records what happened.

pub mod orchestrator;
pub mod tracker;

pub use orchestrator::UpscaleOrchestrator;
pub use tracker::{JobFinishedSender, JobTracker};
