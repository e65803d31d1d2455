//! bl-state: Timeline state for Barline
//!
//! Tracks, clip arrangement, parameter automation, and project
//! serialization.

mod automation;
mod clip;
mod project;
mod track;

pub use automation::*;
pub use clip::*;
pub use project::*;
pub use track::*;
