//! # Vitrine Prelude
//!
//! The types most embedders need, in one import:
//!
//! ```no_run
//! use vitrine::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ViewerConfig::load()?;
//!     vitrine::run(config)
//! }
//! ```

// Re-export core application types
pub use crate::app::{run, GpuFrame, VitrineApp};
pub use crate::config::ViewerConfig;
pub use crate::viewer::{Clock, FixedStep, FrameSink, FrameView, TimeSource, Viewer};

// Re-export graphics and scene types
pub use crate::gfx::camera::{CameraManager, OrbitCamera};
pub use crate::gfx::loader::{AssetLoader, LoadEvent};
pub use crate::gfx::resources::{PhysicalMaterial, Side};
pub use crate::gfx::scene::{NodeId, SceneGraph};

pub use crate::animation::{AnimationController, PlaybackState};
pub use crate::interaction::CursorStyle;

// Re-export performance monitoring
pub use crate::performance::{PerformanceMetrics, PerformanceMonitor};

// Re-export common external dependencies
pub use cgmath::{InnerSpace, Vector3};
pub use imgui::Ui;
