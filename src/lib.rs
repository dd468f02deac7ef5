//! Vitrine
//!
//! An interactive glTF showcase built on wgpu and winit: one
//! physically-based material shared by the model, HDRI reflections, a live
//! material panel and click-to-play animation.

pub mod animation;
pub mod app;
pub mod config;
pub mod gfx;
pub mod interaction;
pub mod performance;
pub mod prelude;
pub mod ui;
pub mod viewer;
pub mod wgpu_utils;

pub use app::{run, VitrineApp};
pub use viewer::Viewer;
