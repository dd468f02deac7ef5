// src/gfx/resources/mod.rs
//! Materials, textures and the uniforms shared by every draw.
//!
//! CPU-side data ([`material`], [`environment`], [`texture_source`]) is
//! plain Rust and testable without a GPU. [`texture_resource`] and
//! [`global_bindings`] turn it into wgpu objects.

pub mod environment;
pub mod global_bindings;
pub mod material;
pub mod texture_resource;
pub mod texture_source;

// Re-export main types
pub use environment::{PmremGenerator, PrefilteredEnvironment};
pub use global_bindings::{GlobalBindings, GlobalUniform, SceneLights};
pub use material::{Color, PhysicalMaterial, Side, StandardMaterial};
pub use texture_resource::TextureResource;
pub use texture_source::{ImageFrame, MapTexture, VideoTexture};
