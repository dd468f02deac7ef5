//! # Graphics Module
//!
//! Everything between a glTF file on disk and pixels on screen.
//!
//! - **Camera System** ([`camera`]) - damped orbit camera and its input mapping
//! - **Loading** ([`loader`]) - background glTF, cube map and texture loading
//! - **Picking** ([`picking`]) - ray casts against the scene graph
//! - **Rendering Pipeline** ([`rendering`]) - PBR forward pass with one shadow map
//! - **Resource Management** ([`resources`]) - materials, textures, environment maps
//! - **Scene Management** ([`scene`]) - node hierarchy, meshes and lights

pub mod camera;
pub mod loader;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
