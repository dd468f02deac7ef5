//! # User Interface Module
//!
//! Dear ImGui overlay for the viewer: the material debug panel and the
//! glue that feeds winit input to imgui and draws it with wgpu.
//!
//! ## Key Components
//!
//! - [`UiManager`] - imgui context, platform and renderer
//! - [`bindings`] - which material fields the panel exposes and how edits
//!   are applied
//! - [`material_panel`] - the panel itself
//!
//! ## Input Handling
//!
//! When imgui wants the mouse, camera orbiting and click-to-toggle are
//! suppressed so dragging a slider never spins the model.

pub mod bindings;
pub mod manager;
pub mod panel;

pub use bindings::{apply_edit, Binding, BindingError, FieldValue, Folder, MaterialField, BINDINGS};
pub use manager::UiManager;
pub use panel::{material_panel, playback_hint};
