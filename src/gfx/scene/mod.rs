//! # Scene Management Module
//!
//! The scene is an arena-backed node graph. Every node is tagged once, at
//! load time, as a [`NodeKind::Group`], [`NodeKind::Mesh`] or
//! [`NodeKind::Light`], so traversals match on the tag instead of probing.
//!
//! ## Key Components
//!
//! - [`SceneGraph`] - node arena with parent/child links and world transforms
//! - [`Transform`] - local TRS with Euler/quaternion rotation kept in sync
//! - [`MeshData`] - CPU triangle mesh shared with the renderer and the raycaster
//! - [`LightNode`] - punctual light with its [`ShadowConfig`]
//! - [`Vertex3D`] - GPU vertex layout

pub mod graph;
pub mod light;
pub mod mesh;
pub mod vertex;

pub use graph::{Appended, MaterialSlot, MeshNode, Node, NodeId, NodeKind, SceneGraph, Transform};
pub use light::{LightKind, LightNode, ShadowConfig};
pub use mesh::{MeshData, MeshId};
pub use vertex::Vertex3D;
