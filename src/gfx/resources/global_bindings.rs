//! Global uniform bindings for camera and scene lights
//!
//! Manages the uniform buffer and bind group shared by every draw: camera
//! matrices, up to [`MAX_LIGHTS`] punctual lights and the view-projection of
//! the one light that casts shadows. Bound to slot 0 in all pipelines.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Vector4};

use crate::{
    gfx::{
        camera::{camera_utils::CameraUniform, orbit_camera::OPENGL_TO_WGPU_MATRIX},
        picking::Aabb,
        scene::{LightKind, NodeKind, SceneGraph},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

pub const MAX_LIGHTS: usize = 4;

const KIND_DIRECTIONAL: f32 = 0.0;
const KIND_POINT: f32 = 1.0;
const KIND_SPOT: f32 = 2.0;

/// One light as the shader sees it. MUST match `Light` in pbr.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// World position, kind in `w` (0 directional, 1 point, 2 spot).
    pub position: [f32; 4],
    /// Direction the light travels, range in `w` (0 = unlimited).
    pub direction: [f32; 4],
    /// Linear color premultiplied by intensity.
    pub color: [f32; 4],
    /// Cosines of the inner and outer spot cone.
    pub cone: [f32; 4],
}

/// MUST match `Globals` in pbr.wgsl and shadow.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// light count, shadow light index (-1 for none), shadow bias, shadow
    /// texel size
    pub params: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl Default for GlobalUniform {
    fn default() -> Self {
        let mut uniform: Self = bytemuck::Zeroable::zeroed();
        uniform.params[1] = -1.0;
        uniform
    }
}

/// The light rendered into the shadow map this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCaster {
    /// Index into [`SceneLights::lights`].
    pub light: usize,
    pub view_proj: Matrix4<f32>,
    pub bias: f32,
    pub map_size: u32,
}

/// Lights gathered from the scene graph.
#[derive(Debug, Clone, Default)]
pub struct SceneLights {
    pub lights: Vec<LightUniform>,
    pub shadow: Option<ShadowCaster>,
}

impl SceneLights {
    /// Collects visible lights in traversal order, keeping the first
    /// [`MAX_LIGHTS`]. The first of them with `cast_shadow` set becomes the
    /// shadow caster unless shadows are disabled.
    pub fn collect(scene: &SceneGraph, shadows_enabled: bool) -> Self {
        let bounds = scene_bounds(scene);
        let mut collected = SceneLights::default();

        for (id, node) in scene.iter() {
            let NodeKind::Light(light) = &node.kind else {
                continue;
            };
            if !scene.is_visible(id) {
                continue;
            }
            if collected.lights.len() == MAX_LIGHTS {
                log::debug!("ignoring light `{}`, limit is {MAX_LIGHTS}", node.name);
                continue;
            }

            let world = scene.world_matrix(id);
            let position = (world * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate();
            let direction = (world * Vector4::new(0.0, 0.0, -1.0, 0.0))
                .truncate()
                .normalize();

            let (kind, range, cone) = match light.kind {
                LightKind::Directional => (KIND_DIRECTIONAL, None, [1.0, 1.0]),
                LightKind::Point { range } => (KIND_POINT, range, [1.0, 1.0]),
                LightKind::Spot {
                    range,
                    inner_cone_angle,
                    outer_cone_angle,
                } => (
                    KIND_SPOT,
                    range,
                    [inner_cone_angle.cos(), outer_cone_angle.cos()],
                ),
            };

            if shadows_enabled && light.cast_shadow && collected.shadow.is_none() {
                collected.shadow = Some(ShadowCaster {
                    light: collected.lights.len(),
                    view_proj: light_view_proj(light.kind, position, direction, bounds),
                    bias: light.shadow.bias,
                    map_size: light.shadow.map_size.0.max(light.shadow.map_size.1),
                });
            }

            let [r, g, b] = light.color;
            collected.lights.push(LightUniform {
                position: [position.x, position.y, position.z, kind],
                direction: [direction.x, direction.y, direction.z, range.unwrap_or(0.0)],
                color: [
                    r * light.intensity,
                    g * light.intensity,
                    b * light.intensity,
                    1.0,
                ],
                cone: [cone[0], cone[1], 0.0, 0.0],
            });
        }

        collected
    }

    pub fn uniform(&self, camera: CameraUniform) -> GlobalUniform {
        let mut uniform = GlobalUniform {
            view_position: camera.view_position,
            view_proj: camera.view_proj,
            ..GlobalUniform::default()
        };
        for (slot, light) in uniform.lights.iter_mut().zip(&self.lights) {
            *slot = *light;
        }
        uniform.params[0] = self.lights.len() as f32;
        if let Some(shadow) = &self.shadow {
            uniform.light_view_proj = shadow.view_proj.into();
            uniform.params[1] = shadow.light as f32;
            uniform.params[2] = shadow.bias;
            uniform.params[3] = 1.0 / shadow.map_size.max(1) as f32;
        }
        uniform
    }
}

/// World bounds of every visible mesh.
pub fn scene_bounds(scene: &SceneGraph) -> Option<Aabb> {
    let mut bounds: Option<Aabb> = None;
    for (id, node) in scene.iter() {
        let Some(mesh) = node.as_mesh() else {
            continue;
        };
        if !scene.is_visible(id) {
            continue;
        }
        let world = scene.world_matrix(id);
        for primitive in &mesh.primitives {
            let b = primitive.bounds().transform(&world);
            bounds = Some(match bounds {
                None => b,
                Some(acc) => Aabb::new(
                    Vector3::new(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y), acc.min.z.min(b.min.z)),
                    Vector3::new(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y), acc.max.z.max(b.max.z)),
                ),
            });
        }
    }
    bounds
}

/// Fits the light frustum around `bounds` so the whole scene lands in the
/// shadow map.
fn light_view_proj(
    kind: LightKind,
    position: Vector3<f32>,
    direction: Vector3<f32>,
    bounds: Option<Aabb>,
) -> Matrix4<f32> {
    let (center, radius) = bounds
        .map(|b| (b.center(), ((b.max - b.min).magnitude() * 0.5).max(0.5)))
        .unwrap_or((Vector3::new(0.0, 0.0, 0.0), 10.0));

    let up = if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };

    match kind {
        LightKind::Directional => {
            let eye = center - direction * radius * 2.0;
            let view = Matrix4::look_at_rh(Point3::from_vec(eye), Point3::from_vec(center), up);
            let proj = cgmath::ortho(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);
            OPENGL_TO_WGPU_MATRIX * proj * view
        }
        LightKind::Point { .. } | LightKind::Spot { .. } => {
            let to_center = center - position;
            let distance = to_center.magnitude();
            let look = if distance > f32::EPSILON {
                to_center / distance
            } else {
                direction
            };
            let up = if look.y.abs() > 0.99 {
                Vector3::unit_z()
            } else {
                up
            };
            let fovy = match kind {
                LightKind::Spot {
                    outer_cone_angle, ..
                } => (outer_cone_angle * 2.0).clamp(0.1, 3.0),
                _ => std::f32::consts::FRAC_PI_2,
            };
            let view = Matrix4::look_at_rh(
                Point3::from_vec(position),
                Point3::from_vec(position + look),
                up,
            );
            let near = 0.1_f32.min(distance * 0.5).max(0.01);
            let proj = cgmath::perspective(Rad(fovy), 1.0, near, distance + radius * 2.0);
            OPENGL_TO_WGPU_MATRIX * proj * view
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Owns the global uniform buffer and its bind group.
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    ubo: GlobalUBO,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform()) // camera + lights
            .create(device, "Globals Bind Group Layout");
        let ubo = GlobalUBO::new_with_data(device, &GlobalUniform::default());
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Global Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
            ubo,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, content: GlobalUniform) {
        self.ubo.update_content(queue, content);
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShadowSettings;
    use crate::gfx::loader::model::tests::showcase_glb;
    use crate::gfx::loader::{assemble_model, parse_model_bytes, AssemblySettings};
    use crate::gfx::scene::{LightNode, Node};

    fn showcase_scene() -> SceneGraph {
        let mut scene = SceneGraph::new();
        let asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        let settings = AssemblySettings {
            time_scale: 1.0,
            shadows: ShadowSettings::default(),
        };
        assemble_model(&mut scene, asset, &settings);
        scene
    }

    #[test]
    fn test_collects_sun_as_shadow_caster() {
        let lights = SceneLights::collect(&showcase_scene(), true);
        assert_eq!(lights.lights.len(), 1);

        let sun = lights.lights[0];
        assert_eq!(sun.position[3], KIND_DIRECTIONAL);
        // Default orientation points down -Z.
        assert_eq!(sun.direction[..3], [0.0, 0.0, -1.0]);
        assert_eq!(sun.color[..3], [2.0, 1.8, 1.6]);

        let shadow = lights.shadow.unwrap();
        assert_eq!(shadow.light, 0);
        assert_eq!(shadow.map_size, 2048);
        assert_eq!(shadow.bias, -0.001);

        let uniform = lights.uniform(CameraUniform::default());
        assert_eq!(uniform.params[0], 1.0);
        assert_eq!(uniform.params[1], 0.0);
        assert_eq!(uniform.params[3], 1.0 / 2048.0);
    }

    #[test]
    fn test_disabled_shadows_have_no_caster() {
        let lights = SceneLights::collect(&showcase_scene(), false);
        assert!(lights.shadow.is_none());
        assert_eq!(lights.uniform(CameraUniform::default()).params[1], -1.0);
    }

    #[test]
    fn test_light_count_is_capped() {
        let mut scene = SceneGraph::new();
        for i in 0..MAX_LIGHTS + 2 {
            let light = LightNode::new(LightKind::Point { range: None }, [1.0; 3], 1.0);
            scene.add_node(Node::new(format!("lamp{i}"), NodeKind::Light(light)), None);
        }
        let lights = SceneLights::collect(&scene, true);
        assert_eq!(lights.lights.len(), MAX_LIGHTS);
        assert!(lights.shadow.is_none());
    }

    #[test]
    fn test_scene_bounds_cover_both_quads() {
        let bounds = scene_bounds(&showcase_scene()).unwrap();
        assert_eq!(bounds.min.x, -1.0);
        assert_eq!(bounds.max.x, 4.0);
        assert!(scene_bounds(&SceneGraph::new()).is_none());
    }

    #[test]
    fn test_light_matrix_keeps_scene_in_clip_space() {
        let scene = showcase_scene();
        let lights = SceneLights::collect(&scene, true);
        let view_proj = lights.shadow.unwrap().view_proj;
        let clip = view_proj * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
