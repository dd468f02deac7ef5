//! WGPU-based rendering engine for the showcase viewer
//!
//! Owns the surface, the device and the GPU copy of the scene: mesh buffers
//! keyed by [`MeshId`], one uniform per mesh node, the shared material's
//! bind group and the shadow map. [`RenderEngine::prepare`] syncs them with
//! the scene graph and the material, [`RenderEngine::render_frame`] draws
//! the shadow pass, the PBR pass and then hands the frame to the UI.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Matrix, Matrix4, SquareMatrix};
use thiserror::Error;
use wgpu::util::DeviceExt;
use wgpu::TextureFormat;

use crate::config::ShadowSettings;
use crate::gfx::camera::OrbitCamera;
use crate::gfx::resources::environment::PrefilteredEnvironment;
use crate::gfx::resources::global_bindings::{GlobalBindings, SceneLights};
use crate::gfx::resources::material::{MaterialUniform, PhysicalMaterial};
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::scene::{MaterialSlot, MeshData, MeshId, NodeId, NodeKind, SceneGraph};
use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

use super::pipeline_manager::{DepthConfig, MaterialPipelineKey, PipelineConfig, PipelineManager};

const SHADOW_PIPELINE: &str = "Shadow";

/// Failures while bringing up the GPU. Everything after start-up is logged
/// and the frame skipped.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create a surface for the window: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("cannot open the GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Per-node transform block (`@group(1)`).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    flags: [f32; 4],
}

impl NodeUniform {
    fn new(model: Matrix4<f32>, receive_shadow: bool) -> Self {
        let normal = model.invert().unwrap_or(model).transpose();
        Self {
            model: model.into(),
            normal: normal.into(),
            flags: [if receive_shadow { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Draw statistics of the last rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub vertex_count: u32,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            vertex_count: mesh.vertices().len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct NodeBinding {
    ubo: UniformBuffer<NodeUniform>,
    bind_group: wgpu::BindGroup,
}

struct MaterialBinding {
    ubo: UniformBuffer<MaterialUniform>,
    bind_group: wgpu::BindGroup,
}

struct MapUpload {
    texture: TextureResource,
    frame_index: usize,
}

struct EnvironmentUpload {
    source: Arc<PrefilteredEnvironment>,
    texture: TextureResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaterialRef {
    Shared,
    Standard(NodeId),
}

/// One mesh node, resolved for this frame.
struct DrawItem {
    node: NodeId,
    meshes: Vec<MeshId>,
    material: MaterialRef,
    pipeline: String,
    transparent: bool,
    cast_shadow: bool,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    line_mode_supported: bool,
    depth_texture: TextureResource,
    pub pipeline_manager: PipelineManager,
    global_bindings: GlobalBindings,

    node_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    shadow_layout: BindGroupLayoutWithDesc,

    shadows: ShadowSettings,
    shadow_map: TextureResource,
    shadow_map_size: u32,
    shadow_bind_group: wgpu::BindGroup,
    has_shadow_caster: bool,

    placeholder_map: TextureResource,
    placeholder_environment: TextureResource,
    map: Option<MapUpload>,
    environment: Option<EnvironmentUpload>,
    shared_material: MaterialBinding,
    shared_visible: bool,
    standard_materials: HashMap<NodeId, MaterialBinding>,

    meshes: HashMap<MeshId, GpuMesh>,
    nodes: HashMap<NodeId, NodeBinding>,
    draws: Vec<DrawItem>,
    stats: RenderStats,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Prefers an sRGB surface so colors are encoded on write, and asks for
    /// line rasterization when the adapter offers it (wireframe materials).
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
        shadows: ShadowSettings,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let line_mode_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if line_mode_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            log::info!("adapter cannot rasterize lines, wireframe draws filled");
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features,
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_capabilities.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface {}x{} {:?}, present mode {:?}",
            config.width,
            config.height,
            format,
            present_mode
        );

        let depth_texture =
            TextureResource::create_depth_texture(&device, config.width, config.height, "depth_texture");

        let global_bindings = GlobalBindings::new(&device);
        let node_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(&device, "Node Bind Group Layout");
        let material_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(&device, "Material Bind Group Layout");
        let shadow_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_depth_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(&device, "Shadow Bind Group Layout");

        let shadow_map_size = shadows.map_size.max(1);
        let shadow_map = TextureResource::create_shadow_map(&device, shadow_map_size);
        let shadow_bind_group = Self::shadow_bind_group(&device, &shadow_layout, &shadow_map);

        let placeholder_map = TextureResource::white_pixel(&device, &queue);
        let placeholder_environment = TextureResource::black_cube(&device, &queue);
        let shared_material = Self::material_binding(
            &device,
            &material_layout,
            &PhysicalMaterial::default().uniform(),
            &placeholder_map,
            &placeholder_environment,
            "Shared Material",
        );

        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader("pbr", include_str!("pbr.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shadow.wgsl"));
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("Shadow Pipeline")
                .with_shader("shadow")
                .with_vertex_only()
                .with_cull_mode(None)
                .with_depth(Some(DepthConfig {
                    compare: wgpu::CompareFunction::LessEqual,
                    bias: wgpu::DepthBiasState {
                        constant: 2,
                        slope_scale: 2.0,
                        clamp: 0.0,
                    },
                    ..DepthConfig::default()
                }))
                .with_bind_group_layouts(vec![
                    global_bindings.layout().clone(),
                    node_layout.layout.clone(),
                ]),
        );
        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            for error in errors {
                log::error!("{error}");
            }
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            format,
            line_mode_supported,
            depth_texture,
            pipeline_manager,
            global_bindings,
            node_layout,
            material_layout,
            shadow_layout,
            shadows,
            shadow_map,
            shadow_map_size,
            shadow_bind_group,
            has_shadow_caster: false,
            placeholder_map,
            placeholder_environment,
            map: None,
            environment: None,
            shared_material,
            shared_visible: true,
            standard_materials: HashMap::new(),
            meshes: HashMap::new(),
            nodes: HashMap::new(),
            draws: Vec::new(),
            stats: RenderStats::default(),
        })
    }

    fn shadow_bind_group(
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        shadow_map: &TextureResource,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .texture(&shadow_map.view)
            .sampler(&shadow_map.sampler)
            .create(device, "Shadow Bind Group")
    }

    fn material_binding(
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        uniform: &MaterialUniform,
        map: &TextureResource,
        environment: &TextureResource,
        label: &str,
    ) -> MaterialBinding {
        let ubo = UniformBuffer::new_with_data(device, uniform);
        let bind_group = BindGroupBuilder::new(layout)
            .resource(ubo.binding_resource())
            .texture(&map.view)
            .sampler(&map.sampler)
            .texture(&environment.view)
            .sampler(&environment.sampler)
            .create(device, label);
        MaterialBinding { ubo, bind_group }
    }

    /// Pipeline name for a material variant, compiling it on first use.
    fn ensure_pipeline(&mut self, key: MaterialPipelineKey) -> String {
        let Self {
            pipeline_manager,
            global_bindings,
            node_layout,
            material_layout,
            shadow_layout,
            format,
            line_mode_supported,
            ..
        } = self;
        pipeline_manager.ensure_material_pipeline(key, || {
            let layouts = vec![
                global_bindings.layout().clone(),
                node_layout.layout.clone(),
                material_layout.layout.clone(),
                shadow_layout.layout.clone(),
            ];
            key.config(*format, layouts, *line_mode_supported)
        })
    }

    /// Syncs GPU state with the scene, the shared material and the camera.
    pub fn prepare(&mut self, scene: &SceneGraph, material: &mut PhysicalMaterial, camera: &OrbitCamera) {
        let mut rebind = false;
        if material.take_needs_update() {
            log::debug!("material changed (version {}), rebinding", material.version());
            // Forces a fresh upload in case the map was swapped for another.
            self.map = None;
            rebind = true;
        }
        rebind |= self.sync_map(material);
        rebind |= self.sync_environment(material);
        if rebind {
            self.shared_material = Self::material_binding(
                &self.device,
                &self.material_layout,
                &material.uniform(),
                self.map.as_ref().map_or(&self.placeholder_map, |m| &m.texture),
                self.environment
                    .as_ref()
                    .map_or(&self.placeholder_environment, |e| &e.texture),
                "Shared Material",
            );
        } else {
            self.shared_material.ubo.update_content(&self.queue, material.uniform());
        }
        self.shared_visible = material.visible;

        let lights = SceneLights::collect(scene, self.shadows.enabled);
        if let Some(caster) = &lights.shadow {
            self.resize_shadow_map(caster.map_size);
        }
        self.has_shadow_caster = lights.shadow.is_some();
        self.global_bindings
            .update(&self.queue, lights.uniform(camera.uniform));

        let shared_key = MaterialPipelineKey::of_physical(material);
        let shared_pipeline = self.ensure_pipeline(shared_key);
        self.sync_scene(scene, shared_key, &shared_pipeline);
    }

    /// Uploads the current map frame. Returns true when the texture object
    /// changed and the bind group must be rebuilt.
    fn sync_map(&mut self, material: &PhysicalMaterial) -> bool {
        let Some(map) = &material.map else {
            return self.map.take().is_some();
        };
        let (index, frame) = map.current_frame();
        let stale = match self.map.as_mut() {
            Some(upload) if upload.frame_index == index => false,
            Some(upload) => {
                if upload.texture.write_frame(&self.queue, frame) {
                    upload.frame_index = index;
                    false
                } else {
                    true
                }
            }
            None => true,
        };
        if stale {
            self.map = Some(MapUpload {
                texture: TextureResource::create_from_frame(&self.device, &self.queue, frame, "Material Map"),
                frame_index: index,
            });
        }
        stale
    }

    fn sync_environment(&mut self, material: &PhysicalMaterial) -> bool {
        let Some(source) = &material.env_map else {
            return self.environment.take().is_some();
        };
        if self
            .environment
            .as_ref()
            .is_some_and(|upload| Arc::ptr_eq(&upload.source, source))
        {
            return false;
        }
        log::debug!(
            "uploading environment cube, {} mips of {}px",
            source.mip_count(),
            source.face_size()
        );
        self.environment = Some(EnvironmentUpload {
            source: source.clone(),
            texture: TextureResource::create_environment_cube(&self.device, &self.queue, source, "Environment Cube"),
        });
        true
    }

    fn resize_shadow_map(&mut self, size: u32) {
        let size = size.clamp(1, self.device.limits().max_texture_dimension_2d);
        if size == self.shadow_map_size {
            return;
        }
        log::debug!("shadow map resized to {size}px");
        self.shadow_map = TextureResource::create_shadow_map(&self.device, size);
        self.shadow_bind_group = Self::shadow_bind_group(&self.device, &self.shadow_layout, &self.shadow_map);
        self.shadow_map_size = size;
    }

    fn sync_scene(&mut self, scene: &SceneGraph, shared_key: MaterialPipelineKey, shared_pipeline: &str) {
        let world = scene.world_matrices();
        self.draws.clear();

        for (id, node) in scene.iter() {
            let NodeKind::Mesh(mesh) = &node.kind else {
                continue;
            };
            if !scene.is_visible(id) {
                continue;
            }

            for primitive in &mesh.primitives {
                self.meshes
                    .entry(primitive.id())
                    .or_insert_with(|| GpuMesh::upload(&self.device, primitive));
            }

            let uniform = NodeUniform::new(world[id.index()], mesh.receive_shadow);
            match self.nodes.get_mut(&id) {
                Some(binding) => binding.ubo.update_content(&self.queue, uniform),
                None => {
                    let ubo = UniformBuffer::new_with_data(&self.device, &uniform);
                    let bind_group = BindGroupBuilder::new(&self.node_layout)
                        .resource(ubo.binding_resource())
                        .create(&self.device, &format!("Node {}", node.name));
                    self.nodes.insert(id, NodeBinding { ubo, bind_group });
                }
            }

            let (material, pipeline, transparent) = match &mesh.material {
                MaterialSlot::Shared => (
                    MaterialRef::Shared,
                    shared_pipeline.to_string(),
                    shared_key.transparent,
                ),
                MaterialSlot::Standard(standard) => {
                    let uniform = standard.uniform();
                    match self.standard_materials.get_mut(&id) {
                        Some(binding) => binding.ubo.update_content(&self.queue, uniform),
                        None => {
                            let binding = Self::material_binding(
                                &self.device,
                                &self.material_layout,
                                &uniform,
                                &self.placeholder_map,
                                &self.placeholder_environment,
                                &format!("{} Material", node.name),
                            );
                            self.standard_materials.insert(id, binding);
                        }
                    }
                    let key = MaterialPipelineKey::of_standard(standard);
                    (MaterialRef::Standard(id), self.ensure_pipeline(key), key.transparent)
                }
            };

            self.draws.push(DrawItem {
                node: id,
                meshes: mesh.primitives.iter().map(|p| p.id()).collect(),
                material,
                pipeline,
                transparent,
                cast_shadow: mesh.cast_shadow,
            });
        }

        // Blended draws go last so they see the opaque depth.
        self.draws.sort_by_key(|draw| draw.transparent);
    }

    /// Draws one frame. Lost or outdated surfaces are reconfigured and the
    /// frame skipped; other surface errors are logged and skipped.
    pub fn render_frame<F>(&mut self, ui_callback: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                log::warn!("skipping frame: {err}");
                return;
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if self.has_shadow_caster {
            self.shadow_pass(&mut encoder);
        }
        self.stats = self.main_pass(&mut encoder, &surface_texture_view);

        ui_callback(&self.device, &self.queue, &mut encoder, &surface_texture_view);

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    fn shadow_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let Some(pipeline) = self.pipeline_manager.pipeline(SHADOW_PIPELINE) else {
            return;
        };
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Depth Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        shadow_pass.set_pipeline(pipeline);
        shadow_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
        for draw in self.draws.iter().filter(|d| d.cast_shadow && self.is_drawn(d)) {
            let Some(node) = self.nodes.get(&draw.node) else {
                continue;
            };
            shadow_pass.set_bind_group(1, &node.bind_group, &[]);
            for mesh in draw.meshes.iter().filter_map(|id| self.meshes.get(id)) {
                mesh.draw(&mut shadow_pass);
            }
        }
    }

    fn main_pass(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) -> RenderStats {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
        render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);

        let mut stats = RenderStats::default();
        for draw in self.draws.iter().filter(|d| self.is_drawn(d)) {
            let Some(pipeline) = self.pipeline_manager.pipeline(&draw.pipeline) else {
                continue;
            };
            let material = match draw.material {
                MaterialRef::Shared => Some(&self.shared_material),
                MaterialRef::Standard(id) => self.standard_materials.get(&id),
            };
            let (Some(material), Some(node)) = (material, self.nodes.get(&draw.node)) else {
                continue;
            };

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(1, &node.bind_group, &[]);
            render_pass.set_bind_group(2, &material.bind_group, &[]);
            for mesh in draw.meshes.iter().filter_map(|id| self.meshes.get(id)) {
                mesh.draw(&mut render_pass);
                stats.draw_calls += 1;
                stats.vertex_count += mesh.vertex_count;
            }
        }
        stats
    }

    fn is_drawn(&self, draw: &DrawItem) -> bool {
        draw.material != MaterialRef::Shared || self.shared_visible
    }

    pub fn last_stats(&self) -> RenderStats {
        self.stats
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rad, Vector3};

    #[test]
    fn test_node_uniform_normal_matrix_undoes_scale() {
        let model = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let uniform = NodeUniform::new(model, true);
        assert!((uniform.normal[0][0] - 0.5).abs() < 1e-6);
        assert!((uniform.normal[1][1] - 1.0).abs() < 1e-6);
        assert_eq!(uniform.flags[0], 1.0);
    }

    #[test]
    fn test_node_uniform_rotation_keeps_normals_rotated() {
        let model = Matrix4::from_angle_y(Rad(std::f32::consts::FRAC_PI_2))
            * Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let uniform = NodeUniform::new(model, false);
        let normal: Matrix4<f32> = uniform.normal.into();
        let rotated = normal * cgmath::Vector4::new(1.0, 0.0, 0.0, 0.0);
        assert!(rotated.x.abs() < 1e-5);
        assert!((rotated.z + 1.0).abs() < 1e-5);
        assert_eq!(uniform.flags[0], 0.0);
    }

    #[test]
    fn test_node_uniform_singular_model_falls_back() {
        let model = Matrix4::from_scale(0.0);
        let uniform = NodeUniform::new(model, false);
        assert!(uniform.normal.iter().flatten().all(|v| v.is_finite()));
    }
}
