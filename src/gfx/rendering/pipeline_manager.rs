//! Render pipeline management system for wgpu
//!
//! Pipelines are registered by name and created lazily. Material pipelines
//! are keyed by [`MaterialPipelineKey`], the subset of material fields that
//! changes fixed-function state or the fragment entry point; editing one of
//! those selects (and on first use compiles) another variant.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::gfx::resources::material::{PhysicalMaterial, Side, StandardMaterial};
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::scene::vertex::Vertex3D;

/// Depth state of a pipeline.
#[derive(Debug, Clone)]
pub struct DepthConfig {
    pub format: TextureFormat,
    pub write_enabled: bool,
    pub compare: CompareFunction,
    pub bias: DepthBiasState,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            format: TextureResource::DEPTH_FORMAT,
            write_enabled: true,
            compare: CompareFunction::Less,
            bias: DepthBiasState::default(),
        }
    }
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    /// `None` for depth-only pipelines.
    pub fragment_entry: Option<String>,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub polygon_mode: PolygonMode,
    pub depth: Option<DepthConfig>,
    pub color_targets: Vec<Option<ColorTargetState>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "pbr".to_string(),
            fragment_entry: Some("fs_main".to_string()),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            depth: Some(DepthConfig::default()),
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8UnormSrgb,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = shader.to_string();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    /// Drops the fragment stage (shadow pass).
    pub fn with_vertex_only(mut self) -> Self {
        self.fragment_entry = None;
        self.color_targets.clear();
        self
    }

    pub fn with_fragment_entry(mut self, entry: &str) -> Self {
        self.fragment_entry = Some(entry.to_string());
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth(mut self, depth: Option<DepthConfig>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn with_color_targets(mut self, targets: Vec<Option<ColorTargetState>>) -> Self {
        self.color_targets = targets;
        self
    }
}

/// The material fields that change pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialPipelineKey {
    pub side: Side,
    pub wireframe: bool,
    pub flat_shading: bool,
    pub transparent: bool,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl MaterialPipelineKey {
    pub fn of_physical(material: &PhysicalMaterial) -> Self {
        Self {
            side: material.side,
            wireframe: material.wireframe,
            flat_shading: material.flat_shading,
            transparent: material.transparent,
            depth_test: material.depth_test,
            depth_write: material.depth_write,
        }
    }

    pub fn of_standard(material: &StandardMaterial) -> Self {
        Self {
            side: material.side(),
            wireframe: false,
            flat_shading: false,
            transparent: material.base_color[3] < 1.0,
            depth_test: true,
            depth_write: true,
        }
    }

    /// Registry name of this variant.
    pub fn pipeline_name(&self) -> String {
        format!(
            "PBR/{}{}{}{}{}",
            self.side.label(),
            if self.wireframe { "/wire" } else { "" },
            if self.flat_shading { "/flat" } else { "" },
            if self.transparent { "/blend" } else { "" },
            match (self.depth_test, self.depth_write) {
                (true, true) => "",
                (true, false) => "/depth-ro",
                (false, true) => "/depth-always",
                (false, false) => "/no-depth",
            },
        )
    }

    /// Pipeline state for this variant. Wireframe falls back to filled
    /// triangles when the device cannot draw lines.
    pub fn config(
        &self,
        color_format: TextureFormat,
        layouts: Vec<BindGroupLayout>,
        line_mode_supported: bool,
    ) -> PipelineConfig {
        let blend = if self.transparent {
            BlendState::ALPHA_BLENDING
        } else {
            BlendState::REPLACE
        };
        let polygon_mode = if self.wireframe && line_mode_supported {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        };

        PipelineConfig::default()
            .with_label(&self.pipeline_name())
            .with_shader("pbr")
            .with_fragment_entry(if self.flat_shading { "fs_flat" } else { "fs_main" })
            .with_cull_mode(self.side.cull_mode())
            .with_polygon_mode(polygon_mode)
            .with_depth(Some(DepthConfig {
                write_enabled: self.depth_write,
                compare: if self.depth_test {
                    CompareFunction::LessEqual
                } else {
                    CompareFunction::Always
                },
                ..DepthConfig::default()
            }))
            .with_bind_group_layouts(layouts)
            .with_color_targets(vec![Some(ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: ColorWrites::ALL,
            })])
    }
}

/// Manages render pipelines with caching and lazy creation
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
    pending_pipelines: Vec<String>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
            pending_pipelines: Vec::new(),
        }
    }

    /// Registers a pipeline configuration without creating it.
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipeline_configs.insert(name.to_string(), config);
        self.pending_pipelines.push(name.to_string());
    }

    pub fn load_shader(&mut self, name: &str, source: &str) {
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_string(), shader_module);
    }

    /// Gets or creates a pipeline (lazy loading)
    pub fn get_pipeline(&mut self, name: &str) -> Option<&RenderPipeline> {
        if !self.pipelines.contains_key(name) {
            let config = self.pipeline_configs.get(name)?.clone();
            match self.create_pipeline_from_config(name, &config) {
                Ok(pipeline) => {
                    self.pipelines.insert(name.to_string(), pipeline);
                    self.pending_pipelines.retain(|n| n != name);
                }
                Err(e) => {
                    log::error!("failed to create pipeline '{name}': {e}");
                    return None;
                }
            }
        }
        self.pipelines.get(name)
    }

    /// Pipeline created earlier, without creating it.
    pub fn pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }

    /// Creates all pending pipelines immediately
    pub fn create_all_pipelines(&mut self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let pending = std::mem::take(&mut self.pending_pipelines);

        for name in pending {
            if let Some(config) = self.pipeline_configs.get(&name).cloned() {
                match self.create_pipeline_from_config(&name, &config) {
                    Ok(pipeline) => {
                        self.pipelines.insert(name, pipeline);
                    }
                    Err(e) => errors.push(format!("Pipeline '{name}': {e}")),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Registers (if needed) and creates the pipeline for a material
    /// variant, returning its name.
    pub fn ensure_material_pipeline(
        &mut self,
        key: MaterialPipelineKey,
        make_config: impl FnOnce() -> PipelineConfig,
    ) -> String {
        let name = key.pipeline_name();
        if !self.pipeline_configs.contains_key(&name) {
            log::debug!("compiling material variant {name}");
            self.register_pipeline(&name, make_config());
        }
        self.get_pipeline(&name);
        name
    }

    fn create_pipeline_from_config(
        &self,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline, String> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| format!("Shader '{}' not found", config.shader))?;

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let fragment_state = config.fragment_entry.as_deref().map(|entry| FragmentState {
            module: shader,
            entry_point: Some(entry),
            targets: &config.color_targets,
            compilation_options: PipelineCompilationOptions::default(),
        });

        let depth_stencil = config.depth.as_ref().map(|depth| DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write_enabled,
            depth_compare: depth.compare,
            stencil: StencilState::default(),
            bias: depth.bias,
        });

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::desc()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: fragment_state,
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: config.polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_key() {
        let key = MaterialPipelineKey::of_physical(&PhysicalMaterial::default());
        assert_eq!(key.side, Side::Front);
        assert!(!key.wireframe && !key.flat_shading && !key.transparent);
        assert_eq!(key.pipeline_name(), "PBR/FrontSide");
    }

    #[test]
    fn test_shader_affecting_edits_change_the_variant() {
        let mut material = PhysicalMaterial::default();
        let before = MaterialPipelineKey::of_physical(&material);

        material.side = Side::Double;
        material.flat_shading = true;
        let after = MaterialPipelineKey::of_physical(&material);

        assert_ne!(before, after);
        assert_eq!(after.pipeline_name(), "PBR/DoubleSide/flat");
    }

    #[test]
    fn test_depth_flags_in_name() {
        let mut material = PhysicalMaterial::default();
        material.depth_write = false;
        material.transparent = true;
        let key = MaterialPipelineKey::of_physical(&material);
        assert_eq!(key.pipeline_name(), "PBR/FrontSide/blend/depth-ro");
    }

    #[test]
    fn test_standard_material_is_always_filled() {
        let key = MaterialPipelineKey::of_standard(&StandardMaterial::default());
        assert!(!key.wireframe);
        assert!(key.depth_test && key.depth_write);
    }
}
