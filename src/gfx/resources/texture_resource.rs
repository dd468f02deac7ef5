//! Texture resource management for wgpu
//!
//! Creates the GPU side of every texture the viewer uses: the depth buffer,
//! the shadow map, the material map (re-uploaded as video frames advance)
//! and the prefiltered environment cube.

use super::environment::PrefilteredEnvironment;
use super::texture_source::ImageFrame;

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

fn linear_sampler(device: &wgpu::Device, label: &str, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, mip_level: u32, layer: u32, size: (u32, u32), data: &[u8]) {
    let (width, height) = size;
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth buffer matching the surface size.
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = linear_sampler(device, label, wgpu::AddressMode::ClampToEdge);

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Square depth map sampled with a `LessEqual` comparison sampler.
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// sRGB 2D texture holding one image frame. Repeat addressing, like a
    /// glTF default sampler.
    pub fn create_from_frame(device: &wgpu::Device, queue: &wgpu::Queue, frame: &ImageFrame, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_rgba(queue, &texture, 0, 0, (frame.width(), frame.height()), frame.pixels());

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = linear_sampler(device, &format!("{label} Sampler"), wgpu::AddressMode::Repeat);

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Replaces the pixels of a texture made by
    /// [`create_from_frame`](Self::create_from_frame). Returns false when
    /// the frame size differs and the texture has to be recreated.
    pub fn write_frame(&self, queue: &wgpu::Queue, frame: &ImageFrame) -> bool {
        let size = self.texture.size();
        if (size.width, size.height) != (frame.width(), frame.height()) {
            return false;
        }
        write_rgba(queue, &self.texture, 0, 0, (frame.width(), frame.height()), frame.pixels());
        true
    }

    /// One white texel, bound when the material has no map.
    pub fn white_pixel(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let frame = ImageFrame::from_rgba(image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4])));
        Self::create_from_frame(device, queue, &frame, "Placeholder Map")
    }

    /// sRGB cube with one mip per prefiltered level, sampled trilinearly so
    /// roughness can pick a level in between.
    pub fn create_environment_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        environment: &PrefilteredEnvironment,
        label: &str,
    ) -> Self {
        let size = environment.face_size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: environment.mip_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in environment.levels().iter().enumerate() {
            for face in 0..6 {
                write_rgba(
                    queue,
                    &texture,
                    mip as u32,
                    face as u32,
                    (level.size, level.size),
                    &level.face_bytes(face),
                );
            }
        }

        Self::cube_from_texture(device, texture, label)
    }

    /// Black 1×1 cube, bound until the environment map has loaded.
    pub fn black_cube(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Placeholder Environment"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for face in 0..6 {
            write_rgba(queue, &texture, 0, face, (1, 1), &[0, 0, 0, 255]);
        }
        Self::cube_from_texture(device, texture, "Placeholder Environment")
    }

    fn cube_from_texture(device: &wgpu::Device, texture: wgpu::Texture, label: &str) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = linear_sampler(device, &format!("{label} Sampler"), wgpu::AddressMode::ClampToEdge);
        Self {
            texture,
            view,
            sampler,
        }
    }
}
