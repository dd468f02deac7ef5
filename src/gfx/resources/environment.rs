//! # Environment Lighting
//!
//! Six cube-face images become a prefiltered radiance map: a mip chain in
//! linear space where each level is a 2×2 box filter of the one above it.
//! The shader picks a level from the surface roughness, level `i` standing
//! for roughness `i / (levels - 1)`.
//!
//! Decoding and prefiltering are CPU work and run on the loader thread. The
//! renderer only uploads the finished [`PrefilteredEnvironment`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::gfx::loader::LoadError;

/// Face order of every cube map in the crate.
pub const CUBE_FACE_LABELS: [&str; 6] = ["+X", "-X", "+Y", "-Y", "+Z", "-Z"];

pub(crate) fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub(crate) fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Six square faces of equal size, linear RGBA.
#[derive(Debug, Clone)]
pub struct CubeFaces {
    size: u32,
    faces: Vec<Vec<[f32; 4]>>,
}

impl CubeFaces {
    /// Converts decoded sRGB images, rejecting non-square or unequal faces.
    pub fn from_images(images: Vec<image::RgbaImage>) -> Result<Self, LoadError> {
        let expected = images.first().map(|img| img.width()).unwrap_or(0);
        if images.len() != 6 {
            return Err(LoadError::CubeFaceMismatch {
                face: images.len(),
                width: 0,
                height: 0,
                expected,
            });
        }
        for (face, img) in images.iter().enumerate() {
            let (width, height) = img.dimensions();
            if width != expected || height != expected || width == 0 {
                return Err(LoadError::CubeFaceMismatch {
                    face,
                    width,
                    height,
                    expected,
                });
            }
        }

        let faces = images
            .iter()
            .map(|img| {
                img.pixels()
                    .map(|p| {
                        let [r, g, b, a] = p.0;
                        [
                            srgb_to_linear(r as f32 / 255.0),
                            srgb_to_linear(g as f32 / 255.0),
                            srgb_to_linear(b as f32 / 255.0),
                            a as f32 / 255.0,
                        ]
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            size: expected,
            faces,
        })
    }

    /// Decodes the six files in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn load(paths: &[PathBuf; 6]) -> Result<Self, LoadError> {
        let images = paths
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|img| img.to_rgba8())
                    .map_err(|source| LoadError::image(path, source))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_images(images)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, index: usize) -> &[[f32; 4]] {
        &self.faces[index]
    }
}

/// One mip level of all six faces.
#[derive(Debug, Clone)]
pub struct EnvironmentLevel {
    pub size: u32,
    pub faces: Vec<Vec<[f32; 4]>>,
}

impl EnvironmentLevel {
    /// Tightly packed sRGB RGBA8 pixels of one face, ready for upload.
    pub fn face_bytes(&self, face: usize) -> Vec<u8> {
        self.faces[face]
            .iter()
            .flat_map(|[r, g, b, a]| {
                [
                    (linear_to_srgb(*r) * 255.0).round() as u8,
                    (linear_to_srgb(*g) * 255.0).round() as u8,
                    (linear_to_srgb(*b) * 255.0).round() as u8,
                    (a.clamp(0.0, 1.0) * 255.0).round() as u8,
                ]
            })
            .collect()
    }
}

/// Mipmapped cube map where deeper levels are blurrier.
#[derive(Debug)]
pub struct PrefilteredEnvironment {
    levels: Vec<EnvironmentLevel>,
}

impl PrefilteredEnvironment {
    pub fn face_size(&self) -> u32 {
        self.levels.first().map(|level| level.size).unwrap_or(0)
    }

    pub fn levels(&self) -> &[EnvironmentLevel] {
        &self.levels
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Deepest level, sampled at roughness 1.
    pub fn max_mip_level(&self) -> u32 {
        self.mip_count().saturating_sub(1)
    }

    pub fn roughness_of_level(&self, level: u32) -> f32 {
        match self.max_mip_level() {
            0 => 0.0,
            max => level.min(max) as f32 / max as f32,
        }
    }
}

/// Builds [`PrefilteredEnvironment`]s, reusing one scratch buffer.
#[derive(Debug, Default)]
pub struct PmremGenerator {
    scratch: Vec<[f32; 4]>,
}

impl PmremGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cubemap(&mut self, cube: &CubeFaces) -> Arc<PrefilteredEnvironment> {
        let mut levels = vec![EnvironmentLevel {
            size: cube.size,
            faces: cube.faces.clone(),
        }];

        while let Some(previous) = levels.last().filter(|level| level.size > 1) {
            let size = (previous.size / 2).max(1);
            let faces = previous
                .faces
                .iter()
                .map(|face| {
                    self.downsample(face, previous.size, size);
                    self.scratch.clone()
                })
                .collect();
            levels.push(EnvironmentLevel { size, faces });
        }

        log::debug!(
            "prefiltered {}px environment into {} levels",
            cube.size,
            levels.len()
        );
        Arc::new(PrefilteredEnvironment { levels })
    }

    /// Releases the scratch buffer.
    pub fn dispose(&mut self) {
        self.scratch = Vec::new();
    }

    fn downsample(&mut self, source: &[[f32; 4]], source_size: u32, size: u32) {
        let src = source_size as usize;
        self.scratch.clear();
        for y in 0..size as usize {
            for x in 0..size as usize {
                let mut sum = [0.0f32; 4];
                for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let px = (x * 2 + sx).min(src - 1);
                    let py = (y * 2 + sy).min(src - 1);
                    let texel = source[py * src + px];
                    for c in 0..4 {
                        sum[c] += texel[c] * 0.25;
                    }
                }
                self.scratch.push(sum);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: u32, value: u8) -> image::RgbaImage {
        image::RgbaImage::from_pixel(size, size, image::Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_unequal_faces_are_rejected() {
        let mut images: Vec<_> = (0..6).map(|_| solid(4, 128)).collect();
        images[3] = solid(2, 128);
        assert!(matches!(
            CubeFaces::from_images(images),
            Err(LoadError::CubeFaceMismatch { face: 3, .. })
        ));

        let mut images: Vec<_> = (0..6).map(|_| solid(4, 128)).collect();
        images[0] = image::RgbaImage::new(4, 2);
        assert!(matches!(
            CubeFaces::from_images(images),
            Err(LoadError::CubeFaceMismatch { face: 0, .. })
        ));

        assert!(CubeFaces::from_images(vec![solid(4, 0)]).is_err());
    }

    #[test]
    fn test_mip_chain_halves_to_one_texel() {
        let cube = CubeFaces::from_images((0..6).map(|_| solid(8, 255)).collect()).unwrap();
        let mut generator = PmremGenerator::new();
        let env = generator.from_cubemap(&cube);
        generator.dispose();

        let sizes: Vec<u32> = env.levels().iter().map(|level| level.size).collect();
        assert_eq!(sizes, vec![8, 4, 2, 1]);
        assert_eq!(env.max_mip_level(), 3);
        assert_eq!(env.roughness_of_level(0), 0.0);
        assert_eq!(env.roughness_of_level(3), 1.0);
        assert_eq!(env.levels()[3].face_bytes(5), vec![255, 255, 255, 255]);
    }

    #[test]
    fn test_box_filter_averages_in_linear_space() {
        // Left half white, right half black.
        let checker = image::RgbaImage::from_fn(2, 2, |x, _| {
            let v = if x == 0 { 255 } else { 0 };
            image::Rgba([v, v, v, 255])
        });
        let cube = CubeFaces::from_images(vec![checker; 6]).unwrap();
        let env = PmremGenerator::new().from_cubemap(&cube);

        let texel = env.levels()[1].faces[0][0];
        assert!((texel[0] - 0.5).abs() < 1e-6);
        assert_eq!(texel[3], 1.0);
    }
}
