//! Material system for PBR rendering
//!
//! The viewer has exactly one tunable material, [`PhysicalMaterial`], shared
//! between the render path and the debug panel. Meshes that keep the material
//! authored in their model file carry a plain [`StandardMaterial`] instead.
//!
//! Fields on [`PhysicalMaterial`] are public and are never clamped here. The
//! documented ranges (ior in 1.0..=2.333, opacity and the other factors in
//! 0..=1) are enforced only by the widgets that edit them.

use std::num::ParseIntError;
use std::sync::Arc;

use thiserror::Error;

use super::environment::PrefilteredEnvironment;
use super::texture_source::MapTexture;

/// Which triangle faces are rendered (and hit-tested).
///
/// The discriminants are the stable numeric values the panel stores.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front = 0,
    Back = 1,
    Double = 2,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Front, Side::Back, Side::Double];

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Side::Front),
            1 => Some(Side::Back),
            2 => Some(Side::Double),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Front => "FrontSide",
            Side::Back => "BackSide",
            Side::Double => "DoubleSide",
        }
    }

    /// Face culled by the rasterizer for this side.
    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        }
    }

    /// Whether a triangle seen from the given facing is visible.
    pub fn accepts(self, front_facing: bool) -> bool {
        match self {
            Side::Front => front_facing,
            Side::Back => !front_facing,
            Side::Double => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ColorParseError {
    #[error("expected six hex digits, got `{0}`")]
    Length(String),
    #[error("invalid hex color `{input}`")]
    Digits {
        input: String,
        #[source]
        source: ParseIntError,
    },
}

/// RGB color with components in 0..=1, stored in sRGB space like the hex
/// values the panel edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn hex(&self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// `#rrggbb`
    pub fn hex_string(&self) -> String {
        format!("#{:06x}", self.hex())
    }

    /// Parses `#rrggbb`, `0xrrggbb` or bare `rrggbb`.
    pub fn parse_hex(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .unwrap_or(trimmed);
        if digits.len() != 6 {
            return Err(ColorParseError::Length(input.to_string()));
        }
        let hex = u32::from_str_radix(digits, 16).map_err(|source| ColorParseError::Digits {
            input: input.to_string(),
            source,
        })?;
        Ok(Self::from_hex(hex))
    }

    pub fn set_hex_str(&mut self, input: &str) -> Result<(), ColorParseError> {
        *self = Self::parse_hex(input)?;
        Ok(())
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_array(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }

    pub fn to_linear(self) -> [f32; 3] {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [decode(self.r), decode(self.g), decode(self.b)]
    }
}

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear base color, opacity in `w`.
    pub color: [f32; 4],
    /// Linear emissive color, environment intensity in `w`.
    pub emissive: [f32; 4],
    /// roughness, metalness, clearcoat, clearcoat roughness
    pub surface: [f32; 4],
    /// transmission, ior, thickness, alpha test
    pub volume: [f32; 4],
    /// has map, has environment, environment max mip, unused
    pub maps: [f32; 4],
}

/// The shared physically-based material.
#[derive(Debug, Clone)]
pub struct PhysicalMaterial {
    pub color: Color,
    pub emissive: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub thickness: f32,
    pub env_map_intensity: f32,
    pub side: Side,
    pub wireframe: bool,
    pub flat_shading: bool,
    pub transparent: bool,
    pub opacity: f32,
    pub depth_test: bool,
    pub depth_write: bool,
    pub alpha_test: f32,
    pub visible: bool,
    pub map: Option<MapTexture>,
    pub env_map: Option<Arc<PrefilteredEnvironment>>,
    needs_update: bool,
    version: u64,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            emissive: Color::BLACK,
            roughness: 0.9,
            metalness: 0.0,
            clearcoat: 0.1,
            clearcoat_roughness: 0.0,
            transmission: 0.91,
            ior: 1.25,
            thickness: 3.0,
            env_map_intensity: 25.0,
            side: Side::Front,
            wireframe: false,
            flat_shading: false,
            transparent: false,
            opacity: 1.0,
            depth_test: true,
            depth_write: true,
            alpha_test: 0.0,
            visible: true,
            map: None,
            env_map: None,
            needs_update: false,
            version: 0,
        }
    }
}

impl PhysicalMaterial {
    /// Flags the material for a pipeline rebuild on the next frame.
    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
        self.version += 1;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Clears the rebuild flag, returning whether it was set.
    pub fn take_needs_update(&mut self) -> bool {
        std::mem::take(&mut self.needs_update)
    }

    /// Increments on every [`mark_needs_update`](Self::mark_needs_update).
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_env_map(&mut self, environment: Arc<PrefilteredEnvironment>) {
        self.env_map = Some(environment);
        self.mark_needs_update();
    }

    pub fn set_map(&mut self, map: MapTexture) {
        self.map = Some(map);
        self.mark_needs_update();
    }

    pub fn uniform(&self) -> MaterialUniform {
        let color = self.color.to_linear();
        let emissive = self.emissive.to_linear();
        let env_max_mip = self
            .env_map
            .as_ref()
            .map(|env| env.max_mip_level() as f32)
            .unwrap_or(0.0);
        MaterialUniform {
            color: [color[0], color[1], color[2], self.opacity],
            emissive: [emissive[0], emissive[1], emissive[2], self.env_map_intensity],
            surface: [
                self.roughness,
                self.metalness,
                self.clearcoat,
                self.clearcoat_roughness,
            ],
            volume: [self.transmission, self.ior, self.thickness, self.alpha_test],
            maps: [
                if self.map.is_some() { 1.0 } else { 0.0 },
                if self.env_map.is_some() { 1.0 } else { 0.0 },
                env_max_mip,
                0.0,
            ],
        }
    }
}

/// Metallic-roughness material authored in a model file.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    /// Linear RGBA.
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub double_sided: bool,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
            emissive: [0.0, 0.0, 0.0],
            double_sided: false,
        }
    }
}

impl StandardMaterial {
    pub fn side(&self) -> Side {
        if self.double_sided {
            Side::Double
        } else {
            Side::Front
        }
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: self.base_color,
            emissive: [self.emissive[0], self.emissive[1], self.emissive[2], 1.0],
            surface: [self.roughness, self.metallic, 0.0, 0.0],
            volume: [0.0, 1.5, 0.0, 0.0],
            maps: [0.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color = Color::from_hex(0x3399ff);
        assert_eq!(color.hex(), 0x3399ff);
        assert_eq!(color.hex_string(), "#3399ff");

        let mut parsed = Color::BLACK;
        parsed.set_hex_str("0x3399ff").unwrap();
        assert_eq!(parsed.hex(), 0x3399ff);
        assert_eq!(Color::parse_hex("3399FF").unwrap().hex(), 0x3399ff);
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(matches!(
            Color::parse_hex("#fff"),
            Err(ColorParseError::Length(_))
        ));
        assert!(matches!(
            Color::parse_hex("#gg0000"),
            Err(ColorParseError::Digits { .. })
        ));
    }

    #[test]
    fn test_side_numeric_values() {
        assert_eq!(Side::Front.index(), 0);
        assert_eq!(Side::Back.index(), 1);
        assert_eq!(Side::Double.index(), 2);
        for side in Side::ALL {
            assert_eq!(Side::from_index(side.index()), Some(side));
        }
        assert_eq!(Side::from_index(3), None);
    }

    #[test]
    fn test_ior_is_not_clamped() {
        // Known gap: only the panel slider bounds ior.
        let mut material = PhysicalMaterial::default();
        material.ior = 3.5;
        assert_eq!(material.ior, 3.5);
        assert_eq!(material.uniform().volume[1], 3.5);

        material.ior = 0.5;
        assert_eq!(material.uniform().volume[1], 0.5);
    }

    #[test]
    fn test_needs_update_is_consumed_once() {
        let mut material = PhysicalMaterial::default();
        assert!(!material.needs_update());
        material.mark_needs_update();
        assert_eq!(material.version(), 1);
        assert!(material.take_needs_update());
        assert!(!material.take_needs_update());
    }
}
