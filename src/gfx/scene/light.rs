/// Shadow map settings of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    /// Shadow map resolution in texels.
    pub map_size: (u32, u32),
    /// Depth offset applied before the comparison. Negative values push the
    /// receiver towards the light to hide acne.
    pub bias: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: (512, 512),
            bias: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point {
        range: Option<f32>,
    },
    Spot {
        range: Option<f32>,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

/// A punctual light. It points down its node's local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    pub kind: LightKind,
    /// Linear RGB.
    pub color: [f32; 3],
    /// Candela for point and spot lights, lux for directional lights.
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl LightNode {
    pub fn new(kind: LightKind, color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind,
            color,
            intensity,
            cast_shadow: false,
            shadow: ShadowConfig::default(),
        }
    }
}
