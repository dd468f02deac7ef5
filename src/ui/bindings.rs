//! Two-way bindings between [`PhysicalMaterial`] fields and panel widgets.
//!
//! The table in [`BINDINGS`] is the single description of the panel: which
//! folder a field sits in, its widget and bounds, and whether editing it
//! forces a pipeline rebuild. All writes go through [`apply_edit`].

use thiserror::Error;

use crate::gfx::resources::material::{Color, ColorParseError, PhysicalMaterial, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialField {
    Transparent,
    Opacity,
    DepthTest,
    DepthWrite,
    AlphaTest,
    Visible,
    Side,
    Color,
    Emissive,
    Wireframe,
    FlatShading,
    Roughness,
    Metalness,
    Clearcoat,
    ClearcoatRoughness,
    Transmission,
    Ior,
    Thickness,
    EnvMapIntensity,
}

impl MaterialField {
    /// Fields that select a different shader path and so need a rebuild
    /// the renderer would not notice on its own.
    pub fn needs_recompile(self) -> bool {
        matches!(
            self,
            MaterialField::AlphaTest | MaterialField::Side | MaterialField::FlatShading
        )
    }

    /// [`BINDINGS`] lists the fields in declaration order.
    pub fn binding(self) -> &'static Binding {
        &BINDINGS[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Material,
    Physical,
}

impl Folder {
    pub const ALL: [Folder; 2] = [Folder::Material, Folder::Physical];

    pub fn label(self) -> &'static str {
        match self {
            Folder::Material => "Material",
            Folder::Physical => "MeshPhysicalMaterial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Widget {
    Checkbox,
    Slider { min: f32, max: f32, step: Option<f32> },
    Color,
    /// Options indexed by the field's numeric value.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub field: MaterialField,
    pub folder: Folder,
    pub label: &'static str,
    pub widget: Widget,
}

const fn slider(min: f32, max: f32, step: Option<f32>) -> Widget {
    Widget::Slider { min, max, step }
}

const SIDE_OPTIONS: &[&str] = &["FrontSide", "BackSide", "DoubleSide"];

pub static BINDINGS: [Binding; 19] = {
    use Folder::{Material, Physical};
    use MaterialField as F;
    const fn bind(field: MaterialField, folder: Folder, label: &'static str, widget: Widget) -> Binding {
        Binding {
            field,
            folder,
            label,
            widget,
        }
    }
    [
        bind(F::Transparent, Material, "transparent", Widget::Checkbox),
        bind(F::Opacity, Material, "opacity", slider(0.0, 1.0, Some(0.01))),
        bind(F::DepthTest, Material, "depthTest", Widget::Checkbox),
        bind(F::DepthWrite, Material, "depthWrite", Widget::Checkbox),
        bind(F::AlphaTest, Material, "alphaTest", slider(0.0, 1.0, Some(0.01))),
        bind(F::Visible, Material, "visible", Widget::Checkbox),
        bind(F::Side, Material, "side", Widget::Choice(SIDE_OPTIONS)),
        bind(F::Color, Physical, "color", Widget::Color),
        bind(F::Emissive, Physical, "emissive", Widget::Color),
        bind(F::Wireframe, Physical, "wireframe", Widget::Checkbox),
        bind(F::FlatShading, Physical, "flatShading", Widget::Checkbox),
        bind(F::Roughness, Physical, "roughness", slider(0.0, 1.0, None)),
        bind(F::Metalness, Physical, "metalness", slider(0.0, 1.0, None)),
        bind(F::Clearcoat, Physical, "clearcoat", slider(0.0, 1.0, Some(0.01))),
        bind(F::ClearcoatRoughness, Physical, "clearcoatRoughness", slider(0.0, 1.0, Some(0.01))),
        bind(F::Transmission, Physical, "transmission", slider(0.0, 1.0, Some(0.01))),
        bind(F::Ior, Physical, "ior", slider(1.0, 2.333, None)),
        bind(F::Thickness, Physical, "thickness", slider(0.0, 10.0, None)),
        bind(F::EnvMapIntensity, Physical, "envMapIntensity", slider(0.0, 50.0, None)),
    ]
};

/// A widget value on its way into or out of the material.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Number(f32),
    /// `#rrggbb`
    Hex(String),
    Choice(u32),
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("{field:?} cannot take {value:?}")]
    TypeMismatch { field: MaterialField, value: FieldValue },
    #[error("no side with value {0}")]
    UnknownSide(u32),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// Rounds to the widget step, if it has one.
pub fn quantize(value: f32, step: Option<f32>) -> f32 {
    match step {
        Some(step) if step > 0.0 => (value / step).round() * step,
        _ => value,
    }
}

pub fn read_field(material: &PhysicalMaterial, field: MaterialField) -> FieldValue {
    use MaterialField as F;
    match field {
        F::Transparent => FieldValue::Bool(material.transparent),
        F::Opacity => FieldValue::Number(material.opacity),
        F::DepthTest => FieldValue::Bool(material.depth_test),
        F::DepthWrite => FieldValue::Bool(material.depth_write),
        F::AlphaTest => FieldValue::Number(material.alpha_test),
        F::Visible => FieldValue::Bool(material.visible),
        F::Side => FieldValue::Choice(material.side.index()),
        F::Color => FieldValue::Hex(material.color.hex_string()),
        F::Emissive => FieldValue::Hex(material.emissive.hex_string()),
        F::Wireframe => FieldValue::Bool(material.wireframe),
        F::FlatShading => FieldValue::Bool(material.flat_shading),
        F::Roughness => FieldValue::Number(material.roughness),
        F::Metalness => FieldValue::Number(material.metalness),
        F::Clearcoat => FieldValue::Number(material.clearcoat),
        F::ClearcoatRoughness => FieldValue::Number(material.clearcoat_roughness),
        F::Transmission => FieldValue::Number(material.transmission),
        F::Ior => FieldValue::Number(material.ior),
        F::Thickness => FieldValue::Number(material.thickness),
        F::EnvMapIntensity => FieldValue::Number(material.env_map_intensity),
    }
}

/// Writes a widget value into the material.
///
/// Numbers are snapped to the widget step but never clamped. The side
/// accepts a choice index or a plain number and is stored as its enum
/// value. Editing a recompile field marks the material for a rebuild.
pub fn apply_edit(
    material: &mut PhysicalMaterial,
    field: MaterialField,
    value: FieldValue,
) -> Result<(), BindingError> {
    use MaterialField as F;

    let step = match field.binding().widget {
        Widget::Slider { step, .. } => step,
        _ => None,
    };

    match (field, value) {
        (F::Transparent, FieldValue::Bool(v)) => material.transparent = v,
        (F::DepthTest, FieldValue::Bool(v)) => material.depth_test = v,
        (F::DepthWrite, FieldValue::Bool(v)) => material.depth_write = v,
        (F::Visible, FieldValue::Bool(v)) => material.visible = v,
        (F::Wireframe, FieldValue::Bool(v)) => material.wireframe = v,
        (F::FlatShading, FieldValue::Bool(v)) => material.flat_shading = v,
        (F::Side, FieldValue::Choice(index)) => {
            material.side = Side::from_index(index).ok_or(BindingError::UnknownSide(index))?;
        }
        (F::Side, FieldValue::Number(number)) => {
            let index = number.max(0.0) as u32;
            material.side = Side::from_index(index).ok_or(BindingError::UnknownSide(index))?;
        }
        (F::Color, FieldValue::Hex(hex)) => material.color = Color::parse_hex(&hex)?,
        (F::Emissive, FieldValue::Hex(hex)) => material.emissive = Color::parse_hex(&hex)?,
        (field, FieldValue::Number(number)) => {
            let number = quantize(number, step);
            let slot = match field {
                F::Opacity => &mut material.opacity,
                F::AlphaTest => &mut material.alpha_test,
                F::Roughness => &mut material.roughness,
                F::Metalness => &mut material.metalness,
                F::Clearcoat => &mut material.clearcoat,
                F::ClearcoatRoughness => &mut material.clearcoat_roughness,
                F::Transmission => &mut material.transmission,
                F::Ior => &mut material.ior,
                F::Thickness => &mut material.thickness,
                F::EnvMapIntensity => &mut material.env_map_intensity,
                _ => {
                    return Err(BindingError::TypeMismatch {
                        field,
                        value: FieldValue::Number(number),
                    })
                }
            };
            *slot = number;
        }
        (field, value) => return Err(BindingError::TypeMismatch { field, value }),
    }

    if field.needs_recompile() {
        material.mark_needs_update();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_bound_once() {
        for binding in &BINDINGS {
            let count = BINDINGS.iter().filter(|b| b.field == binding.field).count();
            assert_eq!(count, 1, "{:?}", binding.field);
            assert_eq!(binding.field.binding(), binding);
        }
        assert_eq!(
            BINDINGS.iter().filter(|b| b.folder == Folder::Material).count(),
            7
        );
    }

    #[test]
    fn test_table_follows_field_order() {
        assert_eq!(BINDINGS.len(), MaterialField::EnvMapIntensity as usize + 1);
        for (index, binding) in BINDINGS.iter().enumerate() {
            assert_eq!(binding.field as usize, index, "{:?}", binding.field);
        }
        assert_eq!(MaterialField::Side.binding().label, "side");
        assert_eq!(MaterialField::EnvMapIntensity.binding().label, "envMapIntensity");
    }

    #[test]
    fn test_only_shader_fields_set_needs_update() {
        let edits = [
            (MaterialField::AlphaTest, FieldValue::Number(0.5), true),
            (MaterialField::Side, FieldValue::Choice(2), true),
            (MaterialField::FlatShading, FieldValue::Bool(true), true),
            (MaterialField::Opacity, FieldValue::Number(0.5), false),
            (MaterialField::Wireframe, FieldValue::Bool(true), false),
            (MaterialField::Color, FieldValue::Hex("#ff0000".into()), false),
            (MaterialField::Ior, FieldValue::Number(1.5), false),
        ];
        for (field, value, expected) in edits {
            let mut material = PhysicalMaterial::default();
            apply_edit(&mut material, field, value).unwrap();
            assert_eq!(material.needs_update(), expected, "{field:?}");
        }
    }

    #[test]
    fn test_side_is_coerced_to_its_number() {
        let mut material = PhysicalMaterial::default();
        apply_edit(&mut material, MaterialField::Side, FieldValue::Number(1.0)).unwrap();
        assert_eq!(material.side, Side::Back);
        assert_eq!(read_field(&material, MaterialField::Side), FieldValue::Choice(1));

        assert!(matches!(
            apply_edit(&mut material, MaterialField::Side, FieldValue::Choice(7)),
            Err(BindingError::UnknownSide(7))
        ));
        assert_eq!(material.side, Side::Back);
    }

    #[test]
    fn test_color_goes_through_hex() {
        let mut material = PhysicalMaterial::default();
        apply_edit(&mut material, MaterialField::Emissive, FieldValue::Hex("#336699".into())).unwrap();
        assert_eq!(material.emissive.hex(), 0x336699);
        assert_eq!(
            read_field(&material, MaterialField::Emissive),
            FieldValue::Hex("#336699".into())
        );
        assert!(apply_edit(&mut material, MaterialField::Color, FieldValue::Hex("nope".into())).is_err());
    }

    #[test]
    fn test_numbers_snap_to_step_without_clamping() {
        let mut material = PhysicalMaterial::default();
        apply_edit(&mut material, MaterialField::Opacity, FieldValue::Number(0.456)).unwrap();
        assert!((material.opacity - 0.46).abs() < 1e-6);

        apply_edit(&mut material, MaterialField::Ior, FieldValue::Number(4.0)).unwrap();
        assert_eq!(material.ior, 4.0);
    }

    #[test]
    fn test_wrong_value_kind_is_rejected() {
        let mut material = PhysicalMaterial::default();
        assert!(matches!(
            apply_edit(&mut material, MaterialField::Visible, FieldValue::Number(1.0)),
            Err(BindingError::TypeMismatch { .. })
        ));
        assert!(material.visible);
    }
}
