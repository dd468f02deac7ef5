//! glTF/GLB decoding into a [`SceneGraph`] plus animation clips.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cgmath::{Quaternion, Vector3};

use super::LoadError;
use crate::animation::{AnimationClip, Interpolation, Keyframes, Track, TrackProperty};
use crate::gfx::resources::material::StandardMaterial;
use crate::gfx::scene::{
    LightKind, LightNode, MaterialSlot, MeshData, MeshNode, Node, NodeId, NodeKind, SceneGraph,
    Transform,
};

/// A decoded model, not yet part of the viewer's scene.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub graph: SceneGraph,
    /// Group holding the glTF scene's top-level nodes.
    pub root: NodeId,
    pub clips: Vec<Arc<AnimationClip>>,
}

/// Decodes a `.gltf` or `.glb` file already read into memory. External
/// buffers are resolved against `base`.
pub fn parse_model_bytes(bytes: &[u8], base: Option<&Path>) -> Result<ModelAsset, LoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base, blob)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::MissingScene)?;

    let mut graph = SceneGraph::new();
    let root = graph.add_node(
        Node::new(scene.name().unwrap_or("Scene"), NodeKind::Group),
        None,
    );
    let mut node_map = HashMap::new();
    for node in scene.nodes() {
        add_node(&node, Some(root), &buffers, &mut graph, &mut node_map)?;
    }

    let clips = document
        .animations()
        .enumerate()
        .map(|(index, animation)| read_animation(&animation, index, &buffers, &node_map))
        .filter(|clip| !clip.tracks().is_empty())
        .map(Arc::new)
        .collect::<Vec<_>>();

    log::debug!(
        "decoded glTF scene with {} nodes and {} clips",
        graph.len(),
        clips.len()
    );
    Ok(ModelAsset { graph, root, clips })
}

fn add_node(
    node: &gltf::Node,
    parent: Option<NodeId>,
    buffers: &[gltf::buffer::Data],
    graph: &mut SceneGraph,
    node_map: &mut HashMap<usize, NodeId>,
) -> Result<(), LoadError> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform::new(
        Vector3::from(translation),
        Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        Vector3::from(scale),
    );

    let name = node
        .name()
        .or_else(|| node.mesh().and_then(|mesh| mesh.name()))
        .unwrap_or_default()
        .to_string();

    let light = node.light().map(|light| read_light(&light));
    let kind = match (node.mesh(), &light) {
        (Some(mesh), _) => NodeKind::Mesh(read_mesh(&mesh, buffers)?),
        (None, Some(light)) => NodeKind::Light(light.clone()),
        (None, None) => NodeKind::Group,
    };
    let is_mesh = matches!(kind, NodeKind::Mesh(_));

    let id = graph.add_node(Node::new(name.clone(), kind).with_transform(transform), parent);
    node_map.insert(node.index(), id);

    // A node carrying both a mesh and a light gets the light as a child.
    if let (true, Some(light)) = (is_mesh, light) {
        graph.add_node(Node::new(format!("{name}_light"), NodeKind::Light(light)), Some(id));
    }

    for child in node.children() {
        add_node(&child, Some(id), buffers, graph, node_map)?;
    }
    Ok(())
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<MeshNode, LoadError> {
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("skipping non-triangle primitive of mesh {:?}", mesh.name());
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| LoadError::MissingPositions {
                mesh: mesh.name().unwrap_or_default().to_string(),
            })?
            .collect();
        let normals = reader.read_normals().map(|iter| iter.collect());
        let uvs = reader.read_tex_coords(0).map(|iter| iter.into_f32().collect());
        let indices = reader.read_indices().map(|iter| iter.into_u32().collect());

        primitives.push(Arc::new(MeshData::from_attributes(positions, normals, uvs, indices)));
    }

    let material = mesh
        .primitives()
        .next()
        .map(|primitive| read_material(&primitive.material()))
        .unwrap_or_default();
    Ok(MeshNode::new(primitives, MaterialSlot::Standard(material)))
}

fn read_material(material: &gltf::Material) -> StandardMaterial {
    let pbr = material.pbr_metallic_roughness();
    StandardMaterial {
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
        double_sided: material.double_sided(),
    }
}

fn read_light(light: &gltf::khr_lights_punctual::Light) -> LightNode {
    use gltf::khr_lights_punctual::Kind;

    let kind = match light.kind() {
        Kind::Directional => LightKind::Directional,
        Kind::Point => LightKind::Point {
            range: light.range(),
        },
        Kind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } => LightKind::Spot {
            range: light.range(),
            inner_cone_angle,
            outer_cone_angle,
        },
    };
    LightNode::new(kind, light.color(), light.intensity())
}

fn read_animation(
    animation: &gltf::Animation,
    index: usize,
    buffers: &[gltf::buffer::Data],
    node_map: &HashMap<usize, NodeId>,
) -> AnimationClip {
    use gltf::animation::util::ReadOutputs;

    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let target = channel.target();
        let Some(&node) = node_map.get(&target.node().index()) else {
            log::debug!("animation channel targets a node outside the scene");
            continue;
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();

        let (property, values) = match outputs {
            ReadOutputs::Translations(values) => (
                TrackProperty::Translation,
                Keyframes::Vector(values.map(Vector3::from).collect()),
            ),
            ReadOutputs::Scales(values) => (
                TrackProperty::Scale,
                Keyframes::Vector(values.map(Vector3::from).collect()),
            ),
            ReadOutputs::Rotations(values) => (
                TrackProperty::Rotation,
                Keyframes::Rotation(
                    values
                        .into_f32()
                        .map(|[x, y, z, w]| Quaternion::new(w, x, y, z))
                        .collect(),
                ),
            ),
            ReadOutputs::MorphTargetWeights(_) => {
                log::debug!("skipping morph target weights channel");
                continue;
            }
        };

        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };

        match Track::new(node, property, interpolation, times, values) {
            Some(track) => tracks.push(track),
            None => log::warn!("dropping malformed animation channel"),
        }
    }

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{index}"));
    AnimationClip::new(name, tracks)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const SCENE_JSON: &str = r#"{
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_lights_punctual"],
        "extensions": { "KHR_lights_punctual": { "lights": [
            { "type": "directional", "color": [1.0, 0.9, 0.8], "intensity": 2.0 }
        ] } },
        "scene": 0,
        "scenes": [{ "name": "Objects", "nodes": [0, 1, 2] }],
        "nodes": [
            { "name": "desktop", "mesh": 0 },
            { "name": "shelf", "mesh": 0, "translation": [3.0, 0.0, 0.0] },
            { "name": "sun", "extensions": { "KHR_lights_punctual": { "light": 0 } } }
        ],
        "meshes": [{ "name": "quad", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "buffers": [{ "byteLength": 92 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 48, "target": 34962 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 12, "target": 34963 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 68, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
              "min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [1.0] },
            { "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "animations": [{
            "name": "lift",
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            "samplers": [{ "input": 2, "output": 3, "interpolation": "LINEAR" }]
        }]
    }"#;

    fn binary_chunk() -> Vec<u8> {
        let mut bin = Vec::new();
        let floats = |bin: &mut Vec<u8>, values: &[f32]| {
            for value in values {
                bin.extend_from_slice(&value.to_le_bytes());
            }
        };
        floats(
            &mut bin,
            &[-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
        );
        for index in [0u16, 1, 2, 2, 3, 0] {
            bin.extend_from_slice(&index.to_le_bytes());
        }
        floats(&mut bin, &[0.0, 1.0]);
        floats(&mut bin, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        bin
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
        out
    }

    /// Two quads named `desktop` and `shelf`, a directional light and a
    /// one second `lift` clip on the desktop.
    pub(crate) fn showcase_glb() -> Vec<u8> {
        glb(SCENE_JSON, &binary_chunk())
    }

    #[test]
    fn test_glb_decodes_meshes_lights_and_clips() {
        let asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        let graph = &asset.graph;

        assert_eq!(graph.node(asset.root).map(|n| n.name.as_str()), Some("Objects"));
        assert_eq!(graph.descendants(asset.root).len(), 4);

        let desktop = graph.find_by_name("desktop").unwrap();
        let mesh = graph.node(desktop).and_then(|n| n.as_mesh()).unwrap();
        assert_eq!(mesh.primitives.len(), 1);
        assert_eq!(mesh.primitives[0].index_count(), 6);
        // Normals were computed from the +Z facing quad.
        assert_eq!(mesh.primitives[0].vertices()[0].normal, [0.0, 0.0, 1.0]);

        let sun = graph.find_by_name("sun").unwrap();
        let light = graph.node(sun).and_then(|n| n.as_light()).unwrap();
        assert_eq!(light.kind, LightKind::Directional);
        assert_eq!(light.intensity, 2.0);
        assert!(!light.cast_shadow);

        assert_eq!(asset.clips.len(), 1);
        assert_eq!(asset.clips[0].name, "lift");
        assert_eq!(asset.clips[0].duration(), 1.0);
        assert_eq!(asset.clips[0].tracks()[0].target, desktop);
    }

    #[test]
    fn test_garbage_is_a_gltf_error() {
        assert!(matches!(
            parse_model_bytes(b"definitely not a model", None),
            Err(LoadError::Gltf(_))
        ));
    }
}
