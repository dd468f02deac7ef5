//! Turns a decoded [`ModelAsset`] into live scene state: shadows on every
//! mesh and light, the shared material on the `desktop` mesh, and a mixer
//! playing every bundled clip in ping-pong.

use std::sync::Arc;

use super::model::ModelAsset;
use crate::animation::{ActionId, AnimationMixer, LoopMode};
use crate::config::ShadowSettings;
use crate::gfx::scene::{MaterialSlot, NodeId, NodeKind, SceneGraph, ShadowConfig};

/// Name of the mesh that gets the shared material, rotates and is clickable.
pub const DESKTOP_NODE_NAME: &str = "desktop";

#[derive(Debug, Clone)]
pub struct AssemblySettings {
    /// Time factor of every created action.
    pub time_scale: f32,
    pub shadows: ShadowSettings,
}

/// References retained from one assembled model. All of them stay `None`
/// when the model has no `desktop` mesh.
#[derive(Debug, Default)]
pub struct AssembledModel {
    /// First `desktop` mesh in traversal order.
    pub tracked_mesh: Option<NodeId>,
    /// Root of the whole model, used as the raycast candidate set.
    pub hitbox: Option<NodeId>,
    /// Mixer over every clip, with the first clip's action tracked.
    pub rig: Option<(AnimationMixer, ActionId)>,
}

/// Configures the asset and appends it to `scene`.
pub fn assemble_model(
    scene: &mut SceneGraph,
    asset: ModelAsset,
    settings: &AssemblySettings,
) -> AssembledModel {
    let ModelAsset {
        mut graph,
        root,
        clips,
    } = asset;

    let mut tracked_mesh = None;
    for id in graph.descendants(root) {
        let Some(node) = graph.node_mut(id) else {
            continue;
        };
        let is_desktop = node.name == DESKTOP_NODE_NAME;
        match &mut node.kind {
            NodeKind::Mesh(mesh) => {
                mesh.cast_shadow = true;
                mesh.receive_shadow = true;
                if is_desktop {
                    mesh.material = MaterialSlot::Shared;
                    tracked_mesh.get_or_insert(id);
                }
            }
            NodeKind::Light(light) => {
                light.cast_shadow = true;
                light.shadow = ShadowConfig {
                    map_size: (settings.shadows.map_size, settings.shadows.map_size),
                    bias: settings.shadows.bias,
                };
            }
            NodeKind::Group => (),
        }
    }

    let appended = scene.append(graph);
    let Some(tracked_mesh) = tracked_mesh else {
        log::warn!("model has no `{DESKTOP_NODE_NAME}` mesh, interaction disabled");
        return AssembledModel::default();
    };

    let mut mixer = AnimationMixer::new();
    let mut tracked = None;
    for clip in clips {
        let clip = Arc::new(Arc::unwrap_or_clone(clip).retarget(|id| appended.map(id)));
        let action = mixer.clip_action(clip);
        if let Some(playing) = mixer.action_mut(action) {
            playing
                .set_loop(LoopMode::PingPong)
                .set_time_scale(settings.time_scale)
                .play();
        }
        tracked.get_or_insert(action);
    }
    let rig = tracked.map(|tracked| (mixer, tracked));

    log::info!(
        "assembled model, tracking `{DESKTOP_NODE_NAME}` with {} clip(s)",
        rig.as_ref().map_or(0, |(mixer, _)| mixer.actions().count())
    );
    AssembledModel {
        tracked_mesh: Some(appended.map(tracked_mesh)),
        hitbox: Some(appended.map(root)),
        rig,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::loader::model::{parse_model_bytes, tests::showcase_glb};

    fn settings() -> AssemblySettings {
        AssemblySettings {
            time_scale: 1.0,
            shadows: ShadowSettings::default(),
        }
    }

    #[test]
    fn test_shadows_and_shared_material_are_configured() {
        let mut scene = SceneGraph::new();
        let asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        let assembled = assemble_model(&mut scene, asset, &settings());

        let desktop = assembled.tracked_mesh.unwrap();
        assert_eq!(scene.node(desktop).map(|n| n.name.as_str()), Some(DESKTOP_NODE_NAME));
        let mesh = scene.node(desktop).and_then(|n| n.as_mesh()).unwrap();
        assert_eq!(mesh.material, MaterialSlot::Shared);
        assert!(mesh.cast_shadow && mesh.receive_shadow);

        let shelf = scene.find_by_name("shelf").unwrap();
        let shelf_mesh = scene.node(shelf).and_then(|n| n.as_mesh()).unwrap();
        assert!(matches!(shelf_mesh.material, MaterialSlot::Standard(_)));
        assert!(shelf_mesh.cast_shadow);

        let sun = scene.find_by_name("sun").unwrap();
        let light = scene.node(sun).and_then(|n| n.as_light()).unwrap();
        assert!(light.cast_shadow);
        assert_eq!(light.shadow.map_size, (2048, 2048));
        assert_eq!(light.shadow.bias, -0.001);
    }

    #[test]
    fn test_clips_play_ping_pong_and_target_appended_nodes() {
        let mut scene = SceneGraph::new();
        scene.add_node(
            crate::gfx::scene::Node::new("already-here", NodeKind::Group),
            None,
        );
        let asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        let assembled = assemble_model(
            &mut scene,
            asset,
            &AssemblySettings {
                time_scale: 0.5,
                ..settings()
            },
        );

        let (mixer, tracked) = assembled.rig.unwrap();
        let action = mixer.action(tracked).unwrap();
        assert!(action.is_running());
        assert_eq!(action.loop_mode, LoopMode::PingPong);
        assert_eq!(action.time_scale, 0.5);
        assert_eq!(action.clip().tracks()[0].target, assembled.tracked_mesh.unwrap());
        assert_eq!(assembled.hitbox.map(|id| id.index()), Some(1));
    }

    #[test]
    fn test_model_without_desktop_stays_inert() {
        let mut scene = SceneGraph::new();
        let mut asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        let desktop = asset.graph.find_by_name(DESKTOP_NODE_NAME).unwrap();
        asset.graph.node_mut(desktop).unwrap().name = "monitor".to_string();

        let assembled = assemble_model(&mut scene, asset, &settings());
        assert!(assembled.tracked_mesh.is_none());
        assert!(assembled.hitbox.is_none());
        assert!(assembled.rig.is_none());
        // Still appended and still lit.
        assert!(scene.find_by_name("monitor").is_some());
    }
}
