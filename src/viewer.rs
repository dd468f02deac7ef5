//! # Viewer State and Frame Driver
//!
//! [`Viewer`] is the whole application state: the scene, the shared
//! material, the camera, the animation controller and the pointer tracker.
//! The window shell feeds it events and calls [`Viewer::tick`] once per
//! redraw.
//!
//! Rendering goes through a [`FrameSink`] and elapsed time through a
//! [`TimeSource`], so a tick can run without a window or GPU.

use std::time::Instant;

use cgmath::{Deg, Rad, Vector3};

use crate::animation::{AnimationController, PlaybackState};
use crate::config::{CameraConfig, ViewerConfig};
use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
use crate::gfx::loader::{assemble_model, AssemblySettings, LoadEvent};
use crate::gfx::picking::Raycaster;
use crate::gfx::resources::material::PhysicalMaterial;
use crate::gfx::scene::{NodeId, SceneGraph};
use crate::interaction::{CursorStyle, InteractionTracker};
use crate::performance::PerformanceMonitor;

/// Everything a sink needs to draw one frame.
pub struct FrameView<'a> {
    pub scene: &'a SceneGraph,
    /// Mutable so the renderer can consume `needs_update` and the debug
    /// panel can edit it while drawing.
    pub material: &'a mut PhysicalMaterial,
    pub camera: &'a OrbitCamera,
    pub perf: &'a PerformanceMonitor,
    pub playback: PlaybackState,
}

/// Render target of the frame driver.
pub trait FrameSink {
    fn render(&mut self, frame: FrameView<'_>);
    fn resize(&mut self, width: u32, height: u32);
    fn set_cursor(&mut self, cursor: CursorStyle);
}

/// Seconds elapsed since the previous call.
pub trait TimeSource {
    fn delta(&mut self) -> f32;
}

/// Wall clock. The first call returns zero.
#[derive(Debug, Default)]
pub struct Clock {
    last: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for Clock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        self.last
            .replace(now)
            .map_or(0.0, |last| (now - last).as_secs_f32())
    }
}

/// Returns the same step every call.
#[derive(Debug, Clone, Copy)]
pub struct FixedStep(pub f32);

impl TimeSource for FixedStep {
    fn delta(&mut self) -> f32 {
        self.0
    }
}

pub struct Viewer {
    scene: SceneGraph,
    material: PhysicalMaterial,
    camera: CameraManager,
    animation: AnimationController,
    interaction: InteractionTracker,
    tracked_mesh: Option<NodeId>,
    hitbox: Option<NodeId>,
    perf: PerformanceMonitor,
    clock: Box<dyn TimeSource>,
    rotation_step: f32,
    assembly: AssemblySettings,
    viewport: (u32, u32),
}

fn camera_from_config(config: &CameraConfig, aspect: f32) -> CameraManager {
    let [x, y, z] = config.position;
    let [tx, ty, tz] = config.target;
    let mut camera = OrbitCamera::looking_at(
        Vector3::new(x, y, z),
        Vector3::new(tx, ty, tz),
        Rad::from(Deg(config.fov_degrees)),
        aspect,
    );
    camera.znear = config.near;
    camera.zfar = config.far;
    camera.damping_factor = config.damping;
    camera.update_view_proj();

    CameraManager::new(
        camera,
        CameraController::new(config.rotate_speed, config.zoom_speed),
    )
}

impl Viewer {
    /// Empty scene with a wall clock. Assets arrive later through
    /// [`apply_load_event`](Self::apply_load_event).
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        Self::with_time_source(config, width, height, Box::new(Clock::new()))
    }

    pub fn with_time_source(
        config: &ViewerConfig,
        width: u32,
        height: u32,
        clock: Box<dyn TimeSource>,
    ) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        Self {
            scene: SceneGraph::new(),
            material: PhysicalMaterial::default(),
            camera: camera_from_config(&config.camera, aspect),
            animation: AnimationController::new(),
            interaction: InteractionTracker::new(),
            tracked_mesh: None,
            hitbox: None,
            perf: PerformanceMonitor::new(),
            clock,
            rotation_step: config.animation.rotation_step,
            assembly: AssemblySettings {
                time_scale: config.animation.time_scale,
                shadows: config.shadows.clone(),
            },
            viewport: (width, height),
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn material(&self) -> &PhysicalMaterial {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut PhysicalMaterial {
        &mut self.material
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraManager {
        &mut self.camera
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn interaction(&self) -> &InteractionTracker {
        &self.interaction
    }

    pub fn tracked_mesh(&self) -> Option<NodeId> {
        self.tracked_mesh
    }

    pub fn hitbox(&self) -> Option<NodeId> {
        self.hitbox
    }

    pub fn perf(&self) -> &PerformanceMonitor {
        &self.perf
    }

    pub fn perf_mut(&mut self) -> &mut PerformanceMonitor {
        &mut self.perf
    }

    /// Applies one finished (or progressing) background load. Failures are
    /// logged and leave the dependent feature absent.
    pub fn apply_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress { ref path, .. } => {
                if let Some(percent) = event.percent() {
                    log::info!("{}: {percent:.0}% loaded", path.display());
                }
            }
            LoadEvent::Model(Ok(asset)) => {
                let assembled = assemble_model(&mut self.scene, asset, &self.assembly);
                self.tracked_mesh = assembled.tracked_mesh;
                self.hitbox = assembled.hitbox;
                if let Some((mixer, tracked)) = assembled.rig {
                    self.animation.attach(mixer, tracked);
                }
                log::info!("model ready, {} nodes in scene", self.scene.len());
            }
            LoadEvent::Model(Err(err)) => log::error!("model failed to load: {err}"),
            LoadEvent::Environment(Ok(environment)) => {
                log::info!(
                    "environment ready, {} mip levels of {}px",
                    environment.mip_count(),
                    environment.face_size()
                );
                self.material.set_env_map(environment);
            }
            LoadEvent::Environment(Err(err)) => {
                log::error!("environment map failed to load: {err}")
            }
            LoadEvent::Texture(Ok(map)) => {
                let (width, height) = map.size();
                log::info!("texture source ready, {width}x{height}");
                self.material.set_map(map);
            }
            LoadEvent::Texture(Err(err)) => log::error!("texture source failed to load: {err}"),
        }
    }

    /// One frame. The step order is fixed: rotation and animation land
    /// before the hit test, and the hit test before the render.
    pub fn tick(&mut self, sink: &mut dyn FrameSink) {
        self.camera.update();

        if let Some(node) = self.tracked_mesh.and_then(|id| self.scene.node_mut(id)) {
            node.transform.rotate_y(self.rotation_step);
        }

        let delta = self.clock.delta();
        self.animation.update(delta, &mut self.scene);

        self.hit_test(sink);
        self.render(sink);
        self.perf.update();
    }

    fn hit_test(&mut self, sink: &mut dyn FrameSink) {
        let Some(root) = self.hitbox else {
            return;
        };
        let raycaster = Raycaster::from_camera(self.interaction.ndc(), &self.camera.camera);
        let nearest = raycaster
            .intersect(&self.scene, root, self.material.side)
            .into_iter()
            .next();
        if let Some(cursor) = self.interaction.update(nearest) {
            sink.set_cursor(cursor);
        }
    }

    fn render(&mut self, sink: &mut dyn FrameSink) {
        sink.render(FrameView {
            scene: &self.scene,
            material: &mut self.material,
            camera: &self.camera.camera,
            perf: &self.perf,
            playback: self.animation.state(),
        });
    }

    /// Pointer position in physical pixels.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        let (width, height) = self.viewport;
        self.interaction.pointer_moved(x, y, width, height);
    }

    /// Toggles playback when the pointer is over the desktop. Returns the
    /// new state if it changed.
    pub fn click(&mut self) -> Option<PlaybackState> {
        self.interaction
            .click_hits_desktop()
            .then(|| self.animation.toggle())
    }

    /// Updates the projection and the sink, then renders once at the new
    /// size. A zero-sized (minimized) window is ignored.
    pub fn resize(&mut self, width: u32, height: u32, sink: &mut dyn FrameSink) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.camera.resize(width, height);
        sink.resize(width, height);
        self.render(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::loader::model::tests::showcase_glb;
    use crate::gfx::loader::{parse_model_bytes, LoadError};
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Render { aspect: f32, yaw: f32 },
        Resize(u32, u32),
        Cursor(CursorStyle),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
        tracked: Option<NodeId>,
    }

    impl FrameSink for RecordingSink {
        fn render(&mut self, frame: FrameView<'_>) {
            let yaw = self
                .tracked
                .and_then(|id| frame.scene.node(id))
                .map_or(0.0, |node| node.transform.euler()[1]);
            self.calls.push(Call::Render {
                aspect: frame.camera.aspect,
                yaw,
            });
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.push(Call::Resize(width, height));
        }

        fn set_cursor(&mut self, cursor: CursorStyle) {
            self.calls.push(Call::Cursor(cursor));
        }
    }

    fn viewer() -> Viewer {
        Viewer::with_time_source(
            &ViewerConfig::default(),
            1200,
            800,
            Box::new(FixedStep(1.0 / 60.0)),
        )
    }

    fn loaded_viewer() -> Viewer {
        let mut viewer = viewer();
        let asset = parse_model_bytes(&showcase_glb(), None).unwrap();
        viewer.apply_load_event(LoadEvent::Model(Ok(asset)));
        viewer
    }

    #[test]
    fn test_model_load_sets_references() {
        let viewer = loaded_viewer();
        let desktop = viewer.scene().find_by_name("desktop").unwrap();
        assert_eq!(viewer.tracked_mesh(), Some(desktop));
        assert!(viewer.hitbox().is_some());
        assert!(viewer.animation().tracked_action().is_some());
    }

    #[test]
    fn test_failed_model_leaves_viewer_inert() {
        let mut viewer = viewer();
        viewer.apply_load_event(LoadEvent::Model(Err(LoadError::Io {
            path: PathBuf::from("models/objects.glb"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })));
        let mut sink = RecordingSink::default();

        viewer.pointer_moved(600.0, 400.0);
        viewer.tick(&mut sink);
        assert_eq!(viewer.click(), None);
        assert!(viewer.scene().find_by_name("desktop").is_none());
        assert_eq!(viewer.animation().state(), PlaybackState::Paused);
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn test_click_outside_geometry_changes_nothing() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink::default();

        viewer.pointer_moved(1190.0, 10.0);
        viewer.tick(&mut sink);
        assert_eq!(viewer.click(), None);
        assert_eq!(viewer.animation().state(), PlaybackState::Paused);
        assert!(!sink.calls.iter().any(|call| matches!(call, Call::Cursor(_))));
    }

    #[test]
    fn test_hover_click_leave_scenario() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink::default();

        // Screen centre looks straight at the desktop quad.
        viewer.pointer_moved(600.0, 400.0);
        viewer.tick(&mut sink);
        assert_eq!(sink.calls[0], Call::Cursor(CursorStyle::Pointer));

        assert_eq!(viewer.click(), Some(PlaybackState::Playing));

        viewer.pointer_moved(1190.0, 10.0);
        viewer.tick(&mut sink);
        assert!(sink.calls.contains(&Call::Cursor(CursorStyle::Default)));
        assert_eq!(viewer.animation().state(), PlaybackState::Playing);
        assert_eq!(viewer.click(), None);
    }

    #[test]
    fn test_repeated_clicks_alternate() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink::default();
        viewer.pointer_moved(600.0, 400.0);
        viewer.tick(&mut sink);

        assert_eq!(viewer.click(), Some(PlaybackState::Playing));
        assert_eq!(viewer.click(), Some(PlaybackState::Paused));
        assert_eq!(viewer.click(), Some(PlaybackState::Playing));
    }

    #[test]
    fn test_tick_rotates_before_render() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink {
            tracked: viewer.tracked_mesh(),
            ..Default::default()
        };

        viewer.tick(&mut sink);
        viewer.tick(&mut sink);

        let yaws: Vec<f32> = sink
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Render { yaw, .. } => Some(*yaw),
                _ => None,
            })
            .collect();
        assert_eq!(yaws.len(), 2);
        assert!((yaws[0] - 0.01).abs() < 1e-4);
        assert!((yaws[1] - 0.02).abs() < 1e-4);
    }

    #[test]
    fn test_first_tick_advances_clip_then_pauses() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink::default();

        viewer.tick(&mut sink);
        let action = viewer.animation().tracked_action().unwrap();
        assert!((action.time() - 1.0 / 60.0).abs() < 1e-6);
        assert!(action.paused);
    }

    #[test]
    fn test_resize_updates_aspect_and_renders_immediately() {
        let mut viewer = loaded_viewer();
        let mut sink = RecordingSink::default();

        viewer.resize(800, 800, &mut sink);
        assert_eq!(sink.calls.len(), 2);
        assert_eq!(sink.calls[0], Call::Resize(800, 800));
        assert!(matches!(sink.calls[1], Call::Render { aspect, .. } if aspect == 1.0));
        assert_eq!(viewer.camera().camera.aspect, 1.0);
    }

    #[test]
    fn test_minimized_resize_is_ignored() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.resize(0, 0, &mut sink);
        assert!(sink.calls.is_empty());
        assert_eq!(viewer.camera().camera.aspect, 1.5);
    }

    #[test]
    fn test_fixed_step_and_clock() {
        let mut step = FixedStep(0.25);
        assert_eq!(step.delta(), 0.25);
        assert_eq!(step.delta(), 0.25);

        let mut clock = Clock::new();
        assert_eq!(clock.delta(), 0.0);
        assert!(clock.delta() >= 0.0);
    }
}
