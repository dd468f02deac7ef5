use super::mixer::{ActionId, AnimationMixer, ClipAction};
use crate::gfx::scene::SceneGraph;

/// Play state of the tracked clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackState::Paused => PlaybackState::Playing,
            PlaybackState::Playing => PlaybackState::Paused,
        }
    }
}

/// The mixer of the loaded model and the one action whose pause flag the
/// controller owns.
#[derive(Debug, Clone)]
pub struct AnimationRig {
    pub mixer: AnimationMixer,
    pub tracked: ActionId,
}

/// Paused/Playing state machine over the tracked clip.
///
/// The state only changes through [`toggle`](Self::toggle). Every frame the
/// mixer advances first and the tracked action's pause flag is written
/// afterwards, so the frame on which a pause takes effect still moves the
/// clip.
#[derive(Debug, Clone, Default)]
pub struct AnimationController {
    state: PlaybackState,
    rig: Option<AnimationRig>,
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the mixer built for a freshly loaded model.
    pub fn attach(&mut self, mixer: AnimationMixer, tracked: ActionId) {
        self.rig = Some(AnimationRig { mixer, tracked });
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn toggle(&mut self) -> PlaybackState {
        self.state = self.state.toggled();
        log::info!("animation {:?}", self.state);
        self.state
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.rig.as_ref().map(|rig| &rig.mixer)
    }

    pub fn tracked_action(&self) -> Option<&ClipAction> {
        self.rig.as_ref().and_then(|rig| rig.mixer.action(rig.tracked))
    }

    /// No-op until a tracked clip exists.
    pub fn update(&mut self, delta: f32, scene: &mut SceneGraph) {
        let Some(rig) = self.rig.as_mut() else {
            return;
        };
        rig.mixer.update(delta, scene);
        let paused = self.state == PlaybackState::Paused;
        if let Some(action) = rig.mixer.action_mut(rig.tracked) {
            action.paused = paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::tests::lift_clip;
    use crate::animation::mixer::LoopMode;
    use crate::gfx::scene::{Node, NodeKind};
    use std::sync::Arc;

    fn attached() -> (AnimationController, SceneGraph) {
        let mut scene = SceneGraph::new();
        let node = scene.add_node(Node::new("desktop", NodeKind::Group), None);
        let mut mixer = AnimationMixer::new();
        let tracked = mixer.clip_action(Arc::new(lift_clip(node)));
        mixer
            .action_mut(tracked)
            .unwrap()
            .set_loop(LoopMode::PingPong)
            .play();
        let mut controller = AnimationController::new();
        controller.attach(mixer, tracked);
        (controller, scene)
    }

    #[test]
    fn test_toggle_alternates_from_paused() {
        let mut controller = AnimationController::new();
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.toggle(), PlaybackState::Playing);
        assert_eq!(controller.toggle(), PlaybackState::Paused);
        assert_eq!(controller.toggle(), PlaybackState::Playing);
    }

    #[test]
    fn test_first_frame_advances_before_pause_applies() {
        let (mut controller, mut scene) = attached();

        controller.update(0.1, &mut scene);
        let after_first = controller.tracked_action().unwrap().time();
        assert!((after_first - 0.1).abs() < 1e-6);
        assert!(controller.tracked_action().unwrap().paused);

        controller.update(0.1, &mut scene);
        assert_eq!(controller.tracked_action().unwrap().time(), after_first);
    }

    #[test]
    fn test_mixer_clock_never_decreases() {
        let (mut controller, mut scene) = attached();
        let mut last = 0.0;
        for frame in 0..20 {
            if frame % 5 == 0 {
                controller.toggle();
            }
            controller.update(1.0 / 60.0, &mut scene);
            let now = controller.mixer().unwrap().time();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_unpausing_resumes_on_the_following_frame() {
        let (mut controller, mut scene) = attached();
        controller.update(0.1, &mut scene);
        controller.toggle();

        // Still flagged paused during this advance; the flag flips afterwards.
        controller.update(0.1, &mut scene);
        assert!((controller.tracked_action().unwrap().time() - 0.1).abs() < 1e-6);
        assert!(!controller.tracked_action().unwrap().paused);

        controller.update(0.1, &mut scene);
        assert!((controller.tracked_action().unwrap().time() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_update_without_clip_is_noop() {
        let mut controller = AnimationController::new();
        let mut scene = SceneGraph::new();
        controller.update(0.1, &mut scene);
        assert!(controller.mixer().is_none());
    }
}
