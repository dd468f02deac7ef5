use std::collections::HashMap;
use std::sync::Arc;

use super::clip::{AnimationClip, PoseValue, TrackProperty};
use crate::gfx::scene::{NodeId, SceneGraph};

/// What happens when an action reaches the end of its clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once and stop on the last frame.
    Once,
    #[default]
    Repeat,
    /// Alternate forwards and backwards.
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

/// A playable instance of a clip with its own clock and pause flag.
#[derive(Debug, Clone)]
pub struct ClipAction {
    clip: Arc<AnimationClip>,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    /// A paused action keeps applying its pose but its clock stands still.
    pub paused: bool,
    running: bool,
    time: f32,
    /// Completed loops, `None` until the first advance.
    loop_count: Option<u64>,
}

impl ClipAction {
    fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::default(),
            paused: false,
            running: false,
            time: 0.0,
            loop_count: None,
        }
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    /// Stops and rewinds.
    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.time = 0.0;
        self.loop_count = None;
        self
    }

    pub fn set_loop(&mut self, loop_mode: LoopMode) -> &mut Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn set_time_scale(&mut self, time_scale: f32) -> &mut Self {
        self.time_scale = time_scale;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Local clock, always within `0..=duration`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count.unwrap_or(0)
    }

    /// Time at which the clip is sampled. Odd ping-pong loops run backwards.
    pub fn clip_time(&self) -> f32 {
        match self.loop_mode {
            LoopMode::PingPong if self.loop_count() % 2 == 1 => self.clip.duration() - self.time,
            _ => self.time,
        }
    }

    /// Advances the local clock by `delta` mixer seconds.
    fn advance(&mut self, delta: f32) {
        let duration = self.clip.duration();
        let delta = if self.paused { 0.0 } else { delta * self.time_scale };
        if duration <= 0.0 {
            self.loop_count.get_or_insert(0);
            return;
        }

        let loop_count = self.loop_count.get_or_insert(0);
        let mut time = self.time + delta;
        match self.loop_mode {
            LoopMode::Once => {
                if !(0.0..duration).contains(&time) {
                    time = time.clamp(0.0, duration);
                    self.running = false;
                }
            }
            LoopMode::Repeat | LoopMode::PingPong => {
                if time >= duration || time < 0.0 {
                    let wraps = (time / duration).floor();
                    time -= duration * wraps;
                    *loop_count += wraps.abs() as u64;
                }
            }
        }
        self.time = time;
    }
}

/// Drives clip actions and writes their blended pose into a scene graph.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    pub time_scale: f32,
    time: f32,
    actions: Vec<ClipAction>,
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            time: 0.0,
            actions: Vec::new(),
        }
    }
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global clock. It only ever moves forward for non-negative deltas,
    /// whatever the state of the individual actions.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// The action for `clip`, created on first request.
    pub fn clip_action(&mut self, clip: Arc<AnimationClip>) -> ActionId {
        if let Some(index) = self
            .actions
            .iter()
            .position(|action| Arc::ptr_eq(&action.clip, &clip))
        {
            return ActionId(index);
        }
        self.actions.push(ClipAction::new(clip));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&ClipAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut ClipAction> {
        self.actions.get_mut(id.0)
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &ClipAction)> {
        self.actions.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    /// Advances the mixer clock and every running action, then applies the
    /// weighted pose of all running actions to `scene`.
    pub fn update(&mut self, delta: f32, scene: &mut SceneGraph) {
        let delta = delta * self.time_scale;
        self.time += delta;

        let mut accumulated: HashMap<(NodeId, TrackProperty), (PoseValue, f32)> = HashMap::new();
        for action in self.actions.iter_mut().filter(|a| a.running) {
            action.advance(delta);
            if action.weight <= 0.0 {
                continue;
            }
            let clip_time = action.clip_time();
            for track in action.clip.tracks() {
                let value = track.sample(clip_time);
                accumulated
                    .entry((track.target, track.property))
                    .and_modify(|(current, weight)| {
                        *weight += action.weight;
                        *current = current.mix(value, action.weight / *weight);
                    })
                    .or_insert((value, action.weight));
            }
        }

        for ((target, property), (value, _)) in accumulated {
            let Some(node) = scene.node_mut(target) else {
                continue;
            };
            match (property, value) {
                (TrackProperty::Translation, PoseValue::Vector(v)) => node.transform.translation = v,
                (TrackProperty::Scale, PoseValue::Vector(v)) => node.transform.scale = v,
                (TrackProperty::Rotation, PoseValue::Rotation(q)) => node.transform.set_rotation(q),
                _ => log::debug!("mismatched pose value for {property:?} on node {}", target.index()),
            }
        }
    }
}
