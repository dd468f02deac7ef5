//! Pointer tracking, hover cursor and click hit testing.

use crate::gfx::loader::DESKTOP_NODE_NAME;
use crate::gfx::picking::Intersection;

/// Mouse cursor the viewer asks the window for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
}

/// Latest pointer position and the hit under it.
#[derive(Debug, Clone, Default)]
pub struct InteractionTracker {
    ndc: (f32, f32),
    current: Option<Intersection>,
}

/// Maps a window position in physical pixels to normalized device
/// coordinates, y up.
pub fn pointer_to_ndc(x: f64, y: f64, width: u32, height: u32) -> (f32, f32) {
    let width = width.max(1) as f64;
    let height = height.max(1) as f64;
    ((x / width * 2.0 - 1.0) as f32, -(y / height * 2.0 - 1.0) as f32)
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at the screen centre until the pointer first moves.
    pub fn ndc(&self) -> (f32, f32) {
        self.ndc
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64, width: u32, height: u32) {
        self.ndc = pointer_to_ndc(x, y, width, height);
    }

    pub fn current_hit(&self) -> Option<&Intersection> {
        self.current.as_ref()
    }

    /// Records this frame's nearest hit and returns the cursor to switch to,
    /// if any. The pointer cursor appears when a hit starts; the default one
    /// only comes back when a `desktop` hit ends.
    pub fn update(&mut self, nearest: Option<Intersection>) -> Option<CursorStyle> {
        match nearest {
            Some(hit) => {
                let started = self.current.is_none();
                self.current = Some(hit);
                started.then_some(CursorStyle::Pointer)
            }
            None => {
                let left_desktop = self
                    .current
                    .take()
                    .is_some_and(|hit| hit.name == DESKTOP_NODE_NAME);
                left_desktop.then_some(CursorStyle::Default)
            }
        }
    }

    /// Whether a click right now lands on the `desktop` mesh.
    pub fn click_hits_desktop(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|hit| hit.name == DESKTOP_NODE_NAME)
    }

    /// Drops the current hit without a cursor change, e.g. when the hitbox
    /// goes away.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::{Node, NodeKind, SceneGraph};
    use cgmath::Vector3;

    fn hit(name: &str) -> Intersection {
        let mut scene = SceneGraph::new();
        let node = scene.add_node(Node::new(name, NodeKind::Group), None);
        Intersection {
            node,
            name: name.to_string(),
            distance: 1.0,
            point: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn test_ndc_mapping_flips_y() {
        assert_eq!(pointer_to_ndc(0.0, 0.0, 1200, 800), (-1.0, 1.0));
        assert_eq!(pointer_to_ndc(1200.0, 800.0, 1200, 800), (1.0, -1.0));
        assert_eq!(pointer_to_ndc(600.0, 400.0, 1200, 800), (0.0, 0.0));
    }

    #[test]
    fn test_cursor_transitions() {
        let mut tracker = InteractionTracker::new();
        assert_eq!(tracker.update(None), None);
        assert_eq!(tracker.update(Some(hit("desktop"))), Some(CursorStyle::Pointer));
        assert_eq!(tracker.update(Some(hit("desktop"))), None);
        assert_eq!(tracker.update(None), Some(CursorStyle::Default));
    }

    #[test]
    fn test_leaving_other_mesh_keeps_cursor() {
        let mut tracker = InteractionTracker::new();
        assert_eq!(tracker.update(Some(hit("shelf"))), Some(CursorStyle::Pointer));
        assert!(!tracker.click_hits_desktop());
        assert_eq!(tracker.update(None), None);
        assert!(tracker.current_hit().is_none());
    }

    #[test]
    fn test_click_requires_desktop_hit() {
        let mut tracker = InteractionTracker::new();
        assert!(!tracker.click_hits_desktop());
        tracker.update(Some(hit("desktop")));
        assert!(tracker.click_hits_desktop());
    }
}
