use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

use crate::gfx::scene::NodeId;

/// How values between two keyframes are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Hermite spline. Each keyframe stores in-tangent, value, out-tangent.
    CubicSpline,
}

/// Node property a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyframes {
    /// Translation or scale keys.
    Vector(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
}

impl Keyframes {
    fn len(&self) -> usize {
        match self {
            Keyframes::Vector(values) => values.len(),
            Keyframes::Rotation(values) => values.len(),
        }
    }
}

/// A sampled property value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseValue {
    Vector(Vector3<f32>),
    Rotation(Quaternion<f32>),
}

impl PoseValue {
    /// Moves `self` towards `other` by `t`.
    pub fn mix(self, other: PoseValue, t: f32) -> PoseValue {
        match (self, other) {
            (PoseValue::Vector(a), PoseValue::Vector(b)) => PoseValue::Vector(a.lerp(b, t)),
            (PoseValue::Rotation(a), PoseValue::Rotation(b)) => PoseValue::Rotation(slerp(a, b, t)),
            (current, _) => current,
        }
    }
}

/// Keyframe track bound to one property of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub target: NodeId,
    pub property: TrackProperty,
    pub interpolation: Interpolation,
    times: Vec<f32>,
    values: Keyframes,
}

impl Track {
    /// Returns `None` when the value count does not match the key count
    /// (three values per key for cubic splines) or there are no keys.
    pub fn new(
        target: NodeId,
        property: TrackProperty,
        interpolation: Interpolation,
        times: Vec<f32>,
        values: Keyframes,
    ) -> Option<Self> {
        let stride = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
        let consistent = match (&values, property) {
            (Keyframes::Rotation(_), TrackProperty::Rotation) => true,
            (Keyframes::Vector(_), TrackProperty::Translation | TrackProperty::Scale) => true,
            _ => false,
        };
        if times.is_empty() || values.len() != times.len() * stride || !consistent {
            return None;
        }
        Some(Self {
            target,
            property,
            interpolation,
            times,
            values,
        })
    }

    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn retarget(mut self, map: impl Fn(NodeId) -> NodeId) -> Self {
        self.target = map(self.target);
        self
    }

    /// Samples the track at `time`, clamping outside the keyed range.
    pub fn sample(&self, time: f32) -> PoseValue {
        let last = self.times.len() - 1;
        let (index, alpha, span) = if time <= self.times[0] {
            (0, 0.0, 0.0)
        } else if time >= self.times[last] {
            (last, 0.0, 0.0)
        } else {
            // First key strictly after `time`.
            let next = self.times.partition_point(|&t| t <= time);
            let span = self.times[next] - self.times[next - 1];
            let alpha = if span > 0.0 {
                (time - self.times[next - 1]) / span
            } else {
                0.0
            };
            (next - 1, alpha, span)
        };

        let step_only = index == last || self.interpolation == Interpolation::Step;
        match &self.values {
            Keyframes::Vector(values) => PoseValue::Vector(match self.interpolation {
                Interpolation::CubicSpline if !step_only => {
                    hermite(values, index, alpha, span, |a, b, c, d| a + b + c + d)
                }
                Interpolation::CubicSpline => values[index * 3 + 1],
                _ if step_only => values[index],
                _ => values[index].lerp(values[index + 1], alpha),
            }),
            Keyframes::Rotation(values) => PoseValue::Rotation(match self.interpolation {
                Interpolation::CubicSpline if !step_only => {
                    hermite(values, index, alpha, span, |a, b, c, d| a + b + c + d).normalize()
                }
                Interpolation::CubicSpline => values[index * 3 + 1],
                _ if step_only => values[index],
                _ => slerp(values[index], values[index + 1], alpha),
            }),
        }
    }
}

/// glTF cubic spline between key `index` and `index + 1`.
fn hermite<T>(values: &[T], index: usize, t: f32, span: f32, sum: impl Fn(T, T, T, T) -> T) -> T
where
    T: Copy + std::ops::Mul<f32, Output = T>,
{
    let t2 = t * t;
    let t3 = t2 * t;
    let v0 = values[index * 3 + 1];
    let out0 = values[index * 3 + 2];
    let in1 = values[(index + 1) * 3];
    let v1 = values[(index + 1) * 3 + 1];
    sum(
        v0 * (2.0 * t3 - 3.0 * t2 + 1.0),
        out0 * ((t3 - 2.0 * t2 + t) * span),
        v1 * (-2.0 * t3 + 3.0 * t2),
        in1 * ((t3 - t2) * span),
    )
}

/// Shortest-arc slerp.
fn slerp(a: Quaternion<f32>, b: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    a.slerp(b, t).normalize()
}

/// A named set of tracks played together.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    tracks: Vec<Track>,
    duration: f32,
}

impl AnimationClip {
    /// The duration is the latest key time across all tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::duration).fold(0.0, f32::max);
        Self {
            name: name.into(),
            tracks,
            duration,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Rewrites every track target, e.g. after the animated graph was
    /// appended into another graph.
    pub fn retarget(self, map: impl Fn(NodeId) -> NodeId) -> Self {
        let tracks = self.tracks.into_iter().map(|t| t.retarget(&map)).collect();
        Self {
            name: self.name,
            tracks,
            duration: self.duration,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gfx::scene::{Node, NodeKind, SceneGraph};
    use cgmath::{Deg, Rotation3};

    pub(crate) fn lift_clip(target: NodeId) -> AnimationClip {
        let track = Track::new(
            target,
            TrackProperty::Translation,
            Interpolation::Linear,
            vec![0.0, 1.0],
            Keyframes::Vector(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)]),
        )
        .unwrap();
        AnimationClip::new("lift", vec![track])
    }

    fn node() -> NodeId {
        let mut graph = SceneGraph::new();
        graph.add_node(Node::new("n", NodeKind::Group), None)
    }

    #[test]
    fn test_linear_sampling_clamps() {
        let clip = lift_clip(node());
        let track = &clip.tracks()[0];
        assert_eq!(clip.duration(), 1.0);
        assert_eq!(track.sample(-1.0), PoseValue::Vector(Vector3::new(0.0, 0.0, 0.0)));
        assert_eq!(track.sample(0.25), PoseValue::Vector(Vector3::new(0.0, 0.25, 0.0)));
        assert_eq!(track.sample(5.0), PoseValue::Vector(Vector3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_step_holds_previous_key() {
        let track = Track::new(
            node(),
            TrackProperty::Scale,
            Interpolation::Step,
            vec![0.0, 1.0, 2.0],
            Keyframes::Vector(vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(2.0, 2.0, 2.0),
                Vector3::new(3.0, 3.0, 3.0),
            ]),
        )
        .unwrap();
        assert_eq!(track.sample(1.5), PoseValue::Vector(Vector3::new(2.0, 2.0, 2.0)));
    }

    #[test]
    fn test_rotation_slerps_halfway() {
        let track = Track::new(
            node(),
            TrackProperty::Rotation,
            Interpolation::Linear,
            vec![0.0, 2.0],
            Keyframes::Rotation(vec![
                Quaternion::from_angle_y(Deg(0.0f32)),
                Quaternion::from_angle_y(Deg(90.0f32)),
            ]),
        )
        .unwrap();
        let PoseValue::Rotation(half) = track.sample(1.0) else {
            panic!("rotation track produced a vector");
        };
        let expected = Quaternion::from_angle_y(Deg(45.0f32));
        assert!((half - expected).magnitude() < 1e-5);
    }

    #[test]
    fn test_cubic_spline_hits_keys_and_rejects_bad_stride() {
        let zero = Vector3::new(0.0, 0.0, 0.0);
        let track = Track::new(
            node(),
            TrackProperty::Translation,
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            Keyframes::Vector(vec![zero, zero, zero, zero, Vector3::new(2.0, 0.0, 0.0), zero]),
        )
        .unwrap();
        assert_eq!(track.sample(0.0), PoseValue::Vector(zero));
        assert_eq!(track.sample(1.0), PoseValue::Vector(Vector3::new(2.0, 0.0, 0.0)));
        // Flat tangents make the midpoint the average.
        let PoseValue::Vector(mid) = track.sample(0.5) else {
            panic!("vector track produced a rotation");
        };
        assert!((mid.x - 1.0).abs() < 1e-6);

        assert!(Track::new(
            node(),
            TrackProperty::Translation,
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            Keyframes::Vector(vec![zero, zero]),
        )
        .is_none());
    }
}
