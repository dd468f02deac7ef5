use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

/// Maps GL clip depth (-1..1) to wgpu's 0..1. Arguments are column major.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Fraction of the pending orbit motion applied per [`OrbitCamera::update`].
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.05;

/// Y-up orbit camera with damped rotation and panning.
///
/// Input does not move the camera directly. It accumulates into pending
/// deltas that [`update`](OrbitCamera::update) bleeds off a fraction at a
/// time, once per frame.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub damping_factor: f32,
    pub uniform: CameraUniform,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_pan: Vector3<f32>,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let proj =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * self.view_matrix()
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(), // Will be auto-calculated in `update_eye()` nevertheless.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Rad(std::f32::consts::FRAC_PI_4),
            znear: 0.1,
            zfar: 1000.0,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            uniform: CameraUniform::default(),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_pan: Vector3::zero(),
        };
        camera.update_eye();
        camera
    }

    /// Places the camera at `eye`, orbiting `target`.
    pub fn looking_at(eye: Vector3<f32>, target: Vector3<f32>, fovy: Rad<f32>, aspect: f32) -> Self {
        let offset = eye - target;
        let distance = offset.magnitude().max(f32::EPSILON);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw = offset.x.atan2(offset.z);
        let mut camera = Self::new(distance, pitch, yaw, target, aspect);
        camera.fovy = fovy;
        camera
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update_eye();
    }

    /// Scales the orbit radius. Positive `delta` zooms out.
    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance * (1.0 + delta).max(0.05));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update_eye();
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update_eye();
    }

    /// Queues an orbit rotation, applied gradually by [`update`](Self::update).
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.pending_yaw += delta_yaw;
        self.pending_pitch += delta_pitch;
    }

    /// Queues a pan relative to the current view direction.
    /// delta.0 = horizontal pan (left/right relative to camera view)
    /// delta.1 = vertical pan (up/down relative to camera view)
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Scale pan movement by distance for consistent feel at all zoom levels
        let pan_scale = self.distance * 0.1;
        self.pending_pan += (right * delta.0 + up * delta.1) * pan_scale;
    }

    /// Advances damping by one frame. Returns whether the camera moved.
    pub fn update(&mut self) -> bool {
        const REST: f32 = 1e-6;
        let damping = self.damping_factor.clamp(0.0, 1.0);
        let moving = self.pending_yaw.abs() > REST
            || self.pending_pitch.abs() > REST
            || self.pending_pan.magnitude2() > REST * REST;
        if !moving {
            return false;
        }

        self.yaw += self.pending_yaw * damping;
        self.pitch = (self.pitch + self.pending_pitch * damping)
            .clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.target += self.pending_pan * damping;

        self.pending_yaw *= 1.0 - damping;
        self.pending_pitch *= 1.0 - damping;
        self.pending_pan *= 1.0 - damping;

        self.set_yaw(self.yaw);
        true
    }

    fn update_eye(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: None,
            min_pitch: -std::f32::consts::FRAC_PI_2 + 1e-4,
            max_pitch: std::f32::consts::FRAC_PI_2 - 1e-4,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looking_at_reproduces_eye() {
        let eye = Vector3::new(-9.5736, 7.1802, 31.9121);
        let camera = OrbitCamera::looking_at(eye, Vector3::zero(), Deg(75.0).into(), 1.5);
        assert!((camera.eye - eye).magnitude() < 1e-3);
        assert_eq!(camera.up, Vector3::unit_y());
    }

    #[test]
    fn test_damping_converges_without_overshoot() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.rotate(1.0, 0.0);

        assert!(camera.update());
        assert!((camera.yaw - DEFAULT_DAMPING_FACTOR).abs() < 1e-6);

        for _ in 0..2000 {
            camera.update();
        }
        assert!(camera.yaw <= 1.0);
        assert!((camera.yaw - 1.0).abs() < 1e-3);
        assert!(!camera.update());
    }

    #[test]
    fn test_clip_depth_spans_zero_to_one() {
        let camera = OrbitCamera::looking_at(
            Vector3::new(0.0, 0.0, 10.0),
            Vector3::zero(),
            Deg(75.0).into(),
            1.5,
        );
        let view_proj = camera.build_view_projection_matrix();
        let ndc = |z: f32| {
            let clip = view_proj * Vector4::new(0.0, 0.0, z, 1.0);
            clip.truncate() / clip.w
        };

        let near = ndc(10.0 - camera.znear);
        let far = ndc(10.0 - camera.zfar);
        assert!(near.z.abs() < 1e-4, "near plane at {}", near.z);
        assert!((far.z - 1.0).abs() < 1e-4, "far plane at {}", far.z);
        assert!(ndc(0.0).x.abs() < 1e-6 && ndc(0.0).y.abs() < 1e-6);
    }

    #[test]
    fn test_resize_sets_aspect() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.resize_projection(1920, 1080);
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }
}
