//! # Object Picking System
//!
//! Pointer ray-casting against the scene graph.
//!
//! ## How it works
//!
//! 1. **Pointer to Ray**: unproject the pointer's NDC position through the
//!    inverse view-projection matrix of the camera
//! 2. **Broadphase**: test the ray against each primitive's world-space AABB
//! 3. **Triangles**: run Möller–Trumbore on the surviving primitives, honouring
//!    the mesh material's [`Side`]
//! 4. **Ordering**: return every hit sorted nearest first
//!
//! ## Usage
//!
//! ```no_run
//! use vitrine::gfx::picking::Raycaster;
//! # fn demo(camera: &vitrine::gfx::camera::OrbitCamera, scene: &vitrine::gfx::scene::SceneGraph, root: vitrine::gfx::scene::NodeId) {
//! let raycaster = Raycaster::from_camera((0.0, 0.0), camera);
//! if let Some(hit) = raycaster.intersect(scene, root, Default::default()).first() {
//!     println!("pointer is over {}", hit.name);
//! }
//! # }
//! ```

use cgmath::{ElementWise, EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Transform, Vector3, Vector4, Zero};

use crate::gfx::camera::OrbitCamera;
use crate::gfx::resources::material::Side;
use crate::gfx::scene::{NodeId, SceneGraph};

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore. Returns the distance along the ray and whether the
    /// triangle was hit on its counter-clockwise (front) face.
    pub fn intersect_triangle(&self, triangle: &[Vector3<f32>; 3]) -> Option<(f32, bool)> {
        const EPSILON: f32 = 1e-7;
        let [v0, v1, v2] = *triangle;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some((t, det > 0.0))
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::from(*first);
        let mut max = min;
        for vertex in vertices.iter().skip(1) {
            let v = Vector3::from(*vertex);
            min = Vector3::new(min.x.min(v.x), min.y.min(v.y), min.z.min(v.z));
            max = Vector3::new(max.x.max(v.x), max.y.max(v.y), max.z.max(v.z));
        }

        Self::new(min, max)
    }

    /// Test ray-AABB intersection
    /// Returns the distance to intersection point, or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t_near = t_min.x.min(t_max.x).max(t_min.y.min(t_max.y)).max(t_min.z.min(t_max.z));
        let t_far = t_min.x.max(t_max.x).min(t_min.y.max(t_max.y)).min(t_min.z.max(t_max.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let transformed: Vec<[f32; 3]> = corners
            .iter()
            .map(|corner| matrix.transform_point(Point3::from_vec(*corner)).into())
            .collect();

        Self::from_vertices(&transformed)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }
}

/// One ray hit against a mesh node.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    /// Authored name of the hit node.
    pub name: String,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World space intersection point
    pub point: Vector3<f32>,
}

/// Casts one ray from the camera through a pointer position.
#[derive(Debug, Clone, Copy)]
pub struct Raycaster {
    pub ray: Ray,
}

impl Raycaster {
    pub fn new(ray: Ray) -> Self {
        Self { ray }
    }

    /// Builds the ray through `ndc` (x and y in -1..=1, y up) starting on the
    /// camera's near plane.
    pub fn from_camera(ndc: (f32, f32), camera: &OrbitCamera) -> Self {
        let (ndc_x, ndc_y) = ndc;

        // GL clip space: the near plane is z = -1 here.
        let view_proj = cgmath::perspective(camera.fovy, camera.aspect, camera.znear, camera.zfar)
            * camera.view_matrix();
        let inv_view_proj = view_proj.invert().unwrap_or_else(Matrix4::identity);

        let unproject = |z: f32| {
            let world = inv_view_proj * Vector4::new(ndc_x, ndc_y, z, 1.0);
            world.truncate() / world.w
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);

        Self::new(Ray::new(near, far - near))
    }

    /// Every hit on the meshes at or below `root`, nearest first. Meshes using
    /// the shared material are culled by `shared_side`.
    pub fn intersect(&self, scene: &SceneGraph, root: NodeId, shared_side: Side) -> Vec<Intersection> {
        let mut hits = Vec::new();

        for id in scene.descendants(root) {
            let Some(node) = scene.node(id) else {
                continue;
            };
            let Some(mesh) = node.as_mesh() else {
                continue;
            };
            let side = mesh.side(shared_side);
            let world = scene.world_matrix(id);

            for primitive in &mesh.primitives {
                if primitive.bounds().transform(&world).intersect_ray(&self.ray).is_none() {
                    continue;
                }
                for triangle in primitive.triangles() {
                    let world_triangle = triangle.map(|v| world.transform_point(Point3::from_vec(v)).to_vec());
                    let Some((distance, front_facing)) = self.ray.intersect_triangle(&world_triangle)
                    else {
                        continue;
                    };
                    if !side.accepts(front_facing) {
                        continue;
                    }
                    hits.push(Intersection {
                        node: id,
                        name: node.name.clone(),
                        distance,
                        point: self.ray.point_at(distance),
                    });
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::Camera;
    use crate::gfx::scene::mesh::quad;
    use crate::gfx::scene::{MaterialSlot, MeshNode, Node, NodeKind, Transform};
    use cgmath::{Deg, One, Quaternion};
    use std::sync::Arc;

    fn camera_at_z(distance: f32) -> OrbitCamera {
        OrbitCamera::looking_at(
            Vector3::new(0.0, 0.0, distance),
            Vector3::zero(),
            Deg(75.0).into(),
            1.0,
        )
    }

    fn quad_scene(names: &[(&str, f32)]) -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let root = scene.add_node(Node::new("Scene", NodeKind::Group), None);
        for (name, z) in names {
            let node = Node::new(
                *name,
                NodeKind::Mesh(MeshNode::new(vec![Arc::new(quad(1.0))], MaterialSlot::Shared)),
            )
            .with_transform(Transform::new(
                Vector3::new(0.0, 0.0, *z),
                Quaternion::one(),
                Vector3::new(1.0, 1.0, 1.0),
            ));
            scene.add_node(node, Some(root));
        }
        (scene, root)
    }

    #[test]
    fn test_ray_passes_through_rendered_position() {
        let camera = OrbitCamera::looking_at(
            Vector3::new(-9.5736, 7.1802, 31.9121),
            Vector3::zero(),
            Deg(75.0).into(),
            1.5,
        );
        let world = Vector3::new(4.0, 2.0, 0.0);
        let clip = camera.build_view_projection_matrix() * world.extend(1.0);
        let ndc = (clip.x / clip.w, clip.y / clip.w);

        let ray = Raycaster::from_camera(ndc, &camera).ray;
        let to_point = world - ray.origin;
        let off_ray = to_point - ray.direction.normalize() * to_point.dot(ray.direction.normalize());
        assert!(off_ray.magnitude() < 1e-2, "ray misses by {}", off_ray.magnitude());
    }

    #[test]
    fn test_aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = Aabb::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray).is_some());

        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn test_triangle_facing() {
        let triangle = [
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let from_front = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let (distance, front) = from_front.intersect_triangle(&triangle).unwrap();
        assert!((distance - 5.0).abs() < 1e-5);
        assert!(front);

        let from_back = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(!from_back.intersect_triangle(&triangle).unwrap().1);
    }

    #[test]
    fn test_ray_hits_nearest_first() {
        let (scene, root) = quad_scene(&[("far", -2.0), ("desktop", 0.0)]);
        // Off the quad diagonal so each quad yields a single triangle hit.
        let raycaster = Raycaster::from_camera((0.05, -0.02), &camera_at_z(5.0));

        let hits = raycaster.intersect(&scene, root, Side::Front);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "desktop");
        assert!((hits[0].distance - 4.9).abs() < 1e-2);
        assert_eq!(hits[1].name, "far");
    }

    #[test]
    fn test_corner_ray_misses() {
        let (scene, root) = quad_scene(&[("desktop", 0.0)]);
        let raycaster = Raycaster::from_camera((0.9, 0.9), &camera_at_z(5.0));
        assert!(raycaster.intersect(&scene, root, Side::Double).is_empty());
    }

    #[test]
    fn test_back_side_material_ignores_front_faces() {
        let (scene, root) = quad_scene(&[("desktop", 0.0)]);
        let raycaster = Raycaster::from_camera((0.05, -0.02), &camera_at_z(5.0));
        assert!(raycaster.intersect(&scene, root, Side::Back).is_empty());
        assert_eq!(raycaster.intersect(&scene, root, Side::Double).len(), 1);
    }
}
