use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::Vector3;

use super::vertex::Vertex3D;
use crate::gfx::picking::Aabb;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`MeshData`], used to key GPU buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

/// CPU-side triangle mesh. Shared between the scene graph (for hit testing)
/// and the renderer (which uploads it once per [`MeshId`]).
#[derive(Debug)]
pub struct MeshData {
    id: MeshId,
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    bounds: Aabb,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        let positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.position).collect();
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            bounds: Aabb::from_vertices(&positions),
            vertices,
            indices,
        }
    }

    /// Builds a mesh from loose attribute streams. Missing normals are
    /// computed from faces, missing uvs default to zero and a missing index
    /// list is treated as a plain triangle list.
    pub fn from_attributes(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let indices = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());
        let normals = normals
            .filter(|n| n.len() == positions.len())
            .unwrap_or_else(|| compute_vertex_normals(&positions, &indices));
        let uvs = uvs.filter(|uv| uv.len() == positions.len());

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: normals[i],
                uv: uvs.as_ref().map_or([0.0, 0.0], |uv| uv[i]),
            })
            .collect();

        Self::new(vertices, indices)
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Object-space bounds.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Object-space triangles. Triangles referencing out-of-range vertices
    /// are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let fetch = |i: u32| {
                self.vertices
                    .get(i as usize)
                    .map(|v| Vector3::from(v.position))
            };
            Some([fetch(tri[0])?, fetch(tri[1])?, fetch(tri[2])?])
        })
    }
}

/// Averages face normals into per-vertex normals.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let v0 = Vector3::from(positions[i0]);
        let edge1 = Vector3::from(positions[i1]) - v0;
        let edge2 = Vector3::from(positions[i2]) - v0;
        // Area weighted: the cross product is left unnormalized.
        let face_normal = edge1.cross(edge2);
        for index in [i0, i1, i2] {
            normals[index] += face_normal;
        }
    }

    normals
        .into_iter()
        .map(|n| {
            let length = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
            if length > 0.0 {
                [n.x / length, n.y / length, n.z / length]
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

/// Unit quad in the XY plane facing +Z, scaled by `half_extent`.
#[cfg(test)]
pub(crate) fn quad(half_extent: f32) -> MeshData {
    let h = half_extent;
    MeshData::from_attributes(
        vec![[-h, -h, 0.0], [h, -h, 0.0], [h, h, 0.0], [-h, h, 0.0]],
        None,
        Some(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]),
        Some(vec![0, 1, 2, 2, 3, 0]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_normals_face_out_of_ccw_winding() {
        let mesh = quad(1.0);
        for vertex in mesh.vertices() {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.triangles().count(), 2);
    }

    #[test]
    fn test_missing_indices_become_triangle_list() {
        let mesh = MeshData::from_attributes(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            None,
        );
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.vertices()[2].uv, [0.0, 0.0]);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(quad(1.0).id(), quad(1.0).id());
    }
}
