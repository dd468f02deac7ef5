use cgmath::{Euler, Matrix4, One, Quaternion, Rad, SquareMatrix, Vector3};

use super::light::LightNode;
use super::mesh::MeshData;
use crate::gfx::resources::material::{Side, StandardMaterial};
use std::sync::Arc;

/// Index of a node inside a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Local translation, rotation and scale of a node.
///
/// The rotation is kept both as a quaternion and as XYZ Euler angles.
/// Writing one re-derives the other, so incrementing the Euler yaw keeps
/// accumulating past ±90° instead of folding back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub scale: Vector3<f32>,
    rotation: Quaternion<f32>,
    euler: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: Quaternion::one(),
            euler: [0.0; 3],
        }
    }
}

impl Transform {
    pub fn new(translation: Vector3<f32>, rotation: Quaternion<f32>, scale: Vector3<f32>) -> Self {
        let mut transform = Self {
            translation,
            scale,
            ..Self::default()
        };
        transform.set_rotation(rotation);
        transform
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
        let euler = Euler::from(rotation);
        self.euler = [euler.x.0, euler.y.0, euler.z.0];
    }

    /// XYZ Euler angles in radians.
    pub fn euler(&self) -> [f32; 3] {
        self.euler
    }

    pub fn set_euler(&mut self, euler: [f32; 3]) {
        self.euler = euler;
        self.rotation = Quaternion::from(Euler::new(Rad(euler[0]), Rad(euler[1]), Rad(euler[2])));
    }

    /// Adds to the Euler yaw.
    pub fn rotate_y(&mut self, angle: f32) {
        let [x, y, z] = self.euler;
        self.set_euler([x, y + angle, z]);
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Material a mesh is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialSlot {
    /// The viewer's shared [`PhysicalMaterial`](crate::gfx::resources::material::PhysicalMaterial).
    Shared,
    Standard(StandardMaterial),
}

#[derive(Debug, Clone)]
pub struct MeshNode {
    pub primitives: Vec<Arc<MeshData>>,
    pub material: MaterialSlot,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshNode {
    pub fn new(primitives: Vec<Arc<MeshData>>, material: MaterialSlot) -> Self {
        Self {
            primitives,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    /// Face culling of this mesh, resolving the shared material's side.
    pub fn side(&self, shared: Side) -> Side {
        match &self.material {
            MaterialSlot::Shared => shared,
            MaterialSlot::Standard(material) => material.side(),
        }
    }
}

/// What a node is, decided once at load time.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    Light(LightNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&LightNode> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

/// Where an appended graph landed.
#[derive(Debug, Clone)]
pub struct Appended {
    offset: usize,
    pub roots: Vec<NodeId>,
}

impl Appended {
    /// Translates an id of the appended graph into the receiving graph.
    pub fn map(&self, id: NodeId) -> NodeId {
        NodeId(id.0 + self.offset)
    }
}

/// Arena of nodes forming a forest.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| p.0 < self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter().find(|(_, node)| node.name == name).map(|(id, _)| id)
    }

    /// `root` and everything below it, depth first, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            ordered.push(id);
            stack.extend(node.children.iter().rev());
        }
        ordered
    }

    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World matrix of every node, indexed by [`NodeId::index`].
    pub fn world_matrices(&self) -> Vec<Matrix4<f32>> {
        let mut matrices = vec![Matrix4::identity(); self.nodes.len()];
        for &root in &self.roots {
            for id in self.descendants(root) {
                let node = &self.nodes[id.0];
                let parent = node
                    .parent
                    .map_or(Matrix4::identity(), |p| matrices[p.0]);
                matrices[id.0] = parent * node.transform.matrix();
            }
        }
        matrices
    }

    /// Whether the node and all of its ancestors are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Moves every node of `other` into this graph. Its roots stay roots.
    pub fn append(&mut self, other: SceneGraph) -> Appended {
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);
        for mut node in other.nodes {
            node.parent = node.parent.map(shift);
            node.children = node.children.into_iter().map(shift).collect();
            self.nodes.push(node);
        }
        let roots: Vec<NodeId> = other.roots.into_iter().map(shift).collect();
        self.roots.extend(roots.iter().copied());
        Appended { offset, roots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rotation3, Transform as _};

    fn group(name: &str) -> Node {
        Node::new(name, NodeKind::Group)
    }

    #[test]
    fn test_descendants_are_preorder() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(group("root"), None);
        let a = graph.add_node(group("a"), Some(root));
        let a1 = graph.add_node(group("a1"), Some(a));
        let b = graph.add_node(group("b"), Some(root));

        assert_eq!(graph.descendants(root), vec![root, a, a1, b]);
        assert_eq!(graph.descendants(a), vec![a, a1]);
        assert_eq!(graph.find_by_name("a1"), Some(a1));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(
            group("root").with_transform(Transform::new(
                Vector3::new(1.0, 0.0, 0.0),
                Quaternion::one(),
                Vector3::new(2.0, 2.0, 2.0),
            )),
            None,
        );
        let child = graph.add_node(
            group("child").with_transform(Transform::new(
                Vector3::new(0.0, 1.0, 0.0),
                Quaternion::one(),
                Vector3::new(1.0, 1.0, 1.0),
            )),
            Some(root),
        );

        let origin = graph
            .world_matrix(child)
            .transform_point(cgmath::Point3::new(0.0, 0.0, 0.0));
        assert!((origin - cgmath::Point3::new(1.0, 2.0, 0.0)).magnitude() < 1e-6);
        assert_eq!(graph.world_matrices()[child.index()], graph.world_matrix(child));
    }

    #[test]
    fn test_append_shifts_ids() {
        let mut scene = SceneGraph::new();
        scene.add_node(group("existing"), None);

        let mut model = SceneGraph::new();
        let model_root = model.add_node(group("model"), None);
        let leaf = model.add_node(group("leaf"), Some(model_root));

        let appended = scene.append(model);
        let mapped = appended.map(leaf);
        assert_eq!(scene.node(mapped).map(|n| n.name.as_str()), Some("leaf"));
        assert_eq!(scene.node(mapped).and_then(|n| n.parent()), Some(appended.map(model_root)));
        assert_eq!(scene.roots().len(), 2);
    }

    #[test]
    fn test_yaw_keeps_accumulating_past_quarter_turn() {
        let mut transform = Transform::default();
        for _ in 0..200 {
            transform.rotate_y(0.01);
        }
        assert!((transform.euler()[1] - 2.0).abs() < 1e-4);
        let expected = Quaternion::from_angle_y(Rad(2.0f32));
        assert!((transform.rotation() - expected).magnitude() < 1e-4);
    }
}
