//! Provides the scene graph as an owned arena of nodes.
//!
//! Nodes reference their parent and children by [`NodeId`]. Destroyed nodes
//! leave an empty slot, so ids held by other code never alias a new node.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//!
//! use glam::Vec3;
//! use thumbframe::mesh::Mesh;
//! use thumbframe::scene::{Scene, Surface};
//!
//! let mut scene = Scene::new();
//! let root = scene.add_node("Robot", None);
//! let arm = scene.add_node("Arm", Some(root));
//! scene.node_mut(arm).unwrap().surfaces.push(Surface::new(Arc::new(Mesh::quad(1.0, 1.0, [1.0; 3]))));
//!
//! let copy = scene.instantiate(root).unwrap();
//! assert_eq!(scene.subtree(copy).len(), 2);
//! assert_eq!(scene.find_by_name("Arm"), Some(arm));
//! ```

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::bounds::{Aabb, SurfaceBounds};
use crate::error::{Result, ThumbnailError};
use crate::layers::{LayerMask, DEFAULT_LAYER};
use crate::mesh::Mesh;

/// Handle to a node in a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Local translation, rotation and scale relative to the parent node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

/// A renderable surface attached to a node.
#[derive(Clone, Debug)]
pub struct Surface {
    /// Disabled surfaces are neither rendered nor counted in bounds.
    pub enabled: bool,
    pub mesh: Arc<Mesh>,
}

impl Surface {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            enabled: true,
            mesh,
        }
    }
}

/// A light shining along its node's local -Z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// A world-space light direction with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLight {
    /// Unit vector the light travels along.
    pub direction: Vec3,
    pub light: DirectionalLight,
}

/// One node of the scene graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    /// Render layer; [`DEFAULT_LAYER`] means unset.
    pub layer: u8,
    pub surfaces: Vec<Surface>,
    pub light: Option<DirectionalLight>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            layer: DEFAULT_LAYER,
            surfaces: Vec::new(),
            light: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A surface paired with the world matrix of its node.
#[derive(Clone, Copy, Debug)]
pub struct WorldSurface<'a> {
    pub node: NodeId,
    pub world: Mat4,
    pub surface: &'a Surface,
}

impl WorldSurface<'_> {
    /// World-space bounds of the surface, or `None` for an empty mesh.
    pub fn world_bounds(&self) -> Option<Aabb> {
        let (min, max) = self.surface.mesh.local_extents()?;
        Some(Aabb::from_min_max(min, max).transformed(&self.world))
    }
}

/// An arena of scene nodes.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty node, optionally under `parent`. A dead parent makes the node a root.
    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| self.contains(*p));
        self.nodes.push(Some(Node::new(name, parent)));
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.push(id);
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Like [`Scene::node`], but reports a dead id as an error.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(ThumbnailError::UnknownNode(id.0))
    }

    /// Like [`Scene::node_mut`], but reports a dead id as an error.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.node_mut(id).ok_or(ThumbnailError::UnknownNode(id.0))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every live node without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.live()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Finds the first live node named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.live().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Returns `root` and all of its descendants in depth-first pre-order.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Applies `apply` to every node of the subtree accepted by `filter`.
    ///
    /// Returns the number of nodes changed.
    pub fn walk_mut(
        &mut self,
        root: NodeId,
        filter: impl Fn(&Node) -> bool,
        mut apply: impl FnMut(&mut Node),
    ) -> usize {
        let mut changed = 0;
        for id in self.subtree(root) {
            if let Some(node) = self.node_mut(id) {
                if filter(&*node) {
                    apply(node);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Moves every node of the subtree still on the default layer to `layer`.
    ///
    /// Nodes with a customized layer keep it.
    pub fn set_layer_recursive(&mut self, root: NodeId, layer: u8) -> usize {
        self.walk_mut(root, |n| n.layer == DEFAULT_LAYER, |n| n.layer = layer)
    }

    /// Deep-copies the subtree at `source` as a new root node.
    ///
    /// The copy keeps the source's world placement. Meshes are shared.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::UnknownNode`] if `source` is not live.
    pub fn instantiate(&mut self, source: NodeId) -> Result<NodeId> {
        let world = self.world_matrix(source)?;
        let copy = self.copy_subtree(source, None)?;
        self.get_mut(copy)?.transform = Transform::from_matrix(&world);
        Ok(copy)
    }

    fn copy_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> Result<NodeId> {
        let original = self.get(source)?.clone();
        let id = self.add_node(original.name.clone(), parent);
        {
            let node = self.get_mut(id)?;
            node.transform = original.transform;
            node.layer = original.layer;
            node.surfaces = original.surfaces;
            node.light = original.light;
        }
        for child in original.children {
            self.copy_subtree(child, Some(id))?;
        }
        Ok(id)
    }

    /// Removes `id` and its descendants. Returns false if `id` was already gone.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).map(|n| n.parent) else {
            return false;
        };
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.retain(|c| *c != id);
        }
        for victim in self.subtree(id) {
            self.nodes[victim.0] = None;
        }
        true
    }

    /// Composes local transforms from the root down to `id`.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::UnknownNode`] if `id` is not live.
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4> {
        let mut node = self.get(id)?;
        let mut world = node.transform.matrix();
        while let Some(parent) = node.parent.and_then(|p| self.node(p)) {
            world = parent.transform.matrix() * world;
            node = parent;
        }
        Ok(world)
    }

    /// World position of `id`.
    pub fn world_position(&self, id: NodeId) -> Result<Vec3> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    /// Every surface in the subtree at `root`, enabled or not.
    pub fn subtree_surfaces(&self, root: NodeId) -> Vec<WorldSurface<'_>> {
        self.subtree(root)
            .into_iter()
            .filter_map(|id| Some((id, self.node(id)?, self.world_matrix(id).ok()?)))
            .flat_map(|(id, node, world)| {
                node.surfaces.iter().map(move |surface| WorldSurface {
                    node: id,
                    world,
                    surface,
                })
            })
            .collect()
    }

    /// World-space bounds of every non-empty surface in the subtree.
    pub fn surface_bounds(&self, root: NodeId) -> Vec<SurfaceBounds> {
        self.subtree_surfaces(root)
            .iter()
            .filter_map(|ws| Some(SurfaceBounds::new(ws.surface.enabled, ws.world_bounds()?)))
            .collect()
    }

    /// Enabled surfaces on layers included in `mask`.
    pub fn visible_surfaces(&self, mask: LayerMask) -> Vec<WorldSurface<'_>> {
        self.roots()
            .into_iter()
            .flat_map(|root| self.subtree_surfaces(root))
            .filter(|ws| ws.surface.enabled)
            .filter(|ws| self.node(ws.node).is_some_and(|n| mask.contains(n.layer)))
            .collect()
    }

    /// Every directional light in the scene with its world direction.
    pub fn lights(&self) -> Vec<SceneLight> {
        self.live()
            .filter_map(|(id, node)| {
                let light = node.light?;
                let world = self.world_matrix(id).ok()?;
                let direction = world.transform_vector3(Vec3::NEG_Z).try_normalize()?;
                Some(SceneLight { direction, light })
            })
            .collect()
    }

    fn live(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_surface() -> Surface {
        Surface::new(Arc::new(Mesh::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5), [1.0; 3])))
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        let child = scene.add_node("child", Some(root));
        scene.get_mut(root).unwrap().transform = Transform::from_translation(Vec3::X);
        scene.get_mut(child).unwrap().transform = Transform::from_translation(Vec3::Y);
        assert_eq!(scene.world_position(child).unwrap(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_set_layer_preserves_custom_layers() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        let a = scene.add_node("a", Some(root));
        let b = scene.add_node("b", Some(a));
        scene.get_mut(a).unwrap().layer = 5;

        let changed = scene.set_layer_recursive(root, 31);
        assert_eq!(changed, 2);
        assert_eq!(scene.get(root).unwrap().layer, 31);
        assert_eq!(scene.get(a).unwrap().layer, 5);
        assert_eq!(scene.get(b).unwrap().layer, 31);
    }

    #[test]
    fn test_instantiate_keeps_world_placement_and_source() {
        let mut scene = Scene::new();
        let parent = scene.add_node("parent", None);
        let source = scene.add_node("source", Some(parent));
        scene.get_mut(parent).unwrap().transform = Transform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        scene.get_mut(source).unwrap().surfaces.push(cube_surface());
        scene.add_node("leaf", Some(source));

        let copy = scene.instantiate(source).unwrap();
        assert!(scene.get(copy).unwrap().parent().is_none());
        assert_eq!(scene.world_position(copy).unwrap(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(scene.subtree(copy).len(), 2);
        assert_eq!(scene.subtree(source).len(), 2);
        assert_eq!(scene.len(), 5);
    }

    #[test]
    fn test_destroy_removes_subtree_and_is_idempotent() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        let child = scene.add_node("child", Some(root));
        let grandchild = scene.add_node("grandchild", Some(child));

        assert!(scene.destroy(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.get(root).unwrap().children().is_empty());
        assert!(!scene.destroy(child));
        assert!(matches!(scene.get(child), Err(ThumbnailError::UnknownNode(_))));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_visible_surfaces_respect_mask_and_enabled() {
        let mut scene = Scene::new();
        let a = scene.add_node("a", None);
        let b = scene.add_node("b", None);
        scene.get_mut(a).unwrap().surfaces.push(cube_surface());
        scene.get_mut(b).unwrap().surfaces.push(cube_surface());
        scene.get_mut(b).unwrap().layer = 9;

        assert_eq!(scene.visible_surfaces(LayerMask::single(9)).len(), 1);
        assert_eq!(scene.visible_surfaces(LayerMask::ALL).len(), 2);
        assert!(scene.visible_surfaces(LayerMask::NONE).is_empty());

        scene.get_mut(b).unwrap().surfaces[0].enabled = false;
        assert!(scene.visible_surfaces(LayerMask::single(9)).is_empty());
    }

    #[test]
    fn test_surface_bounds_are_world_space() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        scene.get_mut(root).unwrap().transform = Transform::from_translation(Vec3::new(0.0, -1000.0, 0.0));
        scene.get_mut(root).unwrap().surfaces.push(cube_surface());

        let bounds = scene.surface_bounds(root);
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].bounds.center, Vec3::new(0.0, -1000.0, 0.0));
        assert_eq!(bounds[0].bounds.half_extents, Vec3::splat(0.5));
    }

    #[test]
    fn test_light_direction_follows_parent_rotation() {
        let mut scene = Scene::new();
        let rig = scene.add_node("rig", None);
        let light = scene.add_node("light", Some(rig));
        scene.get_mut(rig).unwrap().transform.rotation =
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        scene.get_mut(light).unwrap().light = Some(DirectionalLight {
            color: [1.0; 3],
            intensity: 1.5,
        });

        let lights = scene.lights();
        assert_eq!(lights.len(), 1);
        assert!((lights[0].direction - Vec3::NEG_X).length() < 1e-5);
    }
}
