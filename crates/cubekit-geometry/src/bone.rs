//! Bone tree snapshot
//!
//! Bones live in an arena (`Vec<Bone>`) and refer to their parent by name.
//! The tree is built once per export run and never mutated afterwards.

use cubekit_core::{BoundingBox, Error, Result, Vec3};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Position of a cube inside a [`BoneTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeId {
    pub bone: usize,
    pub cube: usize,
}

/// Largest cube dimension accepted, in model units. Keeps UV pixel sizes
/// well inside `i32`.
pub const MAX_CUBE_SIZE: f64 = 65_536.0;

/// Axis-aligned box, the geometry unit of the block-model format
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    origin: Vec3,
    size: Vec3,
    inflate: f64,
    /// Mirrored east/west UV faces
    pub mirror: bool,
    /// Rotation around `pivot` in degrees
    pub rotation: Vec3,
    pub pivot: Option<Vec3>,
    /// Cubes of the same group with equal face sizes share UV space
    pub uv_group: Option<String>,
    /// UV anchor requested by the scene
    pub fixed_uv: Option<[u32; 2]>,
}

impl Cube {
    /// Create a cube from its logical min corner, size and inflate.
    ///
    /// Fails when a size component is negative or above [`MAX_CUBE_SIZE`],
    /// or when inflate shrinks the rendered box below zero
    /// (`size + 2 * inflate < 0`).
    pub fn new(origin: Vec3, size: Vec3, inflate: f64) -> Result<Self> {
        if !origin.is_finite() || !size.is_finite() || !inflate.is_finite() {
            return Err(Error::structure(format!(
                "cube has non-finite geometry (origin {:?}, size {:?}, inflate {})",
                origin.to_array(),
                size.to_array(),
                inflate
            )));
        }
        if size.min_element() < 0.0 {
            return Err(Error::structure(format!(
                "cube size {:?} has a negative dimension",
                size.to_array()
            )));
        }
        if size.to_array().iter().any(|v| *v > MAX_CUBE_SIZE) {
            return Err(Error::structure(format!(
                "cube size {:?} exceeds the largest supported size {}",
                size.to_array(),
                MAX_CUBE_SIZE
            )));
        }
        let rendered = size + Vec3::splat(2.0 * inflate);
        if rendered.min_element() < 0.0 {
            return Err(Error::structure(format!(
                "cube size {:?} with inflate {} renders with a negative dimension",
                size.to_array(),
                inflate
            )));
        }

        Ok(Self {
            origin,
            size,
            inflate,
            mirror: false,
            rotation: Vec3::ZERO,
            pivot: None,
            uv_group: None,
            fixed_uv: None,
        })
    }

    /// Recover the logical cube from the box the host renders.
    ///
    /// The host reports inflated geometry, so the inflate is taken off each
    /// side.
    pub fn from_rendered_bounds(min: Vec3, max: Vec3, inflate: f64) -> Result<Self> {
        let lo = min.min(max);
        let hi = min.max(max);
        Self::new(
            lo + Vec3::splat(inflate),
            (hi - lo) - Vec3::splat(2.0 * inflate),
            inflate,
        )
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3, pivot: Option<Vec3>) -> Self {
        self.rotation = rotation;
        self.pivot = pivot;
        self
    }

    pub fn with_uv_group(mut self, group: impl Into<String>) -> Self {
        self.uv_group = Some(group.into());
        self
    }

    pub fn with_fixed_uv(mut self, anchor: [u32; 2]) -> Self {
        self.fixed_uv = Some(anchor);
        self
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn inflate(&self) -> f64 {
        self.inflate
    }

    /// `size + 2 * inflate`
    pub fn rendered_size(&self) -> Vec3 {
        self.size + Vec3::splat(2.0 * self.inflate)
    }

    /// Box covered on screen, ignoring rotation
    pub fn rendered_bounds(&self) -> BoundingBox {
        let min = self.origin - Vec3::splat(self.inflate);
        BoundingBox::new(min, min + self.rendered_size())
    }

    /// Whole-pixel face dimensions `(width, height, depth)` used for UVs
    pub fn uv_dimensions(&self) -> (u32, u32, u32) {
        let px = |v: f64| v.round().max(0.0) as u32;
        (px(self.size.x), px(self.size.y), px(self.size.z))
    }
}

/// Named attachment point on a bone
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    pub name: String,
    pub offset: Vec3,
    pub rotation: Vec3,
}

impl Locator {
    pub fn new(name: impl Into<String>, offset: Vec3) -> Self {
        Self {
            name: name.into(),
            offset,
            rotation: Vec3::ZERO,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }
}

/// A single bone of the model
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Bone name, also the animation binding key
    pub name: String,
    /// Parent bone name (None for root bones)
    pub parent: Option<String>,
    pub pivot: Vec3,
    /// Rest rotation in degrees
    pub rotation: Vec3,
    pub mirror: bool,
    pub cubes: Vec<Cube>,
    pub locators: Vec<Locator>,
}

impl Bone {
    pub fn new(name: impl Into<String>, pivot: Vec3) -> Self {
        Self {
            name: name.into(),
            parent: None,
            pivot,
            rotation: Vec3::ZERO,
            mirror: false,
            cubes: Vec::new(),
            locators: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_cube(mut self, cube: Cube) -> Self {
        self.cubes.push(cube);
        self
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Check if this is a root bone
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Immutable bone hierarchy of one export run
#[derive(Debug, Clone, Default)]
pub struct BoneTree {
    bones: Vec<Bone>,
    /// First bone index for every name
    index: HashMap<String, usize>,
    /// Resolved parent index per bone (None for roots and missing parents)
    parents: Vec<Option<usize>>,
    children: Vec<SmallVec<[usize; 4]>>,
}

impl BoneTree {
    /// Index the bones and reject parent cycles.
    ///
    /// Duplicate names and parents that name no bone are tolerated here;
    /// they are schema problems reported by the model serializer.
    pub fn new(bones: Vec<Bone>) -> Result<Self> {
        let mut index = HashMap::with_capacity(bones.len());
        for (idx, bone) in bones.iter().enumerate() {
            index.entry(bone.name.clone()).or_insert(idx);
        }

        let parents: Vec<Option<usize>> = bones
            .iter()
            .map(|bone| bone.parent.as_ref().and_then(|p| index.get(p).copied()))
            .collect();

        let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); bones.len()];
        for (idx, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(idx);
            }
        }

        let tree = Self {
            bones,
            index,
            parents,
            children,
        };
        tree.check_cycles()?;
        Ok(tree)
    }

    fn check_cycles(&self) -> Result<()> {
        // 0 = unvisited, 1 = on the current parent chain, 2 = known acyclic
        let mut state = vec![0u8; self.bones.len()];

        for start in 0..self.bones.len() {
            let mut chain = Vec::new();
            let mut current = Some(start);

            while let Some(idx) = current {
                match state[idx] {
                    2 => break,
                    1 => {
                        let names: Vec<&str> = chain
                            .iter()
                            .map(|&i: &usize| self.bones[i].name.as_str())
                            .collect();
                        return Err(Error::structure(format!(
                            "parent cycle through bones {}",
                            names.join(" -> ")
                        )));
                    }
                    _ => {
                        state[idx] = 1;
                        chain.push(idx);
                        current = self.parents[idx];
                    }
                }
            }

            for idx in chain {
                state[idx] = 2;
            }
        }

        Ok(())
    }

    /// Get bone count
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// All bones in definition order
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Get bone by index
    pub fn get(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Find bone by name
    pub fn find(&self, name: &str) -> Option<&Bone> {
        self.index.get(name).map(|&idx| &self.bones[idx])
    }

    /// Find bone index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Resolved parent index
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Get children of a bone
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Indices of bones without a resolvable parent
    pub fn roots(&self) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&idx| self.parents[idx].is_none())
            .collect()
    }

    /// Bone indices ordered so that every bone follows its parent.
    ///
    /// Depth-first from the roots; roots and siblings keep definition order.
    pub fn parent_first_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<usize> = self.roots().into_iter().rev().collect();

        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children(idx).iter().rev().copied());
        }

        order
    }

    /// Iterate over every cube with its id
    pub fn cubes(&self) -> impl Iterator<Item = (CubeId, &Cube)> {
        self.bones.iter().enumerate().flat_map(|(bone_idx, bone)| {
            bone.cubes.iter().enumerate().map(move |(cube_idx, cube)| {
                (
                    CubeId {
                        bone: bone_idx,
                        cube: cube_idx,
                    },
                    cube,
                )
            })
        })
    }

    pub fn cube_count(&self) -> usize {
        self.bones.iter().map(|b| b.cubes.len()).sum()
    }

    /// Get all bone names
    pub fn bone_names(&self) -> Vec<&str> {
        self.bones.iter().map(|b| b.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, parent: Option<&str>) -> Bone {
        let bone = Bone::new(name, Vec3::ZERO);
        match parent {
            Some(p) => bone.with_parent(p),
            None => bone,
        }
    }

    #[test]
    fn test_cube_rejects_negative_size() {
        let err = Cube::new(Vec3::ZERO, Vec3::new(1.0, -1.0, 1.0), 0.0).unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
    }

    #[test]
    fn test_cube_rejects_huge_size() {
        let err = Cube::new(Vec3::ZERO, Vec3::new(3e9, 1.0, 3e9), 0.0).unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        assert!(Cube::new(Vec3::ZERO, Vec3::splat(MAX_CUBE_SIZE), 0.0).is_ok());
    }

    #[test]
    fn test_cube_inflate_bound() {
        let size = Vec3::new(4.0, 2.0, 6.0);
        assert!(Cube::new(Vec3::ZERO, size, -1.0).is_ok());
        assert!(Cube::new(Vec3::ZERO, size, -1.01).is_err());
    }

    #[test]
    fn test_cube_from_rendered_bounds() {
        let cube = Cube::from_rendered_bounds(
            Vec3::new(-4.5, -0.5, -2.5),
            Vec3::new(4.5, 12.5, 2.5),
            0.5,
        )
        .unwrap();

        assert_eq!(cube.origin(), Vec3::new(-4.0, 0.0, -2.0));
        assert_eq!(cube.size(), Vec3::new(8.0, 12.0, 4.0));
        assert_eq!(cube.rendered_size(), Vec3::new(9.0, 13.0, 5.0));
        assert_eq!(cube.uv_dimensions(), (8, 12, 4));
    }

    #[test]
    fn test_tree_children_and_order() {
        let tree = BoneTree::new(vec![
            bone("arm", Some("body")),
            bone("body", None),
            bone("hand", Some("arm")),
            bone("head", Some("body")),
        ])
        .unwrap();

        assert_eq!(tree.roots(), vec![1]);
        assert_eq!(tree.children(1), &[0, 3]);

        let names: Vec<&str> = tree
            .parent_first_order()
            .into_iter()
            .map(|i| tree.bones()[i].name.as_str())
            .collect();
        assert_eq!(names, vec!["body", "arm", "hand", "head"]);
    }

    #[test]
    fn test_tree_rejects_cycle() {
        let err = BoneTree::new(vec![
            bone("a", Some("c")),
            bone("b", Some("a")),
            bone("c", Some("b")),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_tree_rejects_self_parent() {
        assert!(BoneTree::new(vec![bone("a", Some("a"))]).is_err());
    }

    #[test]
    fn test_missing_parent_is_root() {
        let tree = BoneTree::new(vec![bone("a", Some("ghost"))]).unwrap();
        assert_eq!(tree.roots(), vec![0]);
        assert_eq!(tree.parent_of(0), None);
    }
}
