//! Bone tree + UV assignment -> model document

use cubekit_core::{BoundingBox, Error, IdentifierKind, Result, Vec3};
use cubekit_geometry::uv::{CubeUv, UvAssignment};
use cubekit_geometry::{BoneTree, CubeId, Face};
use std::collections::HashSet;
use tracing::{debug, info};

use super::document::{
    BoneEntry, CubeEntry, CubeUvEntry, FaceUv, FaceUvs, Geometry, GeometryDescription,
    LocatorEntry, ModelDocument,
};
use crate::format::{num3, rotation3, Num, OrderedMap};

/// Engine units per block
const UNITS_PER_BLOCK: f64 = 16.0;

/// Visible bounds of a model, in blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleBounds {
    pub width: f64,
    pub height: f64,
    pub offset: Vec3,
}

impl Default for VisibleBounds {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            offset: Vec3::ZERO,
        }
    }
}

impl VisibleBounds {
    /// Bounds covering the rendered extent of every cube.
    ///
    /// Width is symmetric around the vertical axis; height spans the cubes
    /// and the offset centres it. Both sizes are at least one block.
    pub fn from_tree(tree: &BoneTree) -> Self {
        let mut bounds: Option<BoundingBox> = None;
        for (_, cube) in tree.cubes() {
            let b = cube.rendered_bounds();
            bounds = Some(match bounds {
                Some(mut acc) => {
                    acc.union(&b);
                    acc
                }
                None => b,
            });
        }

        let Some(b) = bounds else {
            return Self::default();
        };

        let horizontal = [b.min.x, b.max.x, b.min.z, b.max.z]
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let width = (2.0 * horizontal / UNITS_PER_BLOCK).ceil().max(1.0);
        let height = ((b.max.y - b.min.y) / UNITS_PER_BLOCK).ceil().max(1.0);
        let centre = (b.min.y + b.max.y) / 2.0 / UNITS_PER_BLOCK;

        Self {
            width,
            height,
            offset: Vec3::new(0.0, centre, 0.0),
        }
    }
}

/// Identity and description overrides of a written model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub name: String,
    /// Computed from the cubes when `None`
    pub visible_bounds: Option<VisibleBounds>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible_bounds: None,
        }
    }

    /// `geometry.<name>`
    pub fn identifier(&self) -> String {
        if self.name.starts_with("geometry.") {
            self.name.clone()
        } else {
            format!("geometry.{}", self.name)
        }
    }
}

/// Check names and parent links.
///
/// Reports [`Error::DuplicateIdentifier`] for repeated bone or locator names
/// and [`Error::DanglingReference`] for parents that name no bone. Several
/// problems come back as [`Error::Multiple`].
pub fn validate(tree: &BoneTree) -> Result<()> {
    let mut errors = Vec::new();

    let mut bone_names = HashSet::new();
    let mut reported = HashSet::new();
    for bone in tree.bones() {
        if !bone_names.insert(bone.name.as_str()) && reported.insert(bone.name.as_str()) {
            errors.push(Error::DuplicateIdentifier {
                kind: IdentifierKind::Bone,
                name: bone.name.clone(),
            });
        }
    }

    let mut locator_names = HashSet::new();
    let mut reported_locators = HashSet::new();
    for bone in tree.bones() {
        for locator in &bone.locators {
            if !locator_names.insert(locator.name.as_str())
                && reported_locators.insert(locator.name.as_str())
            {
                errors.push(Error::DuplicateIdentifier {
                    kind: IdentifierKind::Locator,
                    name: locator.name.clone(),
                });
            }
        }
    }

    for bone in tree.bones() {
        if let Some(parent) = &bone.parent {
            if !bone_names.contains(parent.as_str()) {
                errors.push(Error::DanglingReference {
                    bone: bone.name.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Multiple(errors)),
    }
}

fn face_uvs(uv: &CubeUv) -> FaceUvs {
    let mut faces = FaceUvs::default();
    for face in Face::ALL {
        let rect = uv.face(face);
        faces.set(
            face,
            FaceUv {
                uv: [Num::new(rect.position[0] as f64), Num::new(rect.position[1] as f64)],
                uv_size: [Num::new(rect.size[0] as f64), Num::new(rect.size[1] as f64)],
            },
        );
    }
    faces
}

fn is_zero_rotation(rotation: Vec3) -> bool {
    rotation3(rotation).iter().all(|c| c.0 == 0.0)
}

fn cube_entry(tree: &BoneTree, uv: &UvAssignment, id: CubeId) -> Result<CubeEntry> {
    let bone = &tree.bones()[id.bone];
    let cube = &bone.cubes[id.cube];
    let cube_uv = uv.get(id).ok_or_else(|| {
        Error::structure(format!("cube {} of bone {} has no UV", id.cube, bone.name))
    })?;

    let (pivot, rotation) = if is_zero_rotation(cube.rotation) {
        (None, None)
    } else {
        let pivot = cube
            .pivot
            .unwrap_or_else(|| cube.origin() + cube.size() * 0.5);
        (Some(num3(pivot)), Some(rotation3(cube.rotation)))
    };

    let inflate = Num::new(cube.inflate());
    Ok(CubeEntry {
        origin: num3(cube.origin()),
        size: num3(cube.size()),
        inflate: (inflate.0 != 0.0).then_some(inflate),
        pivot,
        rotation,
        mirror: cube.mirror,
        uv: CubeUvEntry::PerFace(face_uvs(cube_uv)),
    })
}

/// Build the model document.
///
/// Bones are written parent-first. Fails when [`validate`] does.
pub fn serialize(
    tree: &BoneTree,
    uv: &UvAssignment,
    metadata: &ModelMetadata,
) -> Result<ModelDocument> {
    validate(tree)?;
    info!(
        model = %metadata.identifier(),
        bones = tree.len(),
        cubes = tree.cube_count(),
        "Serializing model"
    );

    let mut bones = Vec::with_capacity(tree.len());
    for idx in tree.parent_first_order() {
        let bone = &tree.bones()[idx];

        let cubes = (0..bone.cubes.len())
            .map(|cube| cube_entry(tree, uv, CubeId { bone: idx, cube }))
            .collect::<Result<Vec<_>>>()?;

        let mut locators = OrderedMap::new();
        for locator in &bone.locators {
            let entry = if is_zero_rotation(locator.rotation) {
                LocatorEntry::Offset(num3(locator.offset))
            } else {
                LocatorEntry::Rotated {
                    offset: num3(locator.offset),
                    rotation: rotation3(locator.rotation),
                }
            };
            locators.insert(locator.name.clone(), entry);
        }

        debug!(bone = %bone.name, cubes = cubes.len(), locators = locators.len(), "Bone entry");
        bones.push(BoneEntry {
            name: bone.name.clone(),
            parent: bone.parent.clone(),
            pivot: num3(bone.pivot),
            rotation: (!is_zero_rotation(bone.rotation)).then(|| rotation3(bone.rotation)),
            mirror: bone.mirror,
            cubes,
            locators,
        });
    }

    let bounds = metadata
        .visible_bounds
        .unwrap_or_else(|| VisibleBounds::from_tree(tree));

    let description = GeometryDescription {
        identifier: metadata.identifier(),
        texture_width: uv.texture_width,
        texture_height: uv.texture_height,
        visible_bounds_width: Num::new(bounds.width),
        visible_bounds_height: Num::new(bounds.height),
        visible_bounds_offset: num3(bounds.offset),
    };
    debug!(width = bounds.width, height = bounds.height, "Visible bounds");

    Ok(ModelDocument::new(Geometry { description, bones }))
}
