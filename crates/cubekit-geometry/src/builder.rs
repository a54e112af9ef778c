//! Scene snapshot builder
//!
//! Turns what a [`SceneSource`] reports into a validated [`BoneTree`].

use cubekit_core::{Error, Result, ResultExt};
use tracing::{debug, info};

use crate::bone::{Bone, BoneTree, Cube, Locator};
use crate::scene::{SceneBone, SceneCube, SceneSource};

/// Build the immutable bone tree of one export run.
///
/// Fails with [`Error::Structure`] when a bone has no pivot, when parent
/// links form a cycle, or when a cube ends up with a negative dimension once
/// its inflate is taken off.
pub fn build<S>(scene: &S) -> Result<BoneTree>
where
    S: SceneSource + ?Sized,
{
    let scene_bones = scene.read_bones()?;
    info!(bones = scene_bones.len(), "Building bone tree");

    let bones = scene_bones
        .iter()
        .map(convert_bone)
        .collect::<Result<Vec<_>>>()?;

    let tree = BoneTree::new(bones)?;
    debug!(
        bones = tree.len(),
        cubes = tree.cube_count(),
        roots = tree.roots().len(),
        "Bone tree built"
    );
    Ok(tree)
}

fn convert_bone(scene_bone: &SceneBone) -> Result<Bone> {
    let pivot = scene_bone.pivot.ok_or_else(|| {
        Error::structure(format!("bone {} has no pivot", scene_bone.name))
    })?;

    let cubes = scene_bone
        .cubes
        .iter()
        .enumerate()
        .map(|(idx, cube)| {
            convert_cube(cube, scene_bone.mirror)
                .with_context(|| format!("cube {} of bone {}", idx, scene_bone.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let locators = scene_bone
        .locators
        .iter()
        .map(|l| Locator::new(l.name.clone(), l.offset).with_rotation(l.rotation))
        .collect();

    Ok(Bone {
        name: scene_bone.name.clone(),
        parent: scene_bone.parent.clone(),
        pivot,
        rotation: scene_bone.rotation,
        mirror: scene_bone.mirror,
        cubes,
        locators,
    })
}

fn convert_cube(scene_cube: &SceneCube, bone_mirror: bool) -> Result<Cube> {
    let mut cube = Cube::from_rendered_bounds(scene_cube.from, scene_cube.to, scene_cube.inflate)?
        .with_mirror(scene_cube.mirror.unwrap_or(bone_mirror))
        .with_rotation(scene_cube.rotation, scene_cube.pivot);

    if let Some(group) = &scene_cube.uv_group {
        cube = cube.with_uv_group(group.clone());
    }
    if let Some(anchor) = scene_cube.uv {
        cube = cube.with_fixed_uv(anchor);
    }
    Ok(cube)
}
