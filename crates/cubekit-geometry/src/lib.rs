//! cubekit-geometry
//!
//! The geometry half of the export pipeline:
//!
//! | Module | Role |
//! |--------|------|
//! | [`scene`] | collaborator interface to the host scene and the file-backed scene description |
//! | [`bone`] | immutable snapshot types: [`Bone`], [`Cube`], [`Locator`], [`BoneTree`] |
//! | [`builder`] | `build(scene) -> BoneTree` with structural validation |
//! | [`uv`] | box-unfold UV assignment and packing |
//!
//! # Example
//!
//! ```rust,ignore
//! use cubekit_geometry::{build, uv, SceneDescription};
//!
//! let scene = SceneDescription::from_path("zombie.yaml")?;
//! let tree = build(&scene)?;
//! let layout = uv::assign(&tree, 64, Some(64));
//! ```

pub mod bone;
pub mod builder;
pub mod scene;
pub mod uv;

pub use bone::{Bone, BoneTree, Cube, CubeId, Locator};
pub use builder::build;
pub use scene::{
    BoneTracks, PropertyKey, SceneAnimation, SceneBone, SceneCube, SceneDescription, SceneLocator,
    SceneSource, VectorKey,
};
pub use uv::{CubeUv, Face, UvAssignment, UvMapper, UvOptions, UvRect};
