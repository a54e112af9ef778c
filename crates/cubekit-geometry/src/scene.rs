//! Host scene access
//!
//! The export pipeline never touches the host's live object graph directly.
//! It asks a [`SceneSource`] for an owned copy of every bone, which makes the
//! snapshot immune to edits made while the export runs.
//!
//! [`SceneDescription`] is a file-backed scene (YAML or JSON) used by the
//! command line and the tests. Besides geometry it carries animation tracks,
//! which the animation crate evaluates.

use cubekit_core::{Error, PropertyValue, Result, Transform, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Read access to the host scene graph
pub trait SceneSource {
    /// Copy every exportable bone, in definition order
    fn read_bones(&self) -> Result<Vec<SceneBone>>;
}

/// A bone as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Missing pivots are rejected by the builder
    #[serde(default)]
    pub pivot: Option<Vec3>,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub cubes: Vec<SceneCube>,
    #[serde(default)]
    pub locators: Vec<SceneLocator>,
    /// Bind transform; defaults to the pivot and rest rotation
    #[serde(default)]
    pub rest: Option<Transform>,
}

impl SceneBone {
    pub fn new(name: impl Into<String>, pivot: Vec3) -> Self {
        Self {
            name: name.into(),
            parent: None,
            pivot: Some(pivot),
            rotation: Vec3::ZERO,
            mirror: false,
            cubes: Vec::new(),
            locators: Vec::new(),
            rest: None,
        }
    }

    /// Bind transform used as the zero point of animation channels
    pub fn rest_transform(&self) -> Transform {
        self.rest.unwrap_or(Transform {
            location: self.pivot.unwrap_or_default(),
            rotation: self.rotation,
            scale: Vec3::ONE,
        })
    }
}

/// A cube as reported by the host: the rendered (inflated) box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCube {
    pub from: Vec3,
    pub to: Vec3,
    #[serde(default)]
    pub inflate: f64,
    /// Overrides the bone's mirror flag
    #[serde(default)]
    pub mirror: Option<bool>,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub pivot: Option<Vec3>,
    #[serde(default)]
    pub uv_group: Option<String>,
    #[serde(default)]
    pub uv: Option<[u32; 2]>,
}

impl SceneCube {
    pub fn new(from: Vec3, to: Vec3) -> Self {
        Self {
            from,
            to,
            inflate: 0.0,
            mirror: None,
            rotation: Vec3::ZERO,
            pivot: None,
            uv_group: None,
            uv: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLocator {
    pub name: String,
    pub offset: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
}

/// One key of a vector animation track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorKey {
    pub frame: f64,
    pub value: Vec3,
}

/// Absolute location/rotation/scale curves of one bone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTracks {
    #[serde(default)]
    pub location: Vec<VectorKey>,
    #[serde(default)]
    pub rotation: Vec<VectorKey>,
    #[serde(default)]
    pub scale: Vec<VectorKey>,
}

impl BoneTracks {
    pub fn is_empty(&self) -> bool {
        self.location.is_empty() && self.rotation.is_empty() && self.scale.is_empty()
    }
}

/// One key of a custom property track (held until the next key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub frame: i32,
    pub value: PropertyValue,
}

/// Animation data of a scene file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneAnimation {
    /// Frames per second the tracks were authored at
    #[serde(default)]
    pub frame_rate: Option<f64>,
    /// Transform tracks by bone name
    #[serde(default)]
    pub tracks: BTreeMap<String, BoneTracks>,
    /// Property tracks by bone name, then property name
    #[serde(default)]
    pub properties: BTreeMap<String, BTreeMap<String, Vec<PropertyKey>>>,
}

/// File-backed scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub bones: Vec<SceneBone>,
    #[serde(default)]
    pub animation: SceneAnimation,
}

impl SceneDescription {
    /// Load a scene from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let scene = match ext.as_str() {
            "json" => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }?;

        tracing::debug!(
            path = %path.display(),
            bones = scene.bones.len(),
            tracks = scene.animation.tracks.len(),
            "Loaded scene description"
        );
        Ok(scene)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Find a bone by name
    pub fn bone(&self, name: &str) -> Option<&SceneBone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

impl SceneSource for SceneDescription {
    fn read_bones(&self) -> Result<Vec<SceneBone>> {
        Ok(self.bones.clone())
    }
}

impl SceneSource for [SceneBone] {
    fn read_bones(&self) -> Result<Vec<SceneBone>> {
        Ok(self.to_vec())
    }
}

impl SceneSource for Vec<SceneBone> {
    fn read_bones(&self) -> Result<Vec<SceneBone>> {
        Ok(self.clone())
    }
}
