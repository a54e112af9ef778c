//! Model document types
//!
//! Mirrors the `1.12.0` geometry layout:
//!
//! ```json
//! {
//!   "format_version": "1.12.0",
//!   "minecraft:geometry": [{
//!     "description": { "identifier": "geometry.name", "texture_width": 64, ... },
//!     "bones": [{ "name": "body", "pivot": [0, 24, 0], "cubes": [...] }]
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::format::{Num, OrderedMap};
use cubekit_geometry::Face;

pub const MODEL_FORMAT_VERSION: &str = "1.12.0";

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub format_version: String,
    #[serde(rename = "minecraft:geometry")]
    pub geometry: Vec<Geometry>,
}

impl ModelDocument {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION.to_string(),
            geometry: vec![geometry],
        }
    }

    /// First geometry, the one this exporter writes
    pub fn primary(&self) -> Option<&Geometry> {
        self.geometry.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub description: GeometryDescription,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bones: Vec<BoneEntry>,
}

impl Geometry {
    pub fn bone(&self, name: &str) -> Option<&BoneEntry> {
        self.bones.iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescription {
    pub identifier: String,
    #[serde(default = "default_texture_size")]
    pub texture_width: u32,
    #[serde(default = "default_texture_size")]
    pub texture_height: u32,
    #[serde(default = "default_bounds_size")]
    pub visible_bounds_width: Num,
    #[serde(default = "default_bounds_size")]
    pub visible_bounds_height: Num,
    #[serde(default)]
    pub visible_bounds_offset: [Num; 3],
}

fn default_texture_size() -> u32 {
    64
}

fn default_bounds_size() -> Num {
    Num(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub pivot: [Num; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[Num; 3]>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mirror: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cubes: Vec<CubeEntry>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub locators: OrderedMap<LocatorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeEntry {
    pub origin: [Num; 3],
    pub size: [Num; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflate: Option<Num>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<[Num; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[Num; 3]>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mirror: bool,
    #[serde(default)]
    pub uv: CubeUvEntry,
}

/// Box UV (an anchor) or explicit per-face rectangles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CubeUvEntry {
    Box([Num; 2]),
    PerFace(FaceUvs),
}

impl Default for CubeUvEntry {
    fn default() -> Self {
        CubeUvEntry::Box([Num(0.0), Num(0.0)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceUv {
    pub uv: [Num; 2],
    #[serde(default)]
    pub uv_size: [Num; 2],
}

/// Per-face UV in the format's face order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceUvs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north: Option<FaceUv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south: Option<FaceUv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub east: Option<FaceUv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub west: Option<FaceUv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<FaceUv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<FaceUv>,
}

impl FaceUvs {
    pub fn get(&self, face: Face) -> Option<&FaceUv> {
        match face {
            Face::North => self.north.as_ref(),
            Face::South => self.south.as_ref(),
            Face::East => self.east.as_ref(),
            Face::West => self.west.as_ref(),
            Face::Up => self.up.as_ref(),
            Face::Down => self.down.as_ref(),
        }
    }

    pub fn set(&mut self, face: Face, uv: FaceUv) {
        let slot = match face {
            Face::North => &mut self.north,
            Face::South => &mut self.south,
            Face::East => &mut self.east,
            Face::West => &mut self.west,
            Face::Up => &mut self.up,
            Face::Down => &mut self.down,
        };
        *slot = Some(uv);
    }
}

/// Plain offset, or offset plus rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocatorEntry {
    Offset([Num; 3]),
    Rotated { offset: [Num; 3], rotation: [Num; 3] },
}

impl LocatorEntry {
    pub fn offset(&self) -> [Num; 3] {
        match self {
            LocatorEntry::Offset(offset) => *offset,
            LocatorEntry::Rotated { offset, .. } => *offset,
        }
    }
}
