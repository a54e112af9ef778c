//! Model document loading
//!
//! Parses written (or third-party) model files back into [`ModelDocument`].
//! Two layouts are understood: the current `1.12.0` one and the legacy
//! `1.8.0` one, where every geometry is a top-level `geometry.*` object with
//! `texturewidth` / `textureheight` keys.

use cubekit_core::{Error, IdentifierKind, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use super::document::{BoneEntry, Geometry, GeometryDescription, ModelDocument};
use crate::format::Num;

/// Format versions with a dedicated parser, newest first
pub const SUPPORTED_MODEL_VERSIONS: [&str; 2] = ["1.12.0", "1.8.0"];

fn version_tuple(version: &str) -> Option<Vec<u32>> {
    version
        .split('.')
        .map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

/// Newest supported version that is not newer than `version`
pub fn pick_version_parser<'a>(supported: &[&'a str], version: &str) -> Option<&'a str> {
    let target = version_tuple(version)?;
    supported
        .iter()
        .filter_map(|s| version_tuple(s).map(|t| (t, *s)))
        .filter(|(t, _)| *t <= target)
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, s)| s)
}

/// Legacy geometry object
#[derive(Debug, Deserialize)]
struct LegacyGeometry {
    #[serde(default = "default_texture_size")]
    texturewidth: u32,
    #[serde(default = "default_texture_size")]
    textureheight: u32,
    #[serde(default = "default_bounds_size")]
    visible_bounds_width: Num,
    #[serde(default = "default_bounds_size")]
    visible_bounds_height: Num,
    #[serde(default)]
    visible_bounds_offset: [Num; 3],
    #[serde(default)]
    bones: Vec<BoneEntry>,
}

fn default_texture_size() -> u32 {
    64
}

fn default_bounds_size() -> Num {
    Num(1.0)
}

/// Reads model documents from disk or memory
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Label used in error messages (usually the file path)
    source: String,
}

impl ModelLoader {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Load and parse a model file
    pub fn from_path(path: impl AsRef<Path>) -> Result<ModelDocument> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        ModelLoader::new(path.display().to_string()).parse_str(&text)
    }

    pub fn parse_str(&self, text: &str) -> Result<ModelDocument> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::invalid_document(&self.source, e.to_string()))?;
        self.parse_value(value)
    }

    pub fn parse_value(&self, value: Value) -> Result<ModelDocument> {
        let version = value
            .get("format_version")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_document(&self.source, "missing format_version"))?
            .to_string();

        let parser = pick_version_parser(&SUPPORTED_MODEL_VERSIONS, &version).ok_or_else(|| {
            Error::UnsupportedVersion {
                version: version.clone(),
                supported: SUPPORTED_MODEL_VERSIONS.join(", "),
            }
        })?;
        debug!(source = %self.source, version = %version, parser, "Parsing model document");

        let mut document = match parser {
            "1.12.0" => self.parse_current(value)?,
            _ => self.parse_legacy(value)?,
        };
        document.format_version = version;
        Ok(document)
    }

    fn parse_current(&self, value: Value) -> Result<ModelDocument> {
        serde_json::from_value(value).map_err(|e| Error::invalid_document(&self.source, e.to_string()))
    }

    fn parse_legacy(&self, value: Value) -> Result<ModelDocument> {
        let Value::Object(entries) = value else {
            return Err(Error::invalid_document(&self.source, "document is not an object"));
        };

        let mut geometry = Vec::new();
        for (key, entry) in entries {
            if key == "format_version" || key == "debug" {
                continue;
            }
            // "geometry.child:geometry.parent" inherits; only the name is kept
            let identifier = key.split(':').next().unwrap_or(&key).to_string();
            let legacy: LegacyGeometry = serde_json::from_value(entry)
                .map_err(|e| Error::invalid_document(format!("{}/{}", self.source, key), e.to_string()))?;

            geometry.push(Geometry {
                description: GeometryDescription {
                    identifier,
                    texture_width: legacy.texturewidth,
                    texture_height: legacy.textureheight,
                    visible_bounds_width: legacy.visible_bounds_width,
                    visible_bounds_height: legacy.visible_bounds_height,
                    visible_bounds_offset: legacy.visible_bounds_offset,
                },
                bones: legacy.bones,
            });
        }

        if geometry.is_empty() {
            return Err(Error::invalid_document(&self.source, "no geometry found"));
        }
        Ok(ModelDocument {
            format_version: String::new(),
            geometry,
        })
    }
}

/// Check a loaded document for repeated bone names and missing parents
pub fn validate_document(document: &ModelDocument) -> Result<()> {
    let mut errors = Vec::new();

    for geometry in &document.geometry {
        let mut names = HashSet::new();
        for bone in &geometry.bones {
            if !names.insert(bone.name.as_str()) {
                errors.push(Error::DuplicateIdentifier {
                    kind: IdentifierKind::Bone,
                    name: bone.name.clone(),
                });
            }
        }
        for bone in &geometry.bones {
            if let Some(parent) = &bone.parent {
                if !names.contains(parent.as_str()) {
                    errors.push(Error::DanglingReference {
                        bone: bone.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::CubeUvEntry;

    #[test]
    fn test_pick_version_parser() {
        let supported = SUPPORTED_MODEL_VERSIONS;
        assert_eq!(pick_version_parser(&supported, "1.12.0"), Some("1.12.0"));
        assert_eq!(pick_version_parser(&supported, "1.16.0"), Some("1.12.0"));
        assert_eq!(pick_version_parser(&supported, "1.10.0"), Some("1.8.0"));
        assert_eq!(pick_version_parser(&supported, "1.8.0"), Some("1.8.0"));
        assert_eq!(pick_version_parser(&supported, "1.7.0"), None);
        assert_eq!(pick_version_parser(&supported, "one"), None);
    }

    #[test]
    fn test_parse_current_layout() {
        let text = r#"{
            "format_version": "1.12.0",
            "minecraft:geometry": [{
                "description": {"identifier": "geometry.cow", "texture_width": 64, "texture_height": 32},
                "bones": [{"name": "body", "pivot": [0, 19, 2],
                           "cubes": [{"origin": [-6, 11, -5], "size": [12, 18, 10], "uv": [28, 8]}]}]
            }]
        }"#;
        let doc = ModelLoader::new("cow.geo.json").parse_str(text).unwrap();
        let geo = doc.primary().unwrap();
        assert_eq!(geo.description.identifier, "geometry.cow");
        assert_eq!(geo.description.texture_height, 32);
        assert_eq!(geo.bones[0].cubes[0].uv, CubeUvEntry::Box([Num(28.0), Num(8.0)]));
    }

    #[test]
    fn test_parse_legacy_layout() {
        let text = r#"{
            "format_version": "1.8.0",
            "geometry.pig:geometry.base": {
                "texturewidth": 64,
                "textureheight": 32,
                "bones": [{"name": "head", "pivot": [0, 12, -6],
                           "cubes": [{"origin": [-4, 8, -14], "size": [8, 8, 8], "uv": [0, 0]}]}]
            }
        }"#;
        let doc = ModelLoader::new("pig.json").parse_str(text).unwrap();
        assert_eq!(doc.format_version, "1.8.0");
        let geo = doc.primary().unwrap();
        assert_eq!(geo.description.identifier, "geometry.pig");
        assert_eq!(geo.description.texture_width, 64);
        assert_eq!(geo.bones[0].name, "head");
    }

    #[test]
    fn test_unsupported_and_invalid() {
        let err = ModelLoader::new("old.json")
            .parse_str(r#"{"format_version": "1.2.0"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));

        let err = ModelLoader::new("broken.json").parse_str("{").unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));

        let err = ModelLoader::new("nover.json").parse_str("{}").unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_validate_document() {
        let text = r#"{
            "format_version": "1.12.0",
            "minecraft:geometry": [{
                "description": {"identifier": "geometry.x"},
                "bones": [{"name": "a", "parent": "missing"}, {"name": "b"}]
            }]
        }"#;
        let doc = ModelLoader::new("x").parse_str(text).unwrap();
        assert!(matches!(
            validate_document(&doc).unwrap_err(),
            Error::DanglingReference { .. }
        ));
    }
}
