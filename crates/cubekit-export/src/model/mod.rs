//! Model serializer and loader
//!
//! - [`serializer`]: bone tree + UV assignment -> [`ModelDocument`]
//! - [`loader`]: model JSON (current or legacy layout) -> [`ModelDocument`]

pub mod document;
pub mod loader;
pub mod serializer;

pub use document::{
    BoneEntry, CubeEntry, CubeUvEntry, FaceUv, FaceUvs, Geometry, GeometryDescription,
    LocatorEntry, ModelDocument, MODEL_FORMAT_VERSION,
};
pub use loader::{pick_version_parser, validate_document, ModelLoader, SUPPORTED_MODEL_VERSIONS};
pub use serializer::{serialize, validate, ModelMetadata, VisibleBounds};
