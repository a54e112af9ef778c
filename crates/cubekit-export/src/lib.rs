//! cubekit-export
//!
//! Document output for the block-model pipeline.
//!
//! ## Modules
//!
//! - [`model`]: bone tree + UV assignment -> `1.12.0` geometry document, and
//!   a loader for reading model documents back
//! - [`animation`]: sampled channels -> `1.8.0` animation document
//! - [`textures`]: UV template images
//! - [`writer`]: atomic JSON output
//! - [`settings`]: export configuration (YAML / JSON)
//! - [`pipeline`]: the staged export run tying everything together
//!
//! ## Example
//!
//! ```rust,ignore
//! use cubekit_export::{ExportRun, ExportSettings};
//! use cubekit_geometry::SceneDescription;
//!
//! let scene = SceneDescription::from_path("zombie.yaml")?;
//! let settings = ExportSettings::from_path("export.yaml")?;
//! let report = ExportRun::new(&scene, &settings).run("out")?;
//! ```

pub mod animation;
pub mod format;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod textures;
pub mod writer;

pub use animation::{AnimationDocument, AnimationOptions, LoopMode};
pub use model::{ModelDocument, ModelLoader, ModelMetadata};
pub use pipeline::{CancelToken, ExportArtifacts, ExportReport, ExportRun, OutputPaths};
pub use settings::{AnimationSettings, ExportSettings, RequiredChannel};
pub use textures::{render_template, save_png, TemplateRenderer, TextureError};
pub use writer::{write_atomic, DocumentWriter};
