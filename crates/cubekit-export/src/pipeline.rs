//! Export run
//!
//! One run is a linear pass over an immutable snapshot of the scene:
//!
//! 1. build the bone tree
//! 2. assign UVs
//! 3. sample every configured animation
//! 4. serialize the model and animation documents
//! 5. write the files atomically
//!
//! Cancellation is checked between stages only.

use cubekit_anim::{sample_animation, FrameEvaluator, RestPose};
use cubekit_core::logging::instrument_stage;
use cubekit_core::{Diagnosed, Error, Result};
use cubekit_geometry::{build, BoneTree, SceneSource, UvAssignment, UvMapper};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::animation::{serialize_batch, AnimationDocument};
use crate::model::{serialize, ModelDocument, ModelMetadata};
use crate::settings::ExportSettings;
use crate::textures::{render_template, save_png};
use crate::writer::DocumentWriter;

/// Shared flag that stops a run at the next stage boundary
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything an export produces, still in memory
#[derive(Debug)]
pub struct ExportArtifacts {
    pub tree: BoneTree,
    pub uv: UvAssignment,
    pub model: ModelDocument,
    /// `None` when no animation is configured
    pub animations: Option<AnimationDocument>,
    /// Animations dropped because their frame range was empty
    pub skipped: Vec<(String, Error)>,
    pub template: Option<RgbaImage>,
}

/// Output file names for a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub model: PathBuf,
    pub animations: PathBuf,
    pub template: PathBuf,
}

impl OutputPaths {
    /// `<model>.geo.json`, `<model>.animation.json` and `<model>.png` in `dir`
    pub fn in_dir(dir: impl AsRef<Path>, model: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(format!("{}.geo.json", model)),
            animations: dir.join(format!("{}.animation.json", model)),
            template: dir.join(format!("{}.png", model)),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Default)]
pub struct ExportReport {
    pub bones: usize,
    pub cubes: usize,
    pub animations: usize,
    pub skipped: Vec<(String, Error)>,
    pub warnings: Vec<Error>,
    pub written: Vec<PathBuf>,
}

/// One export of a scene under fixed settings
pub struct ExportRun<'a, S: ?Sized> {
    scene: &'a S,
    settings: &'a ExportSettings,
    cancel: CancelToken,
}

impl<'a, S> ExportRun<'a, S>
where
    S: SceneSource + FrameEvaluator + RestPose + Sync + ?Sized,
{
    pub fn new(scene: &'a S, settings: &'a ExportSettings) -> Self {
        Self {
            scene,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every stage up to serialization
    pub fn produce(&self) -> Result<Diagnosed<ExportArtifacts>> {
        self.settings.validate()?;
        let settings = self.settings;
        let mut warnings = Vec::new();

        self.cancel.check()?;
        let tree = instrument_stage("build", || build(self.scene))?;

        self.cancel.check()?;
        let uv = instrument_stage("uv", || {
            UvMapper::new(settings.texture_width, settings.texture_height())
                .with_options(settings.uv.clone())
                .assign(&tree)
        })
        .drain_into(&mut warnings);

        self.cancel.check()?;
        let sampled = instrument_stage("sample", || {
            settings
                .animations
                .iter()
                .map(|animation| {
                    let request = animation.request(settings);
                    (
                        animation.options(settings),
                        sample_animation(&tree, self.scene, self.scene, &request),
                    )
                })
                .collect::<Vec<_>>()
        });

        self.cancel.check()?;
        let (model, animations, skipped) = instrument_stage("serialize", || -> Result<_> {
            let model = serialize(&tree, &uv, &ModelMetadata::new(&settings.model))?;
            if sampled.is_empty() {
                return Ok((model, None, Vec::new()));
            }
            let batch = serialize_batch(sampled)?;
            warnings.extend(batch.warnings);
            Ok((model, Some(batch.document), batch.skipped))
        })?;

        let template = if settings.template {
            self.cancel.check()?;
            Some(instrument_stage("template", || render_template(&uv))?)
        } else {
            None
        };

        for warning in &warnings {
            warn!(%warning, "Export warning");
        }

        Ok(Diagnosed::with_warnings(
            ExportArtifacts {
                tree,
                uv,
                model,
                animations,
                skipped,
                template,
            },
            warnings,
        ))
    }

    /// Produce and write all outputs into `out_dir`
    pub fn run(&self, out_dir: impl AsRef<Path>) -> Result<ExportReport> {
        let Diagnosed { value: artifacts, warnings } = self.produce()?;
        let paths = OutputPaths::in_dir(out_dir, &self.settings.model);
        let writer = DocumentWriter::new().with_pretty(self.settings.pretty);

        self.cancel.check()?;
        let written = instrument_stage("write", || -> Result<Vec<PathBuf>> {
            let mut written = Vec::new();
            writer.write(&artifacts.model, &paths.model)?;
            written.push(paths.model.clone());
            if let Some(animations) = &artifacts.animations {
                writer.write(animations, &paths.animations)?;
                written.push(paths.animations.clone());
            }
            if let Some(template) = &artifacts.template {
                save_png(template, &paths.template)?;
                written.push(paths.template.clone());
            }
            Ok(written)
        })?;

        let report = ExportReport {
            bones: artifacts.tree.len(),
            cubes: artifacts.tree.cube_count(),
            animations: artifacts
                .animations
                .as_ref()
                .map_or(0, |doc| doc.animations.len()),
            skipped: artifacts.skipped,
            warnings,
            written,
        };
        info!(
            bones = report.bones,
            cubes = report.cubes,
            animations = report.animations,
            warnings = report.warnings.len(),
            files = report.written.len(),
            "Export complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AnimationSettings;
    use cubekit_geometry::SceneDescription;

    const SCENE: &str = r#"
bones:
  - name: body
    pivot: [0, 24, 0]
    cubes:
      - from: [-4, 12, -2]
        to: [4, 24, 2]
  - name: head
    parent: body
    pivot: [0, 24, 0]
    cubes:
      - from: [-4, 24, -4]
        to: [4, 32, 4]
animation:
  tracks:
    head:
      rotation:
        - { frame: 0, value: [0, 0, 0] }
        - { frame: 10, value: [0, 90, 0] }
"#;

    fn settings() -> ExportSettings {
        ExportSettings {
            model: "steve".into(),
            animations: vec![AnimationSettings::new("look", 0, 10)],
            ..ExportSettings::default()
        }
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(token.check().is_ok());
        shared.cancel();
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let scene = SceneDescription::from_yaml_str(SCENE).unwrap();
        let settings = settings();
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::new();
        token.cancel();

        let err = ExportRun::new(&scene, &settings)
            .with_cancel(token)
            .run(dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_produce() {
        let scene = SceneDescription::from_yaml_str(SCENE).unwrap();
        let settings = settings();
        let artifacts = ExportRun::new(&scene, &settings).produce().unwrap();

        assert!(artifacts.warnings.is_empty());
        let out = artifacts.value;
        assert_eq!(out.tree.len(), 2);
        assert_eq!(out.model.primary().unwrap().bones.len(), 2);
        let animations = out.animations.unwrap();
        assert!(animations.animations.get("animation.steve.look").is_some());
        assert!(out.template.is_none());
    }

    #[test]
    fn test_output_paths() {
        let paths = OutputPaths::in_dir("out", "cow");
        assert_eq!(paths.model, PathBuf::from("out/cow.geo.json"));
        assert_eq!(paths.animations, PathBuf::from("out/cow.animation.json"));
        assert_eq!(paths.template, PathBuf::from("out/cow.png"));
    }
}
