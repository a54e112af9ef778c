//! Export configuration
//!
//! Loaded from YAML or JSON (chosen by file extension). Every field has a
//! default, so a settings file only needs the values it changes:
//!
//! ```yaml
//! model: zombie
//! texture_width: 64
//! texture_height: 0      # automatic
//! frame_rate: 24
//! animations:
//!   - name: walk
//!     start: 0
//!     end: 40
//!     loop: loop
//! ```

use cubekit_anim::{ChannelKind, SampleMode, SampleRequest, Tolerances};
use cubekit_core::{Error, Result};
use cubekit_geometry::UvOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::animation::{AnimationOptions, LoopMode};

/// Settings of one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Model name, used in the geometry and animation identifiers
    pub model: String,
    pub texture_width: u32,
    /// `None` or 0 packs without a height limit
    pub texture_height: Option<u32>,
    pub uv: UvOptions,
    /// Frames per second of the scene timeline
    pub frame_rate: f64,
    /// Frame written as time 0
    pub time_origin: i32,
    pub tolerances: Tolerances,
    /// Indent written documents
    pub pretty: bool,
    /// Also render the UV template image
    pub template: bool,
    pub animations: Vec<AnimationSettings>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            model: "model".to_string(),
            texture_width: 64,
            texture_height: Some(64),
            uv: UvOptions::default(),
            frame_rate: 20.0,
            time_origin: 0,
            tolerances: Tolerances::default(),
            pretty: true,
            template: false,
            animations: Vec::new(),
        }
    }
}

/// Channel exported even when it stays at rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredChannel {
    pub bone: String,
    pub channel: ChannelKind,
}

/// One animation to sample from the scene timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub name: String,
    pub start: i32,
    pub end: i32,
    pub step: u32,
    #[serde(rename = "loop")]
    pub loop_mode: LoopMode,
    /// Overrides the run's time origin for this animation
    pub time_origin: Option<i32>,
    pub anim_time_update: Option<String>,
    pub override_previous_animation: bool,
    pub mode: SampleMode,
    pub required: Vec<RequiredChannel>,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            name: "animation".to_string(),
            start: 0,
            end: 0,
            step: 1,
            loop_mode: LoopMode::None,
            time_origin: None,
            anim_time_update: None,
            override_previous_animation: false,
            mode: SampleMode::EveryFrame,
            required: Vec::new(),
        }
    }
}

impl AnimationSettings {
    pub fn new(name: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            ..Self::default()
        }
    }

    /// Sampling request under the run's tolerances
    pub fn request(&self, settings: &ExportSettings) -> SampleRequest {
        self.required.iter().fold(
            SampleRequest::new(self.start, self.end)
                .with_step(self.step)
                .with_mode(self.mode)
                .with_tolerances(settings.tolerances),
            |request, channel| request.require(channel.bone.clone(), channel.channel),
        )
    }

    /// Serializer options under the run's model name and timing
    pub fn options(&self, settings: &ExportSettings) -> AnimationOptions {
        AnimationOptions {
            name: self.name.clone(),
            model: settings.model.clone(),
            loop_mode: self.loop_mode,
            frame_rate: settings.frame_rate,
            time_origin: self.time_origin.unwrap_or(settings.time_origin),
            anim_time_update: self.anim_time_update.clone(),
            override_previous_animation: self.override_previous_animation,
        }
    }
}

impl ExportSettings {
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

        let settings = match ext.as_str() {
            "json" => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
        .map_err(|e| e.with_context(format!("settings {}", path.display())))?;

        debug!(
            path = %path.display(),
            model = %settings.model,
            animations = settings.animations.len(),
            "Loaded export settings"
        );
        Ok(settings)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(text)
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(text).map_err(|e| Error::invalid_config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Height limit for packing; `None` when automatic
    pub fn texture_height(&self) -> Option<u32> {
        self.texture_height.filter(|h| *h > 0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::invalid_config("model name is empty"));
        }
        if self.texture_width == 0 {
            return Err(Error::invalid_config("texture_width must be positive"));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(Error::invalid_config(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        let mut names = HashSet::new();
        for animation in &self.animations {
            if !names.insert(animation.name.as_str()) {
                return Err(Error::invalid_config(format!(
                    "animation {} is listed twice",
                    animation.name
                )));
            }
            if animation.start < 0 {
                return Err(Error::invalid_config(format!(
                    "animation {} starts at negative frame {}",
                    animation.name, animation.start
                )));
            }
            let origin = animation.time_origin.unwrap_or(self.time_origin);
            if origin > animation.start {
                return Err(Error::invalid_config(format!(
                    "animation {} starts at frame {} before its time origin {}",
                    animation.name, animation.start, origin
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExportSettings::from_yaml_str("{}").unwrap();
        assert_eq!(settings, ExportSettings::default());
        assert_eq!(settings.texture_height(), Some(64));
    }

    #[test]
    fn test_yaml_settings() {
        let text = r#"
model: zombie
texture_height: 0
frame_rate: 24
uv:
  keep_existing: true
animations:
  - name: walk
    end: 40
    step: 2
    loop: hold_on_last_frame
    required:
      - bone: head
        channel: rotation
"#;
        let settings = ExportSettings::from_yaml_str(text).unwrap();
        assert_eq!(settings.texture_height(), None);
        assert!(settings.uv.keep_existing);

        let walk = &settings.animations[0];
        assert_eq!(walk.loop_mode, LoopMode::HoldOnLastFrame);
        let request = walk.request(&settings);
        assert_eq!(request.frame_step, 2);
        assert!(request.is_required("head", ChannelKind::Rotation));

        let options = walk.options(&settings);
        assert_eq!(options.identifier(), "animation.zombie.walk");
        assert_eq!(options.frame_rate, 24.0);
        assert_eq!(options.time_origin, 0);

        let mut shifted = walk.clone();
        shifted.time_origin = Some(12);
        assert_eq!(shifted.options(&settings).time_origin, 12);
    }

    #[test]
    fn test_json_settings() {
        let settings =
            ExportSettings::from_json_str(r#"{"model": "cow", "pretty": false}"#).unwrap();
        assert_eq!(settings.model, "cow");
        assert!(!settings.pretty);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            ExportSettings::from_yaml_str("frame_rate: 0").unwrap_err(),
            Error::InvalidConfig { .. }
        ));
        assert!(ExportSettings::from_yaml_str("texture_width: 0").is_err());
        assert!(ExportSettings::from_yaml_str("animations: [{name: a}, {name: a}]").is_err());
        assert!(ExportSettings::from_yaml_str("frame_rate: [1]").is_err());
    }

    #[test]
    fn test_negative_times_are_rejected() {
        let negative = ExportSettings::from_yaml_str("animations: [{name: a, start: -10, end: 0}]");
        assert!(matches!(negative.unwrap_err(), Error::InvalidConfig { .. }));

        let late_origin =
            ExportSettings::from_yaml_str("time_origin: 5\nanimations: [{name: a, start: 0, end: 10}]");
        assert!(matches!(late_origin.unwrap_err(), Error::InvalidConfig { .. }));

        let shifted = ExportSettings::from_yaml_str(
            "time_origin: 5\nanimations: [{name: a, start: 0, end: 10, time_origin: 0}]",
        );
        assert!(shifted.is_ok());
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{"model": "pig"}"#).unwrap();
        assert_eq!(ExportSettings::from_path(&path).unwrap().model, "pig");

        let missing = ExportSettings::from_path(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, Error::FileNotFound(_)));
    }
}
