//! Channel map -> animation document

use cubekit_anim::{BoneChannels, ChannelKind, ChannelMap, Keyframe, PropertyChannel, PropertyKind};
use cubekit_core::{round_to, Diagnosed, Error, IdentifierKind, PropertyValue, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::document::{
    AnimationDocument, AnimationEntry, BoneAnimation, EffectEntry, LoopValue, TimeChannel,
};
use crate::format::{format_time, num3, parse_time, NUMBER_DECIMALS, TIME_DECIMALS};

/// How the engine plays the animation past its end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Play once
    #[default]
    None,
    /// Restart after `animation_length`
    Loop,
    /// Stay on the last frame
    HoldOnLastFrame,
}

/// Naming and timing of one serialized animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationOptions {
    /// Short name, written as `animation.<model>.<name>`
    pub name: String,
    pub model: String,
    pub loop_mode: LoopMode,
    /// Frames per second
    pub frame_rate: f64,
    /// Frame written as time 0
    pub time_origin: i32,
    pub anim_time_update: Option<String>,
    pub override_previous_animation: bool,
}

impl AnimationOptions {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            loop_mode: LoopMode::None,
            frame_rate: 20.0,
            time_origin: 0,
            anim_time_update: None,
            override_previous_animation: false,
        }
    }

    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_time_origin(mut self, frame: i32) -> Self {
        self.time_origin = frame;
        self
    }

    /// `animation.<model>.<name>`, keeping an already qualified name
    pub fn identifier(&self) -> String {
        if self.name.starts_with("animation.") {
            self.name.clone()
        } else {
            format!("animation.{}.{}", self.model, self.name)
        }
    }

    /// Seconds of `frame`, rounded to the written precision. Frames before
    /// the origin are rejected by [`serialize_entry`].
    pub fn time_of(&self, frame: i32) -> f64 {
        round_to((frame - self.time_origin) as f64 / self.frame_rate, TIME_DECIMALS)
    }

    fn check(&self, first_frame: i32) -> Result<()> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(Error::invalid_config(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.time_origin > first_frame {
            return Err(Error::invalid_config(format!(
                "time origin {} is after the first frame {} of {}",
                self.time_origin,
                first_frame,
                self.identifier()
            )));
        }
        Ok(())
    }
}

/// Molang-safe variable stem of a bone name
fn variable_name(bone: &str) -> String {
    bone.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn molang_literal(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Text(text) => format!("'{}'", text.replace('\'', "")),
        other => {
            let n = round_to(other.as_number().unwrap_or(0.0), NUMBER_DECIMALS);
            if n.fract() == 0.0 {
                format!("{}", n as i64)
            } else {
                format!("{}", n)
            }
        }
    }
}

/// Keys written as sampled. Rotation deltas keep their unwrapped angles so
/// the engine interpolates the short way between them.
fn time_channel(keys: &[Keyframe], options: &AnimationOptions) -> Option<TimeChannel> {
    if keys.is_empty() {
        return None;
    }
    Some(
        keys.iter()
            .map(|key| (format_time(options.time_of(key.frame)), num3(key.value)))
            .collect(),
    )
}

fn write_property(
    entry: &mut AnimationEntry,
    bone: &str,
    channel: &PropertyChannel,
    options: &AnimationOptions,
) {
    for key in &channel.keys {
        let time = format_time(options.time_of(key.frame));
        match &channel.property {
            PropertyKind::Sound => {
                if let Some(effect) = key.value.as_text() {
                    entry
                        .sound_effects
                        .entry(time)
                        .or_default()
                        .push(EffectEntry {
                            effect: effect.to_string(),
                            locator: None,
                        });
                }
            }
            PropertyKind::Particle { locator } => {
                if let Some(effect) = key.value.as_text() {
                    entry
                        .particle_effects
                        .entry(time)
                        .or_default()
                        .push(EffectEntry {
                            effect: effect.to_string(),
                            locator: locator.clone(),
                        });
                }
            }
            PropertyKind::Instruction => {
                if let Some(text) = key.value.as_text() {
                    let text = text.trim();
                    let line = if text.ends_with(';') {
                        text.to_string()
                    } else {
                        format!("{};", text)
                    };
                    entry.timeline.entry(time).or_default().push(line);
                }
            }
            PropertyKind::Visibility => {
                let visible = !matches!(key.value, PropertyValue::Bool(false))
                    && key.value.as_number() != Some(0.0);
                entry.timeline.entry(time).or_default().push(format!(
                    "v.{}_visible = {};",
                    variable_name(bone),
                    u8::from(visible)
                ));
            }
            PropertyKind::Other(name) => {
                entry.timeline.entry(time).or_default().push(format!(
                    "v.{}_{} = {};",
                    variable_name(bone),
                    variable_name(name),
                    molang_literal(&key.value)
                ));
            }
        }
    }
}

fn bone_animation(channels: &BoneChannels, options: &AnimationOptions) -> BoneAnimation {
    BoneAnimation {
        position: time_channel(&channels.position, options),
        rotation: time_channel(&channels.rotation, options),
        scale: time_channel(&channels.scale, options),
    }
}

/// Build the document entry of one animation.
///
/// An animation without keys still yields a valid (empty) entry, reported
/// with an [`Error::NoAnimatedChannels`] warning. Fails with
/// [`Error::InvalidConfig`] when the time origin lies after the first
/// sampled frame, since times are never negative.
pub fn serialize_entry(
    channels: &ChannelMap,
    options: &AnimationOptions,
) -> Result<Diagnosed<AnimationEntry>> {
    options.check(channels.frame_start)?;

    let mut entry = AnimationEntry {
        anim_time_update: options.anim_time_update.clone(),
        override_previous_animation: options.override_previous_animation.then_some(true),
        ..AnimationEntry::default()
    };

    for bone in &channels.bones {
        let animation = bone_animation(bone, options);
        if !animation.is_empty() {
            entry.bones.insert(bone.bone.clone(), animation);
        }
        for property in &bone.properties {
            write_property(&mut entry, &bone.bone, property, options);
        }
    }
    let last_time = channels.last_key_frame().map(|frame| options.time_of(frame));

    match options.loop_mode {
        LoopMode::None => {}
        LoopMode::Loop => {
            entry.loop_mode = Some(LoopValue::Flag(true));
            entry.animation_length = last_time;
        }
        LoopMode::HoldOnLastFrame => {
            entry.loop_mode = Some(LoopValue::Mode("hold_on_last_frame".to_string()));
        }
    }

    let mut result = Diagnosed::clean(entry);
    if channels.is_empty() {
        warn!(animation = %options.identifier(), "Animation has no animated channels");
        result.warn(Error::NoAnimatedChannels {
            animation: options.identifier(),
        });
    }
    Ok(result)
}

/// Serialize a single animation into its own document
pub fn serialize(
    channels: &ChannelMap,
    options: &AnimationOptions,
) -> Result<Diagnosed<AnimationDocument>> {
    let entry = serialize_entry(channels, options)?;
    Ok(entry.map(|entry| {
        let mut document = AnimationDocument::new();
        document.animations.insert(options.identifier(), entry);
        document
    }))
}

/// Several animations written into one document
#[derive(Debug)]
pub struct AnimationBatch {
    pub document: AnimationDocument,
    pub warnings: Vec<Error>,
    /// Animations left out, with the reason
    pub skipped: Vec<(String, Error)>,
}

/// Serialize sampled animations into one document.
///
/// An animation whose sampling failed with [`Error::EmptyRange`] is left out
/// and reported in [`AnimationBatch::skipped`]; any other failure aborts.
pub fn serialize_batch<I>(items: I) -> Result<AnimationBatch>
where
    I: IntoIterator<Item = (AnimationOptions, Result<ChannelMap>)>,
{
    let mut batch = AnimationBatch {
        document: AnimationDocument::new(),
        warnings: Vec::new(),
        skipped: Vec::new(),
    };

    for (options, sampled) in items {
        let identifier = options.identifier();
        if batch.document.animations.get(&identifier).is_some() {
            return Err(Error::DuplicateIdentifier {
                kind: IdentifierKind::Animation,
                name: identifier,
            });
        }

        let channels = match sampled {
            Ok(channels) => channels,
            Err(err) if matches!(err.root(), Error::EmptyRange { .. }) => {
                warn!(animation = %identifier, error = %err, "Skipping animation");
                batch.skipped.push((identifier, err));
                continue;
            }
            Err(err) => return Err(err.with_context(format!("animation {}", identifier))),
        };

        let entry = serialize_entry(&channels, &options)?.drain_into(&mut batch.warnings);
        batch.document.animations.insert(identifier, entry);
    }

    info!(
        animations = batch.document.animations.len(),
        skipped = batch.skipped.len(),
        warnings = batch.warnings.len(),
        "Animation batch serialized"
    );
    Ok(batch)
}

impl AnimationEntry {
    /// Key times of one bone channel, in seconds
    pub fn channel_times(&self, bone: &str, kind: ChannelKind) -> Vec<f64> {
        let Some(animation) = self.bones.get(bone) else {
            return Vec::new();
        };
        let channel = match kind {
            ChannelKind::Position => animation.position.as_ref(),
            ChannelKind::Rotation => animation.rotation.as_ref(),
            ChannelKind::Scale => animation.scale.as_ref(),
        };
        channel
            .map(|c| c.keys().filter_map(|key| parse_time(key)).collect())
            .unwrap_or_default()
    }
}
