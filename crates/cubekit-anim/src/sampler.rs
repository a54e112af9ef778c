//! Channel sampling and keyframe reduction
//!
//! Every bone is evaluated once per sampled frame. Transform channels are
//! stored relative to the rest pose (offset, angle delta, scale ratio),
//! then reduced: a sample is dropped when linear interpolation between the
//! surrounding kept keys reproduces it within tolerance.

use cubekit_core::{Error, Result, Transform, Vec3};
use cubekit_geometry::BoneTree;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use crate::events::{sample_property, PropertyChannel};
use crate::rotation;
use crate::source::{FrameEvaluator, RestPose};

/// Transform channel of a bone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Position,
    Rotation,
    Scale,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Position, ChannelKind::Rotation, ChannelKind::Scale];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Position => "position",
            ChannelKind::Rotation => "rotation",
            ChannelKind::Scale => "scale",
        }
    }

    /// Delta meaning "no change from rest"
    pub fn identity(&self) -> Vec3 {
        match self {
            ChannelKind::Scale => Vec3::ONE,
            _ => Vec3::ZERO,
        }
    }

    fn delta(&self, pose: &Transform, rest: &Transform) -> Vec3 {
        match self {
            ChannelKind::Position => pose.location - rest.location,
            ChannelKind::Rotation => pose.rotation - rest.rotation,
            ChannelKind::Scale => {
                let ratio = |v: f64, r: f64| if r == 0.0 { v } else { v / r };
                Vec3::new(
                    ratio(pose.scale.x, rest.scale.x),
                    ratio(pose.scale.y, rest.scale.y),
                    ratio(pose.scale.z, rest.scale.z),
                )
            }
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value at an integer frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T = Vec3> {
    pub frame: i32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(frame: i32, value: T) -> Self {
        Self { frame, value }
    }
}

/// Maximum per-component error allowed when dropping samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub position: f64,
    /// Degrees
    pub rotation: f64,
    pub scale: f64,
}

impl Tolerances {
    pub fn for_kind(&self, kind: ChannelKind) -> f64 {
        match kind {
            ChannelKind::Position => self.position,
            ChannelKind::Rotation => self.rotation,
            ChannelKind::Scale => self.scale,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            position: 1e-4,
            rotation: 0.01,
            scale: 1e-4,
        }
    }
}

/// Which frames are evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Every `frame_step`-th frame of the range
    #[default]
    EveryFrame,
    /// Only frames where the scene has authored keys
    SceneKeyframes,
}

/// Frame range and sampling options of one animation
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub frame_start: i32,
    pub frame_end: i32,
    pub frame_step: u32,
    pub mode: SampleMode,
    pub tolerances: Tolerances,
    /// Channels written even when they never leave the rest pose
    pub required: BTreeSet<(String, ChannelKind)>,
}

impl SampleRequest {
    pub fn new(frame_start: i32, frame_end: i32) -> Self {
        Self {
            frame_start,
            frame_end,
            frame_step: 1,
            mode: SampleMode::EveryFrame,
            tolerances: Tolerances::default(),
            required: BTreeSet::new(),
        }
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.frame_step = step;
        self
    }

    pub fn with_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn require(mut self, bone: impl Into<String>, kind: ChannelKind) -> Self {
        self.required.insert((bone.into(), kind));
        self
    }

    pub fn is_required(&self, bone: &str, kind: ChannelKind) -> bool {
        self.required.contains(&(bone.to_string(), kind))
    }

    /// Fail with [`Error::InvalidConfig`] for a negative start frame and
    /// with [`Error::EmptyRange`] for an inverted range or a zero step
    pub fn validate(&self) -> Result<()> {
        if self.frame_start < 0 {
            return Err(Error::invalid_config(format!(
                "frame range must start at frame 0 or later, got {}",
                self.frame_start
            )));
        }
        if self.frame_end < self.frame_start || self.frame_step == 0 {
            return Err(Error::EmptyRange {
                start: self.frame_start,
                end: self.frame_end,
                step: self.frame_step,
            });
        }
        Ok(())
    }

    /// Frames to evaluate for `bone`, increasing, always including both ends
    pub fn frames<E>(&self, evaluator: &E, bone: &str) -> Result<Vec<i32>>
    where
        E: FrameEvaluator + ?Sized,
    {
        self.validate()?;

        let mut frames: Vec<i32> = match self.mode {
            SampleMode::EveryFrame => (self.frame_start..=self.frame_end)
                .step_by(self.frame_step as usize)
                .collect(),
            SampleMode::SceneKeyframes => {
                let mut keyed: Vec<i32> = evaluator
                    .keyed_frames(bone)
                    .into_iter()
                    .filter(|f| f.is_finite())
                    .map(|f| f.ceil() as i32)
                    .filter(|f| *f > self.frame_start && *f < self.frame_end)
                    .collect();
                keyed.push(self.frame_start);
                keyed
            }
        };
        frames.push(self.frame_end);
        frames.sort_unstable();
        frames.dedup();
        Ok(frames)
    }

    /// Every frame of the range, used for discrete properties
    fn all_frames(&self) -> impl Iterator<Item = i32> {
        self.frame_start..=self.frame_end
    }
}

/// All channels of one bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneChannels {
    pub bone: String,
    pub position: Vec<Keyframe>,
    pub rotation: Vec<Keyframe>,
    pub scale: Vec<Keyframe>,
    pub properties: Vec<PropertyChannel>,
}

impl BoneChannels {
    pub fn new(bone: impl Into<String>) -> Self {
        Self {
            bone: bone.into(),
            position: Vec::new(),
            rotation: Vec::new(),
            scale: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn channel(&self, kind: ChannelKind) -> &[Keyframe] {
        match kind {
            ChannelKind::Position => &self.position,
            ChannelKind::Rotation => &self.rotation,
            ChannelKind::Scale => &self.scale,
        }
    }

    fn channel_mut(&mut self, kind: ChannelKind) -> &mut Vec<Keyframe> {
        match kind {
            ChannelKind::Position => &mut self.position,
            ChannelKind::Rotation => &mut self.rotation,
            ChannelKind::Scale => &mut self.scale,
        }
    }

    /// No transform keys and no property keys
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
            && self.rotation.is_empty()
            && self.scale.is_empty()
            && self.properties.iter().all(PropertyChannel::is_empty)
    }

    pub fn key_count(&self) -> usize {
        self.position.len()
            + self.rotation.len()
            + self.scale.len()
            + self.properties.iter().map(|p| p.keys.len()).sum::<usize>()
    }
}

/// Sampled channels of every bone, in tree order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub frame_start: i32,
    pub frame_end: i32,
    pub bones: Vec<BoneChannels>,
}

impl ChannelMap {
    pub fn new(frame_start: i32, frame_end: i32) -> Self {
        Self {
            frame_start,
            frame_end,
            bones: Vec::new(),
        }
    }

    pub fn get(&self, bone: &str) -> Option<&BoneChannels> {
        self.bones.iter().find(|b| b.bone == bone)
    }

    /// Bones with at least one key
    pub fn animated_bones(&self) -> impl Iterator<Item = &BoneChannels> {
        self.bones.iter().filter(|b| !b.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.bones.iter().all(BoneChannels::is_empty)
    }

    /// Last frame holding a key of any channel
    pub fn last_key_frame(&self) -> Option<i32> {
        self.bones
            .iter()
            .flat_map(|b| {
                ChannelKind::ALL
                    .iter()
                    .flat_map(move |k| b.channel(*k).last().map(|key| key.frame))
                    .chain(b.properties.iter().filter_map(|p| p.keys.last().map(|k| k.frame)))
            })
            .max()
    }
}

/// Drop samples that linear interpolation between kept keys reproduces.
///
/// A sample `i` is dropped when every sample since the last kept key `k`
/// lies within `tolerance` of the line from `k` to `i + 1`. First and last
/// samples are always kept.
///
/// Each sample since `k` bounds the slope a line from `k` may take, so the
/// check narrows one slope window per component instead of revisiting the
/// samples. Linear interpolation never needs the frame after a constant run:
/// the last frame of the run is kept instead, which reproduces the same step.
pub fn reduce(samples: &[Keyframe], tolerance: f64) -> Vec<Keyframe> {
    if samples.len() <= 2 {
        return samples.to_vec();
    }

    let mut kept = vec![samples[0]];
    let mut anchor = samples[0];
    let mut window = SlopeWindow::OPEN;

    for i in 1..samples.len() - 1 {
        window.narrow(anchor, samples[i], tolerance);

        let end = samples[i + 1];
        let slope = (end.value - anchor.value) * (1.0 / (end.frame - anchor.frame) as f64);
        if !window.admits(slope) {
            kept.push(samples[i]);
            anchor = samples[i];
            window = SlopeWindow::OPEN;
        }
    }

    kept.push(samples[samples.len() - 1]);
    kept
}

/// Per-component slopes a line from the anchor may take
#[derive(Debug, Clone, Copy)]
struct SlopeWindow {
    low: Vec3,
    high: Vec3,
}

impl SlopeWindow {
    const OPEN: SlopeWindow = SlopeWindow {
        low: Vec3::splat(f64::NEG_INFINITY),
        high: Vec3::splat(f64::INFINITY),
    };

    fn narrow(&mut self, anchor: Keyframe, sample: Keyframe, tolerance: f64) {
        let dt = (sample.frame - anchor.frame) as f64;
        let offset = sample.value - anchor.value;
        let bound = |v: f64, t: f64| (v + t) / dt;
        self.low = self.low.max(offset.map(|v| bound(v, -tolerance)));
        self.high = self.high.min(offset.map(|v| bound(v, tolerance)));
    }

    fn admits(&self, slope: Vec3) -> bool {
        let eps = 1e-12;
        slope.x >= self.low.x - eps
            && slope.x <= self.high.x + eps
            && slope.y >= self.low.y - eps
            && slope.y <= self.high.y + eps
            && slope.z >= self.low.z - eps
            && slope.z <= self.high.z + eps
    }
}

fn evaluate<E>(evaluator: &E, bone: &str, frames: &[i32]) -> Vec<Transform>
where
    E: FrameEvaluator + ?Sized,
{
    frames
        .iter()
        .map(|f| evaluator.transform(bone, *f as f64))
        .collect()
}

fn build_channel(
    kind: ChannelKind,
    bone: &str,
    frames: &[i32],
    poses: &[Transform],
    rest: &Transform,
    request: &SampleRequest,
) -> Vec<Keyframe> {
    let mut values: Vec<Vec3> = poses.iter().map(|p| kind.delta(p, rest)).collect();
    if kind == ChannelKind::Rotation {
        rotation::unwrap_sequence(&mut values);
    }

    let tolerance = request.tolerances.for_kind(kind);
    let identity = kind.identity();

    if values.iter().all(|v| v.max_abs_diff(&identity) <= tolerance) {
        if !request.is_required(bone, kind) {
            return Vec::new();
        }
        let mut keys = Vec::with_capacity(2);
        if let Some(first) = frames.first() {
            keys.push(Keyframe::new(*first, identity));
        }
        if let Some(last) = frames.last().filter(|l| Some(*l) != frames.first()) {
            keys.push(Keyframe::new(*last, identity));
        }
        return keys;
    }

    let samples: Vec<Keyframe> = frames
        .iter()
        .zip(values)
        .map(|(f, v)| Keyframe::new(*f, v))
        .collect();
    reduce(&samples, tolerance)
}

/// Sample one transform channel of `bone`.
///
/// Fails with [`Error::EmptyRange`] when the range is inverted or the step
/// is zero.
pub fn sample<E, R>(
    evaluator: &E,
    rest: &R,
    bone: &str,
    kind: ChannelKind,
    request: &SampleRequest,
) -> Result<Vec<Keyframe>>
where
    E: FrameEvaluator + ?Sized,
    R: RestPose + ?Sized,
{
    let frames = request.frames(evaluator, bone)?;
    let poses = evaluate(evaluator, bone, &frames);
    let rest = rest.rest_transform(bone);
    Ok(build_channel(kind, bone, &frames, &poses, &rest, request))
}

/// Sample every transform channel and custom property of `bone`
pub fn sample_bone<E, R>(
    evaluator: &E,
    rest: &R,
    bone: &str,
    request: &SampleRequest,
) -> Result<BoneChannels>
where
    E: FrameEvaluator + ?Sized,
    R: RestPose + ?Sized,
{
    let frames = request.frames(evaluator, bone)?;
    let poses = evaluate(evaluator, bone, &frames);
    let rest_pose = rest.rest_transform(bone);

    let mut channels = BoneChannels::new(bone);
    for kind in ChannelKind::ALL {
        *channels.channel_mut(kind) =
            build_channel(kind, bone, &frames, &poses, &rest_pose, request);
    }

    channels.properties = evaluator
        .property_names(bone)
        .iter()
        .map(|name| sample_property(evaluator, bone, name, request.all_frames()))
        .filter(|channel| !channel.is_empty())
        .collect();

    debug!(
        bone,
        samples = frames.len(),
        position = channels.position.len(),
        rotation = channels.rotation.len(),
        scale = channels.scale.len(),
        properties = channels.properties.len(),
        "Sampled bone"
    );
    Ok(channels)
}

/// Sample all bones of `tree`. Bones are processed in parallel and returned
/// in tree order.
pub fn sample_animation<E, R>(
    tree: &BoneTree,
    evaluator: &E,
    rest: &R,
    request: &SampleRequest,
) -> Result<ChannelMap>
where
    E: FrameEvaluator + Sync + ?Sized,
    R: RestPose + Sync + ?Sized,
{
    request.validate()?;
    info!(
        bones = tree.len(),
        start = request.frame_start,
        end = request.frame_end,
        step = request.frame_step,
        "Sampling animation"
    );

    let bones = tree
        .bones()
        .par_iter()
        .map(|bone| sample_bone(evaluator, rest, &bone.name, request))
        .collect::<Result<Vec<_>>>()?;

    let map = ChannelMap {
        frame_start: request.frame_start,
        frame_end: request.frame_end,
        bones,
    };
    info!(
        animated = map.animated_bones().count(),
        keys = map.bones.iter().map(BoneChannels::key_count).sum::<usize>(),
        "Sampling complete"
    );
    Ok(map)
}
