//! Animation document types (`1.8.0` layout)

use serde::{Deserialize, Serialize};

use crate::format::{Num, OrderedMap};

pub const ANIMATION_FORMAT_VERSION: &str = "1.8.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDocument {
    pub format_version: String,
    #[serde(default)]
    pub animations: OrderedMap<AnimationEntry>,
}

impl AnimationDocument {
    pub fn new() -> Self {
        Self {
            format_version: ANIMATION_FORMAT_VERSION.to_string(),
            animations: OrderedMap::new(),
        }
    }
}

impl Default for AnimationDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// `true` or `"hold_on_last_frame"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoopValue {
    Flag(bool),
    Mode(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationEntry {
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<LoopValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anim_time_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_previous_animation: Option<bool>,
    #[serde(default)]
    pub bones: OrderedMap<BoneAnimation>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub sound_effects: OrderedMap<Vec<EffectEntry>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub particle_effects: OrderedMap<Vec<EffectEntry>>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub timeline: OrderedMap<Vec<String>>,
}

/// Time key -> value, keys in increasing time
pub type TimeChannel = OrderedMap<[Num; 3]>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneAnimation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<TimeChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<TimeChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<TimeChannel>,
}

impl BoneAnimation {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}
