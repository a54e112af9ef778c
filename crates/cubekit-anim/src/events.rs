//! Discrete custom-property channels
//!
//! Properties such as visibility or sound triggers do not interpolate. A key
//! is written only where the value changes, starting from the property's
//! default before the first frame.

use cubekit_core::PropertyValue;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sampler::Keyframe;
use crate::source::FrameEvaluator;

const NUMBER_TOLERANCE: f64 = 1e-6;

/// What a custom property drives in the written animation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Bone visibility toggle
    Visibility,
    /// Sound effect trigger
    Sound,
    /// Particle effect trigger, optionally bound to a locator
    Particle { locator: Option<String> },
    /// Raw Molang instruction
    Instruction,
    /// Any other property, written as a Molang variable
    Other(String),
}

impl PropertyKind {
    /// Classify a property by name: `visible`, `sound`, `particle`,
    /// `particle:<locator>`, `instruction`; anything else is kept as is
    pub fn from_name(name: &str) -> Self {
        match name {
            "visible" | "visibility" => PropertyKind::Visibility,
            "sound" | "sound_effect" => PropertyKind::Sound,
            "particle" | "particle_effect" => PropertyKind::Particle { locator: None },
            "instruction" | "instructions" => PropertyKind::Instruction,
            other => match other.strip_prefix("particle:") {
                Some(locator) if !locator.is_empty() => PropertyKind::Particle {
                    locator: Some(locator.to_string()),
                },
                _ => PropertyKind::Other(other.to_string()),
            },
        }
    }

    /// Value the property has before any key
    pub fn default_value(&self) -> Option<PropertyValue> {
        match self {
            PropertyKind::Visibility => Some(PropertyValue::Bool(true)),
            _ => None,
        }
    }

    /// Triggers fire on a new value; clearing one writes nothing
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            PropertyKind::Sound | PropertyKind::Particle { .. } | PropertyKind::Instruction
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Visibility => f.write_str("visible"),
            PropertyKind::Sound => f.write_str("sound"),
            PropertyKind::Particle { locator: None } => f.write_str("particle"),
            PropertyKind::Particle {
                locator: Some(locator),
            } => write!(f, "particle:{}", locator),
            PropertyKind::Instruction => f.write_str("instruction"),
            PropertyKind::Other(name) => f.write_str(name),
        }
    }
}

/// Keys of one custom property on one bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChannel {
    pub property: PropertyKind,
    pub keys: Vec<Keyframe<PropertyValue>>,
}

impl PropertyChannel {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn same_value(a: &Option<PropertyValue>, b: &Option<PropertyValue>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.approx_eq(b, NUMBER_TOLERANCE),
        (None, None) => true,
        _ => false,
    }
}

/// Sample a property at `frames` and keep the changes.
///
/// Unset values fall back to the property's default.
pub fn sample_property<E>(
    evaluator: &E,
    bone: &str,
    name: &str,
    frames: impl IntoIterator<Item = i32>,
) -> PropertyChannel
where
    E: FrameEvaluator + ?Sized,
{
    let property = PropertyKind::from_name(name);
    let default = property.default_value();

    let mut previous = default.clone();
    let mut keys = Vec::new();

    for frame in frames {
        let value = evaluator
            .property(bone, name, frame)
            .or_else(|| default.clone());
        if same_value(&value, &previous) {
            continue;
        }
        if let Some(v) = &value {
            keys.push(Keyframe::new(frame, v.clone()));
        } else if !property.is_trigger() {
            // Cleared state property: write its default back
            if let Some(d) = &default {
                keys.push(Keyframe::new(frame, d.clone()));
            }
        }
        previous = value;
    }

    PropertyChannel { property, keys }
}
