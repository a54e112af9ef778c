//! Collaborator interfaces for frame evaluation
//!
//! The sampler asks the host for a bone's absolute transform at a frame and
//! for its bind transform. Calls are synchronous and made in increasing
//! frame order per bone.

use cubekit_core::{PropertyValue, Transform, Vec3};
use cubekit_geometry::{SceneDescription, VectorKey};

/// Evaluates animated scene state at arbitrary frames
pub trait FrameEvaluator {
    /// Absolute transform of `bone` at `frame`
    fn transform(&self, bone: &str, frame: f64) -> Transform;

    /// Value of a custom property at `frame`, `None` when unset
    fn property(&self, bone: &str, property: &str, frame: i32) -> Option<PropertyValue>;

    /// Names of the custom properties animated on `bone`
    fn property_names(&self, bone: &str) -> Vec<String> {
        let _ = bone;
        Vec::new()
    }

    /// Frames holding authored keys for `bone`, used by keyframe sampling
    fn keyed_frames(&self, bone: &str) -> Vec<f64> {
        let _ = bone;
        Vec::new()
    }
}

/// Bind pose access
pub trait RestPose {
    fn rest_transform(&self, bone: &str) -> Transform;
}

fn interpolate(keys: &[VectorKey], frame: f64) -> Option<Vec3> {
    let first = keys.first()?;
    let last = keys.last()?;
    if frame <= first.frame {
        return Some(first.value);
    }
    if frame >= last.frame {
        return Some(last.value);
    }

    keys.windows(2).find_map(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        if frame >= a.frame && frame <= b.frame {
            let span = b.frame - a.frame;
            let t = if span > 0.0 { (frame - a.frame) / span } else { 1.0 };
            Some(a.value.lerp(b.value, t))
        } else {
            None
        }
    })
}

impl RestPose for SceneDescription {
    fn rest_transform(&self, bone: &str) -> Transform {
        self.bone(bone)
            .map(|b| b.rest_transform())
            .unwrap_or(Transform::IDENTITY)
    }
}

/// Tracks are linearly interpolated and held outside their key range.
/// Channels without a track stay at the rest value.
impl FrameEvaluator for SceneDescription {
    fn transform(&self, bone: &str, frame: f64) -> Transform {
        let rest = RestPose::rest_transform(self, bone);
        let Some(tracks) = self.animation.tracks.get(bone) else {
            return rest;
        };

        Transform {
            location: interpolate(&tracks.location, frame).unwrap_or(rest.location),
            rotation: interpolate(&tracks.rotation, frame).unwrap_or(rest.rotation),
            scale: interpolate(&tracks.scale, frame).unwrap_or(rest.scale),
        }
    }

    fn property(&self, bone: &str, property: &str, frame: i32) -> Option<PropertyValue> {
        let keys = self.animation.properties.get(bone)?.get(property)?;
        keys.iter()
            .filter(|k| k.frame <= frame)
            .max_by_key(|k| k.frame)
            .map(|k| k.value.clone())
    }

    fn property_names(&self, bone: &str) -> Vec<String> {
        self.animation
            .properties
            .get(bone)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn keyed_frames(&self, bone: &str) -> Vec<f64> {
        let mut frames: Vec<f64> = Vec::new();
        if let Some(tracks) = self.animation.tracks.get(bone) {
            frames.extend(
                tracks
                    .location
                    .iter()
                    .chain(&tracks.rotation)
                    .chain(&tracks.scale)
                    .map(|k| k.frame),
            );
        }
        if let Some(props) = self.animation.properties.get(bone) {
            frames.extend(props.values().flatten().map(|k| k.frame as f64));
        }
        frames.sort_by(f64::total_cmp);
        frames.dedup();
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
bones:
  - name: arm
    pivot: [5, 22, 0]
animation:
  tracks:
    arm:
      location:
        - { frame: 0, value: [5, 22, 0] }
        - { frame: 10, value: [5, 32, 0] }
      rotation:
        - { frame: 4, value: [0, 0, 40] }
        - { frame: 8, value: [0, 0, 80] }
  properties:
    arm:
      visible:
        - { frame: 3, value: false }
        - { frame: 6, value: true }
"#;

    fn scene() -> SceneDescription {
        SceneDescription::from_yaml_str(SCENE).unwrap()
    }

    #[test]
    fn test_linear_interpolation() {
        let t = scene().transform("arm", 5.0);
        assert_eq!(t.location, Vec3::new(5.0, 27.0, 0.0));
        assert!((t.rotation.z - 50.0).abs() < 1e-9);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn test_clamped_outside_keys() {
        let s = scene();
        assert_eq!(s.transform("arm", 0.0).rotation, Vec3::new(0.0, 0.0, 40.0));
        assert_eq!(s.transform("arm", 20.0).rotation, Vec3::new(0.0, 0.0, 80.0));
        assert_eq!(s.transform("arm", 20.0).location, Vec3::new(5.0, 32.0, 0.0));
    }

    #[test]
    fn test_untracked_bone_is_at_rest() {
        let s = scene();
        let t = s.transform("missing", 3.0);
        assert_eq!(t, Transform::IDENTITY);
    }

    #[test]
    fn test_property_hold() {
        let s = scene();
        assert_eq!(s.property("arm", "visible", 0), None);
        assert_eq!(s.property("arm", "visible", 4), Some(PropertyValue::Bool(false)));
        assert_eq!(s.property("arm", "visible", 9), Some(PropertyValue::Bool(true)));
        assert_eq!(s.property_names("arm"), vec!["visible".to_string()]);
    }

    #[test]
    fn test_keyed_frames() {
        assert_eq!(
            scene().keyed_frames("arm"),
            vec![0.0, 3.0, 4.0, 6.0, 8.0, 10.0]
        );
    }
}
