//! Euler angle continuity
//!
//! The host reports rotations in whatever range its solver produced. Written
//! keys must not jump by a full turn between frames, so every sample is
//! replaced by the equivalent representation closest to the previous one.

use cubekit_core::Vec3;

/// Wrap an angle into (-180, 180]
pub fn normalize_degrees(angle: f64) -> f64 {
    let mut wrapped = angle % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Wrap every component into (-180, 180]
pub fn normalize(rotation: Vec3) -> Vec3 {
    rotation.map(normalize_degrees)
}

/// The other XYZ Euler triple describing the same orientation
pub fn dual(rotation: Vec3) -> Vec3 {
    Vec3::new(rotation.x + 180.0, 180.0 - rotation.y, rotation.z + 180.0)
}

fn unwrap_toward(angle: f64, reference: f64) -> f64 {
    angle + 360.0 * ((reference - angle) / 360.0).round()
}

fn unwrap_vec(rotation: Vec3, reference: Vec3) -> Vec3 {
    Vec3::new(
        unwrap_toward(rotation.x, reference.x),
        unwrap_toward(rotation.y, reference.y),
        unwrap_toward(rotation.z, reference.z),
    )
}

/// Equivalent of `rotation` closest to `previous`, trying full turns per axis
/// and the dual Euler form. Ties keep the direct form.
pub fn closest_rotation(rotation: Vec3, previous: Vec3) -> Vec3 {
    let direct = unwrap_vec(rotation, previous);
    let flipped = unwrap_vec(dual(rotation), previous);

    if flipped.distance(&previous) + 1e-9 < direct.distance(&previous) {
        flipped
    } else {
        direct
    }
}

/// Make a sequence of rotations continuous: the first is normalized, each
/// following one is the representation closest to its predecessor.
pub fn unwrap_sequence(rotations: &mut [Vec3]) {
    let mut previous: Option<Vec3> = None;
    for rotation in rotations.iter_mut() {
        *rotation = match previous {
            None => normalize(*rotation),
            Some(prev) => closest_rotation(*rotation, prev),
        };
        previous = Some(*rotation);
    }
}
