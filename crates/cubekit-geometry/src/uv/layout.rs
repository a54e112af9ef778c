//! Box unfold of a single cube
//!
//! ```text
//!        d     w     w     d ... (w)
//!     +-----+-----+-----+
//!  d  |     | up  |down |
//!     +-----+-----+-----+-----+
//!  h  |east |north|west |south|
//!     +-----+-----+-----+-----+
//! ```

use super::{Face, UvRect};

/// Size of the unfolded box for face dimensions `(w, h, d)`, saturating
pub fn footprint(width: u32, height: u32, depth: u32) -> (u32, u32) {
    (
        width.saturating_add(depth).saturating_mul(2),
        depth.saturating_add(height),
    )
}

/// Rectangles of all six faces for a cube anchored at `anchor`.
///
/// With `mirror` the east and west faces are flipped horizontally: the
/// position moves to the right edge and the width becomes negative.
///
/// Positions saturate at `u32::MAX`; an anchor that far out always lands
/// outside the texture and is reported as overflow by the mapper.
pub fn unfold(anchor: [u32; 2], width: u32, height: u32, depth: u32, mirror: bool) -> [UvRect; 6] {
    let [u, v] = anchor;
    let px = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
    let (w, h, d) = (px(width), px(height), px(depth));
    let top = v.saturating_add(depth);
    let at = |steps: &[u32]| steps.iter().fold(u, |x, step| x.saturating_add(*step));

    let side = |face: Face, x: u32| {
        if mirror {
            UvRect::new(face, [x.saturating_add(depth), top], [-d, h])
        } else {
            UvRect::new(face, [x, top], [d, h])
        }
    };

    [
        UvRect::new(Face::North, [at(&[depth]), top], [w, h]),
        UvRect::new(Face::South, [at(&[depth, depth, width]), top], [w, h]),
        side(Face::East, u),
        side(Face::West, at(&[depth, width])),
        UvRect::new(Face::Up, [at(&[depth]), v], [w, d]),
        // Down is stored upside down, starting from its bottom edge
        UvRect::new(Face::Down, [at(&[depth, width]), top], [w, -d]),
    ]
}
