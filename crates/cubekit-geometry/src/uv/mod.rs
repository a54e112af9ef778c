//! Box-unfold UV assignment
//!
//! Every cube gets an anchor on the texture and the six face rectangles of
//! the standard block-model unfold around it (see [`layout`]). Anchors are
//! packed row by row in definition order by [`packer::ShelfPacker`].

pub mod layout;
pub mod packer;

use cubekit_core::{Diagnosed, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::bone::{BoneTree, CubeId};
use packer::ShelfPacker;

/// Cube face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Face {
    /// Faces in the order the model format writes them
    pub const ALL: [Face; 6] = [
        Face::North,
        Face::South,
        Face::East,
        Face::West,
        Face::Up,
        Face::Down,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Face::North => "north",
            Face::South => "south",
            Face::East => "east",
            Face::West => "west",
            Face::Up => "up",
            Face::Down => "down",
        }
    }

    pub fn from_name(name: &str) -> Option<Face> {
        Face::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x.saturating_add(width),
            y1: y.saturating_add(height),
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Shared area test; empty rectangles never intersect
    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Texture rectangle of one face. A negative size flips the face along
/// that axis; the position is then the far edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UvRect {
    pub face: Face,
    pub position: [u32; 2],
    pub size: [i32; 2],
}

impl UvRect {
    pub fn new(face: Face, position: [u32; 2], size: [i32; 2]) -> Self {
        Self {
            face,
            position,
            size,
        }
    }

    /// Covered pixels with the sign of the size removed
    pub fn region(&self) -> PixelRect {
        let span = |start: u32, len: i32| {
            let end = start as i64 + len as i64;
            let clamp = |n: i64| n.clamp(0, i64::from(u32::MAX)) as u32;
            let lo = clamp((start as i64).min(end));
            let hi = clamp((start as i64).max(end));
            (lo, hi)
        };
        let (x0, x1) = span(self.position[0], self.size[0]);
        let (y0, y1) = span(self.position[1], self.size[1]);
        PixelRect { x0, y0, x1, y1 }
    }

    pub fn overlaps(&self, other: &UvRect) -> bool {
        self.region().intersects(&other.region())
    }

    pub fn is_flipped(&self) -> bool {
        self.size[0] < 0 || self.size[1] < 0
    }
}

/// UV layout of one cube
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeUv {
    pub anchor: [u32; 2],
    /// Unfolded `(width, height, depth)` in pixels
    pub dimensions: (u32, u32, u32),
    pub mirror: bool,
    pub faces: [UvRect; 6],
}

impl CubeUv {
    pub fn new(anchor: [u32; 2], dimensions: (u32, u32, u32), mirror: bool) -> Self {
        let (w, h, d) = dimensions;
        Self {
            anchor,
            dimensions,
            mirror,
            faces: layout::unfold(anchor, w, h, d, mirror),
        }
    }

    pub fn face(&self, face: Face) -> &UvRect {
        // unfold() returns faces in Face::ALL order
        let idx = Face::ALL.iter().position(|f| *f == face).unwrap_or(0);
        &self.faces[idx]
    }

    /// Area reserved by the whole unfold
    pub fn footprint(&self) -> PixelRect {
        let (w, h, d) = self.dimensions;
        let (fw, fh) = layout::footprint(w, h, d);
        PixelRect::new(self.anchor[0], self.anchor[1], fw, fh)
    }
}

/// Packing options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UvOptions {
    /// Keep anchors the scene already assigned and pack around them
    pub keep_existing: bool,
}

/// Result of a UV pass over a bone tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvAssignment {
    pub texture_width: u32,
    /// Requested height, or the packed height when it was automatic
    pub texture_height: u32,
    /// Extent actually covered by footprints
    pub required_width: u32,
    pub required_height: u32,
    /// Per bone, per cube, in tree order
    cubes: Vec<Vec<CubeUv>>,
}

impl UvAssignment {
    pub fn get(&self, id: CubeId) -> Option<&CubeUv> {
        self.cubes.get(id.bone).and_then(|cubes| cubes.get(id.cube))
    }

    /// UVs of the cubes of one bone
    pub fn bone(&self, bone: usize) -> &[CubeUv] {
        self.cubes.get(bone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cube_uvs(&self) -> impl Iterator<Item = (CubeId, &CubeUv)> {
        self.cubes.iter().enumerate().flat_map(|(bone, cubes)| {
            cubes
                .iter()
                .enumerate()
                .map(move |(cube, uv)| (CubeId { bone, cube }, uv))
        })
    }

    /// Every face rectangle with the cube it belongs to
    pub fn rects(&self) -> impl Iterator<Item = (CubeId, &UvRect)> {
        self.cube_uvs()
            .flat_map(|(id, uv)| uv.faces.iter().map(move |rect| (id, rect)))
    }

    pub fn is_within_texture(&self) -> bool {
        self.required_width <= self.texture_width && self.required_height <= self.texture_height
    }
}

/// Assigns anchors and face rectangles for every cube of a tree
#[derive(Debug, Clone)]
pub struct UvMapper {
    texture_width: u32,
    texture_height: Option<u32>,
    options: UvOptions,
}

impl UvMapper {
    /// `texture_height = None` packs without a height limit
    pub fn new(texture_width: u32, texture_height: Option<u32>) -> Self {
        Self {
            texture_width,
            texture_height,
            options: UvOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UvOptions) -> Self {
        self.options = options;
        self
    }

    /// Pack the cubes of `tree`.
    ///
    /// Running out of texture is not fatal: the layout is kept with
    /// out-of-bounds coordinates and an [`Error::UvOverflow`] warning.
    pub fn assign(&self, tree: &BoneTree) -> Diagnosed<UvAssignment> {
        info!(
            cubes = tree.cube_count(),
            width = self.texture_width,
            height = ?self.texture_height,
            "Assigning UVs"
        );

        let mut anchors: HashMap<CubeId, [u32; 2]> = HashMap::new();
        let mut groups: HashMap<(String, (u32, u32, u32)), [u32; 2]> = HashMap::new();
        let mut packer = ShelfPacker::new(self.texture_width);

        if self.options.keep_existing {
            for (id, cube) in tree.cubes() {
                if let Some(anchor) = cube.fixed_uv {
                    let dims = cube.uv_dimensions();
                    let (fw, fh) = layout::footprint(dims.0, dims.1, dims.2);
                    packer.reserve(PixelRect::new(anchor[0], anchor[1], fw, fh));
                    if let Some(group) = &cube.uv_group {
                        groups.entry((group.clone(), dims)).or_insert(anchor);
                    }
                    anchors.insert(id, anchor);
                }
            }
            debug!(fixed = anchors.len(), "Reserved existing UV anchors");
        }

        let mut cubes: Vec<Vec<CubeUv>> = tree
            .bones()
            .iter()
            .map(|b| Vec::with_capacity(b.cubes.len()))
            .collect();
        let mut required_width = 0u32;
        let mut required_height = 0u32;

        for (id, cube) in tree.cubes() {
            let dims = cube.uv_dimensions();
            let group_key = cube.uv_group.as_ref().map(|g| (g.clone(), dims));

            let anchor = match anchors.get(&id) {
                Some(anchor) => *anchor,
                None => match group_key.as_ref().and_then(|k| groups.get(k)) {
                    Some(anchor) => *anchor,
                    None => {
                        let (fw, fh) = layout::footprint(dims.0, dims.1, dims.2);
                        let anchor = packer.place(fw, fh);
                        if let Some(key) = group_key {
                            groups.insert(key, anchor);
                        }
                        anchor
                    }
                },
            };

            let uv = CubeUv::new(anchor, dims, cube.mirror);
            let footprint = uv.footprint();
            required_width = required_width.max(footprint.x1);
            required_height = required_height.max(footprint.y1);

            debug!(
                bone = %tree.bones()[id.bone].name,
                cube = id.cube,
                u = anchor[0],
                v = anchor[1],
                "Placed cube"
            );
            cubes[id.bone].push(uv);
        }

        let texture_height = self.texture_height.unwrap_or(required_height.max(1));
        let assignment = UvAssignment {
            texture_width: self.texture_width,
            texture_height,
            required_width,
            required_height,
            cubes,
        };

        let mut result = Diagnosed::clean(assignment);
        if !result.value.is_within_texture() {
            warn!(
                required_width,
                required_height,
                texture_width = self.texture_width,
                texture_height,
                "UV layout does not fit the texture"
            );
            result.warn(Error::UvOverflow {
                required_width,
                required_height,
                texture_width: self.texture_width,
                texture_height,
            });
        }
        result
    }
}

/// Pack `tree` with default options
pub fn assign(
    tree: &BoneTree,
    texture_width: u32,
    texture_height: Option<u32>,
) -> Diagnosed<UvAssignment> {
    UvMapper::new(texture_width, texture_height).assign(tree)
}
