//! Row-major shelf packer for cube footprints

use super::PixelRect;

/// Places footprints left to right, wrapping to a new row when the running
/// width would pass the texture width. Reserved areas (fixed anchors) are
/// skipped over.
#[derive(Debug)]
pub struct ShelfPacker {
    width: u32,
    cursor_u: u32,
    cursor_v: u32,
    row_height: u32,
    /// Lowest bottom edge of a reserved area that blocked the current row
    blocked_until: Option<u32>,
    reserved: Vec<PixelRect>,
}

impl ShelfPacker {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            cursor_u: 0,
            cursor_v: 0,
            row_height: 0,
            blocked_until: None,
            reserved: Vec::new(),
        }
    }

    /// Keep an area free (a fixed anchor's footprint)
    pub fn reserve(&mut self, rect: PixelRect) {
        if !rect.is_empty() {
            self.reserved.push(rect);
        }
    }

    /// Find the anchor for a `width x height` footprint
    pub fn place(&mut self, width: u32, height: u32) -> [u32; 2] {
        loop {
            if self.cursor_u > 0 && self.cursor_u.saturating_add(width) > self.width {
                self.wrap();
            }

            let candidate = PixelRect::new(self.cursor_u, self.cursor_v, width, height);
            let blocker = self
                .reserved
                .iter()
                .filter(|r| r.intersects(&candidate))
                .max_by_key(|r| r.x1)
                .copied();

            match blocker {
                Some(blocker) => {
                    self.cursor_u = blocker.x1;
                    self.blocked_until = Some(match self.blocked_until {
                        Some(y) => y.min(blocker.y1),
                        None => blocker.y1,
                    });
                }
                None => {
                    let anchor = [self.cursor_u, self.cursor_v];
                    self.cursor_u = self.cursor_u.saturating_add(width);
                    self.row_height = self.row_height.max(height);
                    return anchor;
                }
            }
        }
    }

    fn wrap(&mut self) {
        let advance = if self.row_height > 0 {
            self.row_height
        } else {
            // Nothing placed on this row; skip to where the first reserved
            // area ends. Zero-height rows cannot loop since a blocker always
            // ends below the cursor.
            self.blocked_until
                .map(|y| y.saturating_sub(self.cursor_v))
                .unwrap_or(1)
                .max(1)
        };
        self.cursor_v = self.cursor_v.saturating_add(advance);
        self.cursor_u = 0;
        self.row_height = 0;
        self.blocked_until = None;
    }
}
