//! Texture template rendering
//!
//! Paints the UV layout into an RGBA image so texture artists can see where
//! each face lands. Every cube gets its own hue, every face a shade of it,
//! and each face rectangle a darker one pixel outline.

use cubekit_core::{Color, Error};
use cubekit_geometry::{CubeId, Face, UvAssignment, UvRect};
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::writer::write_atomic;

/// Template rendering errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Write failed: {0}")]
    Write(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

impl From<TextureError> for Error {
    fn from(err: TextureError) -> Self {
        match err {
            TextureError::Io(e) => Error::Io(e),
            other => Error::serialization(other.to_string()),
        }
    }
}

/// Hue step between consecutive cubes (golden angle)
const HUE_STEP: f64 = 137.507_764;

/// Template colours
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Pixels outside every face
    pub background: Color,
    pub saturation: f64,
    pub value: f64,
    /// Outline brightness relative to the face colour
    pub outline: f64,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            background: Color::TRANSPARENT,
            saturation: 0.55,
            value: 0.9,
            outline: 0.55,
        }
    }
}

fn face_shade(face: Face) -> f64 {
    match face {
        Face::Up => 1.0,
        Face::North | Face::South => 0.85,
        Face::East | Face::West => 0.75,
        Face::Down => 0.6,
    }
}

fn to_pixel(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}

/// Renders UV layouts into template images
pub struct TemplateRenderer {
    options: TemplateOptions,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            options: TemplateOptions::default(),
        }
    }

    pub fn with_options(options: TemplateOptions) -> Self {
        Self { options }
    }

    /// Colour of the `index`-th cube
    pub fn cube_color(&self, index: usize) -> Color {
        Color::from_hsv(
            index as f64 * HUE_STEP,
            self.options.saturation,
            self.options.value,
        )
    }

    /// Paint `rects` into a `width x height` image.
    ///
    /// Rectangles sharing a cube id share a hue. Pixels outside the image
    /// (an overflowing layout) are clipped.
    pub fn render<'a, I>(&self, width: u32, height: u32, rects: I) -> TextureResult<RgbaImage>
    where
        I: IntoIterator<Item = (CubeId, &'a UvRect)>,
    {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        let mut image = RgbaImage::from_pixel(width, height, to_pixel(self.options.background));
        let mut cube_index: HashMap<CubeId, usize> = HashMap::new();
        let mut painted = 0usize;

        for (id, rect) in rects {
            let next = cube_index.len();
            let index = *cube_index.entry(id).or_insert(next);
            let fill = self.cube_color(index).darken(face_shade(rect.face));
            let outline = fill.darken(self.options.outline);

            let region = rect.region();
            if region.is_empty() {
                continue;
            }
            let x_end = region.x1.min(width);
            let y_end = region.y1.min(height);
            for y in region.y0..y_end {
                for x in region.x0..x_end {
                    let edge = x == region.x0 || y == region.y0 || x + 1 == region.x1 || y + 1 == region.y1;
                    let color = if edge { outline } else { fill };
                    image.put_pixel(x, y, to_pixel(color));
                }
            }
            painted += 1;
        }

        debug!(cubes = cube_index.len(), faces = painted, "Rendered template");
        Ok(image)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Template of a whole UV assignment at the assignment's texture size
pub fn render_template(assignment: &UvAssignment) -> TextureResult<RgbaImage> {
    TemplateRenderer::new().render(
        assignment.texture_width,
        assignment.texture_height,
        assignment.rects(),
    )
}

/// Encode as PNG and write atomically
pub fn save_png(image: &RgbaImage, path: impl AsRef<Path>) -> TextureResult<()> {
    let path = path.as_ref();
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    write_atomic(path, &bytes).map_err(|e| match e {
        Error::Io(io) => TextureError::Io(io),
        other => TextureError::Write(other.to_string()),
    })?;
    info!(path = %path.display(), width = image.width(), height = image.height(), "Saved template");
    Ok(())
}
