use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::source::VideoFrame;
use crate::plan::geometry::GeometryPlan;

/// Output-sized RGBA8 drawing target holding the most recently drawn source frame.
///
/// Aspect ratio is preserved by the [`GeometryPlan`], so drawing is a plain scale with no
/// letterboxing.
#[derive(Debug)]
pub struct Surface {
    image: RgbaImage,
    filter: FilterType,
    drawn: bool,
}

impl Surface {
    /// Allocate a cleared surface of the planned output size.
    pub fn new(plan: &GeometryPlan) -> Self {
        Self {
            image: RgbaImage::new(plan.output_width, plan.output_height),
            filter: FilterType::Triangle,
            drawn: false,
        }
    }

    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether at least one frame has been drawn.
    pub fn has_content(&self) -> bool {
        self.drawn
    }

    /// Borrow the current pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Resample `frame` onto the surface.
    pub fn draw(&mut self, frame: VideoFrame) -> TranscodeResult<()> {
        let (fw, fh) = (frame.width, frame.height);
        let expected = fw as usize * fh as usize * 4;
        if fw == 0 || fh == 0 || frame.data.len() != expected {
            return Err(TranscodeError::media_load(format!(
                "unreadable frame: {fw}x{fh} with {} bytes (expected {expected})",
                frame.data.len()
            )));
        }

        let src = RgbaImage::from_raw(fw, fh, frame.data)
            .ok_or_else(|| TranscodeError::media_load("frame buffer does not match its size"))?;
        self.image = if (fw, fh) == self.image.dimensions() {
            src
        } else {
            imageops::resize(&src, self.image.width(), self.image.height(), self.filter)
        };
        self.drawn = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
