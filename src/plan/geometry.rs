use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Resolved output dimensions for one source under a size cap.
///
/// Invariants: output preserves the source aspect ratio within integer rounding, both output
/// dimensions are even, and neither exceeds the bound nor the source (no upscaling).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeometryPlan {
    /// Probed source width in pixels.
    pub source_width: u32,
    /// Probed source height in pixels.
    pub source_height: u32,
    /// Encoded width in pixels.
    pub output_width: u32,
    /// Encoded height in pixels.
    pub output_height: u32,
}

impl GeometryPlan {
    /// Fit `source_width x source_height` inside `max_width x max_height`.
    pub fn compute(
        source_width: u32,
        source_height: u32,
        max_width: u32,
        max_height: u32,
    ) -> TranscodeResult<Self> {
        if source_width < 2 || source_height < 2 {
            return Err(TranscodeError::media_load(format!(
                "source dimensions {source_width}x{source_height} are too small to encode"
            )));
        }
        if max_width < 2 || max_height < 2 {
            return Err(TranscodeError::validation(format!(
                "size bound {max_width}x{max_height} must be at least 2x2"
            )));
        }

        let scale = (f64::from(max_width) / f64::from(source_width))
            .min(f64::from(max_height) / f64::from(source_height))
            .min(1.0);

        Ok(Self {
            source_width,
            source_height,
            output_width: scaled_even(source_width, scale),
            output_height: scaled_even(source_height, scale),
        })
    }

    /// Whether frames need resampling before they reach the encoder.
    pub fn needs_resize(&self) -> bool {
        self.source_width != self.output_width || self.source_height != self.output_height
    }

    /// Bytes in one RGBA8 output frame.
    pub fn output_frame_len(&self) -> usize {
        self.output_width as usize * self.output_height as usize * 4
    }
}

fn scaled_even(dim: u32, scale: f64) -> u32 {
    let scaled = (f64::from(dim) * scale).floor() as u32;
    (scaled & !1).max(2)
}

#[cfg(test)]
#[path = "../../tests/unit/plan/geometry.rs"]
mod tests;
