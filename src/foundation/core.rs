use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Zero-based index of an output tick (one encoded frame).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Rational frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a frame rate, rejecting zero numerator or denominator.
    pub fn new(num: u32, den: u32) -> TranscodeResult<Self> {
        if den == 0 {
            return Err(TranscodeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(TranscodeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Presentation time of frame `frames`.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Parse an ffmpeg-style ratio such as `30000/1001`. Returns `None` for `0/0` and friends.
    pub fn parse_ratio(s: &str) -> Option<Self> {
        let (a, b) = s.split_once('/')?;
        let num = a.trim().parse::<u32>().ok()?;
        let den = b.trim().parse::<u32>().ok()?;
        Self::new(num, den).ok()
    }

    /// Parse a user-supplied rate: a `num/den` ratio or a whole number of frames per second.
    pub fn parse(s: &str) -> TranscodeResult<Self> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((a, b)) => (a.trim().parse::<u32>(), b.trim().parse::<u32>()),
            None => (s.parse::<u32>(), Ok(1)),
        };
        match (num, den) {
            (Ok(num), Ok(den)) => Self::new(num, den),
            _ => Err(TranscodeError::validation(format!("invalid frame rate '{s}'"))),
        }
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
