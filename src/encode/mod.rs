//! Encoding sinks.
//!
//! Sinks consume output ticks in order and hand back the encoded container in chunks.

pub(crate) mod ffmpeg;
pub(crate) mod sink;
