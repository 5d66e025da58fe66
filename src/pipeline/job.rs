use std::thread::JoinHandle;

use crate::encode::sink::FrameSink;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::source::FrameSource;
use crate::pipeline::transcode::{OutputArtifact, Transcoder};
use crate::plan::codec::CapabilityProbe;

/// A transcode running on its own worker thread.
///
/// Each job owns its source, sink and capability probe, so any number of jobs can run side by
/// side without sharing state.
pub struct TranscodeJob {
    cancel: CancelToken,
    handle: JoinHandle<TranscodeResult<OutputArtifact>>,
}

impl TranscodeJob {
    /// Start `transcoder` on a new thread.
    pub fn spawn(
        transcoder: Transcoder,
        source: Box<dyn FrameSource>,
        mut sink: Box<dyn FrameSink>,
        capabilities: Box<dyn CapabilityProbe + Send>,
    ) -> TranscodeResult<Self> {
        let cancel = transcoder.cancel_token();
        let handle = std::thread::Builder::new()
            .name("folio-transcode".into())
            .spawn(move || transcoder.run(source, sink.as_mut(), capabilities.as_ref()))
            .map_err(|e| anyhow::anyhow!("failed to spawn transcode thread: {e}"))?;
        Ok(Self { cancel, handle })
    }

    /// Ask the job to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job resolves.
    pub fn wait(self) -> TranscodeResult<OutputArtifact> {
        self.handle
            .join()
            .map_err(|_| TranscodeError::Other(anyhow::anyhow!("transcode thread panicked")))?
    }
}
