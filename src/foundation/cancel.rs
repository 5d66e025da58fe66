use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::foundation::error::{TranscodeError, TranscodeResult};

/// Cooperative cancellation signal shared between a caller and a running transcode.
///
/// Clones observe the same flag. The pipeline checks it while waiting on probing and at every
/// frame-pump iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return [`TranscodeError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> TranscodeResult<()> {
        if self.is_cancelled() {
            Err(TranscodeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
