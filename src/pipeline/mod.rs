pub(crate) mod job;
pub(crate) mod options;
pub(crate) mod progress;
pub(crate) mod transcode;
