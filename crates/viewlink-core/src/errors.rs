use thiserror::Error;

/// Fatal capture-backend conditions. Any of these ends the capture loop;
/// the owning process decides whether to restart the pipeline.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture backend initialization failed: {reason}")]
    InitFailed { reason: String },

    #[error("display access lost: {reason}")]
    AccessLost { reason: String },

    #[error("capture backend error: {reason}")]
    Backend { reason: String },
}

/// Per-region readback failures. Never fatal: the region is skipped and the
/// change source re-reports persistent differences on a later frame.
#[derive(Error, Debug)]
pub enum ReadbackError {
    #[error("staging surface allocation failed: {reason}")]
    StagingAllocation { reason: String },

    #[error("sub-region copy failed: {reason}")]
    RegionCopy { reason: String },

    #[error("staging surface map failed: {reason}")]
    Map { reason: String },
}

/// Malformed change metadata. Aborts processing of the offending frame only.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChangeError {
    #[error("change metadata truncated: need {needed} bytes for {moves} move + {dirty} dirty rects, have {available}")]
    Truncated {
        needed:    usize,
        available: usize,
        moves:     usize,
        dirty:     usize,
    },
}
