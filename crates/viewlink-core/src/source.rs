//! The capture-engine boundary.
//!
//! The frame source is an external collaborator: a desktop-duplication
//! backend on Windows, a stub elsewhere, a scripted double in tests. The
//! pipeline driver only ever talks to it through [`CaptureSource`].
//!
//! The frame handle (`CaptureSource::Frame`) is exclusively owned by the
//! driver between `acquire` and `release` and is never exposed to the
//! consumer context.

use std::time::Duration;

use bytes::Bytes;

use crate::asset::ReadbackBuffer;
use crate::errors::{CaptureError, ReadbackError};
use crate::geometry::Region;

// ── Change metadata ───────────────────────────────────────────────────────────

/// Size in bytes of one packed move record: source point (2 × i32) followed
/// by the destination rect (4 × i32). Matches the duplication backend's
/// native layout.
pub const MOVE_RECT_BYTES: usize = 24;

/// Size in bytes of one packed dirty rect (4 × i32, exclusive right/bottom).
pub const DIRTY_RECT_BYTES: usize = 16;

/// Per-frame change records, exactly as the backend reported them: a single
/// blob of `move_count` move records followed by `dirty_count` dirty rects,
/// all fields little-endian i32.
#[derive(Debug, Clone)]
pub struct ChangeMetadata {
    pub move_count:  usize,
    pub dirty_count: usize,
    pub blob:        Bytes,
}

impl ChangeMetadata {
    /// A frame that reported no changed rectangles.
    pub fn empty() -> Self {
        Self { move_count: 0, dirty_count: 0, blob: Bytes::new() }
    }
}

// ── Pointer state ─────────────────────────────────────────────────────────────

/// Shape encodings a capture backend can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerShapeKind {
    /// 1-bpp; AND and XOR masks stacked vertically in one buffer, so the
    /// reported height covers both masks together.
    Monochrome,
    /// 32-bit color with alpha.
    Color,
    /// 32-bit color plus a separate mask. Not supported by the sink.
    MaskedColor,
}

/// A new pointer shape, reported only when the shape actually changed.
#[derive(Debug, Clone)]
pub struct PointerShape {
    pub kind:   PointerShapeKind,
    pub width:  u32,
    pub height: u32,
    pub hot_x:  u32,
    pub hot_y:  u32,
    pub data:   Bytes,
}

/// Pointer state attached to an acquired frame.
///
/// `last_update == 0` means the pointer has not moved since the previous
/// acquisition and no move command must be produced for it.
#[derive(Debug, Clone)]
pub struct PointerUpdate {
    pub last_update: u64,
    pub x:           i32,
    pub y:           i32,
    pub visible:     bool,
    pub shape:       Option<PointerShape>,
}

// ── CaptureSource ─────────────────────────────────────────────────────────────

/// Outcome of one bounded-wait frame acquisition. A timeout is ordinary
/// control flow, not an error.
#[derive(Debug)]
pub enum Acquisition<F> {
    Timeout,
    Frame { frame: F, changes: ChangeMetadata },
}

/// A desktop frame source with change detection.
pub trait CaptureSource {
    /// Opaque frame handle, valid from `acquire` until `release`.
    type Frame;

    /// Wait up to `timeout` for the next frame.
    fn acquire(&mut self, timeout: Duration) -> Result<Acquisition<Self::Frame>, CaptureError>;

    /// Read one changed region of `frame` back into CPU memory.
    ///
    /// Cost must be bounded by the region, not the frame: implementations
    /// stage and copy only the requested sub-rectangle.
    fn read_region(
        &mut self,
        frame: &Self::Frame,
        region: Region,
    ) -> Result<ReadbackBuffer, ReadbackError>;

    /// Pointer state associated with `frame`, if the backend tracks one.
    fn pointer_update(&mut self, frame: &Self::Frame) -> Option<PointerUpdate>;

    /// Return `frame` to the backend. Must be called exactly once per
    /// successful acquisition, after all regions are processed.
    fn release(&mut self, frame: Self::Frame) -> Result<(), CaptureError>;
}
