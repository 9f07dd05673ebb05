//! viewlink-core — the capture → command translation-and-handoff pipeline.
//!
//! Bridges a live desktop frame source to a remote-display protocol sink:
//! each changed region of a captured frame becomes a protocol-ready draw
//! command backed by a freshly read-back pixel buffer; pointer state becomes
//! separate cursor commands. Both flow through thread-safe FIFO channels to a
//! consumer polling from its own thread, which later reports when each draw
//! command's buffer may be freed.
//!
//! ```text
//! capture backend (CaptureSource)
//!   │  acquire → frame + ChangeMetadata
//!   ▼
//! extract::dirty_regions            ordered, unmerged
//!   │  per region
//!   ▼
//! CaptureSource::read_region        staging copy, sub-rectangle only
//!   │  ReadbackBuffer
//!   ▼
//! DrawCommand / CursorCommand
//!   │  PipelineContext::push_*  (+ SinkWaker::wake)
//!   ▼
//! PipelineContext::poll_* ──────────► protocol sink (its own thread)
//!   ▲                                    │ render / transmit
//!   └──────── release(ReleaseHandle) ────┘
//! ```
//!
//! Everything here is synchronous and runtime-free; the capture loop itself
//! lives in `viewlink-bridge`, the platform backend in
//! `viewlink-capture-windows`.

pub mod asset;
pub mod channel;
pub mod command;
pub mod config;
pub mod context;
pub mod errors;
pub mod extract;
pub mod gate;
pub mod geometry;
pub mod pointer;
pub mod source;

pub use asset::{AssetId, ReadbackBuffer, ReleaseHandle};
pub use command::{CursorCommand, CursorEncoding, CursorShape, DrawCommand, PixelFormat};
pub use config::BridgeConfig;
pub use context::{NoopWaker, PipelineContext, SinkWaker};
pub use errors::{CaptureError, ChangeError, ReadbackError};
pub use geometry::{BoundingBox, GeometryError, Region};
pub use source::{
    Acquisition, CaptureSource, ChangeMetadata, PointerShape, PointerShapeKind, PointerUpdate,
};
