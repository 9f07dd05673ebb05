//! Protocol-ready commands: rectangular pixel updates and cursor changes.
//!
//! Commands are immutable values. The producer relinquishes ownership when it
//! pushes one into a channel; the consumer takes ownership on pop and, for
//! draw commands, must eventually hand the release handle back.

use crate::asset::{AssetId, ReadbackBuffer, ReleaseHandle};
use crate::geometry::{BoundingBox, Region};

// ── PixelFormat ───────────────────────────────────────────────────────────────

/// Pixel layout of a draw command's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit BGRA, rows stored top-down.
    Bgra32,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra32 => 4,
        }
    }
}

// ── DrawCommand ───────────────────────────────────────────────────────────────

/// One rectangular pixel update, backed by the buffer read back for it.
#[derive(Debug)]
pub struct DrawCommand {
    bounding_box: BoundingBox,
    format:       PixelFormat,
    row_stride:   usize,
    buffer:       ReadbackBuffer,
}

impl DrawCommand {
    /// Wrap a readback buffer for the region it was read from.
    pub fn new(region: Region, buffer: ReadbackBuffer) -> Self {
        debug_assert_eq!(buffer.height(), region.height() as usize);
        Self {
            bounding_box: BoundingBox::from_region(&region),
            format:       PixelFormat::Bgra32,
            row_stride:   buffer.row_stride(),
            buffer,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row in `pixels()`. May exceed `width × 4` when the readback
    /// path padded its rows.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixels(&self) -> &[u8] {
        self.buffer.bytes()
    }

    /// Identity the sink will hand back on release; matches 1:1 with this
    /// command's buffer.
    pub fn release_id(&self) -> AssetId {
        self.buffer.asset_id()
    }

    /// Consume the command once rendered/transmitted, keeping only what the
    /// sink needs to report the buffer free.
    pub fn into_release_handle(self) -> ReleaseHandle {
        ReleaseHandle::new(self.buffer)
    }
}

// ── Cursor commands ───────────────────────────────────────────────────────────

/// Shape-payload encodings understood by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEncoding {
    /// 1-bpp AND mask followed by 1-bpp XOR mask.
    Mono  = 0,
    /// 32-bit BGRA with per-pixel alpha.
    Alpha = 1,
}

#[derive(Debug)]
pub enum CursorCommand {
    /// Absolute pointer position; `visible == false` means the pointer left
    /// this display.
    Move { x: i32, y: i32, visible: bool },
    /// New pointer shape.
    Set(CursorShape),
}

// ── CursorShape ───────────────────────────────────────────────────────────────

/// Length of the fixed shape header preceding the payload.
pub const SHAPE_HEADER_LEN: usize = 24;

/// A pointer shape as one contiguous chunk: a fixed header immediately
/// followed by the pixel payload, in a single allocation. The sink consumes
/// the chunk as-is, so header and payload must never be split.
///
/// Header layout (little-endian):
///
/// ```text
/// offset  size  field
///      0     1  encoding (0 = mono, 1 = alpha)
///      1     3  reserved, zero
///      4     4  width (pixels)
///      8     4  height (pixels; mono: per mask)
///     12     4  hot spot x
///     16     4  hot spot y
///     20     4  payload length (bytes)
/// ```
#[derive(Debug)]
pub struct CursorShape {
    chunk: Box<[u8]>,
}

impl CursorShape {
    pub fn new(
        encoding: CursorEncoding,
        width: u32,
        height: u32,
        hot_x: u32,
        hot_y: u32,
        payload: &[u8],
    ) -> Self {
        let mut chunk = vec![0u8; SHAPE_HEADER_LEN + payload.len()];
        chunk[0] = encoding as u8;
        chunk[4..8].copy_from_slice(&width.to_le_bytes());
        chunk[8..12].copy_from_slice(&height.to_le_bytes());
        chunk[12..16].copy_from_slice(&hot_x.to_le_bytes());
        chunk[16..20].copy_from_slice(&hot_y.to_le_bytes());
        chunk[20..24].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        chunk[SHAPE_HEADER_LEN..].copy_from_slice(payload);
        Self { chunk: chunk.into_boxed_slice() }
    }

    pub fn encoding(&self) -> CursorEncoding {
        match self.chunk[0] {
            0 => CursorEncoding::Mono,
            _ => CursorEncoding::Alpha,
        }
    }

    pub fn width(&self) -> u32 {
        self.read_u32(4)
    }

    pub fn height(&self) -> u32 {
        self.read_u32(8)
    }

    pub fn hot_x(&self) -> u32 {
        self.read_u32(12)
    }

    pub fn hot_y(&self) -> u32 {
        self.read_u32(16)
    }

    pub fn header(&self) -> &[u8] {
        &self.chunk[..SHAPE_HEADER_LEN]
    }

    pub fn payload(&self) -> &[u8] {
        &self.chunk[SHAPE_HEADER_LEN..]
    }

    /// The whole chunk, header plus payload, as the sink transmits it.
    pub fn as_bytes(&self) -> &[u8] {
        &self.chunk
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.chunk[offset..offset + 4].try_into().unwrap())
    }
}
