//! Desktop duplication via IDXGIOutputDuplication.
//!
//! One `DesktopDuplicator` owns the D3D11 device, its immediate context and
//! the duplication interface for a single output. All calls happen on the
//! capture loop's thread; the acquired frame texture never leaves it.

use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};
use windows::core::Interface;
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE, D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_REFERENCE, D3D_DRIVER_TYPE_WARP,
    D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0, D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_9_1,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D, D3D11_BIND_FLAG,
    D3D11_BOX, D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_FLAG, D3D11_MAPPED_SUBRESOURCE,
    D3D11_MAP_READ, D3D11_RESOURCE_MISC_FLAG, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC,
    D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::{
    IDXGIAdapter, IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource,
    DXGI_ERROR_ACCESS_LOST, DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
    DXGI_OUTDUPL_MOVE_RECT, DXGI_OUTDUPL_POINTER_SHAPE_INFO,
    DXGI_OUTDUPL_POINTER_SHAPE_TYPE_COLOR, DXGI_OUTDUPL_POINTER_SHAPE_TYPE_MONOCHROME,
};

use viewlink_core::errors::{CaptureError, ReadbackError};
use viewlink_core::geometry::Region;
use viewlink_core::source::{
    Acquisition, CaptureSource, ChangeMetadata, PointerShape, PointerShapeKind, PointerUpdate,
    DIRTY_RECT_BYTES, MOVE_RECT_BYTES,
};
use viewlink_core::ReadbackBuffer;

// ── DesktopDuplicator ─────────────────────────────────────────────────────────

pub struct DesktopDuplicator {
    device:        ID3D11Device,
    context:       ID3D11DeviceContext,
    duplication:   IDXGIOutputDuplication,
    display_index: u8,
}

/// An acquired desktop frame, valid until handed back via `release`.
pub struct DuplicatedFrame {
    texture: ID3D11Texture2D,
    info:    DXGI_OUTDUPL_FRAME_INFO,
}

impl DesktopDuplicator {
    /// Duplicate the given output of the adapter the D3D11 device lives on.
    pub fn open(display_index: u8) -> Result<Self, CaptureError> {
        let (device, context) = create_device()?;

        let dxgi_device: IDXGIDevice = device
            .cast()
            .map_err(|e| init_failed(format!("cast IDXGIDevice: {e}")))?;
        let adapter: IDXGIAdapter = unsafe { dxgi_device.GetAdapter() }
            .map_err(|e| init_failed(format!("GetAdapter: {e}")))?;
        let output = unsafe { adapter.EnumOutputs(display_index as u32) }
            .map_err(|e| init_failed(format!("display[{display_index}] not found: {e}")))?;
        let output1: IDXGIOutput1 = output
            .cast()
            .map_err(|e| init_failed(format!("cast IDXGIOutput1: {e}")))?;
        let duplication = unsafe { output1.DuplicateOutput(&device) }
            .map_err(|e| init_failed(format!("DuplicateOutput: {e}")))?;

        info!("display[{display_index}] desktop duplication started");
        Ok(Self { device, context, duplication, display_index })
    }

    /// Fetch the packed move/dirty rect metadata for the current frame.
    fn frame_changes(&self, total_size: u32) -> windows::core::Result<ChangeMetadata> {
        debug_assert_eq!(std::mem::size_of::<DXGI_OUTDUPL_MOVE_RECT>(), MOVE_RECT_BYTES);
        debug_assert_eq!(std::mem::size_of::<RECT>(), DIRTY_RECT_BYTES);

        let mut moves =
            vec![DXGI_OUTDUPL_MOVE_RECT::default(); total_size as usize / MOVE_RECT_BYTES + 1];
        let mut move_bytes = 0u32;
        unsafe {
            self.duplication.GetFrameMoveRects(
                (moves.len() * MOVE_RECT_BYTES) as u32,
                moves.as_mut_ptr(),
                &mut move_bytes,
            )?;
        }
        let move_count = move_bytes as usize / MOVE_RECT_BYTES;

        let mut dirty = vec![RECT::default(); total_size as usize / DIRTY_RECT_BYTES + 1];
        let mut dirty_bytes = 0u32;
        unsafe {
            self.duplication.GetFrameDirtyRects(
                (dirty.len() * DIRTY_RECT_BYTES) as u32,
                dirty.as_mut_ptr(),
                &mut dirty_bytes,
            )?;
        }
        let dirty_count = dirty_bytes as usize / DIRTY_RECT_BYTES;

        // Pack both lists into the single blob the extractor consumes: move
        // records first, dirty rects after, little-endian i32 fields.
        let mut blob =
            Vec::with_capacity(move_count * MOVE_RECT_BYTES + dirty_count * DIRTY_RECT_BYTES);
        for m in &moves[..move_count] {
            blob.extend_from_slice(&m.SourcePoint.x.to_le_bytes());
            blob.extend_from_slice(&m.SourcePoint.y.to_le_bytes());
            push_rect(&mut blob, &m.DestinationRect);
        }
        for r in &dirty[..dirty_count] {
            push_rect(&mut blob, r);
        }

        Ok(ChangeMetadata { move_count, dirty_count, blob: Bytes::from(blob) })
    }

    fn create_staging_texture(
        &self,
        frame_desc: &D3D11_TEXTURE2D_DESC,
        width: u32,
        height: u32,
    ) -> Result<ID3D11Texture2D, ReadbackError> {
        let desc = D3D11_TEXTURE2D_DESC {
            Width:          width,
            Height:         height,
            MipLevels:      1,
            ArraySize:      1,
            Format:         frame_desc.Format,
            SampleDesc:     frame_desc.SampleDesc,
            Usage:          D3D11_USAGE_STAGING,
            BindFlags:      D3D11_BIND_FLAG(0),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ,
            MiscFlags:      D3D11_RESOURCE_MISC_FLAG(0),
        };
        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { self.device.CreateTexture2D(&desc, None, Some(&mut texture)) }
            .map_err(|e| ReadbackError::StagingAllocation { reason: e.to_string() })?;
        texture.ok_or_else(|| ReadbackError::StagingAllocation {
            reason: "CreateTexture2D returned no texture".into(),
        })
    }
}

impl CaptureSource for DesktopDuplicator {
    type Frame = DuplicatedFrame;

    fn acquire(&mut self, timeout: Duration) -> Result<Acquisition<DuplicatedFrame>, CaptureError> {
        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        let acquired = unsafe {
            self.duplication.AcquireNextFrame(
                timeout.as_millis() as u32,
                &mut info,
                &mut resource,
            )
        };
        if let Err(e) = acquired {
            return if e.code() == DXGI_ERROR_WAIT_TIMEOUT {
                Ok(Acquisition::Timeout)
            } else if e.code() == DXGI_ERROR_ACCESS_LOST {
                Err(CaptureError::AccessLost { reason: e.message() })
            } else {
                Err(CaptureError::Backend { reason: format!("AcquireNextFrame: {e}") })
            };
        }

        let resource = resource.ok_or_else(|| CaptureError::Backend {
            reason: "AcquireNextFrame yielded no resource".into(),
        })?;
        let texture: ID3D11Texture2D = resource.cast().map_err(|e| CaptureError::Backend {
            reason: format!("frame resource is not a texture: {e}"),
        })?;

        let changes = if info.TotalMetadataBufferSize > 0 {
            match self.frame_changes(info.TotalMetadataBufferSize) {
                Ok(changes) => changes,
                Err(e) => {
                    // Self-healing: persistent differences get re-reported,
                    // so an unreadable metadata blob degrades to a no-change
                    // frame instead of killing the loop.
                    warn!("display[{}] frame metadata unavailable: {e}", self.display_index);
                    ChangeMetadata::empty()
                }
            }
        } else {
            ChangeMetadata::empty()
        };

        Ok(Acquisition::Frame { frame: DuplicatedFrame { texture, info }, changes })
    }

    fn read_region(
        &mut self,
        frame: &DuplicatedFrame,
        region: Region,
    ) -> Result<ReadbackBuffer, ReadbackError> {
        let mut frame_desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { frame.texture.GetDesc(&mut frame_desc) };

        let width = region.width();
        let height = region.height();
        let staging = self.create_staging_texture(&frame_desc, width, height)?;

        let source_box = D3D11_BOX {
            left:   region.left() as u32,
            top:    region.top() as u32,
            front:  0,
            right:  region.right() as u32,
            bottom: region.bottom() as u32,
            back:   1,
        };
        unsafe {
            self.context.CopySubresourceRegion(
                &staging,
                0,
                0,
                0,
                0,
                &frame.texture,
                0,
                Some(&source_box),
            );
        }

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe { self.context.Map(&staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped)) }
            .map_err(|e| ReadbackError::Map { reason: e.to_string() })?;

        let row_stride = mapped.RowPitch as usize;
        let src = unsafe {
            std::slice::from_raw_parts(mapped.pData as *const u8, height as usize * row_stride)
        };
        let buffer = ReadbackBuffer::from_mapped(src, row_stride, height as usize);

        unsafe { self.context.Unmap(&staging, 0) };
        // Staging texture is dropped here; it never outlives the readback.
        Ok(buffer)
    }

    fn pointer_update(&mut self, frame: &DuplicatedFrame) -> Option<PointerUpdate> {
        let info = &frame.info;

        let shape = if info.PointerShapeBufferSize > 0 {
            let mut data = vec![0u8; info.PointerShapeBufferSize as usize];
            let mut used = 0u32;
            let mut shape_info = DXGI_OUTDUPL_POINTER_SHAPE_INFO::default();
            let fetched = unsafe {
                self.duplication.GetFramePointerShape(
                    data.len() as u32,
                    data.as_mut_ptr().cast(),
                    &mut used,
                    &mut shape_info,
                )
            };
            match fetched {
                Ok(()) => {
                    data.truncate(used as usize);
                    Some(PointerShape {
                        kind:   shape_kind(shape_info.Type),
                        width:  shape_info.Width,
                        height: shape_info.Height,
                        hot_x:  shape_info.HotSpot.x as u32,
                        hot_y:  shape_info.HotSpot.y as u32,
                        data:   Bytes::from(data),
                    })
                }
                Err(e) => {
                    warn!("display[{}] pointer shape fetch failed: {e}", self.display_index);
                    None
                }
            }
        } else {
            None
        };

        Some(PointerUpdate {
            last_update: info.LastMouseUpdateTime as u64,
            x:           info.PointerPosition.Position.x,
            y:           info.PointerPosition.Position.y,
            visible:     info.PointerPosition.Visible.as_bool(),
            shape,
        })
    }

    fn release(&mut self, frame: DuplicatedFrame) -> Result<(), CaptureError> {
        drop(frame);
        unsafe { self.duplication.ReleaseFrame() }.map_err(|e| {
            if e.code() == DXGI_ERROR_ACCESS_LOST {
                CaptureError::AccessLost { reason: e.message() }
            } else {
                CaptureError::Backend { reason: format!("ReleaseFrame: {e}") }
            }
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

const DRIVER_TYPES: [D3D_DRIVER_TYPE; 3] =
    [D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP, D3D_DRIVER_TYPE_REFERENCE];

const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 4] = [
    D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_10_0,
    D3D_FEATURE_LEVEL_9_1,
];

fn create_device() -> Result<(ID3D11Device, ID3D11DeviceContext), CaptureError> {
    for driver_type in DRIVER_TYPES {
        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        let created = unsafe {
            D3D11CreateDevice(
                None,
                driver_type,
                None,
                D3D11_CREATE_DEVICE_FLAG(0),
                Some(&FEATURE_LEVELS),
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
        };
        if created.is_ok() {
            if let (Some(device), Some(context)) = (device, context) {
                return Ok((device, context));
            }
        }
    }
    Err(init_failed("no D3D11 device (hardware, WARP and reference all failed)".into()))
}

fn shape_kind(raw: u32) -> PointerShapeKind {
    if raw == DXGI_OUTDUPL_POINTER_SHAPE_TYPE_MONOCHROME.0 as u32 {
        PointerShapeKind::Monochrome
    } else if raw == DXGI_OUTDUPL_POINTER_SHAPE_TYPE_COLOR.0 as u32 {
        PointerShapeKind::Color
    } else {
        PointerShapeKind::MaskedColor
    }
}

fn push_rect(blob: &mut Vec<u8>, rect: &RECT) {
    blob.extend_from_slice(&rect.left.to_le_bytes());
    blob.extend_from_slice(&rect.top.to_le_bytes());
    blob.extend_from_slice(&rect.right.to_le_bytes());
    blob.extend_from_slice(&rect.bottom.to_le_bytes());
}

fn init_failed(reason: String) -> CaptureError {
    CaptureError::InitFailed { reason }
}
