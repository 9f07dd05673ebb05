//! viewlink-capture-windows — IDXGIOutputDuplication capture backend.
//!
//! Implements `viewlink_core::CaptureSource` on top of the Windows desktop
//! duplication API. On non-Windows targets a stub is compiled so the
//! workspace builds and tests on CI hosts.
//!
//! # Windows pipeline
//!
//! ```text
//! D3D11CreateDevice (hardware → WARP → reference)
//!   │  IDXGIDevice → IDXGIAdapter → EnumOutputs(display_index)
//!   ▼
//! IDXGIOutput1::DuplicateOutput
//!   │  AcquireNextFrame(timeout)
//!   ▼
//! ID3D11Texture2D (GPU) + move/dirty rect metadata blob
//!   │  per dirty region: staging texture → CopySubresourceRegion → Map
//!   ▼
//! ReadbackBuffer (height × RowPitch bytes, CPU heap)
//! ```

#[cfg(target_os = "windows")]
mod dxgi;
#[cfg(target_os = "windows")]
pub use dxgi::{DesktopDuplicator, DuplicatedFrame};

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
pub use stub::{DesktopDuplicator, DuplicatedFrame};
