//! Non-Windows stub for `DesktopDuplicator` (CI + cross-compilation).
//!
//! Opens successfully and then reports an acquisition timeout every cycle,
//! so the capture loop idles instead of erroring on platforms without a
//! duplication backend.

use std::time::Duration;

use viewlink_core::errors::{CaptureError, ReadbackError};
use viewlink_core::geometry::Region;
use viewlink_core::source::{Acquisition, CaptureSource, PointerUpdate};
use viewlink_core::ReadbackBuffer;

#[allow(dead_code)]
pub struct DesktopDuplicator {
    display_index: u8,
}

/// Never produced by the stub; exists so the trait's associated type lines up.
pub struct DuplicatedFrame {
    _never: std::convert::Infallible,
}

impl DesktopDuplicator {
    pub fn open(display_index: u8) -> Result<Self, CaptureError> {
        tracing::info!("DesktopDuplicator::open stub (non-Windows) display={display_index}");
        Ok(Self { display_index })
    }
}

impl CaptureSource for DesktopDuplicator {
    type Frame = DuplicatedFrame;

    fn acquire(&mut self, timeout: Duration) -> Result<Acquisition<DuplicatedFrame>, CaptureError> {
        std::thread::sleep(timeout);
        Ok(Acquisition::Timeout)
    }

    fn read_region(
        &mut self,
        _frame: &DuplicatedFrame,
        _region: Region,
    ) -> Result<ReadbackBuffer, ReadbackError> {
        Err(ReadbackError::Map { reason: "no capture backend on this platform".into() })
    }

    fn pointer_update(&mut self, _frame: &DuplicatedFrame) -> Option<PointerUpdate> {
        None
    }

    fn release(&mut self, _frame: DuplicatedFrame) -> Result<(), CaptureError> {
        Ok(())
    }
}
