//! The capture loop — the pipeline's only production-side execution context.
//!
//! Strictly sequential: all commands for frame K are pushed before frame K+1
//! is even acquired, so the draw channel delivers regions in exactly the
//! order the capture backend reported them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info, warn};

use viewlink_core::context::{PipelineContext, SinkWaker};
use viewlink_core::errors::CaptureError;
use viewlink_core::source::{Acquisition, CaptureSource, ChangeMetadata};
use viewlink_core::{extract, pointer, DrawCommand};

/// Run the capture loop until `stop` is raised or the backend fails fatally.
///
/// A timeout from `acquire` is an ordinary no-op cycle. Per-region and
/// per-frame conditions are handled here and never reach the sink; only
/// fatal backend errors end the loop, as `Err`, for the owner to decide
/// between restart and shutdown.
pub fn run_capture_loop<S: CaptureSource>(
    source: &mut S,
    ctx: &PipelineContext,
    waker: &dyn SinkWaker,
    stop: &AtomicBool,
    acquire_timeout: Duration,
) -> Result<(), CaptureError> {
    info!("capture loop running");

    while !stop.load(Ordering::Relaxed) {
        let (frame, changes) = match source.acquire(acquire_timeout)? {
            Acquisition::Timeout => continue, // no new frame yet
            Acquisition::Frame { frame, changes } => (frame, changes),
        };

        process_frame(source, &frame, &changes, ctx, waker);
        process_pointer(source, &frame, ctx, waker);

        source.release(frame)?;
    }

    info!("capture loop stopped");
    Ok(())
}

/// Translate one frame's changed regions into draw commands.
fn process_frame<S: CaptureSource>(
    source: &mut S,
    frame: &S::Frame,
    changes: &ChangeMetadata,
    ctx: &PipelineContext,
    waker: &dyn SinkWaker,
) {
    let regions = match extract::dirty_regions(changes) {
        Ok(regions) => regions,
        Err(e) => {
            // Malformed metadata rejects this frame only; the next capture
            // cycle starts clean.
            warn!("rejecting frame: {e}");
            return;
        }
    };

    for region in regions {
        let buffer = match source.read_region(frame, region) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(%region, "region readback failed: {e}; skipping");
                continue;
            }
        };
        ctx.push_draw(DrawCommand::new(region, buffer));
        waker.wake();
    }
}

/// Translate the frame's pointer state into cursor commands.
fn process_pointer<S: CaptureSource>(
    source: &mut S,
    frame: &S::Frame,
    ctx: &PipelineContext,
    waker: &dyn SinkWaker,
) {
    let Some(update) = source.pointer_update(frame) else { return };

    if let Some(command) = pointer::move_command(&update) {
        ctx.push_cursor(command);
        waker.wake();
    }
    if let Some(command) = pointer::set_command(&update) {
        ctx.push_cursor(command);
        waker.wake();
    }
}

// ── BridgePipeline ────────────────────────────────────────────────────────────

/// Handle to a capture loop running on its own OS thread.
pub struct BridgePipeline {
    stop:   Arc<AtomicBool>,
    handle: JoinHandle<Result<(), CaptureError>>,
}

impl BridgePipeline {
    /// Spawn the capture loop on a dedicated thread.
    pub fn spawn<S>(
        mut source: S,
        ctx: Arc<PipelineContext>,
        waker: Arc<dyn SinkWaker>,
        acquire_timeout: Duration,
    ) -> Result<Self, CaptureError>
    where
        S: CaptureSource + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let loop_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                let result =
                    run_capture_loop(&mut source, &ctx, waker.as_ref(), &loop_stop, acquire_timeout);
                if let Err(e) = &result {
                    error!("capture loop failed: {e}");
                }
                result
            })
            .map_err(|e| CaptureError::InitFailed {
                reason: format!("spawn capture thread: {e}"),
            })?;

        Ok(Self { stop, handle })
    }

    /// Ask the loop to exit after its current cycle.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the loop to finish and surface its outcome.
    pub fn join(self) -> Result<(), CaptureError> {
        self.handle.join().unwrap_or_else(|_| {
            Err(CaptureError::Backend { reason: "capture thread panicked".into() })
        })
    }
}
