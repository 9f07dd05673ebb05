//! Consumer-side plumbing: the wake-up primitive handed to the driver, and a
//! diagnostic sink that stands in for a protocol server during bring-up.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

use viewlink_core::{CursorCommand, PipelineContext, SinkWaker};

// ── NotifyWaker ───────────────────────────────────────────────────────────────

/// `SinkWaker` backed by `tokio::sync::Notify`, so an async consumer sleeps
/// between commands instead of busy-polling.
pub struct NotifyWaker {
    notify: Arc<Notify>,
}

impl NotifyWaker {
    pub fn new(notify: Arc<Notify>) -> Self {
        Self { notify }
    }
}

impl SinkWaker for NotifyWaker {
    fn wake(&self) {
        self.notify.notify_one();
    }
}

// ── Diagnostic sink ───────────────────────────────────────────────────────────

/// Drain both channels whenever the driver signals new work, logging each
/// command and releasing draw buffers immediately. Replaced wholesale once a
/// real protocol server polls the context instead.
pub async fn run_diagnostic_sink(ctx: Arc<PipelineContext>, notify: Arc<Notify>) {
    loop {
        notify.notified().await;

        while let Some(command) = ctx.poll_draw() {
            let bbox = command.bounding_box();
            debug!(
                asset = %command.release_id(),
                "draw ({},{})-({},{}) stride {} ({} bytes, {} pending)",
                bbox.left, bbox.top, bbox.right, bbox.bottom,
                command.row_stride(),
                command.pixels().len(),
                ctx.pending_draw(),
            );
            ctx.release(command.into_release_handle());
        }

        while let Some(command) = ctx.poll_cursor() {
            match command {
                CursorCommand::Move { x, y, visible } => {
                    debug!("cursor move ({x},{y}) visible={visible}");
                }
                CursorCommand::Set(shape) => {
                    debug!(
                        "cursor shape {}×{} {:?} ({} bytes)",
                        shape.width(),
                        shape.height(),
                        shape.encoding(),
                        shape.as_bytes().len(),
                    );
                }
            }
        }
    }
}
