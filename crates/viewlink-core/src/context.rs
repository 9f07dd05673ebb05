//! `PipelineContext` — the one object shared between the capture loop and the
//! protocol sink's polling context.
//!
//! It owns the two command channels and the production gate; both sides hold
//! it behind an `Arc` for the life of the process. Producer methods are
//! called only from the capture loop; `poll_*`, `pending_*` and `release` are
//! the sink-facing entry points and must return promptly from any thread.

use std::sync::Arc;

use crate::asset::{self, ReleaseHandle};
use crate::channel::CommandQueue;
use crate::command::{CursorCommand, DrawCommand};
use crate::gate::ProductionGate;

/// Invoked by the driver after every push so a polling sink can sleep
/// between commands instead of busy-polling.
pub trait SinkWaker: Send + Sync {
    fn wake(&self);
}

/// A waker for sinks that poll purely on their own cadence.
pub struct NoopWaker;

impl SinkWaker for NoopWaker {
    fn wake(&self) {}
}

#[derive(Default)]
pub struct PipelineContext {
    gate:   ProductionGate,
    draw:   CommandQueue<DrawCommand>,
    cursor: CommandQueue<CursorCommand>,
}

impl PipelineContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ── Producer side ─────────────────────────────────────────────────────

    pub fn push_draw(&self, command: DrawCommand) {
        let _gate = self.gate.enter();
        self.draw.push(command);
    }

    pub fn push_cursor(&self, command: CursorCommand) {
        let _gate = self.gate.enter();
        self.cursor.push(command);
    }

    // ── Sink side ─────────────────────────────────────────────────────────

    /// Non-blocking: returns the oldest pending draw command, or `None` when
    /// the queue is empty or the gate is contended this round.
    pub fn poll_draw(&self) -> Option<DrawCommand> {
        let mut gate = self.gate.try_enter()?;
        let command = self.draw.try_pop();
        gate.set_command_in_flight(command.is_some());
        command
    }

    /// Non-blocking: returns the oldest pending cursor command, or `None`.
    pub fn poll_cursor(&self) -> Option<CursorCommand> {
        let mut gate = self.gate.try_enter()?;
        let command = self.cursor.try_pop();
        gate.set_command_in_flight(command.is_some());
        command
    }

    /// Advisory "anything pending?" signal for the sink's scheduling.
    pub fn pending_draw(&self) -> usize {
        self.draw.len()
    }

    pub fn pending_cursor(&self) -> usize {
        self.cursor.len()
    }

    /// Report a consumed draw command's buffer free.
    pub fn release(&self, handle: ReleaseHandle) {
        asset::release(handle);
    }
}
