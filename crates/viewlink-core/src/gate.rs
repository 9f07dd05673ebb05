//! The production gate: the locking discipline serializing queue mutation
//! between the capture loop and the sink's polling context.
//!
//! One process-wide lock guards every push and the flag update bracketing
//! every pop. The consumer acquires it with a non-blocking attempt and simply
//! declines to report a command when the attempt fails, keeping its poll
//! callback cheap under contention. The producer acquires it blocking: a
//! command must never be dropped, and the wait is bounded by the consumer's
//! few-instruction critical section.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct GateState {
    /// True while the most recent poll handed a command to the sink. Only
    /// ever written under the lock.
    command_in_flight: bool,
}

#[derive(Debug, Default)]
pub struct ProductionGate {
    state: Mutex<GateState>,
}

impl ProductionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer-side entry. Blocks until the gate is free.
    pub fn enter(&self) -> GateGuard<'_> {
        GateGuard { state: self.state.lock().unwrap() }
    }

    /// Consumer-side entry. Never waits: `None` means the other side holds
    /// the gate and this poll round reports nothing.
    pub fn try_enter(&self) -> Option<GateGuard<'_>> {
        self.state.try_lock().ok().map(|state| GateGuard { state })
    }
}

pub struct GateGuard<'a> {
    state: MutexGuard<'a, GateState>,
}

impl GateGuard<'_> {
    pub fn set_command_in_flight(&mut self, in_flight: bool) {
        self.state.command_in_flight = in_flight;
    }

    pub fn command_in_flight(&self) -> bool {
        self.state.command_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_enter_declines_while_held() {
        let gate = ProductionGate::new();
        let held = gate.enter();
        assert!(gate.try_enter().is_none());
        drop(held);
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn in_flight_flag_is_written_under_the_lock() {
        let gate = ProductionGate::new();
        {
            let mut g = gate.enter();
            g.set_command_in_flight(true);
            assert!(g.command_in_flight());
        }
        let g = gate.try_enter().unwrap();
        assert!(g.command_in_flight());
    }
}
