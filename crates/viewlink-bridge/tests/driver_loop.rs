//! Capture-loop behavior against a scripted in-memory capture source.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use viewlink_bridge::driver::run_capture_loop;
use viewlink_core::context::{PipelineContext, SinkWaker};
use viewlink_core::errors::{CaptureError, ReadbackError};
use viewlink_core::geometry::Region;
use viewlink_core::source::{
    Acquisition, CaptureSource, ChangeMetadata, PointerShape, PointerShapeKind, PointerUpdate,
};
use viewlink_core::{CursorCommand, ReadbackBuffer};

// ── Scripted capture source ───────────────────────────────────────────────────

enum Step {
    Timeout,
    Frame { changes: ChangeMetadata, pointer: Option<PointerUpdate> },
    Fatal(CaptureError),
}

#[derive(Default)]
struct Stats {
    released_frames: usize,
    regions_read:    Vec<Region>,
}

struct ScriptedFrame {
    pointer: Option<PointerUpdate>,
}

struct ScriptedSource {
    script:       VecDeque<Step>,
    row_pad:      usize,
    fail_regions: HashSet<Region>,
    stats:        Arc<Mutex<Stats>>,
    stop:         Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(script: Vec<Step>) -> (Self, Arc<Mutex<Stats>>, Arc<AtomicBool>) {
        let stats = Arc::new(Mutex::new(Stats::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let source = Self {
            script:       script.into(),
            row_pad:      0,
            fail_regions: HashSet::new(),
            stats:        Arc::clone(&stats),
            stop:         Arc::clone(&stop),
        };
        (source, stats, stop)
    }
}

impl CaptureSource for ScriptedSource {
    type Frame = ScriptedFrame;

    fn acquire(&mut self, _timeout: Duration) -> Result<Acquisition<ScriptedFrame>, CaptureError> {
        match self.script.pop_front() {
            None => {
                // Script exhausted: ask the loop to wind down.
                self.stop.store(true, Ordering::Relaxed);
                Ok(Acquisition::Timeout)
            }
            Some(Step::Timeout) => Ok(Acquisition::Timeout),
            Some(Step::Fatal(e)) => Err(e),
            Some(Step::Frame { changes, pointer }) => {
                Ok(Acquisition::Frame { frame: ScriptedFrame { pointer }, changes })
            }
        }
    }

    fn read_region(
        &mut self,
        _frame: &ScriptedFrame,
        region: Region,
    ) -> Result<ReadbackBuffer, ReadbackError> {
        if self.fail_regions.contains(&region) {
            return Err(ReadbackError::RegionCopy { reason: "scripted failure".into() });
        }
        self.stats.lock().unwrap().regions_read.push(region);

        let stride = region.width() as usize * 4 + self.row_pad;
        let marker = (region.left() & 0xFF) as u8;
        Ok(ReadbackBuffer::from_vec(
            vec![marker; region.height() as usize * stride],
            stride,
            region.height() as usize,
        ))
    }

    fn pointer_update(&mut self, frame: &ScriptedFrame) -> Option<PointerUpdate> {
        frame.pointer.clone()
    }

    fn release(&mut self, _frame: ScriptedFrame) -> Result<(), CaptureError> {
        self.stats.lock().unwrap().released_frames += 1;
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

struct CountingWaker(Arc<AtomicUsize>);

impl SinkWaker for CountingWaker {
    fn wake(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn rect_bytes(l: i32, t: i32, r: i32, b: i32) -> Vec<u8> {
    [l, t, r, b].iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn dirty_metadata(rects: &[(i32, i32, i32, i32)]) -> ChangeMetadata {
    let blob: Vec<u8> = rects.iter().flat_map(|&(l, t, r, b)| rect_bytes(l, t, r, b)).collect();
    ChangeMetadata { move_count: 0, dirty_count: rects.len(), blob: Bytes::from(blob) }
}

fn run(source: &mut ScriptedSource, stop: &AtomicBool) -> (Arc<PipelineContext>, usize, Result<(), CaptureError>) {
    let ctx = PipelineContext::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    let waker = CountingWaker(Arc::clone(&wakes));
    let result = run_capture_loop(source, &ctx, &waker, stop, Duration::from_millis(1));
    (ctx, wakes.load(Ordering::SeqCst), result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn two_regions_become_two_draw_commands_in_order() {
    let changes = dirty_metadata(&[(0, 0, 64, 32), (100, 200, 116, 210)]);
    let (mut source, stats, stop) = ScriptedSource::new(vec![Step::Frame { changes, pointer: None }]);
    source.row_pad = 24;

    let (ctx, wakes, result) = run(&mut source, &stop);
    result.unwrap();

    let first = ctx.poll_draw().expect("first draw command");
    let bbox = first.bounding_box();
    assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (0, 0, 63, 31));
    assert_eq!(first.row_stride(), 64 * 4 + 24);
    assert_eq!(first.pixels().len(), 32 * (64 * 4 + 24));

    let second = ctx.poll_draw().expect("second draw command");
    let bbox = second.bounding_box();
    assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (100, 200, 115, 209));
    assert_eq!(second.pixels().len(), 10 * (16 * 4 + 24));

    assert!(ctx.poll_draw().is_none());
    assert_eq!(wakes, 2, "one wake per pushed command");
    assert_eq!(stats.lock().unwrap().released_frames, 1);

    ctx.release(first.into_release_handle());
    ctx.release(second.into_release_handle());
}

#[test]
fn acquisition_timeout_is_a_noop_cycle() {
    let (mut source, stats, stop) = ScriptedSource::new(vec![Step::Timeout, Step::Timeout]);

    let (ctx, wakes, result) = run(&mut source, &stop);
    result.unwrap();

    assert_eq!(ctx.pending_draw(), 0);
    assert_eq!(ctx.pending_cursor(), 0);
    assert_eq!(wakes, 0);
    assert_eq!(stats.lock().unwrap().released_frames, 0, "no frame was acquired, none released");
}

#[test]
fn truncated_metadata_aborts_that_frame_only() {
    let mut bad = dirty_metadata(&[(0, 0, 8, 8)]);
    bad.dirty_count = 3; // count inconsistent with blob size
    let good = dirty_metadata(&[(4, 4, 12, 12)]);

    let (mut source, stats, stop) = ScriptedSource::new(vec![
        Step::Frame { changes: bad, pointer: None },
        Step::Frame { changes: good, pointer: None },
    ]);

    let (ctx, _, result) = run(&mut source, &stop);
    result.unwrap();

    let only = ctx.poll_draw().expect("command from the healthy frame");
    assert_eq!(only.bounding_box().left, 4);
    assert!(ctx.poll_draw().is_none());

    let stats = stats.lock().unwrap();
    assert_eq!(stats.released_frames, 2, "rejected frame still goes back to the backend");
    assert_eq!(stats.regions_read.len(), 1);
    ctx.release(only.into_release_handle());
}

#[test]
fn failed_region_readback_skips_only_that_region() {
    let changes = dirty_metadata(&[(0, 0, 8, 8), (8, 0, 16, 8), (16, 0, 24, 8)]);
    let (mut source, _, stop) = ScriptedSource::new(vec![Step::Frame { changes, pointer: None }]);
    source.fail_regions.insert(Region::from_bounds(8, 0, 16, 8).unwrap());

    let (ctx, wakes, result) = run(&mut source, &stop);
    result.unwrap();

    let lefts: Vec<i32> = std::iter::from_fn(|| ctx.poll_draw())
        .map(|cmd| {
            let left = cmd.bounding_box().left;
            ctx.release(cmd.into_release_handle());
            left
        })
        .collect();
    assert_eq!(lefts, vec![0, 16], "surviving regions keep their order");
    assert_eq!(wakes, 2);
}

#[test]
fn pointer_state_becomes_move_then_set() {
    let pointer = PointerUpdate {
        last_update: 77,
        x:           320,
        y:           240,
        visible:     true,
        shape:       Some(PointerShape {
            kind:   PointerShapeKind::Monochrome,
            width:  32,
            height: 64,
            hot_x:  1,
            hot_y:  2,
            data:   Bytes::from(vec![0xAA; 4 * 64]),
        }),
    };
    let (mut source, _, stop) = ScriptedSource::new(vec![Step::Frame {
        changes: ChangeMetadata::empty(),
        pointer: Some(pointer),
    }]);

    let (ctx, wakes, result) = run(&mut source, &stop);
    result.unwrap();

    match ctx.poll_cursor().expect("move command") {
        CursorCommand::Move { x, y, visible } => {
            assert_eq!((x, y), (320, 240));
            assert!(visible);
        }
        CursorCommand::Set(_) => panic!("move must precede set"),
    }
    match ctx.poll_cursor().expect("set command") {
        CursorCommand::Set(shape) => {
            assert_eq!(shape.height(), 32, "monochrome height is halved");
            assert_eq!(shape.payload().len(), 4 * 64);
        }
        CursorCommand::Move { .. } => panic!("expected the shape command"),
    }
    assert!(ctx.poll_cursor().is_none());
    assert_eq!(wakes, 2);
}

#[test]
fn unchanged_pointer_produces_no_commands() {
    let pointer = PointerUpdate { last_update: 0, x: 0, y: 0, visible: false, shape: None };
    let (mut source, _, stop) = ScriptedSource::new(vec![Step::Frame {
        changes: ChangeMetadata::empty(),
        pointer: Some(pointer),
    }]);

    let (ctx, wakes, result) = run(&mut source, &stop);
    result.unwrap();
    assert_eq!(ctx.pending_cursor(), 0);
    assert_eq!(wakes, 0);
}

#[test]
fn fatal_acquisition_error_ends_the_loop_with_err() {
    let changes = dirty_metadata(&[(0, 0, 4, 4)]);
    let (mut source, stats, stop) = ScriptedSource::new(vec![
        Step::Frame { changes, pointer: None },
        Step::Fatal(CaptureError::AccessLost { reason: "desktop switched".into() }),
    ]);

    let (ctx, _, result) = run(&mut source, &stop);
    assert!(matches!(result, Err(CaptureError::AccessLost { .. })));

    // Work produced before the failure is still deliverable.
    let survivor = ctx.poll_draw().expect("command from the frame before the failure");
    ctx.release(survivor.into_release_handle());
    assert_eq!(stats.lock().unwrap().released_frames, 1);
}

#[test]
fn raised_stop_flag_exits_before_acquiring() {
    let (mut source, stats, stop) = ScriptedSource::new(vec![Step::Frame {
        changes: dirty_metadata(&[(0, 0, 4, 4)]),
        pointer: None,
    }]);
    stop.store(true, Ordering::Relaxed);

    let (ctx, _, result) = run(&mut source, &stop);
    result.unwrap();
    assert_eq!(ctx.pending_draw(), 0);
    assert_eq!(stats.lock().unwrap().released_frames, 0);
}
