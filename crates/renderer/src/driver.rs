//! Per-surface render loop state machine.
//!
//! A running loop always holds exactly one pending [`FrameRequest`]. When the
//! host dispatches that request the loop produces a [`Tick`]; once the frame
//! is drawn, [`RenderLoop::end_tick`] schedules the next one. Any request that
//! is not the current pending one (cancelled, stale, another surface) is
//! ignored, which keeps ticks strictly sequential.
use std::time::Instant;

use scheduler::{FrameRequest, FrameScheduler, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running {
        started: Instant,
        pending: Option<FrameRequest>,
    },
}

/// One dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Seconds since the loop started, from a monotonic clock.
    pub elapsed: f32,
    /// Zero-based frame counter of this loop.
    pub frame: u64,
}

#[derive(Debug)]
pub struct RenderLoop {
    surface: SurfaceId,
    state: LoopState,
    frames: u64,
}

impl RenderLoop {
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            state: LoopState::Idle,
            frames: 0,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        match self.state {
            LoopState::Running { pending, .. } => pending,
            LoopState::Idle => None,
        }
    }

    /// Captures `t0` and schedules the first frame. Starting a running loop
    /// is a no-op.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler, now: Instant) {
        if self.is_running() {
            return;
        }
        let request = scheduler.request_frame(self.surface);
        self.frames = 0;
        self.state = LoopState::Running {
            started: now,
            pending: Some(request),
        };
        tracing::debug!(surface = %self.surface, "render loop started");
    }

    /// Cancels the pending frame. Safe to call any number of times.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let LoopState::Running { pending, .. } = self.state {
            if let Some(request) = pending {
                scheduler.cancel_frame(request);
            }
            self.state = LoopState::Idle;
            tracing::debug!(surface = %self.surface, frames = self.frames, "render loop stopped");
        }
    }

    /// Accepts `request` if it is this loop's pending frame.
    pub fn begin_tick(&mut self, request: FrameRequest, now: Instant) -> Option<Tick> {
        let LoopState::Running { started, pending } = &mut self.state else {
            return None;
        };
        if *pending != Some(request) {
            return None;
        }
        *pending = None;
        let elapsed = now.saturating_duration_since(*started);
        let tick = Tick {
            elapsed: elapsed.as_secs_f32(),
            frame: self.frames,
        };
        self.frames = self.frames.saturating_add(1);
        Some(tick)
    }

    /// Schedules the frame after the one just drawn. Does nothing when the
    /// loop was stopped during the tick.
    pub fn end_tick(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let LoopState::Running { pending, .. } = &mut self.state {
            if pending.is_none() {
                *pending = Some(scheduler.request_frame(self.surface));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler::FrameQueue;
    use std::time::Duration;

    #[test]
    fn ticks_chain_one_frame_at_a_time() {
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(1);
        let mut driver = RenderLoop::new(surface);
        let t0 = Instant::now();
        driver.start(&mut queue, t0);

        for expected in 0..3u64 {
            let batch = queue.begin_frame();
            assert_eq!(batch.len(), 1);
            let request = batch.requests()[0];
            let now = t0 + Duration::from_millis(16 * (expected + 1));
            let tick = driver.begin_tick(request, now).expect("pending frame");
            assert_eq!(tick.frame, expected);
            assert!(tick.elapsed > 0.0);
            assert_eq!(queue.pending(), 0);
            driver.end_tick(&mut queue);
        }
        assert_eq!(driver.frames(), 3);
    }

    #[test]
    fn stop_is_idempotent_and_leaves_nothing_pending() {
        let mut queue = FrameQueue::new();
        let mut driver = RenderLoop::new(SurfaceId::new(2));
        driver.start(&mut queue, Instant::now());
        driver.stop(&mut queue);
        driver.stop(&mut queue);
        assert!(!driver.is_running());
        assert!(queue.is_idle());
    }

    #[test]
    fn stale_requests_are_ignored() {
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(3);
        let mut driver = RenderLoop::new(surface);
        let now = Instant::now();
        driver.start(&mut queue, now);
        let first = queue.begin_frame().requests()[0];
        driver.stop(&mut queue);
        assert!(driver.begin_tick(first, now).is_none());

        driver.start(&mut queue, now);
        assert!(driver.begin_tick(first, now).is_none());
        let second = queue.begin_frame().requests()[0];
        assert!(driver.begin_tick(second, now).is_some());
    }

    #[test]
    fn starting_twice_keeps_one_pending_frame() {
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(4);
        let mut driver = RenderLoop::new(surface);
        driver.start(&mut queue, Instant::now());
        driver.start(&mut queue, Instant::now());
        assert_eq!(queue.pending_for(surface), 1);
    }

    #[test]
    fn stop_during_tick_suppresses_reschedule() {
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(5);
        let mut driver = RenderLoop::new(surface);
        let now = Instant::now();
        driver.start(&mut queue, now);
        let request = queue.begin_frame().requests()[0];
        driver.begin_tick(request, now).expect("tick");
        driver.stop(&mut queue);
        driver.end_tick(&mut queue);
        assert!(queue.is_idle());
    }
}
