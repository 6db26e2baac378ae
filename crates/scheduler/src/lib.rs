//! Frame scheduling primitive shared by every render loop.
//!
//! A render loop never owns a timer. Instead it asks a [`FrameScheduler`] for
//! the next frame and gets back a [`FrameRequest`] token. The host event loop
//! drains a [`FrameQueue`] once per displayed frame and hands each request to
//! whoever asked for it. Requests made while a batch is being dispatched land
//! in the following batch, which gives the same "schedule the next frame from
//! inside this frame" chain an animation-frame callback does, without storing
//! closures.

use std::fmt;

/// Identifies one drawing surface (main canvas, thumbnail, offscreen target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl SurfaceId {
    pub fn new(raw: u32) -> Self {
        SurfaceId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface:{}", self.0)
    }
}

/// Hands out unique surface ids for the lifetime of a host.
#[derive(Debug, Default)]
pub struct SurfaceAllocator {
    next: u32,
}

impl SurfaceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> SurfaceId {
        self.next = self.next.saturating_add(1);
        SurfaceId(self.next)
    }
}

/// Token for one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest {
    id: u64,
    surface: SurfaceId,
}

impl FrameRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }
}

/// The seam render loops schedule through.
pub trait FrameScheduler {
    /// Queues a callback for the next frame on `surface`.
    fn request_frame(&mut self, surface: SurfaceId) -> FrameRequest;

    /// Removes a queued callback. Returns `false` when the request already
    /// fired or was cancelled before.
    fn cancel_frame(&mut self, request: FrameRequest) -> bool;
}

/// Requests handed out for one displayed frame, in scheduling order.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    frame: u64,
    requests: Vec<FrameRequest>,
}

impl FrameBatch {
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[FrameRequest] {
        &self.requests
    }
}

impl IntoIterator for FrameBatch {
    type Item = FrameRequest;
    type IntoIter = std::vec::IntoIter<FrameRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.into_iter()
    }
}

/// Host-side animation frame queue.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_request: u64,
    frame: u64,
    pending: Vec<FrameRequest>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no surface is waiting for a frame.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_for(&self, surface: SurfaceId) -> usize {
        self.pending
            .iter()
            .filter(|request| request.surface == surface)
            .count()
    }

    /// Takes every request queued before this call.
    pub fn begin_frame(&mut self) -> FrameBatch {
        let requests = std::mem::take(&mut self.pending);
        let batch = FrameBatch {
            frame: self.frame,
            requests,
        };
        self.frame = self.frame.saturating_add(1);
        batch
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self, surface: SurfaceId) -> FrameRequest {
        self.next_request = self.next_request.saturating_add(1);
        let request = FrameRequest {
            id: self.next_request,
            surface,
        };
        if self.pending_for(surface) > 0 {
            tracing::warn!(
                %surface,
                request = request.id,
                "surface already has a pending frame; a render loop was not stopped"
            );
        }
        self.pending.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| *pending != request);
        before != self.pending.len()
    }
}
