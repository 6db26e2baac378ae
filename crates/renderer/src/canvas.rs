//! A drawing surface that owns one render session at a time.
//!
//! The canvas reacts to prop changes the way a component effect would: a new
//! shader id or a toggled `interactive` flag builds a fresh session (compile
//! first, then stop the old loop, then start the new one), while a size change
//! only moves the viewport. Failures never escape: an unknown id keeps the
//! running session, a compile error leaves the surface blank and a missing
//! graphics context leaves it static.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use scheduler::{FrameRequest, FrameScheduler, SurfaceId};
use shaderlib::{ShaderId, VERTEX_SOURCE};

use crate::compile::compile;
use crate::driver::Tick;
use crate::error::RenderError;
use crate::gpu::GraphicsContext;
use crate::session::{FrameInputs, RenderSession};
use crate::types::{PixelSize, PointerState, Presentation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasStatus {
    /// A session is running.
    Rendering,
    /// No program: compile failure or no valid shader yet.
    Blank,
    /// No graphics context; nothing will ever be drawn.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasProps {
    /// Raw registry id, validated on every rebuild.
    pub shader: i64,
    pub interactive: bool,
    pub size: PixelSize,
}

impl CanvasProps {
    pub fn new(shader: ShaderId, size: PixelSize) -> Self {
        Self {
            shader: i64::from(shader.raw()),
            interactive: false,
            size,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

/// Pointer listener handed to the host; writes are sampled at tick time.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    state: Rc<Cell<PointerState>>,
}

impl PointerTracker {
    pub fn moved(&self, x: f32, y: f32) {
        self.state.set(PointerState::new(x, y));
    }

    pub fn left(&self) {
        self.state.set(PointerState::NEUTRAL);
    }

    pub fn get(&self) -> PointerState {
        self.state.get()
    }
}

pub struct ShaderCanvas {
    surface: SurfaceId,
    ctx: Option<Box<dyn GraphicsContext>>,
    props: CanvasProps,
    presentation: Presentation,
    session: Option<RenderSession>,
    pointer: Option<PointerTracker>,
    status: CanvasStatus,
}

impl ShaderCanvas {
    pub fn mount(
        surface: SurfaceId,
        ctx: Result<Box<dyn GraphicsContext>, RenderError>,
        props: CanvasProps,
        scheduler: &mut dyn FrameScheduler,
        now: Instant,
    ) -> Self {
        let ctx = match ctx {
            Ok(mut ctx) => {
                ctx.set_viewport(props.size);
                Some(ctx)
            }
            Err(err) => {
                tracing::warn!(%surface, error = %err, "no graphics context; canvas stays static");
                None
            }
        };
        let status = if ctx.is_some() {
            CanvasStatus::Blank
        } else {
            CanvasStatus::Static
        };
        let mut canvas = Self {
            surface,
            ctx,
            props,
            presentation: Presentation::IDENTITY,
            session: None,
            pointer: None,
            status,
        };
        canvas.sync_pointer();
        canvas.rebuild(scheduler, now);
        canvas
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn props(&self) -> CanvasProps {
        self.props
    }

    pub fn status(&self) -> CanvasStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(RenderSession::is_running)
    }

    /// Shader of the running session, if any.
    pub fn shader(&self) -> Option<ShaderId> {
        self.session.as_ref().map(RenderSession::shader)
    }

    pub fn frames(&self) -> u64 {
        self.session.as_ref().map_or(0, RenderSession::frames)
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    /// Listener to feed pointer events into, present only while interactive.
    pub fn pointer_listener(&self) -> Option<PointerTracker> {
        self.pointer.clone()
    }

    pub fn set_presentation(&mut self, presentation: Presentation) {
        self.presentation = presentation;
    }

    pub fn update(&mut self, props: CanvasProps, scheduler: &mut dyn FrameScheduler, now: Instant) {
        let previous = std::mem::replace(&mut self.props, props);
        if previous.size != props.size {
            if let Some(ctx) = self.ctx.as_deref_mut() {
                ctx.set_viewport(props.size);
            }
            tracing::debug!(surface = %self.surface, size = %props.size, "canvas resized");
        }
        if previous.shader != props.shader || previous.interactive != props.interactive {
            self.sync_pointer();
            self.rebuild(scheduler, now);
        }
    }

    /// Routes a dispatched frame to the session it belongs to.
    pub fn on_frame(
        &mut self,
        request: FrameRequest,
        now: Instant,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<Tick> {
        if request.surface() != self.surface {
            return None;
        }
        let ctx = self.ctx.as_deref_mut()?;
        let session = self.session.as_mut()?;
        let inputs = FrameInputs {
            resolution: self.props.size,
            pointer: self
                .pointer
                .as_ref()
                .map_or(PointerState::NEUTRAL, PointerTracker::get),
            presentation: self.presentation,
        };
        session.on_frame(request, now, &inputs, ctx, scheduler)
    }

    /// Stops the loop, releases GPU objects and detaches the pointer listener.
    pub fn unmount(mut self, scheduler: &mut dyn FrameScheduler) {
        if let (Some(session), Some(ctx)) = (self.session.take(), self.ctx.as_deref_mut()) {
            session.dispose(ctx, scheduler);
        }
        self.pointer = None;
        tracing::debug!(surface = %self.surface, "canvas unmounted");
    }

    fn sync_pointer(&mut self) {
        match (self.props.interactive, self.pointer.is_some()) {
            (true, false) => self.pointer = Some(PointerTracker::default()),
            (false, true) => self.pointer = None,
            _ => {}
        }
    }

    fn rebuild(&mut self, scheduler: &mut dyn FrameScheduler, now: Instant) {
        let Some(ctx) = self.ctx.as_deref_mut() else {
            return;
        };

        let shader = match ShaderId::from_raw(self.props.shader) {
            Ok(shader) => shader,
            Err(_) => {
                let err = RenderError::ShaderSourceMissing(self.props.shader);
                tracing::warn!(surface = %self.surface, error = %err, "keeping current shader");
                if self.session.is_none() {
                    self.status = CanvasStatus::Blank;
                }
                return;
            }
        };

        let definition = shader.definition();
        match compile(VERTEX_SOURCE, definition.fragment_source, ctx) {
            Ok(program) => {
                let mut next = RenderSession::new(self.surface, shader, program);
                if let Some(prior) = self.session.take() {
                    prior.dispose(ctx, scheduler);
                }
                next.start(scheduler, now);
                self.session = Some(next);
                self.status = CanvasStatus::Rendering;
                tracing::info!(surface = %self.surface, shader = definition.name, "shader session started");
            }
            Err(err) => {
                tracing::error!(
                    surface = %self.surface,
                    shader = definition.name,
                    stage = %err.stage,
                    log = %err.log,
                    "shader compile failed"
                );
                if let Some(prior) = self.session.take() {
                    prior.dispose(ctx, scheduler);
                }
                ctx.clear();
                self.status = CanvasStatus::Blank;
            }
        }
    }
}
