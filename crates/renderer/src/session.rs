use std::time::Instant;

use scheduler::{FrameRequest, FrameScheduler, SurfaceId};
use shaderlib::ShaderId;

use crate::compile::CompiledProgram;
use crate::driver::{RenderLoop, Tick};
use crate::gpu::{GraphicsContext, UniformValue};
use crate::types::{PixelSize, PointerState, Presentation, Tint};

/// Inputs sampled at tick time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub resolution: PixelSize,
    pub pointer: PointerState,
    pub presentation: Presentation,
}

/// One compiled program bound to one surface and driven by one loop.
#[derive(Debug)]
pub struct RenderSession {
    shader: ShaderId,
    program: CompiledProgram,
    driver: RenderLoop,
}

impl RenderSession {
    pub fn new(surface: SurfaceId, shader: ShaderId, program: CompiledProgram) -> Self {
        Self {
            shader,
            program,
            driver: RenderLoop::new(surface),
        }
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    pub fn surface(&self) -> SurfaceId {
        self.driver.surface()
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    pub fn frames(&self) -> u64 {
        self.driver.frames()
    }

    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler, now: Instant) {
        self.driver.start(scheduler, now);
    }

    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.driver.stop(scheduler);
    }

    /// Draws one frame if `request` is this session's pending frame, then
    /// schedules the next. Draw failures are logged and the loop keeps going.
    pub fn on_frame(
        &mut self,
        request: FrameRequest,
        now: Instant,
        inputs: &FrameInputs,
        ctx: &mut dyn GraphicsContext,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<Tick> {
        let tick = self.driver.begin_tick(request, now)?;

        let program = &self.program;
        let slots = *program.uniforms();
        program.set(ctx, slots.time, UniformValue::Float(tick.elapsed));
        program.set(
            ctx,
            slots.resolution,
            UniformValue::Vec2(inputs.resolution.as_vec2()),
        );
        program.set(
            ctx,
            slots.mouse,
            UniformValue::Vec2(inputs.pointer.as_uniform(inputs.resolution)),
        );

        let presentation = &inputs.presentation;
        let tint = presentation.tint.unwrap_or_else(Tint::transparent);
        program.set(ctx, slots.opacity, UniformValue::Float(presentation.opacity));
        program.set(ctx, slots.scale, UniformValue::Float(presentation.scale));
        program.set(ctx, slots.tint, UniformValue::Vec4(tint.as_vec4()));
        program.set(
            ctx,
            slots.vignette,
            UniformValue::Vec2([presentation.top_vignette, presentation.bottom_vignette]),
        );

        if let Err(err) = ctx.draw_strip(program.quad_draw()) {
            tracing::warn!(
                surface = %self.driver.surface(),
                shader = %self.shader,
                frame = tick.frame,
                error = %err,
                "draw failed"
            );
        }

        self.driver.end_tick(scheduler);
        Some(tick)
    }

    /// Stops the loop and releases the program.
    pub fn dispose(mut self, ctx: &mut dyn GraphicsContext, scheduler: &mut dyn FrameScheduler) {
        self.driver.stop(scheduler);
        self.program.dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::gpu::fake::{Call, FakeGpu};
    use scheduler::FrameQueue;
    use std::time::Duration;

    fn inputs() -> FrameInputs {
        FrameInputs {
            resolution: PixelSize::new(640, 480),
            pointer: PointerState::NEUTRAL,
            presentation: Presentation::IDENTITY,
        }
    }

    #[test]
    fn each_tick_pushes_uniforms_then_draws_once() {
        let mut gpu = FakeGpu::new();
        let log = gpu.log();
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(1);
        let def = ShaderId::FlowingWaves.definition();
        let program = compile(shaderlib::VERTEX_SOURCE, def.fragment_source, &mut gpu).unwrap();
        let handle = program.handle().0;
        let mut session = RenderSession::new(surface, def.id, program);

        let t0 = Instant::now();
        session.start(&mut queue, t0);
        let request = queue.begin_frame().requests()[0];
        let tick = session
            .on_frame(request, t0 + Duration::from_millis(500), &inputs(), &mut gpu, &mut queue)
            .expect("tick");
        assert!((tick.elapsed - 0.5).abs() < 1e-3);

        {
            let log = log.borrow();
            assert_eq!(log.uniform(handle, "iTime"), Some(UniformValue::Float(tick.elapsed)));
            assert_eq!(
                log.uniform(handle, "iResolution"),
                Some(UniformValue::Vec2([640.0, 480.0]))
            );
            assert_eq!(log.uniform(handle, "iMouse"), Some(UniformValue::Vec2([0.0, 0.0])));
            assert_eq!(log.calls.last(), Some(&Call::Draw { program: handle, vertices: 4 }));
        }
        assert_eq!(queue.pending_for(surface), 1);

        session.dispose(&mut gpu, &mut queue);
        assert!(queue.is_idle());
        assert_eq!(log.borrow().live_objects(), 0);
    }

    #[test]
    fn draw_errors_do_not_break_the_loop() {
        let mut gpu = FakeGpu::new().failing_draw();
        let mut queue = FrameQueue::new();
        let surface = SurfaceId::new(2);
        let program = compile(shaderlib::VERTEX_SOURCE, "void main() {}", &mut gpu).unwrap();
        let mut session = RenderSession::new(surface, ShaderId::Ether, program);
        let now = Instant::now();
        session.start(&mut queue, now);
        for _ in 0..2 {
            let request = queue.begin_frame().requests()[0];
            assert!(session.on_frame(request, now, &inputs(), &mut gpu, &mut queue).is_some());
        }
        assert_eq!(session.frames(), 2);
        session.dispose(&mut gpu, &mut queue);
    }
}
