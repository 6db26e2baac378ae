//! Miniature preview per registry entry.
//!
//! Every thumbnail is a full [`ShaderCanvas`] with its own surface, context,
//! program and loop, so a thumbnail that fails to compile only blanks itself.
use std::time::Instant;

use scheduler::{FrameRequest, FrameScheduler, SurfaceAllocator, SurfaceId};
use shaderlib::{definitions, ShaderId};

use crate::canvas::{CanvasProps, CanvasStatus, ShaderCanvas};
use crate::driver::Tick;
use crate::error::RenderError;
use crate::gpu::GraphicsContext;
use crate::types::{PixelSize, Presentation};

/// Opacity of thumbnails that are not under the pointer while another one is.
pub const DIMMED_OPACITY: f32 = 0.6;

/// Emitted on every selection, also when the id is already selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub id: ShaderId,
}

pub struct Thumbnail {
    id: ShaderId,
    canvas: ShaderCanvas,
}

impl Thumbnail {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn surface(&self) -> SurfaceId {
        self.canvas.surface()
    }

    pub fn status(&self) -> CanvasStatus {
        self.canvas.status()
    }

    pub fn canvas(&self) -> &ShaderCanvas {
        &self.canvas
    }
}

pub struct ShaderSelector {
    thumbnails: Vec<Thumbnail>,
    selected: ShaderId,
    hovered: Option<ShaderId>,
}

impl ShaderSelector {
    /// Mounts one non-interactive canvas per registry entry. `contexts` is
    /// asked for a fresh graphics context per thumbnail surface.
    pub fn mount<F>(
        mut contexts: F,
        allocator: &mut SurfaceAllocator,
        size: u32,
        selected: ShaderId,
        scheduler: &mut dyn FrameScheduler,
        now: Instant,
    ) -> Self
    where
        F: FnMut(SurfaceId) -> Result<Box<dyn GraphicsContext>, RenderError>,
    {
        let size = PixelSize::square(size);
        let thumbnails = definitions()
            .iter()
            .map(|definition| {
                let surface = allocator.allocate();
                let props = CanvasProps::new(definition.id, size);
                let canvas = ShaderCanvas::mount(surface, contexts(surface), props, scheduler, now);
                if canvas.status() != CanvasStatus::Rendering {
                    tracing::warn!(
                        shader = definition.name,
                        %surface,
                        status = ?canvas.status(),
                        "thumbnail not rendering"
                    );
                }
                Thumbnail {
                    id: definition.id,
                    canvas,
                }
            })
            .collect();
        Self {
            thumbnails,
            selected,
            hovered: None,
        }
    }

    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    pub fn selected(&self) -> ShaderId {
        self.selected
    }

    pub fn hovered(&self) -> Option<ShaderId> {
        self.hovered
    }

    pub fn select(&mut self, id: ShaderId) -> SelectionChange {
        self.selected = id;
        tracing::debug!(shader = %id, "thumbnail selected");
        SelectionChange { id }
    }

    pub fn hover(&mut self, id: Option<ShaderId>) {
        if self.hovered == id {
            return;
        }
        self.hovered = id;
        for index in 0..self.thumbnails.len() {
            let opacity = self.thumbnail_opacity(self.thumbnails[index].id);
            self.thumbnails[index].canvas.set_presentation(Presentation {
                opacity,
                ..Presentation::IDENTITY
            });
        }
    }

    pub fn thumbnail_opacity(&self, id: ShaderId) -> f32 {
        match self.hovered {
            Some(hovered) if hovered != id => DIMMED_OPACITY,
            _ => 1.0,
        }
    }

    /// Routes `request` to the thumbnail that owns its surface.
    pub fn on_frame(
        &mut self,
        request: FrameRequest,
        now: Instant,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<Tick> {
        self.thumbnails
            .iter_mut()
            .find(|thumbnail| thumbnail.canvas.surface() == request.surface())
            .and_then(|thumbnail| thumbnail.canvas.on_frame(request, now, scheduler))
    }

    pub fn unmount(self, scheduler: &mut dyn FrameScheduler) {
        for thumbnail in self.thumbnails {
            thumbnail.canvas.unmount(scheduler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::fake::{FakeGpu, FakeLog};
    use crate::gpu::UniformValue;
    use scheduler::FrameQueue;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn failing_thumbnail_does_not_affect_the_others() {
        let mut queue = FrameQueue::new();
        let mut allocator = SurfaceAllocator::new();
        let mut logs: Vec<Rc<RefCell<FakeLog>>> = Vec::new();
        let selector = ShaderSelector::mount(
            |_surface| {
                let gpu = FakeGpu::new().failing_on("mat2 m(");
                logs.push(gpu.log());
                Ok(Box::new(gpu) as Box<dyn GraphicsContext>)
            },
            &mut allocator,
            48,
            ShaderId::DEFAULT,
            &mut queue,
            Instant::now(),
        );

        let statuses: Vec<_> = selector
            .thumbnails()
            .iter()
            .map(|thumbnail| (thumbnail.id(), thumbnail.status()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (ShaderId::FlowingWaves, CanvasStatus::Rendering),
                (ShaderId::Ether, CanvasStatus::Blank),
            ]
        );
        assert_eq!(queue.pending(), 1);
        selector.unmount(&mut queue);
        assert!(queue.is_idle());
        assert!(logs.iter().all(|log| log.borrow().live_objects() == 0));
    }

    #[test]
    fn thumbnails_render_square_with_neutral_mouse() {
        let mut queue = FrameQueue::new();
        let mut allocator = SurfaceAllocator::new();
        let mut logs = Vec::new();
        let mut selector = ShaderSelector::mount(
            |_surface| {
                let gpu = FakeGpu::new();
                logs.push(gpu.log());
                Ok(Box::new(gpu) as Box<dyn GraphicsContext>)
            },
            &mut allocator,
            48,
            ShaderId::Ether,
            &mut queue,
            Instant::now(),
        );
        assert_eq!(queue.pending(), 2);

        let now = Instant::now();
        let ticks = queue
            .begin_frame()
            .into_iter()
            .filter_map(|request| selector.on_frame(request, now, &mut queue))
            .count();
        assert_eq!(ticks, 2);

        for log in &logs {
            let log = log.borrow();
            let (&(program, _), _) = log.uniforms.iter().next().unwrap();
            assert_eq!(log.uniform(program, "iMouse"), Some(UniformValue::Vec2([0.0, 0.0])));
            assert_eq!(log.uniform(program, "iResolution"), Some(UniformValue::Vec2([48.0, 48.0])));
        }
        assert!(selector
            .thumbnails()
            .iter()
            .all(|thumbnail| thumbnail.canvas().pointer_listener().is_none()));
        selector.unmount(&mut queue);
    }

    #[test]
    fn select_always_emits_and_hover_dims_the_rest() {
        let mut queue = FrameQueue::new();
        let mut allocator = SurfaceAllocator::new();
        let mut selector = ShaderSelector::mount(
            |_surface| Ok(Box::new(FakeGpu::new()) as Box<dyn GraphicsContext>),
            &mut allocator,
            48,
            ShaderId::FlowingWaves,
            &mut queue,
            Instant::now(),
        );

        assert_eq!(selector.select(ShaderId::FlowingWaves).id, ShaderId::FlowingWaves);
        assert_eq!(selector.select(ShaderId::Ether).id, ShaderId::Ether);
        assert_eq!(selector.selected(), ShaderId::Ether);

        selector.hover(Some(ShaderId::Ether));
        assert_eq!(selector.thumbnail_opacity(ShaderId::Ether), 1.0);
        assert_eq!(selector.thumbnail_opacity(ShaderId::FlowingWaves), DIMMED_OPACITY);
        let waves = &selector.thumbnails()[0];
        assert_eq!(waves.canvas().presentation().opacity, DIMMED_OPACITY);

        selector.hover(None);
        assert!(selector.thumbnails()[0].canvas().presentation().is_identity());
        selector.unmount(&mut queue);
    }

    #[test]
    fn missing_context_leaves_thumbnail_static() {
        let mut queue = FrameQueue::new();
        let mut allocator = SurfaceAllocator::new();
        let selector = ShaderSelector::mount(
            |surface| {
                if surface.raw() == 1 {
                    Err(RenderError::ContextUnavailable("lost".into()))
                } else {
                    Ok(Box::new(FakeGpu::new()) as Box<dyn GraphicsContext>)
                }
            },
            &mut allocator,
            32,
            ShaderId::DEFAULT,
            &mut queue,
            Instant::now(),
        );
        assert_eq!(selector.thumbnails()[0].status(), CanvasStatus::Static);
        assert_eq!(selector.thumbnails()[1].status(), CanvasStatus::Rendering);
        selector.unmount(&mut queue);
    }
}
