//! The scroll-reactive background: one full-viewport canvas whose
//! presentation follows the document scroll position.
use std::time::Instant;

use sceneconfig::SceneConfig;
use scheduler::{FrameRequest, FrameScheduler, SurfaceId};
use shaderlib::{load_selected_shader, PreferenceStore, ShaderId};

use crate::canvas::{CanvasProps, ShaderCanvas};
use crate::driver::Tick;
use crate::error::RenderError;
use crate::gpu::GraphicsContext;
use crate::scroll::{ScrollController, ScrollMetrics, ScrollModel, ScrollState};
use crate::selector::SelectionChange;
use crate::timeline::PresentationAnimator;
use crate::types::PixelSize;

pub struct BackdropScene<S: PreferenceStore> {
    canvas: ShaderCanvas,
    scroll: ScrollController,
    animator: PresentationAnimator,
    store: S,
    selected: ShaderId,
}

impl<S: PreferenceStore> BackdropScene<S> {
    /// Reads the stored shader once and mounts the background canvas.
    #[allow(clippy::too_many_arguments)]
    pub fn mount(
        surface: SurfaceId,
        ctx: Result<Box<dyn GraphicsContext>, RenderError>,
        config: &SceneConfig,
        store: S,
        size: PixelSize,
        metrics: ScrollMetrics,
        scheduler: &mut dyn FrameScheduler,
        now: Instant,
    ) -> Self {
        let fallback = ShaderId::from_raw(i64::from(config.canvas.default_shader))
            .unwrap_or(ShaderId::DEFAULT);
        let selected = load_selected_shader(&store, fallback);

        let scroll = ScrollController::new(ScrollModel::new(config.scroll.clone()), metrics);
        let target = scroll.presentation();
        let animator = PresentationAnimator::new(&config.transitions, target, now);

        let props = CanvasProps::new(selected, size).interactive(config.canvas.interactive);
        let mut canvas = ShaderCanvas::mount(surface, ctx, props, scheduler, now);
        canvas.set_presentation(animator.sample(now));
        tracing::info!(shader = %selected, %size, progress = scroll.state().progress, "background mounted");

        Self {
            canvas,
            scroll,
            animator,
            store,
            selected,
        }
    }

    pub fn canvas(&self) -> &ShaderCanvas {
        &self.canvas
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selected(&self) -> ShaderId {
        self.selected
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.state()
    }

    pub fn scroll_metrics(&self) -> ScrollMetrics {
        self.scroll.metrics()
    }

    /// Feeds one scroll event. Returns `true` when the section changed.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        let changed = self.scroll.on_scroll(metrics);
        self.animator.retarget(self.scroll.presentation(), now);
        changed
    }

    pub fn resize(&mut self, size: PixelSize, scheduler: &mut dyn FrameScheduler, now: Instant) {
        let props = CanvasProps {
            size,
            ..self.canvas.props()
        };
        self.canvas.update(props, scheduler, now);
    }

    /// Persists the selection and switches the background shader.
    pub fn select_shader(
        &mut self,
        change: SelectionChange,
        scheduler: &mut dyn FrameScheduler,
        now: Instant,
    ) {
        if let Err(err) = self.store.write(change.id) {
            tracing::warn!(shader = %change.id, error = %err, "failed to store shader preference");
        }
        self.selected = change.id;
        let props = CanvasProps {
            shader: i64::from(change.id.raw()),
            ..self.canvas.props()
        };
        self.canvas.update(props, scheduler, now);
    }

    pub fn on_frame(
        &mut self,
        request: FrameRequest,
        now: Instant,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<Tick> {
        self.canvas.set_presentation(self.animator.sample(now));
        self.canvas.on_frame(request, now, scheduler)
    }

    /// Unmounts the canvas and hands the preference store back.
    pub fn unmount(self, scheduler: &mut dyn FrameScheduler) -> S {
        self.canvas.unmount(scheduler);
        self.store
    }
}
