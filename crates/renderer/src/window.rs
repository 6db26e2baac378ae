//! Native preview window.
//!
//! The window stands in for the page: its height is the viewport, a virtual
//! document of `document_height` pixels is scrolled with the wheel or the
//! keyboard. A [`ShaderSelector`] renders its thumbnails offscreen on the same
//! device; digit keys select through it and the scene applies the change.
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use sceneconfig::SceneConfig;
use scheduler::{FrameQueue, SurfaceAllocator};
use shaderlib::{PreferenceStore, ShaderId};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::error::RenderError;
use crate::gpu::{GpuDevice, GraphicsContext, WgpuContext};
use crate::scene::BackdropScene;
use crate::scroll::ScrollMetrics;
use crate::selector::ShaderSelector;
use crate::types::PixelSize;

/// Pixels scrolled per wheel line or arrow key press.
const LINE_HEIGHT: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub size: PixelSize,
    /// Overrides the stored preference; the override is persisted like any
    /// other selection.
    pub shader: Option<ShaderId>,
    pub interactive: Option<bool>,
    pub document_height: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            size: PixelSize::new(1280, 720),
            shader: None,
            interactive: None,
            document_height: 3600.0,
        }
    }
}

struct Preview<S: PreferenceStore> {
    scene: BackdropScene<S>,
    selector: ShaderSelector,
}

impl<S: PreferenceStore> Preview<S> {
    fn select(&mut self, id: ShaderId, queue: &mut FrameQueue, now: Instant) {
        let change = self.selector.select(id);
        self.scene.select_shader(change, queue, now);
    }

    fn unmount(self, queue: &mut FrameQueue) {
        self.selector.unmount(queue);
        self.scene.unmount(queue);
    }
}

enum ScrollCommand {
    By(f64),
    Top,
    Bottom,
}

/// Opens the preview window and blocks until it is closed.
pub fn run_preview<S>(mut config: SceneConfig, store: S, options: PreviewOptions) -> Result<()>
where
    S: PreferenceStore + 'static,
{
    if let Some(interactive) = options.interactive {
        config.canvas.interactive = interactive;
    }

    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title("backdrop preview")
        .with_inner_size(PhysicalSize::new(options.size.width, options.size.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let initial = PixelSize::new(window.inner_size().width, window.inner_size().height);
    let (gpu, ctx) = create_context(window.clone(), initial);
    let mut queue = FrameQueue::new();
    let mut surfaces = SurfaceAllocator::new();
    let metrics = document_metrics(0.0, options.document_height, initial);

    let now = Instant::now();
    let scene = BackdropScene::mount(
        surfaces.allocate(),
        ctx,
        &config,
        store,
        initial,
        metrics,
        &mut queue,
        now,
    );
    let thumbnail = PixelSize::square(config.canvas.thumbnail_size);
    let selector = ShaderSelector::mount(
        |_surface| thumbnail_context(gpu.as_ref(), thumbnail),
        &mut surfaces,
        thumbnail.width,
        scene.selected(),
        &mut queue,
        now,
    );
    let background = scene.canvas().surface();
    let mut preview = Preview { scene, selector };
    if let Some(shader) = options
        .shader
        .filter(|shader| *shader != preview.scene.selected())
    {
        preview.select(shader, &mut queue, now);
    }
    tracing::info!(
        shader = %preview.scene.selected(),
        status = ?preview.scene.canvas().status(),
        "preview running; scroll with the wheel, arrows or PageUp/PageDown, digits switch shaders"
    );

    let document_height = options.document_height;
    let mut preview = Some(preview);
    event_loop
        .run(move |event, elwt| {
            let Some(Preview {
                scene: active,
                selector,
            }) = preview.as_mut()
            else {
                return;
            };
            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        if let Some(preview) = preview.take() {
                            preview.unmount(&mut queue);
                        }
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        let size = PixelSize::new(new_size.width, new_size.height);
                        let now = Instant::now();
                        active.resize(size, &mut queue, now);
                        let top = active.scroll_metrics().scroll_top;
                        active.on_scroll(document_metrics(top, document_height, size), now);
                        window.request_redraw();
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let pixels = match delta {
                            MouseScrollDelta::LineDelta(_, lines) => -f64::from(lines) * LINE_HEIGHT,
                            MouseScrollDelta::PixelDelta(position) => -position.y,
                        };
                        scroll(active, ScrollCommand::By(pixels));
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed {
                            return;
                        }
                        if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
                            if let Some(preview) = preview.take() {
                                preview.unmount(&mut queue);
                            }
                            elwt.exit();
                            return;
                        }
                        if let Some(command) = scroll_command(&event, active.scroll_metrics()) {
                            scroll(active, command);
                        } else if let Some(shader) = shader_key(&event) {
                            let change = selector.select(shader);
                            active.select_shader(change, &mut queue, Instant::now());
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if let Some(pointer) = active.canvas().pointer_listener() {
                            pointer.moved(position.x as f32, position.y as f32);
                        }
                    }
                    WindowEvent::CursorLeft { .. } => {
                        if let Some(pointer) = active.canvas().pointer_listener() {
                            pointer.left();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        for request in queue.begin_frame() {
                            if request.surface() == background {
                                active.on_frame(request, now, &mut queue);
                            } else {
                                selector.on_frame(request, now, &mut queue);
                            }
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if !queue.is_idle() {
                        window.request_redraw();
                    }
                    elwt.set_control_flow(ControlFlow::Wait);
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("preview event loop failed: {err}"))
}

/// Opens the device for `window`. The device is also returned so the
/// thumbnails can render offscreen next to the window surface.
fn create_context(
    window: Arc<Window>,
    size: PixelSize,
) -> (
    Option<Arc<GpuDevice>>,
    Result<Box<dyn GraphicsContext>, RenderError>,
) {
    let (gpu, surface) = match GpuDevice::for_window(window) {
        Ok(pair) => pair,
        Err(err) => {
            return (
                None,
                Err(RenderError::ContextUnavailable(format!("{err:#}"))),
            )
        }
    };
    tracing::info!(adapter = %gpu.adapter_name(), "GPU ready");
    let ctx = WgpuContext::for_window(gpu.clone(), surface, size)
        .map(|ctx| Box::new(ctx) as Box<dyn GraphicsContext>)
        .map_err(|err| RenderError::ContextUnavailable(format!("{err:#}")));
    (Some(gpu), ctx)
}

fn thumbnail_context(
    gpu: Option<&Arc<GpuDevice>>,
    size: PixelSize,
) -> Result<Box<dyn GraphicsContext>, RenderError> {
    let gpu = gpu.ok_or_else(|| RenderError::ContextUnavailable("no GPU device".to_string()))?;
    let (ctx, _target) = WgpuContext::offscreen(gpu.clone(), size);
    Ok(Box::new(ctx))
}

fn document_metrics(scroll_top: f64, document_height: f64, viewport: PixelSize) -> ScrollMetrics {
    let viewport_height = f64::from(viewport.height);
    let metrics = ScrollMetrics::new(0.0, document_height.max(viewport_height), viewport_height);
    metrics.scrolled_by(scroll_top)
}

fn scroll<S: PreferenceStore>(scene: &mut BackdropScene<S>, command: ScrollCommand) {
    let metrics = scene.scroll_metrics();
    let next = match command {
        ScrollCommand::By(delta) => metrics.scrolled_by(delta),
        ScrollCommand::Top => ScrollMetrics {
            scroll_top: 0.0,
            ..metrics
        },
        ScrollCommand::Bottom => ScrollMetrics {
            scroll_top: metrics.max_scroll(),
            ..metrics
        },
    };
    if next != metrics {
        scene.on_scroll(next, Instant::now());
    }
}

fn scroll_command(event: &KeyEvent, metrics: ScrollMetrics) -> Option<ScrollCommand> {
    let page = metrics.viewport_height;
    match event.logical_key {
        Key::Named(NamedKey::ArrowDown) => Some(ScrollCommand::By(LINE_HEIGHT)),
        Key::Named(NamedKey::ArrowUp) => Some(ScrollCommand::By(-LINE_HEIGHT)),
        Key::Named(NamedKey::PageDown) | Key::Named(NamedKey::Space) => {
            Some(ScrollCommand::By(page))
        }
        Key::Named(NamedKey::PageUp) => Some(ScrollCommand::By(-page)),
        Key::Named(NamedKey::Home) => Some(ScrollCommand::Top),
        Key::Named(NamedKey::End) => Some(ScrollCommand::Bottom),
        _ => None,
    }
}

fn shader_key(event: &KeyEvent) -> Option<ShaderId> {
    match &event.logical_key {
        Key::Character(value) => value.as_str().parse().ok(),
        _ => None,
    }
}
