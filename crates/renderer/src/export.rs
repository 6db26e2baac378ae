//! Offscreen thumbnail export.
//!
//! The registry is mounted as a [`ShaderSelector`] whose thumbnails render
//! into offscreen textures. Every thumbnail is advanced a fixed number of
//! frames on a simulated 60 Hz clock and read back as PNG.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use scheduler::{FrameQueue, SurfaceAllocator, SurfaceId};
use shaderlib::ShaderId;

use crate::canvas::CanvasStatus;
use crate::error::RenderError;
use crate::gpu::{GpuDevice, GraphicsContext, OffscreenTarget, WgpuContext};
use crate::selector::ShaderSelector;
use crate::types::PixelSize;

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Edge length of the square thumbnails.
    pub size: u32,
    /// Frames rendered before the read back; at least one.
    pub frames: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            size: 48,
            frames: 60,
        }
    }
}

pub fn thumbnail_path(out_dir: &Path, id: ShaderId) -> PathBuf {
    out_dir.join(format!("{}.png", id.slug()))
}

/// Creates `out_dir` if needed; fails when it exists as a file.
pub fn prepare_output_dir(out_dir: &Path) -> Result<()> {
    if out_dir.exists() && !out_dir.is_dir() {
        bail!("{} exists and is not a directory", out_dir.display());
    }
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))
}

/// Mounts the selector on `contexts` and advances it `frames` ticks.
fn render_selector<F>(contexts: F, options: ExportOptions, queue: &mut FrameQueue) -> ShaderSelector
where
    F: FnMut(SurfaceId) -> Result<Box<dyn GraphicsContext>, RenderError>,
{
    let start = Instant::now();
    let mut surfaces = SurfaceAllocator::new();
    let mut selector = ShaderSelector::mount(
        contexts,
        &mut surfaces,
        options.size,
        ShaderId::DEFAULT,
        queue,
        start,
    );
    for frame in 1..=options.frames.max(1) {
        let now = start + FRAME_INTERVAL * frame;
        for request in queue.begin_frame() {
            selector.on_frame(request, now, queue);
        }
    }
    selector
}

/// Renders every registry shader and writes `<slug>.png` into `out_dir`.
/// Shaders that fail to compile are skipped with a warning.
pub fn export_thumbnails(out_dir: &Path, options: ExportOptions) -> Result<Vec<PathBuf>> {
    prepare_output_dir(out_dir)?;
    let gpu = GpuDevice::headless()?;
    tracing::info!(adapter = %gpu.adapter_name(), size = options.size, frames = options.frames, "exporting thumbnails");

    let size = PixelSize::square(options.size);
    let mut queue = FrameQueue::new();
    let mut targets: Vec<(SurfaceId, OffscreenTarget)> = Vec::new();
    let selector = render_selector(
        |surface| {
            let (ctx, target) = WgpuContext::offscreen(gpu.clone(), size);
            targets.push((surface, target));
            Ok(Box::new(ctx) as Box<dyn GraphicsContext>)
        },
        options,
        &mut queue,
    );

    let mut written = Vec::new();
    for thumbnail in selector.thumbnails() {
        let id = thumbnail.id();
        if thumbnail.status() != CanvasStatus::Rendering {
            tracing::warn!(shader = %id, status = ?thumbnail.status(), "skipping thumbnail");
            continue;
        }
        let Some((_, target)) = targets
            .iter()
            .find(|(surface, _)| *surface == thumbnail.surface())
        else {
            continue;
        };
        let path = thumbnail_path(out_dir, id);
        target
            .read_rgba()?
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(shader = %id, path = %path.display(), "thumbnail written");
        written.push(path);
    }
    selector.unmount(&mut queue);

    if written.is_empty() {
        bail!("no thumbnail could be rendered");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::fake::{FakeGpu, FakeLog};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[test]
    fn every_thumbnail_is_pumped_in_isolation() {
        let mut queue = FrameQueue::new();
        let mut logs: Vec<Rc<RefCell<FakeLog>>> = Vec::new();
        let options = ExportOptions { size: 32, frames: 3 };
        let selector = render_selector(
            |_surface| {
                let gpu = FakeGpu::new().failing_on("mat2 m(");
                logs.push(gpu.log());
                Ok(Box::new(gpu) as Box<dyn GraphicsContext>)
            },
            options,
            &mut queue,
        );

        let statuses: Vec<_> = selector
            .thumbnails()
            .iter()
            .map(|thumbnail| thumbnail.status())
            .collect();
        assert_eq!(statuses, vec![CanvasStatus::Rendering, CanvasStatus::Blank]);
        assert_eq!(logs[0].borrow().draws, 3);
        assert_eq!(logs[0].borrow().viewport, Some(PixelSize::square(32)));
        assert_eq!(logs[1].borrow().draws, 0);

        selector.unmount(&mut queue);
        assert!(queue.is_idle());
        assert!(logs.iter().all(|log| log.borrow().live_objects() == 0));
    }

    #[test]
    fn thumbnails_are_named_by_slug() {
        let dir = Path::new("/tmp/thumbs");
        assert_eq!(thumbnail_path(dir, ShaderId::Ether), dir.join("ether.png"));
        assert_eq!(
            thumbnail_path(dir, ShaderId::FlowingWaves),
            dir.join("flowing-waves.png")
        );
    }

    #[test]
    fn output_dir_is_created_recursively() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        prepare_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        prepare_output_dir(&nested).unwrap();
    }

    #[test]
    fn output_dir_rejects_files() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("taken");
        fs::write(&file, b"x").unwrap();
        let err = prepare_output_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
