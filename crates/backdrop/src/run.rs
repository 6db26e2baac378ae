use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use renderer::{
    export_thumbnails, run_preview, ExportOptions, PreviewOptions, ScrollMetrics, ScrollModel,
};
use sceneconfig::SceneConfig;
use serde_json::{json, Value};
use shaderlib::{definitions, load_selected_shader, FilePreferenceStore, ShaderId};
use tracing_subscriber::EnvFilter;

use crate::cli::{PreviewArgs, ScrollArgs, ThumbnailArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the scene configuration. An explicit file must exist; the default
/// location falls back to built-in values when absent.
pub fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<SceneConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (paths.scene_file(), false),
    };
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no scene configuration; using defaults");
            return Ok(SceneConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let config = SceneConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load scene configuration {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded scene configuration");
    Ok(config)
}

pub fn preview(args: PreviewArgs, config: SceneConfig, paths: &AppPaths) -> Result<()> {
    let store = FilePreferenceStore::new(paths.state_file());
    let options = PreviewOptions {
        size: args.size.unwrap_or_else(|| PreviewOptions::default().size),
        shader: args.shader,
        interactive: args.interactive.then_some(true),
        document_height: args.document_height,
    };
    tracing::info!(
        state = %paths.state_file().display(),
        size = %options.size,
        document_height = options.document_height,
        "starting preview"
    );
    run_preview(config, store, options)
}

pub fn thumbnails(args: ThumbnailArgs, config: &SceneConfig) -> Result<()> {
    let options = ExportOptions {
        size: args.size.unwrap_or(config.canvas.thumbnail_size),
        frames: args.frames,
    };
    if options.size == 0 {
        bail!("thumbnail size must be non-zero");
    }
    let written = export_thumbnails(&args.out, options)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn list(config: &SceneConfig, paths: &AppPaths) -> Result<()> {
    let fallback = ShaderId::from_raw(i64::from(config.canvas.default_shader))
        .unwrap_or(ShaderId::DEFAULT);
    let store = FilePreferenceStore::new(paths.state_file());
    let selected = load_selected_shader(&store, fallback);
    for definition in definitions() {
        let marker = if definition.id == selected { '*' } else { ' ' };
        println!(
            "{marker} {:<3} {:<14} {:<16} {}",
            definition.id.raw(),
            definition.id.slug(),
            definition.name,
            definition.accent_color
        );
    }
    Ok(())
}

pub fn scroll(args: ScrollArgs, config: &SceneConfig) -> Result<()> {
    if !(args.offset.is_finite() && args.document_height.is_finite() && args.viewport_height.is_finite())
    {
        bail!("scroll metrics must be finite numbers");
    }
    let report = scroll_report(&args, config);
    let rendered = serde_json::to_string_pretty(&report).context("failed to encode scroll report")?;
    println!("{rendered}");
    Ok(())
}

pub fn scroll_report(args: &ScrollArgs, config: &SceneConfig) -> Value {
    let model = ScrollModel::new(config.scroll.clone());
    let metrics = ScrollMetrics::new(args.offset, args.document_height, args.viewport_height);
    let state = model.state(&metrics);
    let tint = model.tint(state.section_index).map(|tint| {
        json!({
            "rgb": tint.rgb,
            "alpha": tint.alpha,
        })
    });
    json!({
        "progress": state.progress,
        "section_index": state.section_index,
        "sections": config.scroll.sections,
        "intensity": model.intensity(state.progress),
        "scale": model.scale(state.progress),
        "tint": tint,
        "top_vignette": model.top_vignette(state.progress),
        "bottom_vignette": model.bottom_vignette(state.progress),
    })
}
