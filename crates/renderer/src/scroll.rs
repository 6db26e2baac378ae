//! Scroll position to background parameters.
//!
//! Everything here is a pure function of the latest scroll metrics: no
//! history, no debounce, constant work per event.
use sceneconfig::ScrollConfig;

use crate::types::{Presentation, Tint};

/// Document scroll metrics in CSS-style pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            viewport_height,
        }
    }

    /// Largest reachable `scroll_top`.
    pub fn max_scroll(&self) -> f64 {
        (self.scroll_height - self.viewport_height).max(0.0)
    }

    /// Moves by `delta` within the reachable range.
    pub fn scrolled_by(self, delta: f64) -> Self {
        Self {
            scroll_top: (self.scroll_top + delta).clamp(0.0, self.max_scroll()),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    pub progress: f32,
    pub section_index: u32,
}

/// `scroll_top / max(scroll_height - viewport_height, 1)`, clamped to `0..=1`.
/// A page that cannot scroll stays at `0` whatever its offset.
pub fn scroll_progress(metrics: &ScrollMetrics) -> f32 {
    let range = metrics.scroll_height - metrics.viewport_height;
    if range.is_nan() || range <= 0.0 {
        return 0.0;
    }
    let progress = metrics.scroll_top / range.max(1.0);
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0) as f32
}

/// `floor(progress * sections)`; progress 1.0 belongs to the last section.
pub fn section_index(progress: f32, sections: u32) -> u32 {
    let sections = sections.max(1);
    let index = (progress.clamp(0.0, 1.0) * sections as f32).floor() as u32;
    index.min(sections - 1)
}

/// Derived visual parameters for one scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollModel {
    config: ScrollConfig,
}

impl ScrollModel {
    pub fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    pub fn state(&self, metrics: &ScrollMetrics) -> ScrollState {
        let progress = scroll_progress(metrics);
        ScrollState {
            progress,
            section_index: section_index(progress, self.config.sections),
        }
    }

    /// Canvas opacity: `base + sin(progress * 2π) * amplitude`.
    pub fn intensity(&self, progress: f32) -> f32 {
        self.config.intensity_base
            + (progress * std::f32::consts::TAU).sin() * self.config.intensity_amplitude
    }

    pub fn scale(&self, progress: f32) -> f32 {
        self.config.scale_base + progress * self.config.scale_range
    }

    /// Overlay colour for a section; section 0 and unlisted sections have none.
    pub fn tint(&self, section_index: u32) -> Option<Tint> {
        if section_index == 0 {
            return None;
        }
        self.config
            .tints
            .iter()
            .find(|tint| tint.section == section_index)
            .map(|tint| Tint::new(tint.color.to_unit(), tint.alpha))
    }

    pub fn top_vignette(&self, progress: f32) -> bool {
        progress > self.config.top_vignette_after
    }

    pub fn bottom_vignette(&self, progress: f32) -> bool {
        progress < self.config.bottom_vignette_until
    }

    /// Step-function targets; easing is applied by the animator.
    pub fn presentation(&self, state: &ScrollState) -> Presentation {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Presentation {
            opacity: self.intensity(state.progress),
            scale: self.scale(state.progress),
            tint: self.tint(state.section_index),
            top_vignette: flag(self.top_vignette(state.progress)),
            bottom_vignette: flag(self.bottom_vignette(state.progress)),
        }
    }
}

impl Default for ScrollModel {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

/// Tracks the latest scroll metrics and their derived state.
#[derive(Debug, Clone)]
pub struct ScrollController {
    model: ScrollModel,
    metrics: ScrollMetrics,
    state: ScrollState,
}

impl ScrollController {
    pub fn new(model: ScrollModel, metrics: ScrollMetrics) -> Self {
        let state = model.state(&metrics);
        Self {
            model,
            metrics,
            state,
        }
    }

    pub fn model(&self) -> &ScrollModel {
        &self.model
    }

    pub fn metrics(&self) -> ScrollMetrics {
        self.metrics
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Recomputes state for `metrics`. Returns `true` when the section changed.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        let previous = self.state.section_index;
        self.metrics = metrics;
        self.state = self.model.state(&metrics);
        if previous != self.state.section_index {
            tracing::debug!(
                from = previous,
                to = self.state.section_index,
                progress = self.state.progress,
                "scroll section changed"
            );
            true
        } else {
            false
        }
    }

    pub fn presentation(&self) -> Presentation {
        self.model.presentation(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn scroll_walkthrough_clamps_last_section() {
        let model = ScrollModel::default();
        let at = |top: f64| model.state(&ScrollMetrics::new(top, 1500.0, 500.0));

        assert_eq!(at(0.0), ScrollState { progress: 0.0, section_index: 0 });
        assert_eq!(at(500.0), ScrollState { progress: 0.5, section_index: 2 });
        assert_eq!(at(1000.0), ScrollState { progress: 1.0, section_index: 4 });
    }

    #[test]
    fn progress_is_monotonic_and_bounded() {
        let mut last = 0.0;
        for step in 0..=200 {
            let metrics = ScrollMetrics::new(step as f64 * 10.0, 2000.0, 800.0);
            let progress = scroll_progress(&metrics);
            assert!((0.0..=1.0).contains(&progress));
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(scroll_progress(&ScrollMetrics::new(0.0, 2000.0, 800.0)), 0.0);
        assert_eq!(scroll_progress(&ScrollMetrics::new(1200.0, 2000.0, 800.0)), 1.0);
    }

    #[test]
    fn short_pages_never_leave_the_top() {
        for top in [0.0, 0.5, 30.0, 400.0, 10_000.0] {
            assert_eq!(scroll_progress(&ScrollMetrics::new(top, 400.0, 800.0)), 0.0);
            assert_eq!(scroll_progress(&ScrollMetrics::new(top, 800.0, 800.0)), 0.0);
        }
        let model = ScrollModel::default();
        let state = model.state(&ScrollMetrics::new(30.0, 400.0, 800.0));
        assert_eq!(state, ScrollState { progress: 0.0, section_index: 0 });
        assert!(model.bottom_vignette(state.progress));
    }

    #[test]
    fn section_index_is_a_step_function() {
        assert_eq!(section_index(0.0, 5), 0);
        assert_eq!(section_index(0.199, 5), 0);
        assert_eq!(section_index(0.2, 5), 1);
        assert_eq!(section_index(0.79, 5), 3);
        assert_eq!(section_index(0.8, 5), 4);
        assert_eq!(section_index(1.0, 5), 4);
        assert_eq!(section_index(0.5, 0), 0);
    }

    #[test]
    fn intensity_follows_the_sine_envelope() {
        let model = ScrollModel::default();
        assert!((model.intensity(0.0) - 0.25).abs() < EPSILON);
        assert!((model.intensity(0.25) - 0.30).abs() < EPSILON);
        assert!((model.intensity(0.75) - 0.20).abs() < EPSILON);
        assert!((model.scale(1.0) - 1.2).abs() < EPSILON);
    }

    #[test]
    fn tints_switch_at_boundaries() {
        let model = ScrollModel::default();
        assert!(model.tint(0).is_none());
        let violet = model.tint(1).expect("section 1 tint");
        assert!((violet.rgb[0] - 139.0 / 255.0).abs() < EPSILON);
        assert!((violet.alpha - 0.08).abs() < EPSILON);
        assert!(model.tint(2).is_some() && model.tint(3).is_some());
        assert!(model.tint(4).is_none());
    }

    #[test]
    fn vignettes_toggle_at_thresholds() {
        let model = ScrollModel::default();
        assert!(!model.top_vignette(0.1));
        assert!(model.top_vignette(0.11));
        assert!(model.bottom_vignette(0.89));
        assert!(!model.bottom_vignette(0.9));
    }

    #[test]
    fn controller_reports_section_changes() {
        let mut controller =
            ScrollController::new(ScrollModel::default(), ScrollMetrics::new(0.0, 1500.0, 500.0));
        assert!(!controller.on_scroll(ScrollMetrics::new(100.0, 1500.0, 500.0)));
        assert!(controller.on_scroll(ScrollMetrics::new(500.0, 1500.0, 500.0)));
        let presentation = controller.presentation();
        assert!(presentation.tint.is_some());
        assert_eq!(presentation.top_vignette, 1.0);
        assert_eq!(presentation.bottom_vignette, 1.0);
    }

    #[test]
    fn scrolled_by_stays_in_range() {
        let metrics = ScrollMetrics::new(0.0, 1500.0, 500.0);
        assert_eq!(metrics.scrolled_by(-50.0).scroll_top, 0.0);
        assert_eq!(metrics.scrolled_by(5000.0).scroll_top, 1000.0);
    }
}
