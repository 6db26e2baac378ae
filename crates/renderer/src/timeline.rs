//! Eased transitions for the presentation layers.
//!
//! The scroll model produces step functions (tint on/off, vignette on/off).
//! On the page those steps were softened by CSS transitions; here each
//! animated channel owns a [`Transition`] that eases from the value it was
//! showing towards the latest target.
use std::time::{Duration, Instant};

use sceneconfig::{CurveSetting, TransitionConfig};

use crate::types::{Presentation, Tint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    Smoothstep,
    #[default]
    EaseInOut,
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => clamped,
            Easing::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            Easing::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
        }
    }
}

impl From<CurveSetting> for Easing {
    fn from(value: CurveSetting) -> Self {
        match value {
            CurveSetting::Linear => Easing::Linear,
            CurveSetting::Smoothstep => Easing::Smoothstep,
            CurveSetting::EaseInOut => Easing::EaseInOut,
        }
    }
}

/// One animated scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    from: f32,
    to: f32,
    start: Instant,
    duration: Duration,
    easing: Easing,
}

impl Transition {
    pub fn settled(value: f32, duration: Duration, easing: Easing, now: Instant) -> Self {
        Self {
            from: value,
            to: value,
            start: now,
            duration,
            easing,
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn value(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.start);
        let progress = elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON);
        self.from + (self.to - self.from) * self.easing.sample(progress)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.duration.is_zero() || now.saturating_duration_since(self.start) >= self.duration
    }

    /// Starts easing from the currently shown value towards `to`. Re-targeting
    /// to the same value leaves a running transition alone.
    pub fn retarget(&mut self, to: f32, now: Instant) {
        if (to - self.to).abs() <= f32::EPSILON {
            return;
        }
        self.from = self.value(now);
        self.to = to;
        self.start = now;
    }
}

/// Eases a stream of step-function presentations.
#[derive(Debug, Clone)]
pub struct PresentationAnimator {
    opacity: Transition,
    tint_alpha: Transition,
    top: Transition,
    bottom: Transition,
    scale: f32,
    tint_rgb: [f32; 3],
}

impl PresentationAnimator {
    pub fn new(config: &TransitionConfig, initial: Presentation, now: Instant) -> Self {
        let easing = Easing::from(config.curve);
        let tint = initial.tint.unwrap_or_else(Tint::transparent);
        Self {
            opacity: Transition::settled(initial.opacity, config.opacity, easing, now),
            tint_alpha: Transition::settled(tint.alpha, config.tint, easing, now),
            top: Transition::settled(initial.top_vignette, config.vignette, easing, now),
            bottom: Transition::settled(initial.bottom_vignette, config.vignette, easing, now),
            scale: initial.scale,
            tint_rgb: tint.rgb,
        }
    }

    /// Sets new targets. Scale follows immediately; a tint that disappears
    /// keeps its colour while it fades out.
    pub fn retarget(&mut self, target: Presentation, now: Instant) {
        self.opacity.retarget(target.opacity, now);
        self.top.retarget(target.top_vignette, now);
        self.bottom.retarget(target.bottom_vignette, now);
        self.scale = target.scale;
        match target.tint {
            Some(tint) => {
                self.tint_rgb = tint.rgb;
                self.tint_alpha.retarget(tint.alpha, now);
            }
            None => self.tint_alpha.retarget(0.0, now),
        }
    }

    pub fn sample(&self, now: Instant) -> Presentation {
        let alpha = self.tint_alpha.value(now);
        Presentation {
            opacity: self.opacity.value(now),
            scale: self.scale,
            tint: (alpha > 0.0).then(|| Tint::new(self.tint_rgb, alpha)),
            top_vignette: self.top.value(now),
            bottom_vignette: self.bottom.value(now),
        }
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        [self.opacity, self.tint_alpha, self.top, self.bottom]
            .iter()
            .all(|transition| transition.is_finished(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_increases_monotonically() {
        let mut last = 0.0;
        for step in 0..=10 {
            let sample = Easing::Linear.sample(step as f32 / 10.0);
            assert!(sample >= last - f32::EPSILON);
            last = sample;
        }
    }

    #[test]
    fn ease_in_out_accelerates_then_decelerates() {
        let curve = Easing::EaseInOut;
        assert!(curve.sample(0.25) < curve.sample(0.5));
        assert!(curve.sample(0.75) > curve.sample(0.5));
        assert!((curve.sample(0.0) - 0.0).abs() < 1e-6);
        assert!((curve.sample(1.0) - 1.0).abs() < 1e-6);
        assert!((Easing::Smoothstep.sample(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn transition_eases_towards_target() {
        let start = Instant::now();
        let mut fade = Transition::settled(0.0, Duration::from_millis(100), Easing::Linear, start);
        fade.retarget(1.0, start);
        let halfway = fade.value(start + Duration::from_millis(50));
        assert!((halfway - 0.5).abs() < 0.05);
        assert!(!fade.is_finished(start + Duration::from_millis(50)));
        assert_eq!(fade.value(start + Duration::from_millis(200)), 1.0);
    }

    #[test]
    fn retarget_mid_flight_starts_from_shown_value() {
        let start = Instant::now();
        let mut fade = Transition::settled(0.0, Duration::from_millis(100), Easing::Linear, start);
        fade.retarget(1.0, start);
        let mid = start + Duration::from_millis(50);
        fade.retarget(0.0, mid);
        assert!((fade.value(mid) - 0.5).abs() < 0.05);
        assert_eq!(fade.value(mid + Duration::from_millis(100)), 0.0);
    }

    #[test]
    fn zero_duration_is_a_hard_cut() {
        let now = Instant::now();
        let mut fade = Transition::settled(0.2, Duration::ZERO, Easing::EaseInOut, now);
        fade.retarget(0.8, now);
        assert_eq!(fade.value(now), 0.8);
        assert!(fade.is_finished(now));
    }

    #[test]
    fn animator_fades_tint_out_with_its_colour() {
        let now = Instant::now();
        let config = TransitionConfig::default();
        let tinted = Presentation {
            tint: Some(Tint::new([0.5, 0.25, 1.0], 0.08)),
            ..Presentation::IDENTITY
        };
        let mut animator = PresentationAnimator::new(&config, tinted, now);
        animator.retarget(Presentation::IDENTITY, now);

        let during = animator.sample(now + config.tint / 2);
        let tint = during.tint.expect("still fading");
        assert_eq!(tint.rgb, [0.5, 0.25, 1.0]);
        assert!(tint.alpha < 0.08 && tint.alpha > 0.0);

        let after = animator.sample(now + config.tint);
        assert!(after.tint.is_none());
        assert!(animator.is_settled(now + config.tint));
    }

    #[test]
    fn scale_is_not_eased() {
        let now = Instant::now();
        let mut animator =
            PresentationAnimator::new(&TransitionConfig::default(), Presentation::IDENTITY, now);
        animator.retarget(Presentation { scale: 1.2, ..Presentation::IDENTITY }, now);
        assert_eq!(animator.sample(now).scale, 1.2);
    }
}
