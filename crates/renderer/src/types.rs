use std::fmt;

/// Drawing-buffer size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    /// Zero extents are clamped to one pixel so aspect and division math
    /// downstream never sees a zero.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn as_vec2(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Last known pointer position, surface-local, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub const NEUTRAL: PointerState = PointerState { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Value for the `mouse` uniform: normalised to `0..=1` with the y axis
    /// flipped to a bottom-left origin. The neutral pointer stays `(0, 0)` so
    /// shaders can skip their pointer effect.
    pub fn as_uniform(&self, size: PixelSize) -> [f32; 2] {
        if self.is_neutral() {
            return [0.0, 0.0];
        }
        let [width, height] = size.as_vec2();
        [
            (self.x / width).clamp(0.0, 1.0),
            (1.0 - self.y / height).clamp(0.0, 1.0),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub rgb: [f32; 3],
    pub alpha: f32,
}

impl Tint {
    pub fn new(rgb: [f32; 3], alpha: f32) -> Self {
        Self { rgb, alpha }
    }

    pub fn transparent() -> Self {
        Self::new([0.0; 3], 0.0)
    }

    pub(crate) fn as_vec4(&self) -> [f32; 4] {
        [self.rgb[0], self.rgb[1], self.rgb[2], self.alpha]
    }
}

/// Visual parameters layered over the raw shader output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub opacity: f32,
    pub scale: f32,
    pub tint: Option<Tint>,
    /// Weight of the top darkening band, `0..=1`.
    pub top_vignette: f32,
    /// Weight of the bottom darkening band, `0..=1`.
    pub bottom_vignette: f32,
}

impl Presentation {
    pub const IDENTITY: Presentation = Presentation {
        opacity: 1.0,
        scale: 1.0,
        tint: None,
        top_vignette: 0.0,
        bottom_vignette: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_guarded() {
        let size = PixelSize::new(0, 0);
        assert_eq!(size, PixelSize::new(1, 1));
        assert_eq!(size.to_string(), "1x1");
    }

    #[test]
    fn pointer_uniform_flips_y_and_normalises() {
        let size = PixelSize::new(200, 100);
        let pointer = PointerState::new(50.0, 25.0);
        assert_eq!(pointer.as_uniform(size), [0.25, 0.75]);
        assert_eq!(PointerState::NEUTRAL.as_uniform(size), [0.0, 0.0]);
        assert_eq!(PointerState::new(400.0, -5.0).as_uniform(size), [1.0, 1.0]);
    }
}
