use bytemuck::{Pod, Zeroable};

use super::UniformValue;

/// CPU mirror of the `BackdropParams` std140 block injected by `glsl`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BackdropUniforms {
    pub i_resolution: [f32; 2],
    pub i_mouse: [f32; 2],
    pub i_time: f32,
    pub u_opacity: f32,
    pub u_scale: f32,
    pub padding0: f32,
    pub u_tint: [f32; 4],
    pub u_vignette: [f32; 2],
    pub padding1: [f32; 2],
}

unsafe impl Zeroable for BackdropUniforms {}
unsafe impl Pod for BackdropUniforms {}

/// Uniform names in location order; a location is an index into this table.
pub(crate) const UNIFORM_FIELDS: [&str; 7] = [
    "iResolution",
    "iMouse",
    "iTime",
    "uOpacity",
    "uScale",
    "uTint",
    "uVignette",
];

impl BackdropUniforms {
    pub fn new() -> Self {
        Self {
            i_resolution: [1.0, 1.0],
            i_mouse: [0.0, 0.0],
            i_time: 0.0,
            u_opacity: 1.0,
            u_scale: 1.0,
            padding0: 0.0,
            u_tint: [0.0; 4],
            u_vignette: [0.0; 2],
            padding1: [0.0; 2],
        }
    }

    pub fn location_of(name: &str) -> Option<u32> {
        UNIFORM_FIELDS
            .iter()
            .position(|field| *field == name)
            .map(|index| index as u32)
    }

    /// Writes `value` into the field at `location`. Returns `false` when the
    /// location is unknown or the value has the wrong shape.
    pub fn set(&mut self, location: u32, value: UniformValue) -> bool {
        match (location, value) {
            (0, UniformValue::Vec2(v)) => self.i_resolution = v,
            (1, UniformValue::Vec2(v)) => self.i_mouse = v,
            (2, UniformValue::Float(v)) => self.i_time = v,
            (3, UniformValue::Float(v)) => self.u_opacity = v,
            (4, UniformValue::Float(v)) => self.u_scale = v,
            (5, UniformValue::Vec4(v)) => self.u_tint = v,
            (6, UniformValue::Vec2(v)) => self.u_vignette = v,
            _ => return false,
        }
        true
    }
}

impl Default for BackdropUniforms {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn uniforms_follow_std140_layout() {
        let uniforms = BackdropUniforms::new();
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<BackdropUniforms>(), 16);
        assert_eq!(size_of::<BackdropUniforms>(), 64);
        assert_eq!((&uniforms.i_mouse as *const _ as usize) - base, 8);
        assert_eq!((&uniforms.i_time as *const _ as usize) - base, 16);
        assert_eq!((&uniforms.u_scale as *const _ as usize) - base, 24);
        assert_eq!((&uniforms.u_tint as *const _ as usize) - base, 32);
        assert_eq!((&uniforms.u_vignette as *const _ as usize) - base, 48);
    }

    #[test]
    fn set_checks_value_shape() {
        let mut uniforms = BackdropUniforms::new();
        let time = BackdropUniforms::location_of("iTime").unwrap();
        assert!(uniforms.set(time, UniformValue::Float(2.5)));
        assert!(!uniforms.set(time, UniformValue::Vec2([1.0, 1.0])));
        assert_eq!(uniforms.i_time, 2.5);
        assert_eq!(BackdropUniforms::location_of("iDate"), None);
    }
}
