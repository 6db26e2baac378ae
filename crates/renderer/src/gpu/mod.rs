//! Graphics context seam and its wgpu implementation.
//!
//! Everything above this module talks to a [`GraphicsContext`]: a small,
//! program-oriented API (compile a stage, link a program, look up uniforms,
//! draw a strip) over opaque handles. The context owns the real objects in
//! arena maps; callers own the handles and must release them explicitly.
//!
//! - `glsl` rewrites WebGL-1 style sources into the Vulkan-flavoured GLSL the
//!   naga frontend accepts and injects the presentation footer.
//! - `uniforms` mirrors the injected uniform block.
//! - `device` owns adapter and device creation.
//! - `context` implements [`GraphicsContext`] on top of wgpu for window
//!   surfaces and offscreen textures.

mod context;
mod device;
pub(crate) mod glsl;
mod uniforms;

#[cfg(test)]
pub(crate) mod fake;

pub use context::{OffscreenTarget, WgpuContext};
pub use device::GpuDevice;
pub(crate) use uniforms::BackdropUniforms;

use crate::types::PixelSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

/// One triangle-strip draw of the bound program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub buffer: BufferHandle,
    pub position_attribute: u32,
    pub vertex_count: u32,
}

pub trait GraphicsContext {
    /// Compiles one stage. The error string is the driver log.
    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> Result<ShaderHandle, String>;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String>;

    fn delete_program(&mut self, program: ProgramHandle);

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// `None` when the program does not use `name`.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<BufferHandle, String>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn set_viewport(&mut self, size: PixelSize);

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue);

    fn draw_strip(&mut self, draw: DrawCall) -> Result<(), String>;

    /// Fills the target with opaque black.
    fn clear(&mut self);
}
