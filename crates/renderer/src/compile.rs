//! Turns a vertex/fragment source pair into a ready-to-draw program.
//!
//! Every failure path releases the objects created before it, so a failed
//! compile leaves the context exactly as it found it.
use crate::error::{CompileError, CompileStage};
use crate::gpu::{
    BufferHandle, DrawCall, GraphicsContext, ProgramHandle, ShaderKind, UniformLocation,
    UniformValue,
};

/// Full-screen quad as a triangle strip.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Uniform locations cached at link time; `None` means the program does not
/// read the uniform and writes to it are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformSlots {
    pub time: Option<UniformLocation>,
    pub resolution: Option<UniformLocation>,
    pub mouse: Option<UniformLocation>,
    pub opacity: Option<UniformLocation>,
    pub scale: Option<UniformLocation>,
    pub tint: Option<UniformLocation>,
    pub vignette: Option<UniformLocation>,
}

/// A linked program plus the quad buffer it draws with.
#[derive(Debug)]
pub struct CompiledProgram {
    program: ProgramHandle,
    buffer: BufferHandle,
    position: u32,
    uniforms: UniformSlots,
    disposed: bool,
}

pub fn compile(
    vertex_source: &str,
    fragment_source: &str,
    ctx: &mut dyn GraphicsContext,
) -> Result<CompiledProgram, CompileError> {
    let vertex = ctx
        .create_shader(ShaderKind::Vertex, vertex_source)
        .map_err(|log| CompileError::new(CompileStage::Vertex, log))?;

    let fragment = match ctx.create_shader(ShaderKind::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(log) => {
            ctx.delete_shader(vertex);
            return Err(CompileError::new(CompileStage::Fragment, log));
        }
    };

    let linked = ctx.link_program(vertex, fragment);
    // The program keeps what it needs; stage objects are no longer required.
    ctx.delete_shader(vertex);
    ctx.delete_shader(fragment);
    let program = linked.map_err(|log| CompileError::new(CompileStage::Link, log))?;

    let Some(position) = ctx.attribute_location(program, "position") else {
        ctx.delete_program(program);
        return Err(CompileError::new(
            CompileStage::Link,
            "vertex stage does not declare attribute `position`",
        ));
    };

    let uniforms = UniformSlots {
        time: ctx.uniform_location(program, "iTime"),
        resolution: ctx.uniform_location(program, "iResolution"),
        mouse: ctx.uniform_location(program, "iMouse"),
        opacity: ctx.uniform_location(program, "uOpacity"),
        scale: ctx.uniform_location(program, "uScale"),
        tint: ctx.uniform_location(program, "uTint"),
        vignette: ctx.uniform_location(program, "uVignette"),
    };

    let buffer = match ctx.create_vertex_buffer(&QUAD_VERTICES) {
        Ok(buffer) => buffer,
        Err(log) => {
            ctx.delete_program(program);
            return Err(CompileError::new(CompileStage::Link, log));
        }
    };

    tracing::debug!(
        program = program.0,
        time = uniforms.time.is_some(),
        resolution = uniforms.resolution.is_some(),
        mouse = uniforms.mouse.is_some(),
        "linked shader program"
    );

    Ok(CompiledProgram {
        program,
        buffer,
        position,
        uniforms,
        disposed: false,
    })
}

impl CompiledProgram {
    pub fn handle(&self) -> ProgramHandle {
        self.program
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn uniforms(&self) -> &UniformSlots {
        &self.uniforms
    }

    /// Writes `value` if the program reads `slot`.
    pub fn set(
        &self,
        ctx: &mut dyn GraphicsContext,
        slot: Option<UniformLocation>,
        value: UniformValue,
    ) {
        if let Some(location) = slot {
            ctx.set_uniform(self.program, location, value);
        }
    }

    pub fn quad_draw(&self) -> DrawCall {
        DrawCall {
            program: self.program,
            buffer: self.buffer,
            position_attribute: self.position,
            vertex_count: QUAD_VERTICES.len() as u32,
        }
    }

    /// Releases the program and its buffer.
    pub fn dispose(mut self, ctx: &mut dyn GraphicsContext) {
        ctx.delete_buffer(self.buffer);
        ctx.delete_program(self.program);
        self.disposed = true;
    }
}

impl Drop for CompiledProgram {
    fn drop(&mut self) {
        if !self.disposed {
            tracing::warn!(program = self.program.0, "shader program dropped without dispose");
        }
    }
}
