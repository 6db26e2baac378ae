//! Recording [`GraphicsContext`] for tests.
//!
//! Shaders "compile" when their braces balance and they define `main`; tests
//! can force failures with marker strings or a failing link. Every call is
//! logged so tests can assert on ordering, live objects and uniform values.
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::glsl::{references, BUILTIN_UNIFORMS, PRESENTATION_UNIFORMS};
use super::{
    BufferHandle, DrawCall, GraphicsContext, ProgramHandle, ShaderHandle, ShaderKind,
    UniformLocation, UniformValue,
};
use crate::types::PixelSize;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateShader(ShaderKind),
    DeleteShader(u32),
    Link,
    DeleteProgram(u32),
    CreateBuffer(usize),
    DeleteBuffer(u32),
    Viewport(PixelSize),
    Draw { program: u32, vertices: u32 },
    Clear,
}

#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub calls: Vec<Call>,
    pub shaders: BTreeSet<u32>,
    pub programs: BTreeSet<u32>,
    pub buffers: BTreeMap<u32, Vec<[f32; 2]>>,
    /// Last value written per program and uniform name.
    pub uniforms: BTreeMap<(u32, String), UniformValue>,
    pub viewport: Option<PixelSize>,
    pub draws: usize,
}

impl FakeLog {
    pub fn live_objects(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.buffers.len()
    }

    pub fn uniform(&self, program: u32, name: &str) -> Option<UniformValue> {
        self.uniforms.get(&(program, name.to_string())).copied()
    }

    pub fn draws_of(&self, program: u32) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Draw { program: p, .. } if *p == program))
            .count()
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeGpu {
    log: Rc<RefCell<FakeLog>>,
    fail_marker: Option<String>,
    fail_link: bool,
    fail_draw: bool,
    next: u32,
    program_uniforms: BTreeMap<u32, Vec<String>>,
    program_attributes: BTreeMap<u32, Vec<String>>,
    shader_sources: BTreeMap<u32, (ShaderKind, String)>,
}

impl FakeGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the call log; stays valid after the fake is boxed.
    pub fn log(&self) -> Rc<RefCell<FakeLog>> {
        self.log.clone()
    }

    /// Any shader whose source contains `marker` fails to compile.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn failing_draw(mut self) -> Self {
        self.fail_draw = true;
        self
    }

    fn allocate(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}

impl GraphicsContext for FakeGpu {
    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> Result<ShaderHandle, String> {
        self.log.borrow_mut().calls.push(Call::CreateShader(kind));
        if let Some(marker) = &self.fail_marker {
            if source.contains(marker.as_str()) {
                return Err(format!("ERROR: 0:1: '{marker}' : syntax error"));
            }
        }
        if source.matches('{').count() != source.matches('}').count() {
            return Err("ERROR: 0:1: unbalanced braces".to_string());
        }
        if !source.contains("void main") {
            return Err("ERROR: missing main".to_string());
        }
        let id = self.allocate();
        self.log.borrow_mut().shaders.insert(id);
        self.shader_sources.insert(id, (kind, source.to_string()));
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::DeleteShader(shader.0));
        log.shaders.remove(&shader.0);
        self.shader_sources.remove(&shader.0);
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        self.log.borrow_mut().calls.push(Call::Link);
        if self.fail_link {
            return Err("link failed: varying mismatch".to_string());
        }
        let (Some((ShaderKind::Vertex, vertex_source)), Some((ShaderKind::Fragment, fragment_source))) = (
            self.shader_sources.get(&vertex.0).cloned(),
            self.shader_sources.get(&fragment.0).cloned(),
        ) else {
            return Err("invalid shader handles".to_string());
        };

        let id = self.allocate();
        let mut uniforms: Vec<String> = BUILTIN_UNIFORMS
            .iter()
            .filter(|name| references(&fragment_source, name))
            .map(|name| name.to_string())
            .collect();
        uniforms.extend(PRESENTATION_UNIFORMS.iter().map(|name| name.to_string()));
        let attributes = if references(&vertex_source, "position") {
            vec!["position".to_string()]
        } else {
            Vec::new()
        };
        self.program_uniforms.insert(id, uniforms);
        self.program_attributes.insert(id, attributes);
        self.log.borrow_mut().programs.insert(id);
        Ok(ProgramHandle(id))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::DeleteProgram(program.0));
        log.programs.remove(&program.0);
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.program_attributes
            .get(&program.0)?
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.program_uniforms
            .get(&program.0)?
            .iter()
            .position(|uniform| uniform == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<BufferHandle, String> {
        let id = self.allocate();
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::CreateBuffer(vertices.len()));
        log.buffers.insert(id, vertices.to_vec());
        Ok(BufferHandle(id))
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::DeleteBuffer(buffer.0));
        log.buffers.remove(&buffer.0);
    }

    fn set_viewport(&mut self, size: PixelSize) {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Viewport(size));
        log.viewport = Some(size);
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue) {
        let Some(name) = self
            .program_uniforms
            .get(&program.0)
            .and_then(|names| names.get(location.0 as usize))
        else {
            return;
        };
        self.log
            .borrow_mut()
            .uniforms
            .insert((program.0, name.clone()), value);
    }

    fn draw_strip(&mut self, draw: DrawCall) -> Result<(), String> {
        let mut log = self.log.borrow_mut();
        if !log.programs.contains(&draw.program.0) {
            return Err("draw with a deleted program".to_string());
        }
        if !log.buffers.contains_key(&draw.buffer.0) {
            return Err("draw with a deleted buffer".to_string());
        }
        if self.fail_draw {
            return Err("device lost".to_string());
        }
        log.calls.push(Call::Draw {
            program: draw.program.0,
            vertices: draw.vertex_count,
        });
        log.draws += 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.log.borrow_mut().calls.push(Call::Clear);
    }
}
