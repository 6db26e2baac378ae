use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use super::glsl::{wrap_fragment, wrap_vertex};
use super::uniforms::BackdropUniforms;
use super::{
    BufferHandle, DrawCall, GpuDevice, GraphicsContext, ProgramHandle, ShaderHandle, ShaderKind,
    UniformLocation, UniformValue,
};
use crate::types::PixelSize;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

enum Target {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

enum Frame {
    Surface(wgpu::SurfaceTexture),
    Texture,
}

struct ShaderRecord {
    kind: ShaderKind,
    module: wgpu::ShaderModule,
    attributes: Vec<String>,
    uniforms: Vec<&'static str>,
}

struct ProgramRecord {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniforms: BackdropUniforms,
    attributes: Vec<String>,
    active_uniforms: Vec<&'static str>,
}

struct BufferRecord {
    buffer: wgpu::Buffer,
    vertices: u32,
}

/// [`GraphicsContext`] backed by wgpu, drawing into a window surface or an
/// offscreen texture.
pub struct WgpuContext {
    gpu: Arc<GpuDevice>,
    target: Target,
    format: wgpu::TextureFormat,
    viewport: PixelSize,
    uniform_layout: wgpu::BindGroupLayout,
    shaders: HashMap<u32, ShaderRecord>,
    programs: HashMap<u32, ProgramRecord>,
    buffers: HashMap<u32, BufferRecord>,
    next_handle: u32,
}

/// Read side of an offscreen context's colour texture.
pub struct OffscreenTarget {
    gpu: Arc<GpuDevice>,
    texture: wgpu::Texture,
}

impl WgpuContext {
    pub fn for_window(
        gpu: Arc<GpuDevice>,
        surface: wgpu::Surface<'static>,
        size: PixelSize,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        tracing::debug!(?format, ?present_mode, %size, "configured window surface");

        Ok(Self::with_target(gpu, Target::Window { surface, config }, format, size))
    }

    /// Context rendering into a fresh `size` texture, plus the handle used to
    /// read it back.
    pub fn offscreen(gpu: Arc<GpuDevice>, size: PixelSize) -> (Self, OffscreenTarget) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("backdrop offscreen target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target = OffscreenTarget {
            gpu: gpu.clone(),
            texture: texture.clone(),
        };
        let context = Self::with_target(gpu, Target::Offscreen { texture }, OFFSCREEN_FORMAT, size);
        (context, target)
    }

    fn with_target(
        gpu: Arc<GpuDevice>,
        target: Target,
        format: wgpu::TextureFormat,
        viewport: PixelSize,
    ) -> Self {
        let uniform_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("backdrop uniform layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        Self {
            gpu,
            target,
            format,
            viewport,
            uniform_layout,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            next_handle: 0,
        }
    }

    fn allocate_handle(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }

    /// Runs `op` inside a validation error scope and reports what it caught.
    fn scoped<T>(&self, op: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = op(device);
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn acquire(&mut self) -> Result<(Frame, wgpu::TextureView), String> {
        match &mut self.target {
            Target::Window { surface, config } => {
                let texture = match surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        tracing::debug!("surface lost or outdated; reconfiguring");
                        surface.configure(&self.gpu.device, config);
                        surface
                            .get_current_texture()
                            .map_err(|err| format!("failed to acquire surface texture: {err}"))?
                    }
                    Err(err) => return Err(format!("failed to acquire surface texture: {err}")),
                };
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok((Frame::Surface(texture), view))
            }
            Target::Offscreen { texture } => {
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok((Frame::Texture, view))
            }
        }
    }

    fn target_size(&self) -> PixelSize {
        match &self.target {
            Target::Window { config, .. } => PixelSize::new(config.width, config.height),
            Target::Offscreen { texture } => PixelSize::new(texture.width(), texture.height()),
        }
    }

    fn submit(&self, encoder: wgpu::CommandEncoder, frame: Frame) {
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        if let Frame::Surface(texture) = frame {
            texture.present();
        }
    }
}

impl GraphicsContext for WgpuContext {
    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> Result<ShaderHandle, String> {
        let (wrapped, stage, label) = match kind {
            ShaderKind::Vertex => (wrap_vertex(source), ShaderStage::Vertex, "backdrop vertex"),
            ShaderKind::Fragment => (
                wrap_fragment(source),
                ShaderStage::Fragment,
                "backdrop fragment",
            ),
        };
        let module = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Glsl {
                    shader: Cow::Owned(wrapped.code.clone()),
                    stage,
                    defines: &[],
                },
            })
        })?;

        let handle = self.allocate_handle();
        self.shaders.insert(
            handle,
            ShaderRecord {
                kind,
                module,
                attributes: wrapped.attributes,
                uniforms: wrapped.uniforms,
            },
        );
        Ok(ShaderHandle(handle))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader.0);
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let vertex_record = self
            .shaders
            .get(&vertex.0)
            .filter(|record| record.kind == ShaderKind::Vertex)
            .ok_or_else(|| "vertex shader handle is not a live vertex shader".to_string())?;
        let fragment_record = self
            .shaders
            .get(&fragment.0)
            .filter(|record| record.kind == ShaderKind::Fragment)
            .ok_or_else(|| "fragment shader handle is not a live fragment shader".to_string())?;

        // The quad buffer is the only vertex stream, so it can feed exactly one
        // vec2 attribute.
        if let Some(extra) = vertex_record
            .attributes
            .iter()
            .find(|name| name.as_str() != "position")
        {
            return Err(format!("attribute `{extra}` has no vertex buffer"));
        }
        let vertex_attributes: Vec<wgpu::VertexAttribute> = vertex_record
            .attributes
            .iter()
            .enumerate()
            .map(|(location, _)| wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: location as u32,
            })
            .collect();
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        }];
        let buffers: &[wgpu::VertexBufferLayout] = if vertex_attributes.is_empty() {
            &[]
        } else {
            &vertex_buffers
        };

        let format = self.format;
        let uniform_layout = &self.uniform_layout;
        let vertex_module = &vertex_record.module;
        let fragment_module = &fragment_record.module;
        let (pipeline, uniform_buffer, bind_group) = self.scoped(|device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("backdrop pipeline layout"),
                bind_group_layouts: &[uniform_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("backdrop pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some("main"),
                    buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment_module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });
            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("backdrop uniforms"),
                size: std::mem::size_of::<BackdropUniforms>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("backdrop uniform bind group"),
                layout: uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            (pipeline, uniform_buffer, bind_group)
        })?;

        let record = ProgramRecord {
            pipeline,
            uniform_buffer,
            bind_group,
            uniforms: BackdropUniforms::new(),
            attributes: vertex_record.attributes.clone(),
            active_uniforms: fragment_record.uniforms.clone(),
        };
        let handle = self.allocate_handle();
        self.programs.insert(handle, record);
        Ok(ProgramHandle(handle))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(record) = self.programs.remove(&program.0) {
            record.uniform_buffer.destroy();
        }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs
            .get(&program.0)?
            .attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|location| location as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let record = self.programs.get(&program.0)?;
        if !record.active_uniforms.contains(&name) {
            return None;
        }
        BackdropUniforms::location_of(name).map(UniformLocation)
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<BufferHandle, String> {
        let buffer = self.scoped(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("backdrop quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        })?;
        let handle = self.allocate_handle();
        self.buffers.insert(
            handle,
            BufferRecord {
                buffer,
                vertices: vertices.len() as u32,
            },
        );
        Ok(BufferHandle(handle))
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(record) = self.buffers.remove(&buffer.0) {
            record.buffer.destroy();
        }
    }

    fn set_viewport(&mut self, size: PixelSize) {
        self.viewport = size;
        if let Target::Window { surface, config } = &mut self.target {
            if config.width != size.width || config.height != size.height {
                config.width = size.width;
                config.height = size.height;
                surface.configure(&self.gpu.device, config);
            }
        }
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue) {
        let Some(record) = self.programs.get_mut(&program.0) else {
            tracing::warn!(program = program.0, "uniform write to a deleted program");
            return;
        };
        if !record.uniforms.set(location.0, value) {
            tracing::warn!(location = location.0, ?value, "uniform value does not match its location");
        }
    }

    fn draw_strip(&mut self, draw: DrawCall) -> Result<(), String> {
        let program = self
            .programs
            .get(&draw.program.0)
            .ok_or_else(|| "draw with a deleted program".to_string())?;
        let buffer = self
            .buffers
            .get(&draw.buffer.0)
            .ok_or_else(|| "draw with a deleted vertex buffer".to_string())?;
        if draw.vertex_count > buffer.vertices {
            return Err(format!(
                "draw of {} vertices exceeds buffer of {}",
                draw.vertex_count, buffer.vertices
            ));
        }
        if program.attributes.len() as u32 <= draw.position_attribute {
            return Err(format!(
                "program has no attribute at location {}",
                draw.position_attribute
            ));
        }
        self.gpu
            .queue
            .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&program.uniforms));

        let target = self.target_size();
        let width = self.viewport.width.min(target.width) as f32;
        let height = self.viewport.height.min(target.height) as f32;
        let pipeline = program.pipeline.clone();
        let bind_group = program.bind_group.clone();
        let vertex_buffer = buffer.buffer.clone();

        let (frame, view) = self.acquire()?;
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_viewport(0.0, 0.0, width, height, 0.0, 1.0);
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..draw.vertex_count, 0..1);
        }
        self.submit(encoder, frame);
        Ok(())
    }

    fn clear(&mut self) {
        let (frame, view) = match self.acquire() {
            Ok(acquired) => acquired,
            Err(err) => {
                tracing::warn!(error = %err, "failed to clear surface");
                return;
            }
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop clear"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("backdrop clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.submit(encoder, frame);
    }
}

impl OffscreenTarget {
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.texture.width(), self.texture.height())
    }

    /// Copies the texture back to the CPU, blocking until the GPU is done.
    pub fn read_rgba(&self) -> Result<image::RgbaImage> {
        let PixelSize { width, height } = self.size();
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let device = &self.gpu.device;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("backdrop readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("backdrop readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("failed to wait for GPU readback: {err}"))?;
        rx.recv()
            .context("readback callback dropped")?
            .context("failed to map readback buffer")?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        readback.unmap();

        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("readback produced a short image for {width}x{height}"))
    }
}
