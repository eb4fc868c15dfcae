use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::{
    AttribFormat, BufferId, BufferUsage, Device, DeviceObject, DrawMode, ProgramId, ShaderId,
    StageKind, UniformLocation, UniformValue, VertexArrayId,
};
use crate::paint::Color;

use super::reflect;
use super::state::{
    merge_uniforms, split_passes, write_uniform, ArrayObject, BufferObject, CompiledStage,
    DeviceState, DrawCall, FrameCommand, LinkedProgram, PipelineKey, ProgramObject, ShaderObject,
    UniformSlot, VertexBinding,
};
use super::topology;
use super::{Gpu, GpuInit, SurfaceErrorAction};

/// [`Device`] implementation on top of wgpu.
///
/// Binding state and object tables live on the CPU. Clears and draws are
/// recorded as they are issued and encoded into render passes by
/// [`present`](Self::present): each clear opens a new pass, draws land in the
/// current one.
///
/// Shader sources are WGSL. Uniforms are `var<uniform>` globals in
/// `@group(0)`, one binding each, written by name.
///
/// Pipelines, uniform buffers and generated index buffers are created on
/// first use and reused by later frames.
pub struct WgpuDevice {
    gpu: RefCell<Gpu>,
    state: RefCell<DeviceState>,
    index_buffers: RefCell<HashMap<(DrawMode, Range<u32>), wgpu::Buffer>>,
}

/// Generated index buffers kept before the cache is flushed.
const INDEX_CACHE_LIMIT: usize = 64;

impl WgpuDevice {
    pub fn new(gpu: Gpu) -> Self {
        Self {
            gpu: RefCell::new(gpu),
            state: RefCell::new(DeviceState::default()),
            index_buffers: RefCell::new(HashMap::new()),
        }
    }

    /// Device rendering into an offscreen `width`×`height` texture.
    pub fn headless(width: u32, height: u32, init: GpuInit) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::headless(width, height, init))?;
        Ok(Self::new(gpu))
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.gpu.borrow().size()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.gpu.borrow().format()
    }

    pub fn resize(&self, size: PhysicalSize<u32>) {
        self.gpu.borrow_mut().resize(size);
    }

    pub fn set_swap_interval(&self, interval: u32) {
        self.gpu.borrow_mut().set_swap_interval(interval);
    }

    /// Reads back the last presented offscreen frame (RGBA8, row-major).
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        self.gpu.borrow().read_pixels()
    }

    /// Encodes everything recorded since the last present and shows it.
    ///
    /// On a surface error the recorded commands are dropped and the action
    /// the caller should take is returned.
    pub fn present(&self) -> std::result::Result<(), SurfaceErrorAction> {
        let commands = std::mem::take(&mut self.state.borrow_mut().commands);

        let frame = self.gpu.borrow().begin_frame();
        let mut frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame dropped: {err}");
                return Err(self.gpu.borrow_mut().handle_surface_error(err));
            }
        };

        let gpu = self.gpu.borrow();
        let mut slots_used: HashMap<*const LinkedProgram, usize> = HashMap::new();
        let passes = split_passes(commands, |call| {
            let mode = call.mode;
            match self.prepare_draw(&gpu, &mut slots_used, call) {
                Ok(draw) => draw,
                Err(err) => {
                    log::error!("{mode:?} draw skipped: {err}");
                    None
                }
            }
        });

        for pass in &passes {
            let load = match pass.clear {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(c.r),
                    g: f64::from(c.g),
                    b: f64::from(c.b),
                    a: f64::from(c.a),
                }),
                None => wgpu::LoadOp::Load,
            };
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kat frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &pass.draws {
                rpass.set_pipeline(&draw.pipeline);
                rpass.set_bind_group(0, &draw.bind_group, &[]);
                for (slot, (buffer, offset)) in draw.vertex_buffers.iter().enumerate() {
                    rpass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
                }
                match &draw.indices {
                    Some((index_buffer, count)) => {
                        rpass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => rpass.draw(draw.vertices.clone(), 0..1),
                }
            }
        }

        log::trace!(
            "present: {} passes, {} draws",
            passes.len(),
            passes.iter().map(|p| p.draws.len()).sum::<usize>()
        );
        gpu.submit(frame);
        Ok(())
    }

    fn compile_stage(&self, kind: StageKind, source: &str) -> std::result::Result<CompiledStage, String> {
        let entry = match kind {
            StageKind::Vertex => "@vertex",
            StageKind::Fragment => "@fragment",
            StageKind::Compute => "@compute",
            other => return Err(format!("{other} stages are not supported by the wgpu backend")),
        };
        if !source.contains(entry) {
            return Err(format!("{kind} stage source has no `{entry}` entry point"));
        }
        let uniforms = reflect::scan_uniforms(source)?;

        let gpu = self.gpu.borrow();
        let module = validated(gpu.device(), |d| {
            d.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("kat shader stage"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        Ok(CompiledStage { module, uniforms })
    }

    fn link_stages(
        &self,
        stages: Vec<(ShaderId, StageKind, Option<CompiledStage>)>,
    ) -> std::result::Result<LinkedProgram, String> {
        let mut vertex = None;
        let mut fragment = None;
        let mut uniforms = Vec::new();

        for (id, kind, compiled) in stages {
            let compiled = compiled.ok_or_else(|| format!("{id} ({kind}) is not compiled"))?;
            let slot = match kind {
                StageKind::Vertex => &mut vertex,
                StageKind::Fragment => &mut fragment,
                StageKind::Compute => {
                    return Err("compute stages cannot be linked into a render program".into());
                }
                other => return Err(format!("{other} stages are not supported by the wgpu backend")),
            };
            if slot.replace(compiled.module).is_some() {
                return Err(format!("more than one {kind} stage attached"));
            }
            merge_uniforms(&mut uniforms, &compiled.uniforms)?;
        }

        let vertex = vertex.ok_or("program has no vertex stage")?;
        let fragment = fragment.ok_or("program has no fragment stage")?;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
            .iter()
            .map(|u| wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let gpu = self.gpu.borrow();
        let (bind_group_layout, pipeline_layout) = validated(gpu.device(), |d| {
            let bgl = d.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("kat program bgl"),
                entries: &entries,
            });
            let layout = d.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("kat program layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });
            (bgl, layout)
        })?;

        Ok(LinkedProgram {
            vertex,
            fragment,
            uniforms,
            bind_group_layout,
            pipeline_layout,
            pipelines: RefCell::new(HashMap::new()),
            uniform_slots: RefCell::new(Vec::new()),
        })
    }

    /// Resolves a recorded draw into GPU objects. `Ok(None)` means the draw
    /// has nothing to rasterize.
    fn prepare_draw(
        &self,
        gpu: &Gpu,
        slots_used: &mut HashMap<*const LinkedProgram, usize>,
        call: DrawCall,
    ) -> std::result::Result<Option<PreparedDraw>, String> {
        let DrawCall {
            program,
            uniform_values,
            inputs,
            topology,
            mode,
        } = call;

        if topology.indices.as_ref().is_some_and(Vec::is_empty) {
            log::debug!("{mode:?} draw of {} vertices produces no primitives", topology.vertices.len());
            return Ok(None);
        }

        let key = PipelineKey {
            buffers: inputs.iter().map(|(_, _, layout)| layout.clone()).collect(),
            primitive: topology.primitive,
            strip_index_format: topology.strip_index_format,
            format: gpu.format(),
        };
        let pipeline = pipeline_for(gpu.device(), &program, &key)?;

        let slot = slots_used.entry(Rc::as_ptr(&program)).or_default();
        let bind_group = uniform_slot(gpu, &program, *slot, &uniform_values)?;
        *slot += 1;

        let indices = match &topology.indices {
            Some(indices) => Some((
                self.index_buffer(gpu.device(), mode, &topology.vertices, indices)?,
                indices.len() as u32,
            )),
            None => None,
        };

        Ok(Some(PreparedDraw {
            pipeline,
            bind_group,
            vertex_buffers: inputs.into_iter().map(|(b, offset, _)| (b, offset)).collect(),
            indices,
            vertices: topology.vertices,
        }))
    }

    /// Returns the index buffer for a fan or loop over `vertices`.
    fn index_buffer(
        &self,
        device: &wgpu::Device,
        mode: DrawMode,
        vertices: &Range<u32>,
        indices: &[u32],
    ) -> std::result::Result<wgpu::Buffer, String> {
        let key = (mode, vertices.clone());
        if let Some(buffer) = self.index_buffers.borrow().get(&key) {
            return Ok(buffer.clone());
        }

        let buffer = validated(device, |d| {
            d.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("kat index buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        })?;

        let mut cache = self.index_buffers.borrow_mut();
        if cache.len() >= INDEX_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(key, buffer.clone());
        Ok(buffer)
    }
}

impl Device for WgpuDevice {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> BufferId {
        let mut st = self.state.borrow_mut();
        let id = BufferId(st.next_id());
        st.buffers.insert(id, BufferObject::default());
        id
    }

    fn bind_array_buffer(&self, buffer: Option<BufferId>) {
        let mut st = self.state.borrow_mut();
        if let Some(id) = buffer
            && !st.buffers.contains_key(&id)
        {
            log::error!("bind_array_buffer: unknown {id}");
            return;
        }
        st.bound_array_buffer = buffer;
    }

    fn named_buffer_data(&self, buffer: BufferId, data: &[u8], usage: BufferUsage) {
        let gpu_buffer = (!data.is_empty()).then(|| {
            let mut usages = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;
            if usage.is_readback() {
                usages |= wgpu::BufferUsages::COPY_SRC;
            }
            self.gpu
                .borrow()
                .device()
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("kat vertex buffer"),
                    contents: data,
                    usage: usages,
                })
        });

        let mut st = self.state.borrow_mut();
        match st.buffers.get_mut(&buffer) {
            Some(obj) => obj.buffer = gpu_buffer,
            None => log::error!("named_buffer_data: unknown {buffer}"),
        }
    }

    // ── vertex arrays ─────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> VertexArrayId {
        let mut st = self.state.borrow_mut();
        let id = VertexArrayId(st.next_id());
        st.arrays.insert(id, ArrayObject::default());
        id
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayId>) {
        let mut st = self.state.borrow_mut();
        if let Some(id) = array
            && !st.arrays.contains_key(&id)
        {
            log::error!("bind_vertex_array: unknown {id}");
            return;
        }
        st.bound_array = array;
    }

    fn vertex_array_attrib_format(&self, array: VertexArrayId, attrib: u32, format: AttribFormat) {
        if !(1..=4).contains(&format.components) {
            log::error!("{array}: attribute {attrib} has {} components", format.components);
            return;
        }
        self.with_array(array, |a| a.attribs.entry(attrib).or_default().format = Some(format));
    }

    fn vertex_array_attrib_binding(&self, array: VertexArrayId, attrib: u32, binding: u32) {
        self.with_array(array, |a| a.attribs.entry(attrib).or_default().binding = binding);
    }

    fn enable_vertex_array_attrib(&self, array: VertexArrayId, attrib: u32) {
        self.with_array(array, |a| a.attribs.entry(attrib).or_default().enabled = true);
    }

    fn vertex_array_vertex_buffer(
        &self,
        array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        stride: u32,
    ) {
        self.with_array(array, |a| {
            a.bindings.insert(binding, VertexBinding { buffer, offset, stride });
        });
    }

    // ── shader stages ─────────────────────────────────────────────────────

    fn create_shader(&self, kind: StageKind) -> ShaderId {
        let mut st = self.state.borrow_mut();
        let id = ShaderId(st.next_id());
        st.shaders.insert(
            id,
            ShaderObject {
                kind,
                source: String::new(),
                compiled: None,
                log: String::new(),
            },
        );
        id
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        match self.state.borrow_mut().shaders.get_mut(&shader) {
            Some(obj) => obj.source = source.to_owned(),
            None => log::error!("shader_source: unknown {shader}"),
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let (kind, source) = match self.state.borrow().shaders.get(&shader) {
            Some(obj) => (obj.kind, obj.source.clone()),
            None => {
                log::error!("compile_shader: unknown {shader}");
                return;
            }
        };

        let result = self.compile_stage(kind, &source);

        if let Some(obj) = self.state.borrow_mut().shaders.get_mut(&shader) {
            match result {
                Ok(compiled) => {
                    obj.compiled = Some(compiled);
                    obj.log.clear();
                }
                Err(log) => {
                    obj.compiled = None;
                    obj.log = log;
                }
            }
        }
    }

    fn compile_status(&self, shader: ShaderId) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled.is_some())
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_else(|| format!("unknown {shader}"))
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> ProgramId {
        let mut st = self.state.borrow_mut();
        let id = ProgramId(st.next_id());
        st.programs.insert(id, ProgramObject::default());
        id
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        match self.state.borrow_mut().programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => log::error!("attach_shader: unknown {program}"),
        }
    }

    fn link_program(&self, program: ProgramId) {
        let stages = {
            let st = self.state.borrow();
            let Some(p) = st.programs.get(&program) else {
                log::error!("link_program: unknown {program}");
                return;
            };
            p.attached
                .iter()
                .map(|id| match st.shaders.get(id) {
                    Some(s) => (*id, s.kind, s.compiled.clone()),
                    None => (*id, StageKind::Vertex, None),
                })
                .collect::<Vec<_>>()
        };

        let result = self.link_stages(stages);

        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            match result {
                Ok(linked) => {
                    p.uniform_values = vec![[0.0; 16]; linked.uniforms.len()];
                    p.linked = Some(Rc::new(linked));
                    p.log.clear();
                }
                Err(log) => {
                    p.linked = None;
                    p.uniform_values.clear();
                    p.log = log;
                }
            }
        }
    }

    fn link_status(&self, program: ProgramId) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_else(|| format!("unknown {program}"))
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut st = self.state.borrow_mut();
        if let Some(id) = program
            && !st.programs.get(&id).is_some_and(|p| p.linked.is_some())
        {
            log::error!("use_program: {id} is not a linked program");
            return;
        }
        st.current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let st = self.state.borrow();
        let linked = st.programs.get(&program)?.linked.as_ref()?;
        linked
            .uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn program_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue<'_>) {
        let mut st = self.state.borrow_mut();
        let Some(p) = st.programs.get_mut(&program) else {
            log::error!("program_uniform: unknown {program}");
            return;
        };
        let Some(linked) = &p.linked else {
            log::error!("program_uniform: {program} is not linked");
            return;
        };
        if let Err(msg) = write_uniform(&mut p.uniform_values, &linked.uniforms, location, value) {
            log::error!("program_uniform: {program}: {msg}");
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    fn clear_color(&self, color: Color) {
        self.state.borrow_mut().clear_color = color;
    }

    fn clear(&self) {
        let mut st = self.state.borrow_mut();
        let color = st.clear_color;
        st.commands.push(FrameCommand::Clear(color));
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let topology = match topology::expand(mode, first, count) {
            Ok(t) => t,
            Err(reason) => {
                log::error!("draw_arrays({mode:?}) skipped: {reason}");
                return;
            }
        };

        let mut guard = self.state.borrow_mut();
        let st = &mut *guard;

        let Some(program_id) = st.current_program else {
            log::error!("draw_arrays: no program in use");
            return;
        };
        let Some((program, uniform_values)) = st
            .programs
            .get(&program_id)
            .and_then(|p| Some((p.linked.clone()?, p.uniform_values.clone())))
        else {
            log::error!("draw_arrays: {program_id} is not linked");
            return;
        };
        let Some(array_id) = st.bound_array else {
            log::error!("draw_arrays: no vertex array bound");
            return;
        };
        let Some(array) = st.arrays.get(&array_id) else {
            log::error!("draw_arrays: {array_id} was deleted");
            return;
        };

        let inputs = match array.vertex_inputs() {
            Ok(inputs) => inputs,
            Err(msg) => {
                log::error!("draw_arrays: {array_id}: {msg}");
                return;
            }
        };
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            let Some(buffer) = st.buffers.get(&input.buffer).and_then(|b| b.buffer.clone()) else {
                log::error!("draw_arrays: {array_id} reads {}, which has no data", input.buffer);
                return;
            };
            resolved.push((buffer, input.offset, input.layout));
        }

        st.commands.push(FrameCommand::Draw(DrawCall {
            program,
            uniform_values,
            inputs: resolved,
            topology,
            mode,
        }));
    }

    // ── lifetime ──────────────────────────────────────────────────────────

    fn delete(&self, object: DeviceObject) {
        let mut st = self.state.borrow_mut();
        let removed = match object {
            DeviceObject::Buffer(id) => {
                if st.bound_array_buffer == Some(id) {
                    st.bound_array_buffer = None;
                }
                st.buffers.remove(&id).is_some()
            }
            DeviceObject::VertexArray(id) => {
                if st.bound_array == Some(id) {
                    st.bound_array = None;
                }
                st.arrays.remove(&id).is_some()
            }
            DeviceObject::Shader(id) => st.shaders.remove(&id).is_some(),
            DeviceObject::Program(id) => {
                if st.current_program == Some(id) {
                    st.current_program = None;
                }
                st.programs.remove(&id).is_some()
            }
        };
        if !removed {
            log::error!("delete: unknown {object}");
        }
    }
}

impl WgpuDevice {
    fn with_array(&self, array: VertexArrayId, f: impl FnOnce(&mut ArrayObject)) {
        match self.state.borrow_mut().arrays.get_mut(&array) {
            Some(a) => f(a),
            None => log::error!("unknown {array}"),
        }
    }
}

// ── frame encoding ────────────────────────────────────────────────────────

struct PreparedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex_buffers: Vec<(wgpu::Buffer, u64)>,
    indices: Option<(wgpu::Buffer, u32)>,
    vertices: Range<u32>,
}

/// Writes `values` into the program's `index`-th uniform slot, creating the
/// slot on first use, and returns its bind group.
///
/// Queue writes land before the frame's commands run, so each draw of a
/// frame needs its own slot.
fn uniform_slot(
    gpu: &Gpu,
    program: &LinkedProgram,
    index: usize,
    values: &[[f32; 16]],
) -> std::result::Result<wgpu::BindGroup, String> {
    let mut slots = program.uniform_slots.borrow_mut();
    if index >= slots.len() {
        let slot = validated(gpu.device(), |device| new_uniform_slot(device, program))?;
        slots.push(slot);
    }
    let Some(slot) = slots.get(index) else {
        return Err(format!("uniform slot {index} requested out of order"));
    };

    for ((decl, buffer), values) in program.uniforms.iter().zip(&slot.buffers).zip(values) {
        let len = (decl.ty.buffer_size() / 4) as usize;
        gpu.queue().write_buffer(buffer, 0, bytemuck::cast_slice(&values[..len]));
    }
    Ok(slot.bind_group.clone())
}

fn new_uniform_slot(device: &wgpu::Device, program: &LinkedProgram) -> UniformSlot {
    let buffers: Vec<wgpu::Buffer> = program
        .uniforms
        .iter()
        .map(|decl| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("kat uniform buffer"),
                size: decl.ty.buffer_size(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .collect();

    let entries: Vec<wgpu::BindGroupEntry> = program
        .uniforms
        .iter()
        .zip(&buffers)
        .map(|(decl, buffer)| wgpu::BindGroupEntry {
            binding: decl.binding,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kat uniform bind group"),
        layout: &program.bind_group_layout,
        entries: &entries,
    });

    UniformSlot { buffers, bind_group }
}

/// Returns the cached pipeline for `key`, creating it on first use.
fn pipeline_for(
    device: &wgpu::Device,
    program: &LinkedProgram,
    key: &PipelineKey,
) -> std::result::Result<wgpu::RenderPipeline, String> {
    if let Some(pipeline) = program.pipelines.borrow().get(key) {
        return Ok(pipeline.clone());
    }

    let attributes: Vec<Vec<wgpu::VertexAttribute>> = key
        .buffers
        .iter()
        .map(|layout| {
            layout
                .attributes
                .iter()
                .map(|a| wgpu::VertexAttribute {
                    format: vertex_format(a.components),
                    offset: u64::from(a.offset),
                    shader_location: a.location,
                })
                .collect()
        })
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout> = key
        .buffers
        .iter()
        .zip(&attributes)
        .map(|(layout, attributes)| wgpu::VertexBufferLayout {
            array_stride: u64::from(layout.stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    let pipeline = validated(device, |device| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("kat pipeline"),
            layout: Some(&program.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: None,
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: None,
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: key.primitive,
                strip_index_format: key.strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    })?;

    program
        .pipelines
        .borrow_mut()
        .insert(key.clone(), pipeline.clone());
    Ok(pipeline)
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Runs `f` inside a validation error scope and reports what it caught.
fn validated<T>(device: &wgpu::Device, f: impl FnOnce(&wgpu::Device) -> T) -> std::result::Result<T, String> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f(device);
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}
