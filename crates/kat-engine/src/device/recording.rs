//! Recording device for unit tests (no GPU required).
//!
//! Every call is appended to a log that tests inspect. Compile and link
//! outcomes are scripted.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::paint::Color;

use super::{
    AttribFormat, BufferId, BufferUsage, Device, DeviceObject, DrawMode, ProgramId, ShaderId,
    SharedDevice, StageKind, UniformLocation, UniformValue, VertexArrayId,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateBuffer(BufferId),
    BindArrayBuffer(Option<BufferId>),
    BufferData { buffer: BufferId, bytes: usize, usage: BufferUsage },
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    AttribFormat { array: VertexArrayId, attrib: u32, format: AttribFormat },
    AttribBinding { array: VertexArrayId, attrib: u32, binding: u32 },
    EnableAttrib { array: VertexArrayId, attrib: u32 },
    VertexBuffer { array: VertexArrayId, binding: u32, buffer: BufferId, offset: u64, stride: u32 },
    CreateShader(ShaderId, StageKind),
    ShaderSource(ShaderId, String),
    CompileShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    Uniform { program: ProgramId, location: UniformLocation, values: Vec<f32> },
    ClearColor(Color),
    Clear,
    DrawArrays { mode: DrawMode, first: u32, count: u32 },
    Delete(DeviceObject),
}

#[derive(Default)]
pub(crate) struct RecordingDevice {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    sources: RefCell<HashMap<ShaderId, String>>,
    compile_failure_marker: Option<&'static str>,
    link_fails: bool,
    uniforms: Vec<&'static str>,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Compiling a source containing `marker` fails.
    pub(crate) fn failing_compile(mut self, marker: &'static str) -> Self {
        self.compile_failure_marker = Some(marker);
        self
    }

    pub(crate) fn failing_link(mut self) -> Self {
        self.link_fails = true;
        self
    }

    /// Uniform names resolvable on every program; location = index.
    pub(crate) fn with_uniforms(mut self, names: &[&'static str]) -> Self {
        self.uniforms = names.to_vec();
        self
    }

    pub(crate) fn shared() -> (Rc<RecordingDevice>, SharedDevice) {
        Self::new().into_shared()
    }

    pub(crate) fn into_shared(self) -> (Rc<RecordingDevice>, SharedDevice) {
        let rec = Rc::new(self);
        let device: SharedDevice = rec.clone();
        (rec, device)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn deleted(&self) -> Vec<DeviceObject> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Delete(o) => Some(*o),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn compiled_sources(&self) -> Vec<String> {
        let sources = self.sources.borrow();
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::CompileShader(id) => sources.get(id).cloned(),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn source_fails(&self, shader: ShaderId) -> bool {
        let Some(marker) = self.compile_failure_marker else {
            return false;
        };
        self.sources
            .borrow()
            .get(&shader)
            .is_some_and(|s| s.contains(marker))
    }
}

impl Device for RecordingDevice {
    fn create_buffer(&self) -> BufferId {
        let id = BufferId(self.next());
        self.push(Call::CreateBuffer(id));
        id
    }

    fn bind_array_buffer(&self, buffer: Option<BufferId>) {
        self.push(Call::BindArrayBuffer(buffer));
    }

    fn named_buffer_data(&self, buffer: BufferId, data: &[u8], usage: BufferUsage) {
        self.push(Call::BufferData { buffer, bytes: data.len(), usage });
    }

    fn create_vertex_array(&self) -> VertexArrayId {
        let id = VertexArrayId(self.next());
        self.push(Call::CreateVertexArray(id));
        id
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayId>) {
        self.push(Call::BindVertexArray(array));
    }

    fn vertex_array_attrib_format(&self, array: VertexArrayId, attrib: u32, format: AttribFormat) {
        self.push(Call::AttribFormat { array, attrib, format });
    }

    fn vertex_array_attrib_binding(&self, array: VertexArrayId, attrib: u32, binding: u32) {
        self.push(Call::AttribBinding { array, attrib, binding });
    }

    fn enable_vertex_array_attrib(&self, array: VertexArrayId, attrib: u32) {
        self.push(Call::EnableAttrib { array, attrib });
    }

    fn vertex_array_vertex_buffer(
        &self,
        array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        stride: u32,
    ) {
        self.push(Call::VertexBuffer { array, binding, buffer, offset, stride });
    }

    fn create_shader(&self, kind: StageKind) -> ShaderId {
        let id = ShaderId(self.next());
        self.push(Call::CreateShader(id, kind));
        id
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        self.sources.borrow_mut().insert(shader, source.to_string());
        self.push(Call::ShaderSource(shader, source.to_string()));
    }

    fn compile_shader(&self, shader: ShaderId) {
        self.push(Call::CompileShader(shader));
    }

    fn compile_status(&self, shader: ShaderId) -> bool {
        !self.source_fails(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        if self.source_fails(shader) {
            format!("0:1(1): error: syntax error in {shader}")
        } else {
            String::new()
        }
    }

    fn create_program(&self) -> ProgramId {
        let id = ProgramId(self.next());
        self.push(Call::CreateProgram(id));
        id
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.push(Call::AttachShader(program, shader));
    }

    fn link_program(&self, program: ProgramId) {
        self.push(Call::LinkProgram(program));
    }

    fn link_status(&self, _program: ProgramId) -> bool {
        !self.link_fails
    }

    fn program_info_log(&self, _program: ProgramId) -> String {
        if self.link_fails {
            "error: vertex output `v_uv` is not consumed by the fragment stage".to_string()
        } else {
            String::new()
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.push(Call::UseProgram(program));
    }

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|n| *n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn program_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue<'_>) {
        self.push(Call::Uniform {
            program,
            location,
            values: value.components().to_vec(),
        });
    }

    fn clear_color(&self, color: Color) {
        self.push(Call::ClearColor(color));
    }

    fn clear(&self) {
        self.push(Call::Clear);
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) {
        self.push(Call::DrawArrays { mode, first, count });
    }

    fn delete(&self, object: DeviceObject) {
        self.push(Call::Delete(object));
    }
}
