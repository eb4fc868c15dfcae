//! Graphics device abstraction.
//!
//! The engine never talks to a graphics API directly. Every resource wrapper
//! (`VertexBuffer`, `VertexArray`, `Shader`) goes through the [`Device`] trait,
//! which models a GL-style object device:
//! - objects are named by small integer ids issued by the device
//! - a process-wide "current binding" state exists (array buffer, vertex array, program)
//! - uniform writes are program-targeted and do not depend on the active program
//!
//! The concrete wgpu implementation lives in [`crate::gpu`].

mod handle;
mod types;

#[cfg(test)]
pub(crate) mod recording;

use std::rc::Rc;

use crate::paint::Color;

pub use handle::{
    BufferId, DeviceObject, Handle, ObjectId, ProgramId, ShaderId, UniformLocation, VertexArrayId,
};
pub use types::{AttribFormat, BufferUsage, DrawMode, StageKind, UniformValue};

/// Shared, thread-affine device reference.
///
/// `Rc` keeps every device call on the thread that created the context.
pub type SharedDevice = Rc<dyn Device>;

/// Opaque graphics device.
///
/// Calls are synchronous and infallible at this level: misuse (unknown ids,
/// draws without a bound vertex array) is reported by the implementation through
/// logging, the same way a GL driver reports it through its error state.
pub trait Device {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> BufferId;

    /// Binds `buffer` as the current array buffer (`None` unbinds).
    fn bind_array_buffer(&self, buffer: Option<BufferId>);

    /// Replaces the whole content of `buffer`. No bind is required.
    fn named_buffer_data(&self, buffer: BufferId, data: &[u8], usage: BufferUsage);

    // ── vertex arrays ─────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> VertexArrayId;

    fn bind_vertex_array(&self, array: Option<VertexArrayId>);

    fn vertex_array_attrib_format(&self, array: VertexArrayId, attrib: u32, format: AttribFormat);

    fn vertex_array_attrib_binding(&self, array: VertexArrayId, attrib: u32, binding: u32);

    fn enable_vertex_array_attrib(&self, array: VertexArrayId, attrib: u32);

    /// Attaches `buffer` to `binding` with the given start offset and stride (bytes).
    fn vertex_array_vertex_buffer(
        &self,
        array: VertexArrayId,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        stride: u32,
    );

    // ── shader stages ─────────────────────────────────────────────────────

    fn create_shader(&self, kind: StageKind) -> ShaderId;

    fn shader_source(&self, shader: ShaderId, source: &str);

    fn compile_shader(&self, shader: ShaderId);

    fn compile_status(&self, shader: ShaderId) -> bool;

    fn shader_info_log(&self, shader: ShaderId) -> String;

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> ProgramId;

    fn attach_shader(&self, program: ProgramId, shader: ShaderId);

    fn link_program(&self, program: ProgramId);

    fn link_status(&self, program: ProgramId) -> bool;

    fn program_info_log(&self, program: ProgramId) -> String;

    fn use_program(&self, program: Option<ProgramId>);

    /// Resolves `name` on `program`. `None` is the "not found" sentinel.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn program_uniform(&self, program: ProgramId, location: UniformLocation, value: UniformValue<'_>);

    // ── frame ─────────────────────────────────────────────────────────────

    fn clear_color(&self, color: Color);

    /// Clears the frame with the current clear color.
    fn clear(&self);

    /// Draws `count` vertices starting at `first` from the bound vertex array
    /// using the active program.
    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32);

    // ── lifetime ──────────────────────────────────────────────────────────

    /// Releases a device object. The id must not be used afterwards.
    fn delete(&self, object: DeviceObject);
}
