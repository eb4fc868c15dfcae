//! Object tables and binding state behind [`WgpuDevice`](super::WgpuDevice).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::device::{
    AttribFormat, BufferId, DrawMode, ProgramId, ShaderId, StageKind, UniformLocation,
    UniformValue, VertexArrayId,
};
use crate::paint::Color;

use super::reflect::UniformDecl;
use super::topology::Topology;

#[derive(Default)]
pub(super) struct BufferObject {
    /// `None` until data is uploaded, and for zero-length uploads.
    pub buffer: Option<wgpu::Buffer>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct AttribState {
    pub format: Option<AttribFormat>,
    pub binding: u32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct VertexBinding {
    pub buffer: BufferId,
    pub offset: u64,
    pub stride: u32,
}

#[derive(Debug, Default)]
pub(super) struct ArrayObject {
    pub attribs: BTreeMap<u32, AttribState>,
    pub bindings: BTreeMap<u32, VertexBinding>,
}

/// Vertex attribute as seen by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct AttribKey {
    pub location: u32,
    pub components: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct BufferLayoutKey {
    pub stride: u32,
    pub attributes: Vec<AttribKey>,
}

/// One wgpu vertex buffer slot: which buffer, from where, with what layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct VertexInput {
    pub buffer: BufferId,
    pub offset: u64,
    pub layout: BufferLayoutKey,
}

impl ArrayObject {
    /// Collects enabled attributes into per-binding layouts, in binding order.
    ///
    /// Bindings are compacted: wgpu vertex buffer slots are always `0..n`.
    pub fn vertex_inputs(&self) -> Result<Vec<VertexInput>, String> {
        let mut per_binding: BTreeMap<u32, Vec<AttribKey>> = BTreeMap::new();
        for (&location, attrib) in &self.attribs {
            if !attrib.enabled {
                continue;
            }
            let format = attrib
                .format
                .ok_or_else(|| format!("attribute {location} is enabled but has no format"))?;
            per_binding.entry(attrib.binding).or_default().push(AttribKey {
                location,
                components: format.components,
                offset: format.offset,
            });
        }

        per_binding
            .into_iter()
            .map(|(slot, attributes)| {
                let binding = self
                    .bindings
                    .get(&slot)
                    .ok_or_else(|| format!("binding slot {slot} has no vertex buffer"))?;
                Ok(VertexInput {
                    buffer: binding.buffer,
                    offset: binding.offset,
                    layout: BufferLayoutKey {
                        stride: binding.stride,
                        attributes,
                    },
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub(super) struct CompiledStage {
    pub module: wgpu::ShaderModule,
    pub uniforms: Vec<UniformDecl>,
}

pub(super) struct ShaderObject {
    pub kind: StageKind,
    pub source: String,
    pub compiled: Option<CompiledStage>,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub buffers: Vec<BufferLayoutKey>,
    pub primitive: wgpu::PrimitiveTopology,
    pub strip_index_format: Option<wgpu::IndexFormat>,
    pub format: wgpu::TextureFormat,
}

/// Result of a successful link. Shared with queued draws, so a program
/// deleted mid-frame still renders the draws already submitted with it.
pub(super) struct LinkedProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub uniforms: Vec<UniformDecl>,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub pipelines: RefCell<HashMap<PipelineKey, wgpu::RenderPipeline>>,
    /// Uniform buffers + bind group per draw of this program within a frame.
    /// Slot `n` serves the program's `n`-th draw and is reused every frame.
    pub uniform_slots: RefCell<Vec<UniformSlot>>,
}

pub(super) struct UniformSlot {
    /// One buffer per uniform, indexed like `LinkedProgram::uniforms`.
    pub buffers: Vec<wgpu::Buffer>,
    pub bind_group: wgpu::BindGroup,
}

#[derive(Default)]
pub(super) struct ProgramObject {
    pub attached: Vec<ShaderId>,
    pub linked: Option<Rc<LinkedProgram>>,
    pub log: String,
    /// Current value of each uniform, indexed like `LinkedProgram::uniforms`.
    pub uniform_values: Vec<[f32; 16]>,
}

/// Draw captured at submission time, replayed at present.
///
/// Uniform values are copied here, so later writes do not affect draws
/// already submitted.
pub(super) struct DrawCall {
    pub program: Rc<LinkedProgram>,
    pub uniform_values: Vec<[f32; 16]>,
    pub inputs: Vec<(wgpu::Buffer, u64, BufferLayoutKey)>,
    pub topology: Topology,
    pub mode: DrawMode,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum FrameCommand<D = DrawCall> {
    Clear(Color),
    Draw(D),
}

/// Draws sharing one render pass. `clear` is `None` when the pass keeps
/// what the target already holds.
#[derive(Debug, PartialEq)]
pub(super) struct Pass<D> {
    pub clear: Option<Color>,
    pub draws: Vec<D>,
}

/// Groups a frame's commands into passes.
///
/// Every clear opens a new pass. Draws before the first clear go into a
/// pass that loads the existing contents. Draws that `prepare` rejects are
/// dropped without affecting pass boundaries.
pub(super) fn split_passes<D, P>(
    commands: Vec<FrameCommand<D>>,
    mut prepare: impl FnMut(D) -> Option<P>,
) -> Vec<Pass<P>> {
    let mut passes: Vec<Pass<P>> = Vec::new();
    for command in commands {
        match command {
            FrameCommand::Clear(color) => passes.push(Pass {
                clear: Some(color),
                draws: Vec::new(),
            }),
            FrameCommand::Draw(draw) => {
                let Some(draw) = prepare(draw) else {
                    continue;
                };
                match passes.last_mut() {
                    Some(pass) => pass.draws.push(draw),
                    None => passes.push(Pass {
                        clear: None,
                        draws: vec![draw],
                    }),
                }
            }
        }
    }
    passes
}

/// Stores `value` as the current value of the uniform at `location`.
///
/// `values` and `decls` are indexed alike. The value must have exactly the
/// declared number of components.
pub(super) fn write_uniform(
    values: &mut [[f32; 16]],
    decls: &[UniformDecl],
    location: UniformLocation,
    value: UniformValue<'_>,
) -> Result<(), String> {
    let index = location.0 as usize;
    let (Some(decl), Some(slot)) = (decls.get(index), values.get_mut(index)) else {
        return Err(format!("no uniform at location {}", location.0));
    };
    let components = value.components();
    if components.len() != decl.ty.components() {
        return Err(format!(
            "`{}` is {:?}, got {} components",
            decl.name,
            decl.ty,
            components.len()
        ));
    }
    slot[..components.len()].copy_from_slice(components);
    Ok(())
}

/// Everything the GL-style device model keeps between calls.
#[derive(Default)]
pub(super) struct DeviceState {
    next_id: u32,
    pub buffers: HashMap<BufferId, BufferObject>,
    pub arrays: HashMap<VertexArrayId, ArrayObject>,
    pub shaders: HashMap<ShaderId, ShaderObject>,
    pub programs: HashMap<ProgramId, ProgramObject>,

    pub bound_array_buffer: Option<BufferId>,
    pub bound_array: Option<VertexArrayId>,
    pub current_program: Option<ProgramId>,
    pub clear_color: Color,

    pub commands: Vec<FrameCommand>,
}

impl DeviceState {
    /// Issues a fresh id. Ids are never reused.
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Adds `incoming` to the program-wide uniform list.
///
/// The same name may appear in several stages if it has the same binding and
/// type everywhere. A binding may only be used by one name.
pub(super) fn merge_uniforms(merged: &mut Vec<UniformDecl>, incoming: &[UniformDecl]) -> Result<(), String> {
    for decl in incoming {
        if let Some(existing) = merged.iter().find(|u| u.name == decl.name) {
            if existing != decl {
                return Err(format!(
                    "uniform `{}` is declared differently across stages",
                    decl.name
                ));
            }
            continue;
        }
        if let Some(clash) = merged.iter().find(|u| u.binding == decl.binding) {
            return Err(format!(
                "@binding({}) is used by both `{}` and `{}`",
                decl.binding, clash.name, decl.name
            ));
        }
        merged.push(decl.clone());
    }
    Ok(())
}
