use crate::device::{AttribFormat, BufferId, Handle, SharedDevice, VertexArrayId};
use crate::error::LayoutError;

use super::VertexBuffer;

const FLOAT_BYTES: u32 = std::mem::size_of::<f32>() as u32;

/// One enabled vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub index: u32,
    pub components: u32,
    /// Byte offset inside the owning binding's stride.
    pub offset: u32,
    pub binding: u32,
}

/// One buffer attached to a binding slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferBinding {
    pub slot: u32,
    pub buffer: BufferId,
    pub stride: u32,
}

/// Vertex layout object: maps attached buffers onto shader inputs.
///
/// Attribute indices and binding slots are handed out by a cursor that only
/// moves forward. Each [`attach`](Self::attach) call consumes one binding
/// slot and one attribute index per component count.
#[derive(Debug)]
pub struct VertexArray {
    handle: Handle<VertexArrayId>,
    attributes: Vec<VertexAttribute>,
    bindings: Vec<BufferBinding>,
    next_attribute: u32,
    next_binding: u32,
}

impl VertexArray {
    pub fn new(device: &SharedDevice) -> Self {
        let handle = Handle::create(device, |d| d.create_vertex_array());
        device.bind_vertex_array(Some(handle.id()));
        device.bind_vertex_array(None);
        Self {
            handle,
            attributes: Vec::new(),
            bindings: Vec::new(),
            next_attribute: 0,
            next_binding: 0,
        }
    }

    /// Attaches `buffer` at the next binding slot, declaring one attribute per
    /// entry of `components` (tightly packed `f32`s, interleaved in order).
    ///
    /// The list is validated up front; on error nothing is sent to the device
    /// and the layout is left as it was.
    pub fn attach(&mut self, buffer: &VertexBuffer, components: &[u32]) -> Result<&mut Self, LayoutError> {
        validate(components)?;

        let device = self.handle.device();
        let array = self.handle.id();
        let binding = self.next_binding;

        let mut stride = 0;
        for &count in components {
            let index = self.next_attribute;
            device.vertex_array_attrib_format(
                array,
                index,
                AttribFormat {
                    components: count,
                    offset: stride,
                },
            );
            device.vertex_array_attrib_binding(array, index, binding);
            device.enable_vertex_array_attrib(array, index);

            self.attributes.push(VertexAttribute {
                index,
                components: count,
                offset: stride,
                binding,
            });
            self.next_attribute += 1;
            stride += count * FLOAT_BYTES;
        }

        device.vertex_array_vertex_buffer(array, binding, buffer.id(), 0, stride);
        self.bindings.push(BufferBinding {
            slot: binding,
            buffer: buffer.id(),
            stride,
        });
        self.next_binding += 1;

        log::debug!(
            "{array}: {} at binding {binding}, {} attributes, stride {stride}",
            buffer.id(),
            components.len()
        );
        Ok(self)
    }

    /// Makes this layout current for draws.
    pub fn bind(&self) {
        self.handle.device().bind_vertex_array(Some(self.handle.id()));
    }

    /// Clears the current layout, whichever it is.
    pub fn unbind(device: &SharedDevice) {
        device.bind_vertex_array(None);
    }

    #[inline]
    pub fn id(&self) -> VertexArrayId {
        self.handle.id()
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    #[inline]
    pub fn bindings(&self) -> &[BufferBinding] {
        &self.bindings
    }

    #[inline]
    pub fn next_attribute(&self) -> u32 {
        self.next_attribute
    }

    #[inline]
    pub fn next_binding(&self) -> u32 {
        self.next_binding
    }

    pub(crate) fn shared_device(&self) -> &SharedDevice {
        self.handle.shared_device()
    }

    pub fn dispose(self) {
        self.handle.dispose();
    }
}

fn validate(components: &[u32]) -> Result<(), LayoutError> {
    if components.is_empty() {
        return Err(LayoutError::EmptyAttributeList);
    }
    match components.iter().position(|c| !(1..=4).contains(c)) {
        Some(position) => Err(LayoutError::InvalidComponentCount {
            position,
            count: components[position],
        }),
        None => Ok(()),
    }
}
