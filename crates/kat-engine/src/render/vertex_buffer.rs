use crate::device::{BufferId, BufferUsage, Handle, SharedDevice};

/// Device buffer holding `f32` vertex data.
///
/// The payload is uploaded once, at construction, and never changes.
#[derive(Debug)]
pub struct VertexBuffer {
    handle: Handle<BufferId>,
    len: usize,
    usage: BufferUsage,
}

impl VertexBuffer {
    /// Creates a buffer with no storage.
    ///
    /// The buffer is bound once so the device materializes the object, then
    /// the array-buffer binding is cleared again.
    pub fn empty(device: &SharedDevice) -> Self {
        let handle = Handle::create(device, |d| d.create_buffer());
        device.bind_array_buffer(Some(handle.id()));
        device.bind_array_buffer(None);
        Self {
            handle,
            len: 0,
            usage: BufferUsage::default(),
        }
    }

    /// Creates a buffer and uploads `data` in one step.
    ///
    /// An empty slice yields a valid zero-length buffer.
    pub fn new(device: &SharedDevice, data: &[f32], usage: BufferUsage) -> Self {
        let handle = Handle::create(device, |d| d.create_buffer());
        device.named_buffer_data(handle.id(), bytemuck::cast_slice(data), usage);
        log::debug!("{} <- {} floats ({usage:?})", handle.id(), data.len());
        Self {
            handle,
            len: data.len(),
            usage,
        }
    }

    /// [`VertexBuffer::new`] with [`BufferUsage::StaticDraw`].
    pub fn with_data(device: &SharedDevice, data: &[f32]) -> Self {
        Self::new(device, data, BufferUsage::StaticDraw)
    }

    pub fn bind(&self) {
        self.handle.device().bind_array_buffer(Some(self.handle.id()));
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.handle.id()
    }

    /// Number of floats uploaded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn dispose(self) {
        self.handle.dispose();
    }
}
