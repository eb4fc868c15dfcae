use std::fmt;
use std::rc::Rc;

use super::{Device, SharedDevice};

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl ObjectId for $name {
            #[inline]
            fn into_object(self) -> DeviceObject {
                DeviceObject::$variant(self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($variant), self.0)
            }
        }
    };
}

object_id!(
    /// Device buffer object.
    BufferId,
    Buffer
);
object_id!(
    /// Vertex layout (array) object.
    VertexArrayId,
    VertexArray
);
object_id!(
    /// Compiled (or failed) shader stage object.
    ShaderId,
    Shader
);
object_id!(
    /// Program object.
    ProgramId,
    Program
);

/// Uniform location on one specific program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Any device object, as passed to [`Device::delete`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceObject {
    Buffer(BufferId),
    VertexArray(VertexArrayId),
    Shader(ShaderId),
    Program(ProgramId),
}

impl fmt::Display for DeviceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceObject::Buffer(id) => id.fmt(f),
            DeviceObject::VertexArray(id) => id.fmt(f),
            DeviceObject::Shader(id) => id.fmt(f),
            DeviceObject::Program(id) => id.fmt(f),
        }
    }
}

/// Typed device object id.
pub trait ObjectId: Copy + fmt::Debug + fmt::Display {
    fn into_object(self) -> DeviceObject;
}

/// Exclusive owner of one device object.
///
/// The object is created when the handle is constructed and released when the
/// handle is dropped. [`Handle::dispose`] consumes the handle, so an object can
/// never be released twice or used after release through this type.
pub struct Handle<T: ObjectId> {
    device: SharedDevice,
    id: T,
}

impl<T: ObjectId> Handle<T> {
    /// Acquires one object from `device` via `create`.
    pub fn create(device: &SharedDevice, create: impl FnOnce(&dyn Device) -> T) -> Self {
        let id = create(device.as_ref());
        log::trace!("acquired {id}");
        Self {
            device: Rc::clone(device),
            id,
        }
    }

    #[inline]
    pub fn id(&self) -> T {
        self.id
    }

    #[inline]
    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    #[inline]
    pub fn shared_device(&self) -> &SharedDevice {
        &self.device
    }

    /// Releases the object now instead of at end of scope.
    pub fn dispose(self) {
        drop(self);
    }
}

impl<T: ObjectId> Drop for Handle<T> {
    fn drop(&mut self) {
        log::trace!("releasing {}", self.id);
        self.device.delete(self.id.into_object());
    }
}

impl<T: ObjectId> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}
