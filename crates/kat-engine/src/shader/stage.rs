use crate::device::{Handle, ShaderId, SharedDevice, StageKind};
use crate::error::ShaderError;

use super::SourceOrigin;

/// One successfully compiled shader stage.
///
/// A stage only exists to be linked. [`Shader::link`](super::Shader::link)
/// consumes it and the stage object is released right after linking.
#[derive(Debug)]
pub struct ShaderStage {
    handle: Handle<ShaderId>,
    kind: StageKind,
    origin: SourceOrigin,
}

impl ShaderStage {
    /// Compiles `source` as a `kind` stage.
    ///
    /// On failure the compiler log is logged and returned; the stage object is
    /// released either way.
    pub fn compile(
        device: &SharedDevice,
        source: &str,
        kind: StageKind,
        origin: SourceOrigin,
    ) -> Result<Self, ShaderError> {
        let handle = Handle::create(device, |d| d.create_shader(kind));
        let id = handle.id();

        device.shader_source(id, source);
        device.compile_shader(id);

        if !device.compile_status(id) {
            let log = device.shader_info_log(id);
            log::error!("{kind} stage ({origin}) failed to compile:\n{log}");
            return Err(ShaderError::Compile { kind, origin, log });
        }

        log::debug!("compiled {kind} stage {id} ({origin})");
        Ok(Self { handle, kind, origin })
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.handle.id()
    }

    #[inline]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    #[inline]
    pub fn origin(&self) -> SourceOrigin {
        self.origin
    }
}
