use std::collections::HashSet;

use glam::Mat4;

use crate::device::{Handle, ProgramId, SharedDevice, StageKind, UniformLocation, UniformValue};
use crate::error::ShaderError;

use super::{ShaderBuilder, ShaderStage};

/// Linked shader program.
///
/// Uniform writes target this program directly; they do not require it to be
/// the active one. Unknown uniform names are ignored and reported once.
#[derive(Debug)]
pub struct Shader {
    handle: Handle<ProgramId>,
    stages: Vec<StageKind>,
    matrix_scratch: [f32; 16],
    missing_uniforms: HashSet<String>,
}

impl Shader {
    pub fn builder() -> ShaderBuilder {
        ShaderBuilder::new()
    }

    /// Links compiled stages into a program.
    ///
    /// Every stage passed in is released once linking has run, whatever the
    /// outcome. On failure the program is released too.
    pub fn link(device: &SharedDevice, stages: Vec<ShaderStage>) -> Result<Self, ShaderError> {
        let handle = Handle::create(device, |d| d.create_program());
        let program = handle.id();

        for stage in &stages {
            device.attach_shader(program, stage.id());
        }
        device.link_program(program);

        let kinds: Vec<StageKind> = stages.iter().map(ShaderStage::kind).collect();
        drop(stages);

        if !device.link_status(program) {
            let log = device.program_info_log(program);
            log::error!("{program} failed to link:\n{log}");
            return Err(ShaderError::Link { kinds, log });
        }

        log::debug!("linked {program} from {kinds:?}");
        Ok(Self {
            handle,
            stages: kinds,
            matrix_scratch: [0.0; 16],
            missing_uniforms: HashSet::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.handle.id()
    }

    /// Stage kinds this program was linked from, in link order.
    #[inline]
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// Makes this program active for subsequent draws.
    pub fn use_program(&self) {
        self.handle.device().use_program(Some(self.handle.id()));
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    pub fn uniform1f(&mut self, name: &str, x: f32) {
        self.write(name, UniformValue::Float(x));
    }

    pub fn uniform2f(&mut self, name: &str, x: f32, y: f32) {
        self.write(name, UniformValue::Vec2([x, y]));
    }

    pub fn uniform3f(&mut self, name: &str, x: f32, y: f32, z: f32) {
        self.write(name, UniformValue::Vec3([x, y, z]));
    }

    pub fn uniform4f(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.write(name, UniformValue::Vec4([x, y, z, w]));
    }

    pub fn uniform2fv(&mut self, name: &str, v: impl Into<[f32; 2]>) {
        self.write(name, UniformValue::Vec2(v.into()));
    }

    pub fn uniform3fv(&mut self, name: &str, v: impl Into<[f32; 3]>) {
        self.write(name, UniformValue::Vec3(v.into()));
    }

    /// Accepts `glam::Vec4`, `[f32; 4]` or a [`Color`](crate::paint::Color).
    pub fn uniform4fv(&mut self, name: &str, v: impl Into<[f32; 4]>) {
        self.write(name, UniformValue::Vec4(v.into()));
    }

    /// Writes `m` in column-major order.
    pub fn uniform_matrix4f(&mut self, name: &str, m: Mat4) {
        let Some(location) = self.location(name) else {
            return;
        };
        m.write_cols_to_slice(&mut self.matrix_scratch);
        self.handle.device().program_uniform(
            self.handle.id(),
            location,
            UniformValue::Mat4(&self.matrix_scratch),
        );
    }

    fn write(&mut self, name: &str, value: UniformValue<'_>) {
        if let Some(location) = self.location(name) {
            self.handle
                .device()
                .program_uniform(self.handle.id(), location, value);
        }
    }

    fn location(&mut self, name: &str) -> Option<UniformLocation> {
        let location = self.handle.device().uniform_location(self.handle.id(), name);
        if location.is_none() && self.missing_uniforms.insert(name.to_owned()) {
            log::warn!("{}: no active uniform named `{name}`, writes are ignored", self.handle.id());
        }
        location
    }

    pub fn dispose(self) {
        self.handle.dispose();
    }
}
