use std::path::Path;

use crate::device::{SharedDevice, StageKind};
use crate::error::ShaderError;

use super::{ResourceLoader, Shader, ShaderStage, SourceOrigin};

#[derive(Debug, Clone)]
struct StageEntry {
    origin: SourceOrigin,
    path: String,
    kind: StageKind,
}

/// Collects stage sources for one program.
///
/// `build` resolves every source before compiling anything, so a missing
/// resource never leaves half-compiled stages behind.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ShaderBuilder {
    entries: Vec<StageEntry>,
}

impl ShaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage whose source is an embedded resource.
    pub fn internal(mut self, key: impl Into<String>, kind: StageKind) -> Self {
        self.entries.push(StageEntry {
            origin: SourceOrigin::Embedded,
            path: key.into(),
            kind,
        });
        self
    }

    /// Adds a stage whose source is a file on disk.
    pub fn external(mut self, path: impl Into<String>, kind: StageKind) -> Self {
        self.entries.push(StageEntry {
            origin: SourceOrigin::External,
            path: path.into(),
            kind,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self, device: &SharedDevice, loader: &dyn ResourceLoader) -> Result<Shader, ShaderError> {
        let sources = self
            .entries
            .iter()
            .map(|entry| resolve(entry, loader).map(|text| (entry, text)))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = sources
            .iter()
            .map(|(entry, text)| ShaderStage::compile(device, text, entry.kind, entry.origin))
            .collect::<Result<Vec<_>, _>>()?;

        Shader::link(device, stages)
    }
}

fn resolve(entry: &StageEntry, loader: &dyn ResourceLoader) -> Result<String, ShaderError> {
    match entry.origin {
        SourceOrigin::Embedded => {
            loader
                .load_embedded(&entry.path)
                .ok_or_else(|| ShaderError::ResourceNotFound {
                    key: entry.path.clone(),
                })
        }
        SourceOrigin::External => {
            let path = Path::new(&entry.path);
            loader.load_external(path).map_err(|source| ShaderError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::{Call, RecordingDevice};
    use crate::device::DeviceObject;
    use crate::shader::StaticResources;

    fn loader() -> StaticResources {
        StaticResources::new()
            .with("ok/vert.wgsl", "@vertex fn vs_main() {}")
            .with("ok/frag.wgsl", "@fragment fn fs_main() {}")
            .with("bad/frag.wgsl", "@fragment BROKEN")
    }

    fn compile_count(rec: &RecordingDevice) -> usize {
        rec.calls()
            .iter()
            .filter(|c| matches!(c, Call::CompileShader(_)))
            .count()
    }

    #[test]
    fn builds_program_from_embedded_sources() {
        let (rec, device) = RecordingDevice::shared();
        let shader = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .internal("ok/frag.wgsl", StageKind::Fragment)
            .build(&device, &loader())
            .unwrap();

        assert_eq!(shader.stages(), &[StageKind::Vertex, StageKind::Fragment]);
        assert_eq!(
            rec.compiled_sources(),
            vec!["@vertex fn vs_main() {}", "@fragment fn fs_main() {}"]
        );
        assert!(rec.deleted().iter().all(|o| matches!(o, DeviceObject::Shader(_))));
    }

    #[test]
    fn missing_embedded_resource_fails_before_any_compile() {
        let (rec, device) = RecordingDevice::shared();
        let err = Shader::builder()
            .internal("missing.wgsl", StageKind::Vertex)
            .internal("ok/frag.wgsl", StageKind::Fragment)
            .build(&device, &loader())
            .unwrap_err();

        assert!(matches!(err, ShaderError::ResourceNotFound { ref key } if key == "missing.wgsl"));
        assert_eq!(compile_count(&rec), 0);
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn missing_resource_late_in_list_still_compiles_nothing() {
        let (rec, device) = RecordingDevice::shared();
        let err = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .internal("ok/frag.wgsl", StageKind::Fragment)
            .internal("missing.wgsl", StageKind::Geometry)
            .build(&device, &loader())
            .unwrap_err();

        assert!(matches!(err, ShaderError::ResourceNotFound { .. }));
        assert_eq!(compile_count(&rec), 0);
    }

    #[test]
    fn unreadable_external_path_is_io_error() {
        let (rec, device) = RecordingDevice::shared();
        let err = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .external("/definitely/not/here/frag.wgsl", StageKind::Fragment)
            .build(&device, &loader())
            .unwrap_err();

        match err {
            ShaderError::Io { path, source } => {
                assert_eq!(path, Path::new("/definitely/not/here/frag.wgsl"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(compile_count(&rec), 0);
    }

    #[test]
    fn external_sources_are_read_from_disk() {
        let dir = std::env::temp_dir().join(format!("kat-engine-builder-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let frag = dir.join("frag.wgsl");
        std::fs::write(&frag, "@fragment fn fs_main() {}").unwrap();

        let (rec, device) = RecordingDevice::shared();
        let shader = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .external(frag.to_string_lossy(), StageKind::Fragment)
            .build(&device, &loader())
            .unwrap();

        assert_eq!(shader.stages().len(), 2);
        assert_eq!(rec.compiled_sources()[1], "@fragment fn fs_main() {}");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn compile_failure_releases_every_stage_and_skips_link() {
        let (rec, device) = RecordingDevice::new().failing_compile("BROKEN").into_shared();
        let err = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .internal("bad/frag.wgsl", StageKind::Fragment)
            .build(&device, &loader())
            .unwrap_err();

        assert!(matches!(
            err,
            ShaderError::Compile { kind: StageKind::Fragment, origin: SourceOrigin::Embedded, .. }
        ));
        assert_eq!(rec.deleted().len(), 2);
        assert!(!rec.calls().iter().any(|c| matches!(c, Call::CreateProgram(_))));
    }

    #[test]
    fn entry_order_does_not_change_stage_set() {
        let (_rec, device) = RecordingDevice::shared();
        let a = Shader::builder()
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .internal("ok/frag.wgsl", StageKind::Fragment)
            .build(&device, &loader())
            .unwrap();
        let b = Shader::builder()
            .internal("ok/frag.wgsl", StageKind::Fragment)
            .internal("ok/vert.wgsl", StageKind::Vertex)
            .build(&device, &loader())
            .unwrap();

        let mut sa = a.stages().to_vec();
        let mut sb = b.stages().to_vec();
        sa.sort();
        sb.sort();
        assert_eq!(sa, sb);
    }
}
