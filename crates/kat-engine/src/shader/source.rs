use std::collections::HashMap;
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::Path;

use rust_embed::RustEmbed;

/// Where a stage's source text comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    /// Resource bundled with the binary, looked up by key.
    Embedded,
    /// File on disk, looked up by path.
    External,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceOrigin::Embedded => "embedded",
            SourceOrigin::External => "external",
        })
    }
}

/// Byte-source provider for shader text.
pub trait ResourceLoader {
    /// Returns the embedded resource `key`, or `None` if absent.
    fn load_embedded(&self, key: &str) -> Option<String>;

    /// Reads an external file. Defaults to the filesystem.
    fn load_external(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader backed by a `rust-embed` asset folder.
///
/// ```ignore
/// #[derive(rust_embed::RustEmbed)]
/// #[folder = "shaders"]
/// struct Shaders;
///
/// let loader = EmbeddedResources::<Shaders>::new();
/// ```
pub struct EmbeddedResources<E: RustEmbed> {
    _assets: PhantomData<E>,
}

impl<E: RustEmbed> EmbeddedResources<E> {
    pub fn new() -> Self {
        Self {
            _assets: PhantomData,
        }
    }
}

impl<E: RustEmbed> Default for EmbeddedResources<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RustEmbed> ResourceLoader for EmbeddedResources<E> {
    fn load_embedded(&self, key: &str) -> Option<String> {
        let file = E::get(key)?;
        match std::str::from_utf8(file.data.as_ref()) {
            Ok(text) => Some(text.to_owned()),
            Err(e) => {
                log::warn!("embedded resource `{key}` is not valid UTF-8: {e}");
                None
            }
        }
    }
}

/// In-memory loader, typically filled from `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct StaticResources {
    entries: HashMap<String, String>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(key, source);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(key.into(), source.into());
    }
}

impl ResourceLoader for StaticResources {
    fn load_embedded(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resources_lookup() {
        let loader = StaticResources::new().with("main/vert.wgsl", "@vertex fn vs_main() {}");
        assert_eq!(
            loader.load_embedded("main/vert.wgsl").as_deref(),
            Some("@vertex fn vs_main() {}")
        );
        assert!(loader.load_embedded("main/frag.wgsl").is_none());
    }

    #[test]
    fn default_external_reads_filesystem() {
        let dir = std::env::temp_dir().join(format!("kat-engine-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frag.wgsl");
        std::fs::write(&path, "@fragment fn fs_main() {}").unwrap();

        let text = StaticResources::new().load_external(&path).unwrap();
        assert_eq!(text, "@fragment fn fs_main() {}");

        let missing = StaticResources::new().load_external(&dir.join("nope.wgsl"));
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn origin_display() {
        assert_eq!(SourceOrigin::Embedded.to_string(), "embedded");
        assert_eq!(SourceOrigin::External.to_string(), "external");
    }
}
