//! Shader pipeline: stage compilation, program linking, uniforms.
//!
//! Typical use goes through the builder:
//!
//! ```ignore
//! let mut shader = Shader::builder()
//!     .internal("main/vert.wgsl", StageKind::Vertex)
//!     .internal("main/frag.wgsl", StageKind::Fragment)
//!     .build(&device, &loader)?;
//! ```

mod builder;
mod program;
mod source;
mod stage;

pub use builder::ShaderBuilder;
pub use program::Shader;
pub use source::{EmbeddedResources, ResourceLoader, SourceOrigin, StaticResources};
pub use stage::ShaderStage;
