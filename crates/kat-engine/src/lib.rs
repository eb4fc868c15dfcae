//! kat engine crate.
//!
//! A small GL-style rendering scaffold: vertex buffers and layouts, shader
//! programs with named uniforms, and a render loop that drives a window.
//! Resources talk to a [`device::Device`]; [`gpu::WgpuDevice`] implements it
//! on wgpu.

pub mod core;
pub mod device;
pub mod error;
pub mod gpu;
pub mod logging;
pub mod paint;
pub mod render;
pub mod shader;
pub mod time;
pub mod window;

pub use error::{LayoutError, ShaderError};
pub use paint::{palette, Color};
