//! Vertex resources and draw submission.
//!
//! Convention:
//! - constructors bind what they need and restore the binding afterwards
//! - draws bind their layout and unbind it afterwards
//! - the active program is the caller's responsibility

pub mod draw;
mod vertex_array;
mod vertex_buffer;

pub use draw::{clear, clear_color, draw_arrays, draw_arrays_from, draw_triangles};
pub use vertex_array::{BufferBinding, VertexArray, VertexAttribute};
pub use vertex_buffer::VertexBuffer;
